//! Index resource.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use docsearch_core::IndexUid;

use crate::client::Shared;
use crate::documents::Documents;
use crate::error::ClientError;
use crate::search::{SearchQuery, SearchResults};
use crate::settings::IndexSettings;
use crate::task::Task;

/// Handle on one index. Creating the handle makes no request.
#[derive(Clone)]
pub struct Index {
    uid: IndexUid,
    shared: Shared,
}

impl Index {
    pub(crate) fn new(uid: IndexUid, shared: Shared) -> Self {
        Self { uid, shared }
    }

    pub fn uid(&self) -> &IndexUid {
        &self.uid
    }

    pub(crate) fn path(&self) -> String {
        format!("/indexes/{}", self.uid)
    }

    pub async fn create(&self, primary_key: Option<&str>) -> Result<Task, ClientError> {
        let body = json!({ "uid": self.uid, "primaryKey": primary_key });
        let record = self.shared.http.post("/indexes", &body).await?;
        Ok(self.shared.task(record))
    }

    pub async fn fetch_info(&self) -> Result<IndexInfo, ClientError> {
        self.shared.http.get(&self.path()).await
    }

    /// Change the primary key.
    pub async fn update(&self, primary_key: &str) -> Result<Task, ClientError> {
        let body = json!({ "primaryKey": primary_key });
        let record = self.shared.http.patch(&self.path(), &body).await?;
        Ok(self.shared.task(record))
    }

    pub async fn delete(&self) -> Result<Task, ClientError> {
        let record = self.shared.http.delete(&self.path()).await?;
        Ok(self.shared.task(record))
    }

    pub async fn stats(&self) -> Result<IndexStats, ClientError> {
        self.shared.http.get(&format!("{}/stats", self.path())).await
    }

    pub fn documents(&self) -> Documents {
        Documents::new(self.clone())
    }

    pub fn settings(&self) -> IndexSettings {
        IndexSettings::new(self.clone())
    }

    /// Run a search. Hits deserialize into `T`.
    pub async fn search<T: DeserializeOwned>(
        &self,
        query: &SearchQuery,
    ) -> Result<SearchResults<T>, ClientError> {
        self.shared
            .http
            .post(&format!("{}/search", self.path()), query)
            .await
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub uid: String,
    pub primary_key: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub number_of_documents: u64,
    pub is_indexing: bool,
    #[serde(default)]
    pub field_distribution: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::Client;
    use docsearch_core::TaskStatus;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_create_returns_task_handle() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/indexes")
            .match_body(Matcher::Json(json!({"uid": "movies", "primaryKey": "id"})))
            .with_status(202)
            .with_body(
                json!({
                    "taskUid": 0,
                    "indexUid": "movies",
                    "status": "enqueued",
                    "type": "indexCreation",
                    "enqueuedAt": "2024-05-01T10:00:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = Client::new(ClientConfig::new(server.url())).unwrap();
        let task = client.create_index("movies", Some("id")).await.unwrap();

        assert_eq!(task.uid().get(), 0);
        assert_eq!(task.status(), TaskStatus::Enqueued);
        assert_eq!(task.kind(), "indexCreation");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stats() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/indexes/movies/stats")
            .with_status(200)
            .with_body(r#"{"numberOfDocuments":19654,"isIndexing":false,"fieldDistribution":{"title":19654}}"#)
            .create_async()
            .await;

        let client = Client::new(ClientConfig::new(server.url())).unwrap();
        let stats = client.index("movies").stats().await.unwrap();

        assert_eq!(stats.number_of_documents, 19654);
        assert_eq!(stats.field_distribution.get("title"), Some(&19654));
    }
}
