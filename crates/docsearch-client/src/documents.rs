//! Document ingestion and retrieval.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use docsearch_core::TaskRecord;

use crate::error::ClientError;
use crate::http::encode_segment;
use crate::index::Index;
use crate::task::Task;

/// Documents of one index.
pub struct Documents {
    index: Index,
}

impl Documents {
    pub(crate) fn new(index: Index) -> Self {
        Self { index }
    }

    fn path(&self) -> String {
        format!("{}/documents", self.index.path())
    }

    fn task(&self, record: TaskRecord) -> Task {
        self.index.shared().task(record)
    }

    /// Add documents, replacing any existing document with the same id.
    pub async fn add<T: Serialize>(
        &self,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<Task, ClientError> {
        let record = self
            .index
            .shared()
            .http
            .post_with_query(&self.path(), &primary_key_query(primary_key), documents)
            .await?;
        Ok(self.task(record))
    }

    /// Add documents, merging fields into any existing document with the
    /// same id.
    pub async fn update<T: Serialize>(
        &self,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<Task, ClientError> {
        let record = self
            .index
            .shared()
            .http
            .put_with_query(&self.path(), &primary_key_query(primary_key), documents)
            .await?;
        Ok(self.task(record))
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T, ClientError> {
        self.index
            .shared()
            .http
            .get(&format!("{}/{}", self.path(), encode_segment(id)))
            .await
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<DocumentsPage<T>, ClientError> {
        self.index
            .shared()
            .http
            .get_with_query(
                &self.path(),
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Task, ClientError> {
        let record = self
            .index
            .shared()
            .http
            .delete(&format!("{}/{}", self.path(), encode_segment(id)))
            .await?;
        Ok(self.task(record))
    }

    pub async fn delete_batch<I: Serialize>(&self, ids: &[I]) -> Result<Task, ClientError> {
        let record = self
            .index
            .shared()
            .http
            .post(&format!("{}/delete-batch", self.path()), ids)
            .await?;
        Ok(self.task(record))
    }

    pub async fn delete_all(&self) -> Result<Task, ClientError> {
        let record = self.index.shared().http.delete(&self.path()).await?;
        Ok(self.task(record))
    }
}

fn primary_key_query(primary_key: Option<&str>) -> Vec<(&'static str, &str)> {
    primary_key.map(|pk| ("primaryKey", pk)).into_iter().collect()
}

/// One page of documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsPage<T> {
    pub results: Vec<T>,
    pub offset: u32,
    pub limit: u32,
    pub total: u64,
}
