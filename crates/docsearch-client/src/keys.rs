//! API key management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::Shared;
use crate::error::ClientError;
use crate::http::encode_segment;

/// An API key as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub uid: Uuid,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub actions: Vec<String>,
    pub indexes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for creating a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub actions: Vec<String>,
    pub indexes: Vec<String>,
    /// `None` means the key never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl KeyRequest {
    pub fn new<A, I>(actions: A, indexes: I) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            uid: None,
            name: None,
            description: None,
            actions: actions.into_iter().map(Into::into).collect(),
            indexes: indexes.into_iter().map(Into::into).collect(),
            expires_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPage {
    pub results: Vec<Key>,
    pub offset: u32,
    pub limit: u32,
    pub total: u64,
}

/// Key endpoints. Key changes take effect immediately and return the key,
/// not a task.
pub struct Keys {
    shared: Shared,
}

impl Keys {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    pub async fn list(&self, offset: u32, limit: u32) -> Result<KeyPage, ClientError> {
        self.shared
            .http
            .get_with_query(
                "/keys",
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    /// Fetch a key by its uid or its value.
    pub async fn get(&self, key: &str) -> Result<Key, ClientError> {
        self.shared.http.get(&format!("/keys/{}", encode_segment(key))).await
    }

    pub async fn create(&self, request: &KeyRequest) -> Result<Key, ClientError> {
        self.shared.http.post("/keys", request).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), ClientError> {
        self.shared
            .http
            .delete::<serde_json::Value>(&format!("/keys/{}", encode_segment(key)))
            .await?;
        Ok(())
    }
}
