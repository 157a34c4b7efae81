//! Top-level client.
//!
//! The client does not implement any resource itself. It owns the transport,
//! the task endpoint and the diagnostics sink, and hands out resource
//! objects ([`Index`], [`Keys`], [`TasksEndpoint`]) that share them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use docsearch_core::{IndexUid, TaskRecord, TaskUid};

use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::ClientError;
use crate::http::HttpClient;
use crate::index::{Index, IndexInfo, IndexStats};
use crate::keys::Keys;
use crate::task::Task;
use crate::tasks::{TasksEndpoint, WaitOptions};

/// State shared by the client and every resource object it hands out.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) http: Arc<HttpClient>,
    pub(crate) tasks: Arc<TasksEndpoint>,
    pub(crate) diagnostics: Arc<dyn Diagnostics>,
}

impl Shared {
    /// Wrap an enqueued record in a handle.
    pub(crate) fn task(&self, record: TaskRecord) -> Task {
        Task::new(record, self.tasks.clone(), self.diagnostics.clone())
    }
}

/// Client for one service instance.
pub struct Client {
    shared: Shared,
    config: ClientConfig,
}

impl Client {
    /// Create a client. No request is made.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Arc::new(HttpClient::new(&config)?);
        info!(url = %http.base_url(), authenticated = config.api_key.is_some(), "Created docsearch client");

        Ok(Self {
            shared: Shared {
                tasks: Arc::new(TasksEndpoint::new(http.clone())),
                http,
                diagnostics: Arc::new(TracingDiagnostics),
            },
            config,
        })
    }

    /// Replace the warning sink used by this client and the handles it
    /// creates.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.shared.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Default polling bounds from the configuration.
    pub fn wait_options(&self) -> WaitOptions {
        self.config.wait
    }

    pub fn tasks(&self) -> &TasksEndpoint {
        &self.shared.tasks
    }

    pub fn index(&self, uid: impl Into<IndexUid>) -> Index {
        Index::new(uid.into(), self.shared.clone())
    }

    pub fn keys(&self) -> Keys {
        Keys::new(self.shared.clone())
    }

    /// Wrap a record obtained elsewhere in a handle bound to this client.
    pub fn wrap_task(&self, record: TaskRecord) -> Task {
        self.shared.task(record)
    }

    /// Fetch a task and wrap it.
    pub async fn task(&self, uid: TaskUid) -> Result<Task, ClientError> {
        Ok(self.shared.task(self.shared.tasks.get(uid).await?))
    }

    /// Poll a task until it finishes. See [`crate::wait_for_task`].
    pub async fn wait_for_task(
        &self,
        uid: TaskUid,
        opts: WaitOptions,
    ) -> Result<TaskRecord, ClientError> {
        self.shared.tasks.wait_for_task(uid, opts).await
    }

    /// Create an index. Shorthand for `client.index(uid).create(..)`.
    pub async fn create_index(
        &self,
        uid: impl Into<IndexUid>,
        primary_key: Option<&str>,
    ) -> Result<Task, ClientError> {
        self.index(uid).create(primary_key).await
    }

    /// List indexes.
    pub async fn indexes(&self, offset: u32, limit: u32) -> Result<IndexPage, ClientError> {
        self.shared
            .http
            .get_with_query(
                "/indexes",
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        self.shared.http.get("/health").await
    }

    /// True if the service answers its health check. Transport failures
    /// count as unhealthy.
    pub async fn is_healthy(&self) -> bool {
        matches!(self.health().await, Ok(health) if health.status == "available")
    }

    pub async fn version(&self) -> Result<Version, ClientError> {
        self.shared.http.get("/version").await
    }

    /// Stats for the whole instance.
    pub async fn stats(&self) -> Result<Stats, ClientError> {
        self.shared.http.get("/stats").await
    }
}

/// One page of `GET /indexes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPage {
    pub results: Vec<IndexInfo>,
    pub offset: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub commit_sha: String,
    pub commit_date: String,
    pub pkg_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub database_size: u64,
    pub last_update: Option<String>,
    pub indexes: HashMap<String, IndexStats>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
