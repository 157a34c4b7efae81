//! Client library for the docsearch service.
//!
//! Wraps the HTTP API (indexes, documents, search, settings, keys) and
//! tracks the asynchronous tasks the service enqueues for every write.
//!
//! ```no_run
//! use docsearch_client::{Client, ClientConfig, SearchQuery};
//! use serde_json::{json, Value};
//!
//! # async fn run() -> Result<(), docsearch_client::ClientError> {
//! let client = Client::new(ClientConfig::from_env())?;
//! let movies = client.index("movies");
//!
//! let mut task = movies.documents().add(&[json!({"id": 1, "title": "Nope"})], Some("id")).await?;
//! task.wait(client.wait_options()).await?;
//!
//! let query = SearchQuery::new("nope").with_filter(&json!({"id": {"gte": 1}}))?;
//! let results = movies.search::<Value>(&query).await?;
//! println!("{} hits", results.hits.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod documents;
pub mod error;
pub mod http;
pub mod index;
pub mod keys;
pub mod search;
pub mod settings;
pub mod task;
pub mod tasks;

pub use client::{Client, Health, IndexPage, Stats, Version};
pub use config::ClientConfig;
pub use diagnostics::{Diagnostics, NoopDiagnostics, TracingDiagnostics};
pub use documents::{Documents, DocumentsPage};
pub use error::{ApiError, ClientError};
pub use http::HttpClient;
pub use index::{Index, IndexInfo, IndexStats};
pub use keys::{Key, KeyPage, KeyRequest, Keys};
pub use search::{SearchQuery, SearchResults};
pub use settings::{AttributeList, IndexSettings, Settings};
pub use task::{Deletion, Task};
pub use tasks::{
    wait_for_task, FetchOutcome, TaskEndpoint, TaskFilter, TaskPage, TasksEndpoint, WaitOptions,
};

pub use docsearch_core::{
    filter, ErrorPayload, FilterError, IndexUid, TaskRecord, TaskStatus, TaskUid,
};
