//! Task handle: a lazily refreshed view of one asynchronous task.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use docsearch_core::{ErrorPayload, TaskRecord, TaskStatus, TaskUid};

use crate::diagnostics::Diagnostics;
use crate::error::ClientError;
use crate::tasks::{wait_for_task, FetchOutcome, TaskEndpoint, TaskFilter, WaitOptions};

/// What is known about the task still existing on the service.
///
/// Moves from `Unknown` or `Present` to `Deleted` and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// Never probed.
    Unknown,
    /// Last fetch found the task.
    Present,
    /// A fetch returned not-found.
    Deleted,
}

/// Handle over one task record.
///
/// Status predicates refresh the record only when the cached answer could
/// be stale: a task shown as enqueued or processing may have moved on, a
/// finished task cannot.
///
/// ```rust,no_run
/// # async fn example(client: &docsearch_client::Client) -> Result<(), docsearch_client::ClientError> {
/// use serde_json::json;
///
/// let mut task = client
///     .index("movies")
///     .documents()
///     .add(&[json!({"id": 1, "title": "Nope"})], None)
///     .await?;
///
/// task.wait(client.wait_options()).await?;
/// if task.is_failed() {
///     eprintln!("indexing failed: {:?}", task.error());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Task {
    record: TaskRecord,
    deletion: Deletion,
    endpoint: Arc<dyn TaskEndpoint>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Task {
    /// Wrap a validated record.
    pub fn new(
        record: TaskRecord,
        endpoint: Arc<dyn TaskEndpoint>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            record,
            deletion: Deletion::Unknown,
            endpoint,
            diagnostics,
        }
    }

    /// Validate a raw record and wrap it.
    pub fn from_value(
        value: Value,
        endpoint: Arc<dyn TaskEndpoint>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, ClientError> {
        Ok(Self::new(TaskRecord::from_value(value)?, endpoint, diagnostics))
    }

    pub fn uid(&self) -> TaskUid {
        self.record.uid()
    }

    pub fn kind(&self) -> &str {
        self.record.kind()
    }

    /// Cached status, without refreshing.
    pub fn status(&self) -> TaskStatus {
        self.record.status()
    }

    pub fn error(&self) -> Option<ErrorPayload> {
        self.record.error()
    }

    pub fn record(&self) -> &TaskRecord {
        &self.record
    }

    pub fn into_record(self) -> TaskRecord {
        self.record
    }

    /// Raw field of the cached record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.record.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.record.keys()
    }

    pub fn deletion(&self) -> Deletion {
        self.deletion
    }

    pub async fn is_enqueued(&mut self) -> Result<bool, ClientError> {
        if self.status() == TaskStatus::Enqueued {
            self.refresh().await?;
        }
        Ok(self.status() == TaskStatus::Enqueued)
    }

    pub async fn is_processing(&mut self) -> Result<bool, ClientError> {
        if self.status().is_unfinished() {
            self.refresh().await?;
        }
        Ok(self.status() == TaskStatus::Processing)
    }

    /// True while the task is enqueued or processing.
    pub async fn is_unfinished(&mut self) -> Result<bool, ClientError> {
        if self.status().is_unfinished() {
            self.refresh().await?;
        }
        Ok(self.status().is_unfinished())
    }

    /// Alias of [`Task::is_unfinished`].
    pub async fn is_waiting(&mut self) -> Result<bool, ClientError> {
        self.is_unfinished().await
    }

    pub async fn is_finished(&mut self) -> Result<bool, ClientError> {
        Ok(!self.is_unfinished().await?)
    }

    /// Answers from the cached record. Warns if the task is not known to be
    /// finished yet, see [`Task::wait`].
    pub fn is_succeeded(&self) -> bool {
        self.warn_if_unfinished("succeeded");
        self.status() == TaskStatus::Succeeded
    }

    /// Answers from the cached record. Warns if the task is not known to be
    /// finished yet.
    pub fn is_failed(&self) -> bool {
        self.warn_if_unfinished("failed");
        self.status() == TaskStatus::Failed
    }

    /// Answers from the cached record. Warns if the task is not known to be
    /// finished yet.
    pub fn is_cancelled(&self) -> bool {
        self.warn_if_unfinished("cancelled");
        self.status() == TaskStatus::Cancelled
    }

    /// Probes the service once; afterwards answers from the cached flag.
    pub async fn is_deleted(&mut self) -> Result<bool, ClientError> {
        if self.deletion == Deletion::Unknown {
            self.refresh().await?;
        }
        Ok(self.deletion == Deletion::Deleted)
    }

    /// Replace the cached record with a fresh one.
    ///
    /// A not-found answer marks the task deleted and keeps the last known
    /// record. Other errors propagate.
    pub async fn refresh(&mut self) -> Result<&mut Self, ClientError> {
        match self.endpoint.fetch_task(self.uid()).await? {
            FetchOutcome::Found(record) => {
                self.record = record;
                if self.deletion == Deletion::Unknown {
                    self.deletion = Deletion::Present;
                }
            }
            FetchOutcome::NotFound(_) => {
                debug!(task_uid = %self.uid(), "Task no longer exists");
                self.deletion = Deletion::Deleted;
            }
        }
        Ok(self)
    }

    /// Wait for the task to finish. No request is made if it already has.
    ///
    /// Fails with [`ClientError::Timeout`] if it does not finish within
    /// `opts.timeout`.
    pub async fn wait(&mut self, opts: WaitOptions) -> Result<&mut Self, ClientError> {
        if self.status().is_terminal() {
            return Ok(self);
        }

        let record = wait_for_task(self.endpoint.as_ref(), self.uid(), opts).await?;
        info!(task_uid = %record.uid(), status = %record.status(), "Task finished");
        self.record = record;
        if self.deletion == Deletion::Unknown {
            self.deletion = Deletion::Present;
        }
        Ok(self)
    }

    /// Ask the service to cancel the task.
    ///
    /// Returns true if the task ends up cancelled. A task that already
    /// finished in another state cannot be cancelled and no cancellation is
    /// requested. A stale unfinished status is refreshed first.
    pub async fn cancel(&mut self, opts: WaitOptions) -> Result<bool, ClientError> {
        if self.status() == TaskStatus::Cancelled {
            return Ok(true);
        }
        if self.is_finished().await? {
            return Ok(self.status() == TaskStatus::Cancelled);
        }

        let cancellation = self
            .endpoint
            .cancel_tasks(&TaskFilter::uid(self.uid()))
            .await?;
        debug!(task_uid = %self.uid(), cancellation_uid = %cancellation.uid(), "Cancellation enqueued");
        wait_for_task(self.endpoint.as_ref(), cancellation.uid(), opts).await?;

        self.refresh().await?;
        Ok(self.is_cancelled())
    }

    /// Delete the finished task from the service's task list.
    ///
    /// Returns false without a request while the task is unfinished.
    pub async fn delete(&mut self, opts: WaitOptions) -> Result<bool, ClientError> {
        if !self.is_finished().await? {
            return Ok(false);
        }

        let deletion = self
            .endpoint
            .delete_tasks(&TaskFilter::uid(self.uid()))
            .await?;
        debug!(task_uid = %self.uid(), deletion_uid = %deletion.uid(), "Deletion enqueued");
        wait_for_task(self.endpoint.as_ref(), deletion.uid(), opts).await?;

        // Re-probe: an earlier probe may have seen the task present.
        self.refresh().await?;
        self.is_deleted().await
    }

    fn warn_if_unfinished(&self, predicate: &str) {
        if self.status().is_unfinished() {
            self.diagnostics.warn(&format!(
                "task {} is still {}; checking whether it {predicate} before it finished \
                 answers from a stale status. Call `wait` or `is_finished` first.",
                self.uid(),
                self.status()
            ));
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("record", &self.record)
            .field("deletion", &self.deletion)
            .finish_non_exhaustive()
    }
}
