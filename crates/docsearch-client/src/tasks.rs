//! Task endpoint and the bounded polling primitive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use docsearch_core::{TaskRecord, TaskStatus, TaskUid};

use crate::error::{ApiError, ClientError};
use crate::http::HttpClient;

/// Result of fetching one task by uid.
///
/// Not-found is an expected answer (the task was deleted), so it is a
/// variant rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(TaskRecord),
    NotFound(ApiError),
}

/// Operations a task handle needs from the service.
#[async_trait]
pub trait TaskEndpoint: Send + Sync {
    /// Fetch the current record of a task.
    async fn fetch_task(&self, uid: TaskUid) -> Result<FetchOutcome, ClientError>;

    /// Ask the service to cancel matching tasks. Returns the enqueued
    /// cancellation task.
    async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskRecord, ClientError>;

    /// Ask the service to delete matching finished tasks. Returns the
    /// enqueued deletion task.
    async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskRecord, ClientError>;
}

/// Bounds for [`wait_for_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total time allowed for the task to reach a terminal status.
    pub timeout: Duration,
    /// Pause between two polls. Should be well below `timeout`.
    pub interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            interval: Duration::from_millis(50),
        }
    }
}

/// Poll a task until it is no longer enqueued or processing.
///
/// `failed` and `cancelled` records are returned like `succeeded` ones; it
/// is up to the caller to inspect them. Fetch errors (including not-found)
/// propagate immediately. If no terminal record shows up within
/// `opts.timeout`, returns [`ClientError::Timeout`].
pub async fn wait_for_task(
    endpoint: &dyn TaskEndpoint,
    uid: TaskUid,
    opts: WaitOptions,
) -> Result<TaskRecord, ClientError> {
    match tokio::time::timeout(opts.timeout, poll_until_terminal(endpoint, uid, opts.interval)).await
    {
        Ok(result) => result,
        Err(_) => {
            debug!(
                task_uid = %uid,
                timeout_ms = opts.timeout.as_millis() as u64,
                "Gave up waiting for task"
            );
            Err(ClientError::Timeout {
                uid,
                timeout: opts.timeout,
            })
        }
    }
}

async fn poll_until_terminal(
    endpoint: &dyn TaskEndpoint,
    uid: TaskUid,
    interval: Duration,
) -> Result<TaskRecord, ClientError> {
    loop {
        let record = match endpoint.fetch_task(uid).await? {
            FetchOutcome::Found(record) => record,
            FetchOutcome::NotFound(err) => return Err(ClientError::Api(err)),
        };

        if record.status().is_terminal() {
            return Ok(record);
        }

        trace!(task_uid = %uid, status = %record.status(), "Task not finished yet");
        tokio::time::sleep(interval).await;
    }
}

/// Selects tasks for listing, cancellation and deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub uids: Vec<TaskUid>,
    pub statuses: Vec<TaskStatus>,
    pub types: Vec<String>,
    pub index_uids: Vec<String>,
    pub limit: Option<u32>,
    pub from: Option<u64>,
}

impl TaskFilter {
    /// Filter matching one task.
    pub fn uid(uid: TaskUid) -> Self {
        Self {
            uids: vec![uid],
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn with_index_uids<S: Into<String>>(mut self, uids: impl IntoIterator<Item = S>) -> Self {
        self.index_uids.extend(uids.into_iter().map(Into::into));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Query parameters; list values are comma joined, empty lists omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_list(&mut query, "uids", self.uids.iter());
        push_list(&mut query, "statuses", self.statuses.iter());
        push_list(&mut query, "types", self.types.iter());
        push_list(&mut query, "indexUids", self.index_uids.iter());
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(from) = self.from {
            query.push(("from", from.to_string()));
        }
        query
    }
}

fn push_list<T: ToString>(
    query: &mut Vec<(&'static str, String)>,
    key: &'static str,
    values: impl Iterator<Item = T>,
) {
    let joined = values.map(|v| v.to_string()).collect::<Vec<_>>().join(",");
    if !joined.is_empty() {
        query.push((key, joined));
    }
}

/// One page of `GET /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub results: Vec<TaskRecord>,
    pub limit: u32,
    pub from: Option<u64>,
    pub next: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// HTTP implementation of [`TaskEndpoint`].
#[derive(Debug, Clone)]
pub struct TasksEndpoint {
    http: Arc<HttpClient>,
}

impl TasksEndpoint {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch a task, treating not-found as an error.
    pub async fn get(&self, uid: TaskUid) -> Result<TaskRecord, ClientError> {
        match self.fetch_task(uid).await? {
            FetchOutcome::Found(record) => Ok(record),
            FetchOutcome::NotFound(err) => Err(ClientError::Api(err)),
        }
    }

    /// List tasks matching `filter`.
    pub async fn list(&self, filter: &TaskFilter) -> Result<TaskPage, ClientError> {
        self.http.get_with_query("/tasks", &filter.to_query()).await
    }

    /// Poll `uid` until terminal. See [`wait_for_task`].
    pub async fn wait_for_task(
        &self,
        uid: TaskUid,
        opts: WaitOptions,
    ) -> Result<TaskRecord, ClientError> {
        wait_for_task(self, uid, opts).await
    }
}

#[async_trait]
impl TaskEndpoint for TasksEndpoint {
    async fn fetch_task(&self, uid: TaskUid) -> Result<FetchOutcome, ClientError> {
        match self.http.get(&format!("/tasks/{uid}")).await {
            Ok(record) => Ok(FetchOutcome::Found(record)),
            Err(ClientError::Api(err)) if err.is_not_found() => Ok(FetchOutcome::NotFound(err)),
            Err(e) => Err(e),
        }
    }

    async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskRecord, ClientError> {
        self.http
            .post_query("/tasks/cancel", &filter.to_query())
            .await
    }

    async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskRecord, ClientError> {
        self.http
            .delete_with_query("/tasks", &filter.to_query())
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use docsearch_core::ErrorPayload;

    pub fn record(uid: u64, status: &str) -> TaskRecord {
        record_of_type(uid, status, "documentAdditionOrUpdate")
    }

    pub fn record_of_type(uid: u64, status: &str, kind: &str) -> TaskRecord {
        TaskRecord::from_value(json!({
            "uid": uid,
            "indexUid": "movies",
            "status": status,
            "type": kind,
        }))
        .unwrap()
    }

    pub fn not_found() -> ApiError {
        ApiError::new(404, ErrorPayload::from_message("task not found"))
    }

    /// Scripted in-memory endpoint.
    ///
    /// Each task uid has a queue of fetch answers; the last answer repeats
    /// once the queue is drained.
    #[derive(Default)]
    pub struct FakeEndpoint {
        answers: Mutex<Vec<(TaskUid, VecDeque<Result<FetchOutcome, ApiError>>)>>,
        pub fetches: Mutex<Vec<TaskUid>>,
        pub cancels: Mutex<Vec<TaskFilter>>,
        pub deletes: Mutex<Vec<TaskFilter>>,
        next_uid: Mutex<u64>,
    }

    impl FakeEndpoint {
        pub fn new() -> Self {
            Self {
                next_uid: Mutex::new(1000),
                ..Self::default()
            }
        }

        pub fn script(&self, uid: u64, answers: Vec<Result<FetchOutcome, ApiError>>) {
            self.answers
                .lock()
                .unwrap()
                .push((TaskUid::new(uid), answers.into_iter().collect()));
        }

        pub fn script_statuses(&self, uid: u64, statuses: &[&str]) {
            self.script(
                uid,
                statuses
                    .iter()
                    .map(|s| Ok(FetchOutcome::Found(record(uid, s))))
                    .collect(),
            );
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.lock().unwrap().len()
        }

        fn enqueue(&self, kind: &str) -> TaskRecord {
            let mut next = self.next_uid.lock().unwrap();
            *next += 1;
            let uid = *next;
            self.script_statuses(uid, &["succeeded"]);
            let summary: Value = json!({
                "taskUid": uid,
                "indexUid": null,
                "status": "enqueued",
                "type": kind,
            });
            TaskRecord::from_value(summary).unwrap()
        }
    }

    #[async_trait]
    impl TaskEndpoint for FakeEndpoint {
        async fn fetch_task(&self, uid: TaskUid) -> Result<FetchOutcome, ClientError> {
            self.fetches.lock().unwrap().push(uid);
            let mut answers = self.answers.lock().unwrap();
            let queue = answers
                .iter_mut()
                .find(|(id, _)| *id == uid)
                .map(|(_, queue)| queue)
                .unwrap_or_else(|| panic!("no scripted answers for task {uid}"));
            let answer = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            answer.map_err(ClientError::Api)
        }

        async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskRecord, ClientError> {
            self.cancels.lock().unwrap().push(filter.clone());
            Ok(self.enqueue("taskCancelation"))
        }

        async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskRecord, ClientError> {
            self.deletes.lock().unwrap().push(filter.clone());
            Ok(self.enqueue("taskDeletion"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    use crate::config::ClientConfig;

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_first_terminal_record() {
        let endpoint = FakeEndpoint::new();
        endpoint.script_statuses(1, &["enqueued", "processing", "succeeded"]);
        let interval = Duration::from_millis(100);

        let started = tokio::time::Instant::now();
        let record = wait_for_task(
            &endpoint,
            TaskUid::new(1),
            WaitOptions::new(Duration::from_millis(1000), interval),
        )
        .await
        .unwrap();

        assert_eq!(record.status(), TaskStatus::Succeeded);
        assert_eq!(endpoint.fetch_count(), 3);
        assert_eq!(started.elapsed(), interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_on_stuck_task() {
        let endpoint = FakeEndpoint::new();
        endpoint.script_statuses(2, &["processing"]);

        let err = wait_for_task(
            &endpoint,
            TaskUid::new(2),
            WaitOptions::new(Duration::from_millis(500), Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(err, ClientError::Timeout { uid, .. } if uid == TaskUid::new(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_failed_and_cancelled_records() {
        let endpoint = FakeEndpoint::new();
        endpoint.script_statuses(3, &["processing", "failed"]);
        endpoint.script_statuses(4, &["canceled"]);
        let opts = WaitOptions::default();

        let failed = wait_for_task(&endpoint, TaskUid::new(3), opts).await.unwrap();
        let cancelled = wait_for_task(&endpoint, TaskUid::new(4), opts).await.unwrap();

        assert_eq!(failed.status(), TaskStatus::Failed);
        assert_eq!(cancelled.status(), TaskStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_propagates_fetch_errors_without_retry() {
        let endpoint = FakeEndpoint::new();
        endpoint.script(
            5,
            vec![Err(ApiError::new(
                500,
                docsearch_core::ErrorPayload::from_message("internal"),
            ))],
        );

        let err = wait_for_task(&endpoint, TaskUid::new(5), WaitOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Api(ref api) if api.status == 500));
        assert_eq!(endpoint.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_surfaces_not_found_as_api_error() {
        let endpoint = FakeEndpoint::new();
        endpoint.script(6, vec![Ok(FetchOutcome::NotFound(not_found()))]);

        let err = wait_for_task(&endpoint, TaskUid::new(6), WaitOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_task_filter_query() {
        let filter = TaskFilter::uid(TaskUid::new(4))
            .with_statuses([TaskStatus::Enqueued, TaskStatus::Cancelled])
            .with_index_uids(["movies", "books"])
            .with_limit(20);

        assert_eq!(
            filter.to_query(),
            vec![
                ("uids", "4".to_string()),
                ("statuses", "enqueued,canceled".to_string()),
                ("indexUids", "movies,books".to_string()),
                ("limit", "20".to_string()),
            ]
        );
        assert!(TaskFilter::default().to_query().is_empty());
    }

    fn endpoint_for(server: &mockito::ServerGuard) -> TasksEndpoint {
        TasksEndpoint::new(Arc::new(
            HttpClient::new(&ClientConfig::new(server.url())).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_http_fetch_maps_404_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tasks/77")
            .with_status(404)
            .with_body(r#"{"message":"Task `77` not found.","code":"task_not_found","type":"invalid_request"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/tasks/78")
            .with_status(200)
            .with_body(r#"{"uid":78,"status":"processing","type":"indexCreation"}"#)
            .create_async()
            .await;

        let endpoint = endpoint_for(&server);

        match endpoint.fetch_task(TaskUid::new(77)).await.unwrap() {
            FetchOutcome::NotFound(err) => assert_eq!(err.code(), "task_not_found"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
        match endpoint.fetch_task(TaskUid::new(78)).await.unwrap() {
            FetchOutcome::Found(record) => assert_eq!(record.status(), TaskStatus::Processing),
            other => panic!("Expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetch_propagates_other_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tasks/9")
            .with_status(401)
            .with_body(r#"{"message":"missing key","code":"missing_authorization_header","type":"auth"}"#)
            .create_async()
            .await;

        let err = endpoint_for(&server)
            .fetch_task(TaskUid::new(9))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Api(ref api) if api.status == 401));
    }

    #[tokio::test]
    async fn test_http_cancel_and_delete() {
        let mut server = mockito::Server::new_async().await;
        let cancel = server
            .mock("POST", "/tasks/cancel")
            .match_query(Matcher::UrlEncoded("uids".into(), "12".into()))
            .with_status(200)
            .with_body(
                json!({"taskUid": 13, "status": "enqueued", "type": "taskCancelation"}).to_string(),
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/tasks")
            .match_query(Matcher::UrlEncoded("uids".into(), "12".into()))
            .with_status(200)
            .with_body(
                json!({"taskUid": 14, "status": "enqueued", "type": "taskDeletion"}).to_string(),
            )
            .create_async()
            .await;

        let endpoint = endpoint_for(&server);
        let filter = TaskFilter::uid(TaskUid::new(12));

        let cancellation = endpoint.cancel_tasks(&filter).await.unwrap();
        let deletion = endpoint.delete_tasks(&filter).await.unwrap();

        assert_eq!(cancellation.uid(), TaskUid::new(13));
        assert_eq!(cancellation.kind(), "taskCancelation");
        assert_eq!(deletion.uid(), TaskUid::new(14));
        cancel.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tasks")
            .match_query(Matcher::UrlEncoded("statuses".into(), "failed".into()))
            .with_status(200)
            .with_body(
                json!({
                    "results": [{"uid": 3, "status": "failed", "type": "indexCreation"}],
                    "limit": 20,
                    "from": 3,
                    "next": null,
                    "total": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let page = endpoint_for(&server)
            .list(&TaskFilter::default().with_statuses([TaskStatus::Failed]))
            .await
            .unwrap();

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total, Some(1));
        assert!(page.next.is_none());
    }
}
