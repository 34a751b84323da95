//! REST API endpoints for the relay
//!
//! Every response is JSON with a `status` field of `success`, `error`,
//! `running` or `healthy`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::report::types::{RunReport, RunRequest};
use crate::runner::Orchestrator;
use crate::store::ArchiveEntry;
use crate::utils::now_iso;

/// Shared state for API handlers
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Liveness payload
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stored report, latest or archived
#[derive(Serialize)]
pub struct ResultsResponse {
    pub status: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub data: serde_json::Value,
}

#[derive(Serialize)]
pub struct ResultsListResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub files: Vec<ArchiveEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub project_id: String,
    pub timestamp: String,
    pub results_file: String,
    pub data: RunReport,
}

/// Build API router
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/results", get(get_latest))
        .route("/results/:filename", get(get_result_file))
        .route("/results-list", get(list_results))
        .route("/trigger-tests", post(trigger_tests))
}

fn error_response(code: StatusCode, message: impl Into<String>, error: Option<String>) -> Response {
    (
        code,
        Json(ErrorResponse {
            status: "error",
            message: message.into(),
            error,
        }),
    )
        .into_response()
}

/// GET /
async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        message: "Affooh Automation Playwright Server is alive",
        timestamp: now_iso(),
    })
}

/// GET /health
async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy",
        message: "Playwright webhook is alive",
        timestamp: now_iso(),
    })
}

/// GET /results - Report of the most recent run
async fn get_latest(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.store().latest() {
        Ok(Some(data)) => Json(ResultsResponse {
            status: "success",
            timestamp: now_iso(),
            filename: None,
            data,
        })
        .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "No test results available yet", None),
        Err(e) => {
            error!("Error reading results: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read test results",
                Some(e.to_string()),
            )
        }
    }
}

/// GET /results/:filename - One archived report
async fn get_result_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    match state.orchestrator.store().archived(&filename) {
        Ok(Some(data)) => Json(ResultsResponse {
            status: "success",
            timestamp: now_iso(),
            filename: Some(filename),
            data,
        })
        .into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Results file {} not found", filename),
            None,
        ),
        Err(e) => {
            error!("Error reading results file {}: {}", filename, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read test results file",
                Some(e.to_string()),
            )
        }
    }
}

/// GET /results-list - Archived reports, newest first
async fn list_results(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.store().list_archive() {
        Ok(Some(files)) => Json(ResultsListResponse {
            status: "success",
            timestamp: Some(now_iso()),
            message: None,
            files,
        })
        .into_response(),
        Ok(None) => Json(ResultsListResponse {
            status: "success",
            timestamp: None,
            message: Some("No results directory found"),
            files: vec![],
        })
        .into_response(),
        Err(e) => {
            error!("Error listing results: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list result files",
                Some(e.to_string()),
            )
        }
    }
}

/// POST /trigger-tests - Run the suite and respond with its report
async fn trigger_tests(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Unreadable trigger request: {}", rejection.body_text());
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid trigger request",
                Some(rejection.body_text()),
            );
        }
    };

    let project_id = request.project_id.clone();
    match state.orchestrator.trigger(request).await {
        Ok(outcome) => {
            info!("Run for project {} finished: {}", project_id, outcome.results_file);
            Json(TriggerResponse {
                status: "success",
                message: "Tests completed successfully",
                project_id,
                timestamp: now_iso(),
                results_file: outcome.results_file,
                data: outcome.report,
            })
            .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), e.detail()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ReportStore};
    use crate::testing::{sample_tree, FakeRunner, RecordingNotifier};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        /// Serve the router on a loopback port
        async fn listen(&self) -> std::net::SocketAddr {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let app = self.app.clone();
            tokio::spawn(async move {
                axum::serve(listener, app.into_make_service()).await.unwrap();
            });
            addr
        }
    }

    fn harness(runner: FakeRunner, store: Arc<MemoryStore>) -> Harness {
        let notifier = Arc::new(RecordingNotifier::responding(200));
        let orchestrator = Orchestrator::new(
            store.clone(),
            store,
            Arc::new(runner),
            notifier.clone(),
        );
        let app = api_router().with_state(Arc::new(AppState::new(orchestrator)));
        Harness { app, notifier }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_liveness_endpoints() {
        let h = harness(FakeRunner::silent(), Arc::new(MemoryStore::new()));

        let (status, body) = send(&h.app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert!(body["timestamp"].is_string());

        let (status, body) = send(&h.app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_results_before_any_run() {
        let h = harness(FakeRunner::silent(), Arc::new(MemoryStore::new()));
        let (status, body) = send(&h.app, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No test results available yet");
    }

    #[tokio::test]
    async fn test_results_list_without_archive() {
        let h = harness(FakeRunner::silent(), Arc::new(MemoryStore::new()));
        let (status, body) = send(&h.app, "GET", "/results-list", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"], json!([]));
        assert_eq!(body["message"], "No results directory found");
    }

    #[tokio::test]
    async fn test_trigger_without_results_file() {
        let h = harness(FakeRunner::silent(), Arc::new(MemoryStore::new()));
        let (status, body) = send(
            &h.app,
            "POST",
            "/trigger-tests",
            Some(json!({ "projectId": "123", "tests": [], "callbackUrl": "http://hooks.local/x" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Test results file not generated");
        assert!(h.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_then_query() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(FakeRunner::writing(store.clone(), sample_tree()), store);

        let (status, body) = send(
            &h.app,
            "POST",
            "/trigger-tests",
            Some(json!({
                "projectId": "123",
                "tests": [{ "testId": "TC13", "email": "qa@example.com" }],
                "callbackUrl": "http://hooks.local/x"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["projectId"], "123");
        assert_eq!(body["data"]["tests"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["tests"][1]["testCaseId"], "TC14");
        assert_eq!(
            body["data"]["tests"][1]["error"]["message"],
            "Timeout 15000ms exceeded"
        );
        assert_eq!(h.notifier.calls().len(), 1);

        let file = body["resultsFile"].as_str().unwrap().to_string();
        assert!(file.starts_with("results-") && file.ends_with(".json"));

        let (status, archived) = send(&h.app, "GET", &format!("/results/{}", file), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(archived["filename"], file.as_str());
        assert_eq!(archived["data"], body["data"]);

        let (status, latest) = send(&h.app, "GET", "/results", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["data"], body["data"]);

        let (status, listing) = send(&h.app, "GET", "/results-list", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["files"][0]["filename"], file.as_str());
    }

    #[tokio::test]
    async fn test_client_hang_up_still_archives_and_notifies() {
        use tokio::io::AsyncWriteExt;

        let store = Arc::new(MemoryStore::new());
        let runner = FakeRunner::writing(store.clone(), sample_tree()).with_delay_ms(300);
        let h = harness(runner, store.clone());
        let addr = h.listen().await;

        let body = json!({ "projectId": "123", "tests": [], "callbackUrl": "http://hooks.local/x" })
            .to_string();
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                format!(
                    "POST /trigger-tests HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(stream);

        tokio::time::sleep(std::time::Duration::from_millis(800)).await;
        assert!(store.latest().unwrap().is_some());
        assert_eq!(store.list_archive().unwrap().unwrap().len(), 1);
        let calls = h.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://hooks.local/x");
    }

    #[tokio::test]
    async fn test_unknown_result_file() {
        let h = harness(FakeRunner::silent(), Arc::new(MemoryStore::new()));
        let (status, body) = send(&h.app, "GET", "/results/results-nope.json", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Results file results-nope.json not found");

        let (status, _) = send(&h.app, "GET", "/results/..%2Flatest-results.json", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreadable_body_is_server_error() {
        let h = harness(FakeRunner::silent(), Arc::new(MemoryStore::new()));
        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/trigger-tests")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
