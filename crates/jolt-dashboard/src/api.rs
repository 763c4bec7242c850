use crate::config::events_url;
use jolt_core::{Statistics, Task};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub type TaskStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported scheme: {0}")]
    Scheme(String),
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Thin client over the backend's REST and event endpoints.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    server: Url,
}

impl ApiClient {
    pub fn new(server: Url) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, server })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.server.join(path)?)
    }

    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let url = self.endpoint("api/v1/tasks")?;
        let tasks = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Task>>()
            .await?;
        Ok(tasks)
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("api/v1/tasks/{id}"))?;
        self.http.delete(url).send().await?.error_for_status()?;
        Ok(())
    }

    pub async fn fetch_log(&self, id: Uuid) -> Result<String, ApiError> {
        let url = log_url(&self.server, id)?;
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    pub async fn fetch_statistics(&self) -> Result<Statistics, ApiError> {
        let url = self.endpoint("api/v1/statistics")?;
        let stats = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Statistics>()
            .await?;
        Ok(stats)
    }

    pub async fn connect_events(&self) -> Result<TaskStream, ApiError> {
        let url = events_url(&self.server)?;
        let (stream, _) = connect_async(url.as_str()).await?;
        Ok(stream)
    }
}

/// Where a task's raw log can be opened outside the dashboard.
pub fn log_url(server: &Url, id: Uuid) -> Result<Url, ApiError> {
    Ok(server.join(&format!("api/v1/tasks/{id}/log"))?)
}

pub fn decode_task(text: &str) -> Result<Task, ApiError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
pub(crate) mod test_server {
    use crate::config::normalize_server_url;
    use axum::Router;
    use url::Url;

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        normalize_server_url(&format!("http://{addr}")).expect("test server url")
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::serve;
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{delete, get};
    use axum::Router;
    use jolt_core::TaskStatus;

    const TASKS_JSON: &str = r#"[
        {"id": "00000000-0000-0000-0000-000000000001", "Name": "build", "Status": "Queued",
         "Queued": "2024-03-01 10:00:00"},
        {"id": "00000000-0000-0000-0000-000000000002", "Name": "test", "Worker": "w1",
         "Status": "Running", "Queued": "2024-03-01 10:00:00", "Started": "2024-03-01 10:00:05"}
    ]"#;

    fn backend() -> Router {
        Router::new()
            .route("/api/v1/tasks", get(|| async { TASKS_JSON }))
            .route(
                "/api/v1/tasks/:id",
                delete(|Path(id): Path<String>| async move {
                    if id == Uuid::from_u128(1).to_string() {
                        StatusCode::NO_CONTENT
                    } else {
                        StatusCode::NOT_FOUND
                    }
                }),
            )
            .route(
                "/api/v1/tasks/:id/log",
                get(|Path(id): Path<String>| async move {
                    if id == Uuid::from_u128(1).to_string() {
                        Ok("line one\nline two".to_string())
                    } else {
                        Err(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                }),
            )
            .route(
                "/api/v1/statistics",
                get(|| async { r#"{"Tasks": {"Queued": 4, "Running": 1}}"# }),
            )
    }

    #[tokio::test]
    async fn fetches_task_snapshot() {
        let client = ApiClient::new(serve(backend()).await).unwrap();
        let tasks = client.fetch_tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].status, TaskStatus::Running);
        assert_eq!(tasks[1].worker, "w1");
    }

    #[tokio::test]
    async fn delete_reports_backend_errors() {
        let client = ApiClient::new(serve(backend()).await).unwrap();
        client.delete_task(Uuid::from_u128(1)).await.unwrap();
        let err = client.delete_task(Uuid::from_u128(7)).await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
    }

    #[tokio::test]
    async fn fetches_log_text_and_surfaces_failures() {
        let client = ApiClient::new(serve(backend()).await).unwrap();
        let body = client.fetch_log(Uuid::from_u128(1)).await.unwrap();
        assert_eq!(body, "line one\nline two");
        assert!(client.fetch_log(Uuid::from_u128(2)).await.is_err());
    }

    #[tokio::test]
    async fn fetches_statistics() {
        let client = ApiClient::new(serve(backend()).await).unwrap();
        let stats = client.fetch_statistics().await.unwrap();
        assert_eq!(stats.tasks.queued, 4);
        assert_eq!(stats.tasks.base.running, 1);
    }

    #[tokio::test]
    async fn malformed_snapshot_is_reported_as_http_decode_failure() {
        let router = Router::new().route("/api/v1/tasks", get(|| async { "{not json" }));
        let client = ApiClient::new(serve(router).await).unwrap();
        match client.fetch_tasks().await.unwrap_err() {
            ApiError::Http(err) => assert!(err.is_decode()),
            other => panic!("expected http decode error, got {other:?}"),
        }
    }

    #[test]
    fn decode_task_rejects_unknown_status() {
        let raw = r#"{"id": "00000000-0000-0000-0000-000000000001", "Status": "Exploded"}"#;
        assert!(matches!(decode_task(raw), Err(ApiError::Decode(_))));
    }
}
