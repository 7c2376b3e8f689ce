//! Mirror client
//!
//! The mirror is an external spreadsheet-like system fed over a webhook. It
//! is advisory: a failed POST is logged by the caller and never retried.

use async_trait::async_trait;
use reqwest::Client;
use shared::MirrorPayload;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Mirror request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mirror rejected payload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for coalesced sync payloads
#[async_trait]
pub trait MirrorClient: Send + Sync + 'static {
    async fn deliver(&self, payload: &MirrorPayload) -> Result<(), MirrorError>;
}

/// POSTs each payload as JSON to a webhook URL
pub struct HttpMirror {
    client: Client,
    url: String,
}

impl std::fmt::Debug for HttpMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMirror").field("url", &self.url).finish()
    }
}

impl HttpMirror {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MirrorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MirrorClient for HttpMirror {
    async fn deliver(&self, payload: &MirrorPayload) -> Result<(), MirrorError> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Rejected { status, body });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use shared::SyncAction;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn payload() -> MirrorPayload {
        MirrorPayload {
            sku: "X1".into(),
            color: "RED".into(),
            action: SyncAction::Add,
            previous_quantity: 0,
            new_quantity: 3,
            total_before: 5,
            total_after: 8,
            actor_name: "Ana".into(),
            location: "C1 / S1 / A1".into(),
            timestamp: 1,
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/hook")
    }

    #[tokio::test]
    async fn posts_payload_as_json() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let sink = received.clone();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().await.push(body);
                    StatusCode::OK
                }
            }),
        );
        let url = serve(app).await;

        let mirror = HttpMirror::new(url, Duration::from_secs(5)).unwrap();
        mirror.deliver(&payload()).await.unwrap();

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["totalBefore"], 5);
        assert_eq!(received[0]["action"], "ADD");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/hook",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "sheet locked") }),
        );
        let url = serve(app).await;

        let mirror = HttpMirror::new(url, Duration::from_secs(5)).unwrap();
        match mirror.deliver(&payload()).await {
            Err(MirrorError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "sheet locked");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
