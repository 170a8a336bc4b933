//! Transport collaborators: the capability that actually delivers a
//! submission.
//!
//! The controller only needs one operation — [`Transport::send`] — which must
//! settle exactly once with either a destination-defined JSON value or a
//! [`TransportError`]. Timeout enforcement lives here (or in the remote
//! stack), never in the controller.
//!
//! Two implementations ship with the engine:
//!
//! - [`HttpTransport`] - real delivery over HTTP; files go as multipart
//!   form-data, forms as JSON
//! - [`SimulatedTransport`] - deterministic in-process delivery with
//!   configurable latency and outcome, used when no destination URL is
//!   configured and throughout the test suite

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{TransportError, TransportResult};
use crate::models::Payload;

// =============================================================================
// Transport Trait
// =============================================================================

/// A capability that delivers a payload to a logical destination.
///
/// Implementations must settle exactly once per call and must eventually
/// settle; the controller never retries and never times a call out on its
/// own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` to the destination named by `destination`.
    async fn send(&self, payload: &Payload, destination: &str) -> TransportResult<Value>;
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Delivers submissions over HTTP.
///
/// Destination ids map to URLs through [`with_route`](Self::with_route);
/// asking for an unmapped destination fails without any network activity.
pub struct HttpTransport {
    client: reqwest::Client,
    routes: HashMap<String, String>,
}

impl HttpTransport {
    /// Create a transport with no routes.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            routes: HashMap::new(),
        }
    }

    /// Map a destination id to a URL.
    pub fn with_route(mut self, destination: impl Into<String>, url: impl Into<String>) -> Self {
        self.routes.insert(destination.into(), url.into());
        self
    }

    fn url_for(&self, destination: &str) -> TransportResult<&str> {
        self.routes
            .get(destination)
            .map(String::as_str)
            .ok_or_else(|| TransportError::UnknownDestination(destination.to_string()))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &Payload, destination: &str) -> TransportResult<Value> {
        let url = self.url_for(destination)?;

        let request = match payload {
            Payload::File(file) => {
                let part = multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)
                    .map_err(|e| TransportError::Http(e.to_string()))?;
                let form = multipart::Form::new().part("file", part);
                self.client.post(url).multipart(form)
            }
            Payload::Form(value) => self.client.post(url).json(value),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

/// Pull a displayable message out of an error response body.
///
/// Prefers the `error` / `message` fields of a JSON body, then falls back to
/// the raw body text.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(message) = json.get(key).and_then(Value::as_str) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }
    body.trim().to_string()
}

// =============================================================================
// Simulated Transport
// =============================================================================

#[derive(Debug, Clone)]
enum SimulatedOutcome {
    Succeed(Value),
    Fail(String),
}

/// Deterministic in-process transport.
///
/// Stands in for the real destination when none is configured, and gives
/// tests full control over timing and outcome: fixed latency, a scripted
/// result, and an optional [`SubmissionGate`] that holds the call in flight
/// until released.
pub struct SimulatedTransport {
    outcome: SimulatedOutcome,
    latency: Duration,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl SimulatedTransport {
    /// Always resolve successfully with `value`.
    pub fn succeed_with(value: Value) -> Self {
        Self {
            outcome: SimulatedOutcome::Succeed(value),
            latency: Duration::ZERO,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail with the given user-displayable message.
    pub fn fail_with(message: impl Into<String>) -> Self {
        Self {
            outcome: SimulatedOutcome::Fail(message.into()),
            latency: Duration::ZERO,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a fixed delay before resolving.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Hold every call in flight until the returned gate is released.
    ///
    /// Each call consumes one release; releasing before the call arrives is
    /// fine.
    pub fn gated(mut self) -> (Self, SubmissionGate) {
        let notify = Arc::new(Notify::new());
        self.gate = Some(notify.clone());
        (self, SubmissionGate { notify })
    }

    /// Number of times `send` has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Release handle for a gated [`SimulatedTransport`].
#[derive(Clone)]
pub struct SubmissionGate {
    notify: Arc<Notify>,
}

impl SubmissionGate {
    /// Let one held call proceed.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn send(&self, _payload: &Payload, _destination: &str) -> TransportResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.outcome {
            SimulatedOutcome::Succeed(value) => Ok(value.clone()),
            SimulatedOutcome::Fail(message) => Err(TransportError::Rejected(message.clone())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilePayload;
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::response::Json;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;

    fn form_payload() -> Payload {
        Payload::Form(json!({"fullName": "Avery Chen"}))
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_simulated_success_and_call_count() {
        let transport = SimulatedTransport::succeed_with(json!({"status": "received"}));
        let result = transport.send(&form_payload(), "demo-request").await.unwrap();
        assert_eq!(result["status"], "received");
        assert_eq!(transport.calls(), 1);

        transport.send(&form_payload(), "demo-request").await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_simulated_failure_is_rejected() {
        let transport = SimulatedTransport::fail_with("network down");
        let err = transport
            .send(&form_payload(), "demo-request")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "network down");
    }

    #[tokio::test]
    async fn test_gated_transport_waits_for_release() {
        let (transport, gate) = SimulatedTransport::succeed_with(json!({"ok": true})).gated();
        let transport = Arc::new(transport);

        let in_flight = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.send(&form_payload(), "demo-request").await })
        };

        // The call is held; release lets it settle.
        gate.release();
        let result = in_flight.await.unwrap().unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn test_http_transport_unknown_destination() {
        let transport = HttpTransport::new();
        let err = transport
            .send(&form_payload(), "nowhere")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownDestination(_)));
    }

    #[tokio::test]
    async fn test_http_transport_posts_form_as_json() {
        let app = Router::new().route(
            "/demo",
            post(|Json(body): Json<Value>| async move { Json(json!({"received": body})) }),
        );
        let base = serve(app).await;

        let transport = HttpTransport::new().with_route("demo-request", format!("{base}/demo"));
        let result = transport
            .send(&form_payload(), "demo-request")
            .await
            .unwrap();
        assert_eq!(result["received"]["fullName"], "Avery Chen");
    }

    #[tokio::test]
    async fn test_http_transport_uploads_file_as_multipart() {
        async fn receive(mut multipart: Multipart) -> Json<Value> {
            let mut name = String::new();
            let mut size = 0;
            while let Some(field) = multipart.next_field().await.unwrap() {
                if field.name() == Some("file") {
                    name = field.file_name().unwrap_or_default().to_string();
                    size = field.bytes().await.unwrap().len();
                }
            }
            Json(json!({"url": format!("https://cdn.rxflow.app/uploads/{name}"), "size": size}))
        }

        let app = Router::new().route("/upload", post(receive));
        let base = serve(app).await;

        let payload = Payload::File(FilePayload::new(
            "licence.pdf",
            "application/pdf",
            vec![7u8; 64],
        ));
        let transport = HttpTransport::new().with_route("document-upload", format!("{base}/upload"));
        let result = transport.send(&payload, "document-upload").await.unwrap();
        assert_eq!(result["url"], "https://cdn.rxflow.app/uploads/licence.pdf");
        assert_eq!(result["size"], 64);
    }

    #[tokio::test]
    async fn test_http_transport_surfaces_error_body() {
        let app = Router::new().route(
            "/demo",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({"error": "storage offline"})),
                )
            }),
        );
        let base = serve(app).await;

        let transport = HttpTransport::new().with_route("demo-request", format!("{base}/demo"));
        let err = transport
            .send(&form_payload(), "demo-request")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "storage offline");
        assert!(matches!(err, TransportError::Status { status: 502, .. }));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error": "storage offline"}"#),
            "storage offline"
        );
        assert_eq!(
            extract_error_message(r#"{"message": "quota exceeded"}"#),
            "quota exceeded"
        );
        assert_eq!(extract_error_message("plain text\n"), "plain text");
    }
}
