//! HTTP Server for the RxFlow submission API.
//!
//! Thin presentation adapter over the submission controller: each request
//! gets its own controller wired to the configured transport, and the
//! response maps the resting state back to HTTP.
//!
//! # API Endpoints
//!
//! | Method | Path                | Description                          |
//! |--------|---------------------|--------------------------------------|
//! | GET    | `/health`           | Health check                         |
//! | POST   | `/api/demo-request` | Submit the demo-request form         |
//! | POST   | `/api/upload`       | Upload a dashboard document          |
//! | GET    | `/api/events`       | SSE stream of submission activity    |
//!
//! Client-side validation failures answer `422`; transport failures answer
//! `502`. Both carry the user-displayable message in the body.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::events::EVENT_BROADCASTER;
use super::types::{error_response, SubmitResponse};
use crate::config::{Config, DEMO_REQUEST_DESTINATION, UPLOAD_DESTINATION};
use crate::controller::{SubmissionController, SubmissionState};
use crate::models::{guess_content_type, FilePayload, Payload};
use crate::rules;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    // Multipart carries some framing overhead on top of the file itself.
    let body_limit = config.max_upload_bytes + 1024 * 1024;

    // CORS permissive for the site and local development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/demo-request", post(submit_demo_request))
        .route("/api/upload", post(upload_document))
        .route("/api/events", get(sse_events))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(AppState {
            config: Arc::new(config),
        });

    println!("🚀 RxFlow submission engine on http://localhost:{}", port);
    println!("   POST /api/demo-request - Demo request form");
    println!("   POST /api/upload       - Document upload");
    println!("   GET  /api/events       - SSE activity stream");
    println!("   GET  /health           - Health check");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "rxflow",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "demoRequest": "POST /api/demo-request",
            "upload": "POST /api/upload",
            "events": "GET /api/events (SSE)"
        }
    }))
}

/// SSE endpoint for real-time submission activity
async fn sse_events() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = EVENT_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Demo-request form endpoint
async fn submit_demo_request(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<SubmitResponse>, (StatusCode, Json<Value>)> {
    let payload = Payload::Form(body);
    let controller = SubmissionController::new(
        DEMO_REQUEST_DESTINATION,
        rules::demo_request_rules(),
        state.config.transport(DEMO_REQUEST_DESTINATION),
    );

    let outcome = controller.validate(&payload);
    if let Some(message) = outcome.message() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(error_response(message)),
        ));
    }

    settle(controller, payload, DEMO_REQUEST_DESTINATION).await
}

/// Document upload endpoint
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, (StatusCode, Json<Value>)> {
    let mut file: Option<FilePayload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(error_response(&format!("Multipart error: {e}"))),
        )
    })? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .map(|c| c.to_string())
                .unwrap_or_else(|| guess_content_type(&file_name).to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(error_response(&format!("Read error: {e}"))),
                    )
                })?
                .to_vec();
            file = Some(FilePayload::new(file_name, content_type, bytes));
        }
    }

    let file = file.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(error_response("No file provided")),
        )
    })?;

    let payload = Payload::File(file);
    let controller = SubmissionController::new(
        UPLOAD_DESTINATION,
        state.config.upload_rules(),
        state.config.transport(UPLOAD_DESTINATION),
    );

    let outcome = controller.validate(&payload);
    if let Some(message) = outcome.message() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(error_response(message)),
        ));
    }

    settle(controller, payload, UPLOAD_DESTINATION).await
}

/// Drive a validated payload through the controller and map the resting
/// state to HTTP.
async fn settle(
    controller: SubmissionController,
    payload: Payload,
    destination: &str,
) -> Result<Json<SubmitResponse>, (StatusCode, Json<Value>)> {
    match controller.submit(payload).await {
        Ok(SubmissionState::Succeeded(result)) => {
            Ok(Json(SubmitResponse::succeeded(destination, result)))
        }
        Ok(SubmissionState::Failed(message)) => {
            Err((StatusCode::BAD_GATEWAY, Json(error_response(&message))))
        }
        Ok(_) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response("submission did not settle")),
        )),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(&err.to_string())),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::upload_rules;
    use crate::transport::SimulatedTransport;

    fn payload() -> Payload {
        Payload::File(FilePayload::new(
            "licence.pdf",
            "application/pdf",
            vec![1u8; 512],
        ))
    }

    #[tokio::test]
    async fn test_settle_maps_success_to_response_body() {
        let controller = SubmissionController::new(
            UPLOAD_DESTINATION,
            upload_rules(1024 * 1024, &["pdf"]),
            Arc::new(SimulatedTransport::succeed_with(json!({"url": "https://host/e/f.png"}))),
        );

        let response = settle(controller, payload(), UPLOAD_DESTINATION)
            .await
            .unwrap();
        assert_eq!(response.0.status, "succeeded");
        assert_eq!(
            response.0.result.as_ref().unwrap()["url"],
            "https://host/e/f.png"
        );
    }

    #[tokio::test]
    async fn test_settle_maps_transport_failure_to_bad_gateway() {
        let controller = SubmissionController::new(
            UPLOAD_DESTINATION,
            upload_rules(1024 * 1024, &["pdf"]),
            Arc::new(SimulatedTransport::fail_with("network down")),
        );

        let (status, body) = settle(controller, payload(), UPLOAD_DESTINATION)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.0["error"], "network down");
    }
}
