//! # RxFlow Submission Engine
//!
//! The submission engine behind the RxFlow pharmacy platform: the
//! demo-request form on the marketing site and the document uploads in the
//! dashboard both run through the same validated, cancellable workflow.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Payload   │────▶│    Rules    │────▶│  Controller │────▶│  Transport  │
//! │ (file/form) │     │  (ordered)  │     │ (lifecycle) │     │ (HTTP/sim)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! The controller owns the lifecycle: validate locally, deliver remotely,
//! and reflect exactly one of idle / pending / succeeded / failed to the
//! presentation surface at all times.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rxflow::{rules, FilePayload, Payload, SimulatedTransport, SubmissionController};
//!
//! #[tokio::main]
//! async fn main() {
//!     let controller = SubmissionController::new(
//!         "document-upload",
//!         rules::upload_rules(5 * 1024 * 1024, &["pdf"]),
//!         Arc::new(SimulatedTransport::succeed_with(serde_json::json!({"status": "stored"}))),
//!     );
//!     let payload = Payload::File(FilePayload::from_path("licence.pdf".as_ref()).unwrap());
//!     let state = controller.submit(payload).await.unwrap();
//!     println!("settled: {}", state.label());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Payloads and submission requests
//! - [`rules`] - Ordered client-side validation
//! - [`controller`] - The submission workflow state machine
//! - [`transport`] - Delivery collaborators (HTTP and simulated)
//! - [`config`] - Environment-backed configuration
//! - [`api`] - HTTP API server and activity events

// Core modules
pub mod error;
pub mod models;

// Validation
pub mod rules;

// Workflow
pub mod controller;

// Delivery
pub mod transport;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, ControllerError, TransportError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{guess_content_type, DemoRequest, FilePayload, Payload, SubmissionRequest};

// =============================================================================
// Re-exports - Rules
// =============================================================================

pub use rules::{
    demo_request_rules,
    evaluate,
    upload_rules,
    ValidationOutcome,
    ValidationRule,
};

// =============================================================================
// Re-exports - Controller
// =============================================================================

pub use controller::{SubmissionController, SubmissionState};

// =============================================================================
// Re-exports - Transport
// =============================================================================

pub use transport::{HttpTransport, SimulatedTransport, SubmissionGate, Transport};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{Config, DEMO_REQUEST_DESTINATION, UPLOAD_DESTINATION};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, SubmitResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
