//! Domain models for the submission engine.
//!
//! This module contains the data structures that flow through a submission:
//!
//! - [`FilePayload`] - An in-memory file picked up from the dashboard or CLI
//! - [`DemoRequest`] - The demo-request form from the marketing site
//! - [`Payload`] - The opaque unit of data handed to the controller
//! - [`SubmissionRequest`] - One immutable workflow invocation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

// =============================================================================
// File Payload
// =============================================================================

/// A file staged for upload, held fully in memory.
///
/// Uploads on this platform are small documents (prescriptions, licences,
/// CSV inventories), so buffering them is fine; the size rules reject
/// anything oversized before a transport ever sees it.
#[derive(Debug, Clone)]
pub struct FilePayload {
    /// Original file name, as picked by the user.
    pub file_name: String,
    /// MIME type reported by the picker, or guessed from the extension.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl FilePayload {
    /// Create a payload from already-read bytes.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing the MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = guess_content_type(&file_name).to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// File size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercased extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

/// Guess a MIME type from a file name.
///
/// Covers the document types the dashboard accepts; everything else is
/// `application/octet-stream`.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Demo Request Form
// =============================================================================

/// The demo-request form submitted from the marketing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoRequest {
    /// Contact name.
    pub full_name: String,
    /// Work email address, used for the follow-up.
    pub work_email: String,
    /// Pharmacy or chain name.
    pub pharmacy_name: String,
    /// Optional phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-form message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DemoRequest {
    /// Convert the form into an opaque payload for the controller.
    pub fn to_payload(&self) -> serde_json::Result<Payload> {
        Ok(Payload::Form(serde_json::to_value(self)?))
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Opaque unit of data submitted by a user action.
///
/// The controller never inspects a payload; only validation rules and
/// transports do.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A file picked in the dashboard (or from the CLI).
    File(FilePayload),
    /// A structured form object, already serialized to JSON.
    Form(Value),
}

impl Payload {
    /// The file payload, if this is a file.
    pub fn as_file(&self) -> Option<&FilePayload> {
        match self {
            Payload::File(file) => Some(file),
            Payload::Form(_) => None,
        }
    }

    /// The form object, if this is a form.
    pub fn as_form(&self) -> Option<&Value> {
        match self {
            Payload::Form(value) => Some(value),
            Payload::File(_) => None,
        }
    }

    /// Short human-readable description, used in activity events.
    pub fn describe(&self) -> String {
        match self {
            Payload::File(file) => format!("{} ({} bytes)", file.file_name, file.len()),
            Payload::Form(_) => "form submission".to_string(),
        }
    }
}

// =============================================================================
// Submission Request
// =============================================================================

/// One immutable workflow invocation.
///
/// Created when the user acts, consumed synchronously by validation, then
/// handed to the transport. Discarded once the controller reaches a resting
/// state; the id outlives it only in activity events.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Unique id for this invocation.
    pub id: Uuid,
    /// Logical endpoint name, resolved to a URL by the transport.
    pub destination: String,
    /// The submitted data.
    pub payload: Payload,
    /// When the user triggered the submission.
    pub created_at: DateTime<Utc>,
}

impl SubmissionRequest {
    /// Stamp a new request for the given destination.
    pub fn new(destination: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination: destination.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
