//! Real-time submission lifecycle events via Server-Sent Events (SSE).
//!
//! This module provides a broadcast channel for submission activity that the
//! dashboard streams over SSE. Every controller state transition lands here,
//! stamped with the submission id it belongs to.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event level for frontend display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single activity event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    /// Event level
    pub level: EventLevel,
    /// Event message
    pub message: String,
    /// Submission this event belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<Uuid>,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
}

impl SubmissionEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            submission_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the submission this event belongs to.
    pub fn for_submission(mut self, id: Uuid) -> Self {
        self.submission_id = Some(id);
        self
    }
}

/// Global event broadcaster
pub static EVENT_BROADCASTER: Lazy<EventBroadcaster> = Lazy::new(EventBroadcaster::new);

/// Broadcasts activity events to all connected SSE clients
pub struct EventBroadcaster {
    sender: broadcast::Sender<SubmissionEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SubmissionEvent) {
        // Also print to stdout
        let prefix = match event.level {
            EventLevel::Info => "   ",
            EventLevel::Success => "   ✓",
            EventLevel::Warning => "   ⚠️",
            EventLevel::Error => "   ❌",
        };
        println!("{} {}", prefix, event.message);

        // Broadcast to SSE clients (ignore if no receivers)
        let _ = self.sender.send(event);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient emit functions
pub fn emit_info(submission: Option<Uuid>, message: impl Into<String>) {
    emit(SubmissionEvent::info(message), submission);
}

pub fn emit_success(submission: Option<Uuid>, message: impl Into<String>) {
    emit(SubmissionEvent::success(message), submission);
}

pub fn emit_warning(submission: Option<Uuid>, message: impl Into<String>) {
    emit(SubmissionEvent::warning(message), submission);
}

pub fn emit_error(submission: Option<Uuid>, message: impl Into<String>) {
    emit(SubmissionEvent::error(message), submission);
}

fn emit(event: SubmissionEvent, submission: Option<Uuid>) {
    let event = match submission {
        Some(id) => event.for_submission(id),
        None => event,
    };
    EVENT_BROADCASTER.publish(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_camel_case() {
        let id = Uuid::new_v4();
        let event = SubmissionEvent::success("delivered").for_submission(id);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "delivered");
        assert_eq!(json["submissionId"], id.to_string());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_subscribers_receive_published_events() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(SubmissionEvent::info("submitting"));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.message, "submitting");
        assert!(event.submission_id.is_none());
    }
}
