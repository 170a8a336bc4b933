//! Submission workflow controller.
//!
//! Governs the lifecycle of one user-initiated asynchronous action — a
//! document upload or a form submission — from local validation through
//! delivery, reflecting exactly one state to the presentation surface at all
//! times:
//!
//! ```text
//! Idle ---submit(valid)---> Pending ---success---> Succeeded
//! Idle ---submit(invalid)-----------------------> Failed
//! Pending ---failure---> Failed
//! Succeeded --reset--> Idle
//! Failed --reset--> Idle
//! Pending --submit()--> [rejected, no transition]
//! ```
//!
//! One controller is created per UI surface and persists across sequential
//! submissions; `Succeeded`/`Failed` are resting states left by an explicit
//! [`reset`](SubmissionController::reset) or another
//! [`submit`](SubmissionController::submit). At most one delivery is in
//! flight per controller, and a surface that has been torn down (see
//! [`detach`](SubmissionController::detach)) never observes a late
//! resolution: the transport's eventual result is checked against a liveness
//! flag and a generation counter before anything is mutated.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::api::events;
use crate::error::{ControllerError, ControllerResult};
use crate::models::{Payload, SubmissionRequest};
use crate::rules::{self, ValidationOutcome, ValidationRule};
use crate::transport::Transport;

/// Capacity of the per-controller state-change channel.
const STATE_CHANNEL_CAPACITY: usize = 16;

// =============================================================================
// Submission State
// =============================================================================

/// The single observable state of a submission surface.
///
/// Exactly one variant is active at any time; the presentation surface
/// renders from it and must disable its trigger control while `Pending`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    /// No request in flight, no prior result shown.
    Idle,
    /// A request is in flight; duplicate submissions are rejected.
    Pending,
    /// The last request completed; carries the destination-defined result.
    Succeeded(Value),
    /// The last request failed; carries a user-displayable message.
    Failed(String),
}

impl SubmissionState {
    /// Whether a request is currently in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, SubmissionState::Pending)
    }

    /// Whether this is a resting state (`Succeeded` or `Failed`).
    pub fn is_resting(&self) -> bool {
        matches!(self, SubmissionState::Succeeded(_) | SubmissionState::Failed(_))
    }

    /// Short label for events and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Pending => "pending",
            SubmissionState::Succeeded(_) => "succeeded",
            SubmissionState::Failed(_) => "failed",
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

type SuccessHook = Arc<dyn Fn(&Value) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;

struct ControllerInner {
    destination: String,
    rules: Vec<ValidationRule>,
    transport: Arc<dyn Transport>,
    state: Mutex<SubmissionState>,
    /// Liveness flag: false once the owning surface is torn down.
    live: AtomicBool,
    /// Incremented when a delivery starts; a resolution only applies if the
    /// generation still matches the one captured at `Pending` entry.
    generation: AtomicU64,
    changes: broadcast::Sender<SubmissionState>,
    on_success: Mutex<Option<SuccessHook>>,
    on_error: Mutex<Option<ErrorHook>>,
}

/// Cheaply clonable handle to one submission surface's workflow.
///
/// Clones share state; the surface keeps one handle for `submit`/`reset`
/// and its teardown path keeps another for [`detach`](Self::detach).
#[derive(Clone)]
pub struct SubmissionController {
    inner: Arc<ControllerInner>,
}

impl SubmissionController {
    /// Create a controller for one surface.
    ///
    /// `rules` run in declaration order on every submission; `transport`
    /// performs the actual delivery to `destination`.
    pub fn new(
        destination: impl Into<String>,
        rules: Vec<ValidationRule>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (changes, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ControllerInner {
                destination: destination.into(),
                rules,
                transport,
                state: Mutex::new(SubmissionState::Idle),
                live: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                changes,
                on_success: Mutex::new(None),
                on_error: Mutex::new(None),
            }),
        }
    }

    /// Register the success hook, fired exactly once per `Succeeded`
    /// resolution, synchronously after the state transition.
    pub fn on_success(&self, hook: impl Fn(&Value) + Send + Sync + 'static) {
        *lock(&self.inner.on_success) = Some(Arc::new(hook));
    }

    /// Register the error hook, fired exactly once per `Failed` resolution.
    pub fn on_error(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *lock(&self.inner.on_error) = Some(Arc::new(hook));
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SubmissionState {
        self.lock_state().clone()
    }

    /// Subscribe to state changes; the presentation surface renders from
    /// this stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionState> {
        self.inner.changes.subscribe()
    }

    /// The logical destination this controller submits to.
    pub fn destination(&self) -> &str {
        &self.inner.destination
    }

    /// Whether the owning surface is still up.
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Tear the controller off its surface.
    ///
    /// Any in-flight delivery still settles, but its resolution is silently
    /// dropped: no state mutation, no hook, no state-change broadcast. A
    /// detached controller rejects further submissions.
    pub fn detach(&self) {
        self.inner.live.store(false, Ordering::SeqCst);
    }

    /// Run this controller's rules against a payload without submitting.
    ///
    /// Pure: no side effects, deterministic for a given payload.
    pub fn validate(&self, payload: &Payload) -> ValidationOutcome {
        rules::evaluate(&self.inner.rules, payload)
    }

    /// Submit a payload through validation and the transport.
    ///
    /// Fails immediately with [`ControllerError::AlreadyPending`] if a
    /// delivery is in flight, leaving state untouched. A payload that fails
    /// validation moves the controller straight to `Failed` without any
    /// transport activity. Otherwise the controller goes `Pending`, the
    /// transport is invoked exactly once (no internal retry — re-submit to
    /// retry), and the resolution becomes `Succeeded` or `Failed`.
    ///
    /// Returns the state the controller settled in for this request.
    pub async fn submit(&self, payload: Payload) -> ControllerResult<SubmissionState> {
        if !self.is_live() {
            return Err(ControllerError::Detached);
        }

        let request = SubmissionRequest::new(self.inner.destination.clone(), payload);

        // Admission and validation happen atomically with the transition.
        let generation = {
            let mut state = self.lock_state();
            if state.is_pending() {
                return Err(ControllerError::AlreadyPending);
            }
            match rules::evaluate(&self.inner.rules, &request.payload) {
                ValidationOutcome::Invalid(message) => {
                    *state = SubmissionState::Failed(message);
                    None
                }
                ValidationOutcome::Valid => {
                    *state = SubmissionState::Pending;
                    Some(self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1)
                }
            }
        };

        let Some(generation) = generation else {
            // Client-side rejection: the transport was never contacted.
            let failed = self.state();
            events::emit_warning(
                Some(request.id),
                format!("{} rejected by validation", request.payload.describe()),
            );
            self.notify_transition(&failed);
            return Ok(failed);
        };

        events::emit_info(
            Some(request.id),
            format!(
                "submitting {} to {}",
                request.payload.describe(),
                request.destination
            ),
        );
        self.notify_transition(&SubmissionState::Pending);

        let outcome = self
            .inner
            .transport
            .send(&request.payload, &request.destination)
            .await;

        // Apply the resolution only if this request is still the live one.
        let resolved = {
            let mut state = self.lock_state();
            let fresh = self.is_live()
                && self.inner.generation.load(Ordering::SeqCst) == generation
                && state.is_pending();
            if fresh {
                *state = match &outcome {
                    Ok(value) => SubmissionState::Succeeded(value.clone()),
                    Err(err) => SubmissionState::Failed(err.user_message()),
                };
                Some(state.clone())
            } else {
                None
            }
        };

        match resolved {
            Some(next) => {
                match &next {
                    SubmissionState::Succeeded(_) => events::emit_success(
                        Some(request.id),
                        format!("{} delivered to {}", request.payload.describe(), request.destination),
                    ),
                    SubmissionState::Failed(message) => events::emit_error(
                        Some(request.id),
                        format!("submission failed: {message}"),
                    ),
                    _ => {}
                }
                self.notify_transition(&next);
                Ok(next)
            }
            None => {
                // Stale resolution: surface torn down while in flight.
                events::emit_warning(
                    Some(request.id),
                    "resolution discarded, surface no longer active",
                );
                Ok(self.state())
            }
        }
    }

    /// Re-arm the controller: return from a resting state to `Idle`.
    ///
    /// Allowed from `Idle`, `Succeeded`, and `Failed`. Fails with
    /// [`ControllerError::ResetWhilePending`] while a delivery is in flight
    /// (it is not a silent no-op).
    pub fn reset(&self) -> ControllerResult<()> {
        {
            let mut state = self.lock_state();
            if state.is_pending() {
                return Err(ControllerError::ResetWhilePending);
            }
            *state = SubmissionState::Idle;
        }
        let _ = self.inner.changes.send(SubmissionState::Idle);
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, SubmissionState> {
        lock(&self.inner.state)
    }

    /// Broadcast a transition and fire the matching hook.
    ///
    /// Hooks are cloned out of their slot before the call so a hook may
    /// safely re-register or query the controller.
    fn notify_transition(&self, state: &SubmissionState) {
        let _ = self.inner.changes.send(state.clone());
        match state {
            SubmissionState::Succeeded(value) => {
                let hook = lock(&self.inner.on_success).clone();
                if let Some(hook) = hook {
                    hook(value);
                }
            }
            SubmissionState::Failed(message) => {
                let hook = lock(&self.inner.on_error).clone();
                if let Some(hook) = hook {
                    hook(message);
                }
            }
            _ => {}
        }
    }
}

/// Lock a mutex, recovering the inner value if a panicking holder poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Tests
// =============================================================================
