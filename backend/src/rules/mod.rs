//! Client-side validation rules for submissions.
//!
//! A [`ValidationRule`] is a named predicate over a [`Payload`] plus the
//! user-displayable message shown when it fails. Rules run strictly in
//! declaration order and the first failure wins: the user sees one clear
//! problem at a time, not a wall of errors.
//!
//! Two kinds of rules ship with the engine:
//!
//! - field checks (size limits, required fields, email format), built from
//!   the constructors below;
//! - JSON Schema checks via [`matches_schema`], validating structured forms
//!   against schemas embedded at compile time from the `schemas/` directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use rxflow::rules::{self, max_file_size};
//!
//! let rules = vec![max_file_size(5 * 1024 * 1024)];
//! let outcome = rules::evaluate(&rules, &payload);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::models::Payload;

/// Loose email shape check; the destination does the authoritative check.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

// =============================================================================
// Rule and Outcome Types
// =============================================================================

/// Outcome of evaluating a rule set against a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Every rule passed.
    Valid,
    /// A rule failed; carries its user-displayable message.
    Invalid(String),
}

impl ValidationOutcome {
    /// Whether the payload passed every rule.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// The failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(message) => Some(message),
        }
    }
}

/// A predicate over a payload plus the message reported when it fails.
///
/// Rules that do not apply to the payload kind (a file rule evaluating a
/// form, or vice versa) pass.
pub struct ValidationRule {
    name: &'static str,
    message: String,
    predicate: Box<dyn Fn(&Payload) -> bool + Send + Sync>,
}

impl ValidationRule {
    /// Create a rule from a name, a failure message, and a predicate.
    pub fn new(
        name: &'static str,
        message: impl Into<String>,
        predicate: impl Fn(&Payload) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            message: message.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Rule name, for logs and debugging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The message reported when this rule fails.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run the predicate.
    pub fn passes(&self, payload: &Payload) -> bool {
        (self.predicate)(payload)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

/// Evaluate rules strictly in declaration order.
///
/// Pure function: no side effects, deterministic for a given payload and
/// rule set. The first failing rule short-circuits and its message becomes
/// the outcome; later rules are not evaluated.
pub fn evaluate(rules: &[ValidationRule], payload: &Payload) -> ValidationOutcome {
    for rule in rules {
        if !rule.passes(payload) {
            return ValidationOutcome::Invalid(rule.message.clone());
        }
    }
    ValidationOutcome::Valid
}

// =============================================================================
// File Rules
// =============================================================================

/// Reject files larger than `limit_bytes`.
pub fn max_file_size(limit_bytes: usize) -> ValidationRule {
    let message = format!("File size exceeds {}MB limit", limit_bytes / (1024 * 1024));
    ValidationRule::new("max-file-size", message, move |payload| {
        payload.as_file().map_or(true, |file| file.len() <= limit_bytes)
    })
}

/// Reject empty files.
pub fn non_empty_file() -> ValidationRule {
    ValidationRule::new("non-empty-file", "File is empty", |payload| {
        payload.as_file().map_or(true, |file| !file.is_empty())
    })
}

/// Restrict uploads to the given extensions (lowercase, no dot).
pub fn allowed_extensions(extensions: &[&str]) -> ValidationRule {
    let allowed: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
    let message = format!("File type must be one of: {}", allowed.join(", "));
    ValidationRule::new("allowed-extensions", message, move |payload| {
        payload.as_file().map_or(true, |file| {
            file.extension()
                .map_or(false, |ext| allowed.iter().any(|a| *a == ext))
        })
    })
}

// =============================================================================
// Form Rules
// =============================================================================

/// Require a non-empty string field on a form payload.
///
/// `label` is the user-facing field name used in the failure message.
pub fn required_field(field: &'static str, label: &'static str) -> ValidationRule {
    let message = format!("{label} is required");
    ValidationRule::new("required-field", message, move |payload| {
        payload.as_form().map_or(true, |form| {
            form.get(field)
                .and_then(Value::as_str)
                .map_or(false, |value| !value.trim().is_empty())
        })
    })
}

/// Require a plausibly-shaped email address in a form field.
pub fn email_format(field: &'static str) -> ValidationRule {
    ValidationRule::new(
        "email-format",
        "Please enter a valid email address",
        move |payload| {
            payload.as_form().map_or(true, |form| {
                form.get(field)
                    .and_then(Value::as_str)
                    .map_or(false, |value| EMAIL_RE.is_match(value.trim()))
            })
        },
    )
}

/// Validate a form payload against a JSON Schema (Draft 7).
///
/// `name` names the form in the failure message; per-field detail is
/// available separately through [`schema_errors`].
pub fn matches_schema(name: &'static str, schema: Value) -> ValidationRule {
    let message = format!("{name} is not valid");
    ValidationRule::new("matches-schema", message, move |payload| {
        payload
            .as_form()
            .map_or(true, |form| schema_errors(&schema, form).is_empty())
    })
}

/// Validate a JSON object against a schema, collecting every error message.
///
/// Used by [`matches_schema`] and by the CLI `validate` command for its
/// detailed report.
pub fn schema_errors(schema: &Value, data: &Value) -> Vec<String> {
    let validator = match jsonschema::draft7::new(schema) {
        Ok(validator) => validator,
        Err(e) => return vec![format!("invalid schema: {e}")],
    };
    validator.iter_errors(data).map(|e| e.to_string()).collect()
}

// =============================================================================
// Product Rule Sets
// =============================================================================

/// Embedded demo-request form schema (Draft 7).
///
/// Compiled in from `schemas/demo-request.json`; the CLI uses it for
/// detailed validation reports.
pub fn demo_request_schema() -> Value {
    serde_json::from_str(include_str!("../../schemas/demo-request.json"))
        .expect("embedded demo-request schema is valid JSON")
}

/// Rules for the marketing-site demo-request form.
///
/// Field checks run first so the user gets a friendly message for the
/// common mistakes; the schema check backstops everything else.
pub fn demo_request_rules() -> Vec<ValidationRule> {
    vec![
        required_field("fullName", "Full name"),
        required_field("workEmail", "Work email"),
        required_field("pharmacyName", "Pharmacy name"),
        email_format("workEmail"),
        matches_schema("Demo request", demo_request_schema()),
    ]
}

/// Rules for dashboard document uploads.
pub fn upload_rules(max_bytes: usize, extensions: &[&str]) -> Vec<ValidationRule> {
    vec![
        non_empty_file(),
        max_file_size(max_bytes),
        allowed_extensions(extensions),
    ]
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilePayload;
    use serde_json::json;

    fn file_of(len: usize, name: &str) -> Payload {
        Payload::File(FilePayload::new(name, "application/pdf", vec![0u8; len]))
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let rules = vec![
            ValidationRule::new("first", "first failure", |_| false),
            ValidationRule::new("second", "second failure", |_| false),
        ];
        let outcome = evaluate(&rules, &Payload::Form(json!({})));
        assert_eq!(outcome, ValidationOutcome::Invalid("first failure".into()));
    }

    #[test]
    fn test_all_passing_is_valid() {
        let rules = vec![
            ValidationRule::new("a", "a", |_| true),
            ValidationRule::new("b", "b", |_| true),
        ];
        assert!(evaluate(&rules, &Payload::Form(json!({}))).is_valid());
    }

    #[test]
    fn test_later_rules_not_reported_after_first_failure() {
        // Both size and extension fail; only the size message surfaces.
        let rules = vec![
            max_file_size(1024 * 1024),
            allowed_extensions(&["pdf"]),
        ];
        let outcome = evaluate(&rules, &file_of(4 * 1024 * 1024, "huge.exe"));
        assert_eq!(
            outcome.message(),
            Some("File size exceeds 1MB limit")
        );
    }

    #[test]
    fn test_max_file_size_message_and_boundary() {
        let rule = max_file_size(5 * 1024 * 1024);
        assert_eq!(rule.message(), "File size exceeds 5MB limit");

        assert!(rule.passes(&file_of(5 * 1024 * 1024, "ok.pdf")));
        assert!(!rule.passes(&file_of(10 * 1024 * 1024, "big.pdf")));
        // Not applicable to forms.
        assert!(rule.passes(&Payload::Form(json!({}))));
    }

    #[test]
    fn test_allowed_extensions() {
        let rule = allowed_extensions(&["pdf", "csv"]);
        assert!(rule.passes(&file_of(10, "inventory.csv")));
        assert!(rule.passes(&file_of(10, "licence.PDF")));
        assert!(!rule.passes(&file_of(10, "script.exe")));
        assert!(!rule.passes(&file_of(10, "no-extension")));
    }

    #[test]
    fn test_non_empty_file() {
        let rule = non_empty_file();
        assert!(!rule.passes(&file_of(0, "empty.pdf")));
        assert!(rule.passes(&file_of(1, "tiny.pdf")));
    }

    #[test]
    fn test_required_field() {
        let rule = required_field("workEmail", "Work email");
        assert_eq!(rule.message(), "Work email is required");

        assert!(rule.passes(&Payload::Form(json!({"workEmail": "a@b.co"}))));
        assert!(!rule.passes(&Payload::Form(json!({"workEmail": "   "}))));
        assert!(!rule.passes(&Payload::Form(json!({}))));
        assert!(!rule.passes(&Payload::Form(json!({"workEmail": 42}))));
    }

    #[test]
    fn test_email_format() {
        let rule = email_format("workEmail");
        assert!(rule.passes(&Payload::Form(json!({"workEmail": "avery@citypharmacy.com"}))));
        assert!(!rule.passes(&Payload::Form(json!({"workEmail": "not-an-email"}))));
        assert!(!rule.passes(&Payload::Form(json!({"workEmail": "two@@at.com"}))));
    }

    #[test]
    fn test_schema_errors_reports_missing_fields() {
        let schema = demo_request_schema();
        let errors = schema_errors(&schema, &json!({"fullName": "Avery"}));
        assert!(!errors.is_empty());

        let errors = schema_errors(
            &schema,
            &json!({
                "fullName": "Avery Chen",
                "workEmail": "avery@citypharmacy.com",
                "pharmacyName": "City Pharmacy"
            }),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_demo_request_rules_order() {
        let rules = demo_request_rules();
        // Empty form: the first missing field is reported, not the schema.
        let outcome = evaluate(&rules, &Payload::Form(json!({})));
        assert_eq!(outcome.message(), Some("Full name is required"));

        // Bad email reported before the schema backstop.
        let outcome = evaluate(
            &rules,
            &Payload::Form(json!({
                "fullName": "Avery Chen",
                "workEmail": "nope",
                "pharmacyName": "City Pharmacy"
            })),
        );
        assert_eq!(outcome.message(), Some("Please enter a valid email address"));
    }

    #[test]
    fn test_upload_rules_accept_valid_document() {
        let rules = upload_rules(5 * 1024 * 1024, &["pdf", "png", "csv"]);
        assert!(evaluate(&rules, &file_of(1024, "licence.pdf")).is_valid());

        let outcome = evaluate(&rules, &file_of(10 * 1024 * 1024, "licence.pdf"));
        assert_eq!(outcome.message(), Some("File size exceeds 5MB limit"));
    }
}
