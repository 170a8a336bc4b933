//! Engine configuration.
//!
//! Defaults are compiled in; each value can be overridden through the
//! environment (a `.env` file is honored — the binary calls
//! `dotenvy::dotenv()` at startup). Destinations without a configured URL
//! run on the simulated transport, matching the staging setup where the
//! real storage and CRM endpoints are not reachable.
//!
//! | Variable                      | Default                        |
//! |-------------------------------|--------------------------------|
//! | `RXFLOW_PORT`                 | `3000`                         |
//! | `RXFLOW_MAX_UPLOAD_BYTES`     | `5242880` (5 MB)               |
//! | `RXFLOW_ALLOWED_EXTENSIONS`   | `pdf,png,jpg,jpeg,csv`         |
//! | `RXFLOW_DEMO_REQUEST_URL`     | unset (simulated)              |
//! | `RXFLOW_UPLOAD_URL`           | unset (simulated)              |
//! | `RXFLOW_SIMULATED_LATENCY_MS` | `1500`                         |

use serde_json::{json, Value};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rules::{self, ValidationRule};
use crate::transport::{HttpTransport, SimulatedTransport, Transport};

/// Logical destination for marketing-site demo requests.
pub const DEMO_REQUEST_DESTINATION: &str = "demo-request";

/// Logical destination for dashboard document uploads.
pub const UPLOAD_DESTINATION: &str = "document-upload";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default upload size limit (5 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Document types the dashboard accepts.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "csv"];

/// Latency of the simulated transport, matching the staging delay the site
/// was built against.
pub const DEFAULT_SIMULATED_LATENCY_MS: u64 = 1500;

/// Runtime configuration for the submission engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for `rxflow serve`.
    pub port: u16,
    /// Upload size limit in bytes.
    pub max_upload_bytes: usize,
    /// Accepted upload extensions (lowercase, no dot).
    pub allowed_extensions: Vec<String>,
    /// Real endpoint for demo requests; simulated when unset.
    pub demo_request_url: Option<String>,
    /// Real endpoint for document uploads; simulated when unset.
    pub upload_url: Option<String>,
    /// Delay applied by the simulated transport.
    pub simulated_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            demo_request_url: None,
            upload_url: None,
            simulated_latency_ms: DEFAULT_SIMULATED_LATENCY_MS,
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = read("RXFLOW_PORT") {
            config.port = parse("RXFLOW_PORT", &value)?;
        }
        if let Some(value) = read("RXFLOW_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("RXFLOW_MAX_UPLOAD_BYTES", &value)?;
        }
        if let Some(value) = read("RXFLOW_ALLOWED_EXTENSIONS") {
            config.allowed_extensions = parse_extensions(&value);
        }
        if let Some(value) = read("RXFLOW_SIMULATED_LATENCY_MS") {
            config.simulated_latency_ms = parse("RXFLOW_SIMULATED_LATENCY_MS", &value)?;
        }
        config.demo_request_url = read("RXFLOW_DEMO_REQUEST_URL");
        config.upload_url = read("RXFLOW_UPLOAD_URL");

        Ok(config)
    }

    /// The validation rules for dashboard uploads under this config.
    pub fn upload_rules(&self) -> Vec<ValidationRule> {
        let extensions: Vec<&str> = self.allowed_extensions.iter().map(String::as_str).collect();
        rules::upload_rules(self.max_upload_bytes, &extensions)
    }

    /// Configured URL for a destination, if any.
    pub fn url_for(&self, destination: &str) -> Option<&str> {
        match destination {
            DEMO_REQUEST_DESTINATION => self.demo_request_url.as_deref(),
            UPLOAD_DESTINATION => self.upload_url.as_deref(),
            _ => None,
        }
    }

    /// Build the transport for a destination.
    ///
    /// A configured URL gets real HTTP delivery; anything else runs on the
    /// simulated transport with the configured latency.
    pub fn transport(&self, destination: &str) -> Arc<dyn Transport> {
        match self.url_for(destination) {
            Some(url) => Arc::new(HttpTransport::new().with_route(destination, url)),
            None => Arc::new(
                SimulatedTransport::succeed_with(simulated_result(destination))
                    .with_latency(Duration::from_millis(self.simulated_latency_ms)),
            ),
        }
    }
}

/// What the simulated transport answers for each destination.
fn simulated_result(destination: &str) -> Value {
    match destination {
        UPLOAD_DESTINATION => json!({
            "url": "https://cdn.rxflow.app/uploads/pending-review",
            "status": "stored"
        }),
        _ => json!({ "status": "received" }),
    }
}

fn read(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        message: e.to_string(),
    })
}

fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(config.allowed_extensions.iter().any(|e| e == "pdf"));
        assert!(config.demo_request_url.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse::<u16>("RXFLOW_PORT", "not-a-port").unwrap_err();
        assert!(err.to_string().contains("RXFLOW_PORT"));

        let port: u16 = parse("RXFLOW_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_extensions() {
        assert_eq!(
            parse_extensions("pdf, .PNG ,csv,,"),
            vec!["pdf".to_string(), "png".to_string(), "csv".to_string()]
        );
    }

    #[test]
    fn test_url_for_known_destinations() {
        let config = Config {
            demo_request_url: Some("https://crm.rxflow.app/demo".into()),
            ..Config::default()
        };
        assert_eq!(
            config.url_for(DEMO_REQUEST_DESTINATION),
            Some("https://crm.rxflow.app/demo")
        );
        assert_eq!(config.url_for(UPLOAD_DESTINATION), None);
        assert_eq!(config.url_for("something-else"), None);
    }

    #[test]
    fn test_simulated_result_shapes() {
        assert!(simulated_result(UPLOAD_DESTINATION)["url"].is_string());
        assert_eq!(simulated_result(DEMO_REQUEST_DESTINATION)["status"], "received");
    }
}
