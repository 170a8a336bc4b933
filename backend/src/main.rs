//! RxFlow CLI - Drive the submission engine from the terminal
//!
//! # Main Commands
//!
//! ```bash
//! rxflow serve                      # Start HTTP server (port 3000)
//! rxflow validate licence.pdf       # Run the upload rules on a file
//! rxflow submit licence.pdf         # One-shot submission workflow
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! rxflow validate --form demo.json  # Validate a demo-request form
//! rxflow submit licence.pdf --endpoint http://localhost:4000/upload
//! ```

use clap::{Parser, Subcommand};
use rxflow::rules::{self, ValidationOutcome};
use rxflow::{Config, FilePayload, Payload, SubmissionController, SubmissionState};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rxflow")]
#[command(about = "Submission workflow engine for the RxFlow pharmacy platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides RXFLOW_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the client-side validation rules without submitting
    Validate {
        /// Input file (a document, or a JSON form with --form)
        input: PathBuf,

        /// Treat the input as a demo-request form
        #[arg(long)]
        form: bool,
    },

    /// Run one submission workflow to completion
    Submit {
        /// Document to upload
        input: PathBuf,

        /// Logical destination (default: document-upload)
        #[arg(short, long)]
        destination: Option<String>,

        /// POST to this URL instead of the configured destination
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Validate { input, form } => cmd_validate(&input, form),

        Commands::Submit {
            input,
            destination,
            endpoint,
        } => cmd_submit(&input, destination, endpoint).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    rxflow::server::start_server(config).await
}

fn cmd_validate(input: &Path, form: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let (payload, rules) = if form {
        let text = fs::read_to_string(input)?;
        let value: Value = serde_json::from_str(&text)?;
        (Payload::Form(value), rules::demo_request_rules())
    } else {
        (
            Payload::File(FilePayload::from_path(input)?),
            config.upload_rules(),
        )
    };

    eprintln!("🔎 Validating: {}", input.display());

    match rules::evaluate(&rules, &payload) {
        ValidationOutcome::Valid => {
            eprintln!("✅ Valid");
            Ok(())
        }
        ValidationOutcome::Invalid(message) => {
            // For forms, also show the full schema report.
            if let Some(value) = payload.as_form() {
                let schema = rules::demo_request_schema();
                for error in rules::schema_errors(&schema, value) {
                    eprintln!("   - {}", error);
                }
            }
            Err(message.into())
        }
    }
}

async fn cmd_submit(
    input: &Path,
    destination: Option<String>,
    endpoint: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let destination = destination.unwrap_or_else(|| rxflow::UPLOAD_DESTINATION.to_string());

    let payload = Payload::File(FilePayload::from_path(input)?);

    let transport = match endpoint {
        Some(url) => Arc::new(rxflow::HttpTransport::new().with_route(destination.clone(), url))
            as Arc<dyn rxflow::Transport>,
        None => config.transport(&destination),
    };

    let controller = SubmissionController::new(&destination, config.upload_rules(), transport);
    controller.on_success(|result| {
        eprintln!("✅ Delivered: {}", result);
    });
    controller.on_error(|message| {
        eprintln!("❌ Failed: {}", message);
    });

    eprintln!("📤 Submitting {} to {}", payload.describe(), destination);

    match controller.submit(payload).await? {
        SubmissionState::Failed(_) => Err(format!("submission to {} failed", destination).into()),
        state => {
            eprintln!("   final state: {}", state.label());
            Ok(())
        }
    }
}
