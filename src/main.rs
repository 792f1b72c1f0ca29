//! FirstLine triage service binary.
//!
//! Usage:
//!   firstline-triage serve [--host 0.0.0.0] [--port 8000] [--model medgemma:4b] [--pull]
//!   firstline-triage smoke [--url http://127.0.0.1:8000]

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use firstline_triage::api::{start_server_on, ApiContext};
use firstline_triage::config::{self, ServiceConfig};
use firstline_triage::model_service::ModelService;
use firstline_triage::pipeline::ollama::OllamaClient;
use firstline_triage::pipeline::triage::TriageOrchestrator;

#[derive(Parser)]
#[command(name = "firstline-triage", version)]
#[command(about = "Clinical symptom triage over MedGemma with a deterministic fallback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the triage HTTP API (default)
    Serve(ServeArgs),
    /// Check /health and /infer on a running instance
    Smoke {
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        url: String,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 180)]
        timeout: u64,
    },
}

/// Flags override the environment.
#[derive(Args, Default)]
struct ServeArgs {
    #[arg(long)]
    host: Option<IpAddr>,
    #[arg(long)]
    port: Option<u16>,
    /// Ollama model tag
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    ollama_url: Option<String>,
    /// Pull the model if it is not installed
    #[arg(long)]
    pull: bool,
}

impl ServeArgs {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = self.model {
            config.model_id = model;
        }
        if let Some(url) = self.ollama_url {
            config.ollama_host = url.trim_end_matches('/').to_string();
        }
        if self.pull {
            config.pull_model_on_start = true;
        }
    }
}

fn main() -> Result<()> {
    let env_file = config::load_env_file();
    firstline_triage::init_tracing();
    if let Some(path) = env_file {
        tracing::debug!(path = %path, "Loaded environment file");
    }

    let cli = Cli::parse();
    match cli.command.unwrap_or_else(|| Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => serve(args),
        Commands::Smoke { url, timeout } => smoke(&url, Duration::from_secs(timeout)),
    }
}

fn serve(args: ServeArgs) -> Result<()> {
    let mut config = ServiceConfig::from_env().context("reading configuration")?;
    args.apply(&mut config);

    tracing::info!(
        version = config::APP_VERSION,
        model = %config.model_id,
        ollama = %config.ollama_host,
        "{} starting",
        config::APP_NAME
    );

    // The blocking HTTP client must be built outside the async runtime.
    let client = OllamaClient::new(&config.ollama_host, config.generation_timeout_secs)
        .context("building Ollama client")?;
    let service = Arc::new(
        ModelService::new(Box::new(client), &config.model_id)
            .with_pull_on_start(config.pull_model_on_start),
    );
    let orchestrator = Arc::new(TriageOrchestrator::new(service.clone()));
    let ctx = ApiContext::new(orchestrator, Duration::from_secs(config.request_timeout_secs));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let loader = service.clone();
    let result = runtime.block_on(async move {
        // Requests are served by the fallback until the model is ready.
        tokio::task::spawn_blocking(move || loader.load());

        let mut server = start_server_on(ctx, config.bind_addr())
            .await
            .map_err(anyhow::Error::msg)?;
        tracing::info!(addr = %server.addr, "Listening");

        tokio::signal::ctrl_c()
            .await
            .context("waiting for shutdown signal")?;
        server.shutdown();
        server.stopped().await;
        Ok::<(), anyhow::Error>(())
    });

    // A pull may still be running on the blocking pool.
    runtime.shutdown_timeout(Duration::from_secs(5));
    drop(service);
    result
}

fn smoke(url: &str, timeout: Duration) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(firstline_triage::smoke::run(url, timeout))
}
