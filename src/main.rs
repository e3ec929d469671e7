use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meetbridge::client::ApiClient;
use meetbridge::config::{self, Config};
use meetbridge::zoom::TokenCache;
use meetbridge::{api, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Meeting { command }) => handle_meeting_command(command, &cfg).await,
        Some(cli::Commands::Translate { to, text, api_url }) => {
            let client = api_client(&cfg, api_url)?;
            let translation = client.translate(&text, &to).await?;
            println!("{}", translation);
            Ok(())
        }
        Some(cli::Commands::ZoomToken) => handle_zoom_token_command(&cfg).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// fmt logging filtered by RUST_LOG, plus an OTLP exporter when
/// OTEL_EXPORTER_OTLP_ENDPOINT is set.
fn init_tracing() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "meetbridge"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "meetbridge=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();
    Ok(())
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    let http = meetbridge::http_client(&cfg).context("failed to build HTTP client")?;

    tracing::info!("Initializing Zoom and translation clients...");
    let state = Arc::new(AppState::from_config(cfg, http)?);
    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("meetbridge listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("meetbridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

fn api_client(cfg: &Config, api_url: Option<String>) -> anyhow::Result<ApiClient> {
    let base = api_url.unwrap_or_else(|| cfg.api_base_url.clone());
    ApiClient::new(&base, cfg.upstream_timeout)
}

async fn handle_meeting_command(cmd: cli::MeetingCommands, cfg: &Config) -> anyhow::Result<()> {
    let record = match cmd {
        cli::MeetingCommands::Ensure {
            transaction_id,
            api_url,
        } => api_client(cfg, api_url)?.ensure_meeting(&transaction_id).await?,
        cli::MeetingCommands::Get {
            transaction_id,
            api_url,
        } => api_client(cfg, api_url)?.get_meeting(&transaction_id).await?,
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn handle_zoom_token_command(cfg: &Config) -> anyhow::Result<()> {
    let http = meetbridge::http_client(cfg).context("failed to build HTTP client")?;
    let tokens = TokenCache::from_config(http, cfg)?;
    let token = tokens.get_token().await?;
    println!(
        "Zoom credentials OK. Access token expires at {}",
        token.expires_at().to_rfc3339()
    );
    Ok(())
}
