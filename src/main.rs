//! # Complaint Voice Gateway - Main Application Entry Point
//!
//! HTTP front door for the complaint assistant's voice path. Browsers and
//! kiosks upload their recording as a WAV container (any rate from 8 kHz up,
//! any channel count, 8/16/24-bit PCM or 32-bit float). The gateway keeps the
//! first channel, resamples it to the speech service's rate, packs it into a
//! 16-bit PCM mono WAV file, and relays it to the remote chatbot API.
//! Compressed recorder output (webm, ogg) must be converted to WAV by the
//! widget before upload.
//!
//! ## Application Architecture:
//! - **audio**: Resampling, WAV encode/decode and chunked capture sessions
//! - **chatbot**: HTTP client for the remote transcription and chat API
//! - **config**: Layered configuration (defaults, `config.toml`, environment)
//! - **state**: Shared application state, metrics and the lazily built client
//! - **health**: Health and metrics endpoints
//! - **middleware**: Per-route request metrics
//! - **handlers**: HTTP request handlers for the API endpoints
//! - **error**: Error types and their HTTP JSON representation

mod audio;
mod chatbot;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::AppState;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load configuration, start the HTTP server and wait for a shutdown signal.
///
/// Startup fails fast: a configuration that does not validate or an address
/// that cannot be bound ends the process with an error.
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting complaint-voice-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        remote = %config.remote.base_url,
        language = %config.remote.language,
        target_sample_rate = config.audio.target_sample_rate,
        "Configuration loaded"
    );

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Middleware runs in reverse registration order for responses
            .wrap(middleware::MetricsMiddleware)
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
            .default_service(web::to(handlers::not_found))
    })
    .disable_signals()
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` controls the filter; without it the gateway logs its own
/// events at debug and actix-web at info.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "complaint_voice_gateway=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Resolve once SIGINT (Ctrl+C) or SIGTERM arrives.
async fn wait_for_shutdown() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
