// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Medium Publisher API Server
//!
//! Stores drafts, publishes them to Medium on demand or at a scheduled
//! time, and converts between markdown and HTML.

use chrono::Utc;
use medium_publisher::{config::Config, db::Database, services::MediumClient, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging
    init_logging();

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    tracing::info!(port = config.port, "Starting Medium Publisher API");

    let db = Database::connect(&config.database_url).await?;
    tracing::info!(backend = db.backend_name(), "Document store connected");

    let medium = Arc::new(MediumClient::new(
        config.medium_client_id.clone(),
        config.medium_client_secret.clone(),
        config.medium_redirect_url.clone(),
        config.medium_timeout,
    )?);

    let port = config.port;
    let state = Arc::new(AppState::new(config, db, medium));

    // Posts left mid-publish by a previous process go back in the queue
    let recovered = state.publisher.recover_interrupted(Utc::now()).await?;
    if recovered > 0 {
        tracing::warn!(count = recovered, "Recovered interrupted publishes");
    }

    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn(state.build_scheduler().run(cancel.clone()));

    let app = medium_publisher::routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Scheduler task failed");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = EnvFilter::from_default_env();
    for directive in ["medium_publisher=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
