// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process;

use relational_social_server::{
    api::router, config::AppConfig, state::AppState, storage::Database,
    story_sweeper::StorySweeper, telemetry::init_tracing,
};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!(error = %e, path = %config.data_dir.display(), "Failed to create data directory");
        process::exit(1);
    }
    let db = match Database::open(&config.database_path()) {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to open database");
            process::exit(1);
        }
    };

    let admin_email = config.admin_email.clone();
    let addr = config.bind_address();
    let state = AppState::new(config, db);

    if let Some(email) = admin_email {
        match state.sessions.promote_admin(&email) {
            Ok(true) => info!(email = %email, "Admin account promoted"),
            Ok(false) => warn!(email = %email, "ADMIN_EMAIL does not match any account yet"),
            Err(e) => warn!(error = %e, "Failed to promote admin account"),
        }
    }

    let shutdown = state.shutdown.clone();
    let sweeper = tokio::spawn(StorySweeper::new(state.db.clone()).run(shutdown.clone()));
    let app = router(state);

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %addr, "Failed to bind");
            process::exit(1);
        }
    };
    info!(addr = %addr, "Relational Social server listening (docs at /docs)");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
    {
        error!(error = %e, "Server error");
        process::exit(1);
    }
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Story sweeper did not stop cleanly");
    }
    info!("Server stopped");
}

/// Wait for Ctrl+C or SIGTERM, then cancel `shutdown` so open realtime
/// connections close before the listener drains.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
    shutdown.cancel();
}
