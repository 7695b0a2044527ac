// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;

use rental_registry_server::{
    api::router,
    auth::AuthService,
    blockchain::ChainClient,
    config::{AuthSettings, ServerConfig},
    logging::init_tracing,
    state::AppState,
    storage::Database,
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = ServerConfig::from_env()?;
    let auth_settings = AuthSettings::from_env()?;
    tracing::info!(?auth_settings, "Authentication configured");

    let db = Database::open(&config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "Database opened");

    let auth = AuthService::from_settings(&auth_settings)?;
    let mut state = AppState::new(db, auth, config.rate_limit);

    match &config.rpc_url {
        Some(rpc_url) => {
            state = state.with_chain(ChainClient::new(rpc_url)?);
            tracing::info!(rpc_url = %rpc_url, "Chain confirmation sync enabled");
        }
        None => tracing::warn!("RPC_URL not set; transaction sync endpoints will return 503"),
    }

    let shutdown = CancellationToken::new();
    let eviction = state.rate_limiter.spawn_eviction(shutdown.clone());

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let addr: SocketAddr = config.bind_address().parse()?;

    let handle = Handle::new();
    let signal_handle = handle.clone();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.cancel();
        signal_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            tracing::info!(%addr, "Rental Registry listening on https");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app)
                .await?;
        }
        _ => {
            tracing::info!(%addr, "Rental Registry listening on http");
            axum_server::bind(addr).handle(handle).serve(app).await?;
        }
    }

    shutdown.cancel();
    eviction.await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
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
