// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use relational_claim_server::{
    api::router,
    blockchain::{AlloyClaimLedger, LedgerClientError},
    clock::{Clock, SystemClock},
    config::{ConfigError, LogFormat, ServiceConfig},
    identity::{HttpIdentityOracle, IdentityOracle, OracleError, UnconfiguredOracle},
    state::AppState,
    store::{InMemoryKvStore, KvStore},
    store_sweeper::StoreSweeper,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("ledger client error: {0}")]
    Ledger(#[from] LedgerClientError),
    #[error("identity oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("invalid bind address: {0}")]
    BindAddress(#[from] std::net::AddrParseError),
    #[error("failed to install rustls crypto provider")]
    CryptoProvider,
    #[error("failed to load TLS certificate: {0}")]
    Tls(std::io::Error),
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server terminated");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run() -> Result<(), StartupError> {
    // Install the ring crypto provider for rustls before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| StartupError::CryptoProvider)?;

    let config = ServiceConfig::from_env()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new(clock.clone()));
    let ledger = Arc::new(AlloyClaimLedger::new(&config.rpc_url, config.contracts)?);
    let oracle: Arc<dyn IdentityOracle> = match &config.identity_verify_url {
        Some(url) => Arc::new(HttpIdentityOracle::new(url.clone())?),
        None => {
            tracing::warn!("Identity verification endpoint not configured");
            Arc::new(UnconfiguredOracle)
        }
    };

    let state = AppState::new(&config, store.clone(), clock, ledger, oracle);
    let app = router(state);

    let shutdown = CancellationToken::new();
    tokio::spawn(StoreSweeper::new(store, config.sweep_interval).run(shutdown.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone(), shutdown));

    tracing::info!(
        %addr,
        chain_id = config.verifier.chain_id,
        domain = %config.verifier.domain,
        tls = config.tls.is_some(),
        "Relational Claim server listening (docs at /docs)"
    );

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(StartupError::Tls)?;
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)
        }
        None => axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(StartupError::Serve),
    }
}

async fn shutdown_on_signal(handle: Handle<SocketAddr>, shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
