// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use autodraft::config;
use autodraft::proxy;
use autodraft::upstream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autodraft", about = "Streaming content generation relay")]
struct Cli {
    /// Path to the autodraft.yaml config file
    #[arg(long, default_value = "autodraft.yaml", env = "AUTODRAFT_CONFIG")]
    config: String,

    /// Port to listen on
    #[arg(long, default_value_t = proxy::DEFAULT_PORT, env = "AUTODRAFT_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    tracing::info!(%addr, "autodraft starting");

    let source = config::FileSource {
        path: std::path::PathBuf::from(cli.config),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        environment = %config.environment,
        provider = config.upstream.provider.key(),
        model = %config.upstream.model,
        config_hash = %config.config_hash,
        "config loaded"
    );

    let idle_timeout = Duration::from_millis(config.upstream.idle_timeout_ms);
    let upstream: Arc<dyn proxy::UpstreamClient> =
        Arc::new(upstream::build_upstream_client(&config));

    let app = proxy::build_router(upstream, idle_timeout);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "autodraft listening");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutting down");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
