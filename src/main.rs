use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use url::Url;

use mcgravity::cli::Cli;
use mcgravity::composer::Composer;
use mcgravity::config::AggregatorConfig;
use mcgravity::error::AggregatorError;
use mcgravity::http::routes::{build_router, BIND_TIMEOUT};
use mcgravity::http::state::AppState;
use mcgravity::protocol::ServerInfo;
use mcgravity::registry::CapabilityRegistry;
use mcgravity::server::ExposedServer;
use mcgravity::upstream::UpstreamDescriptor;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error during startup");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> mcgravity::error::AggregatorResult<()> {
    let config = match &cli.config {
        Some(path) => AggregatorConfig::load(path)?,
        None => AggregatorConfig {
            name: cli.mcp_name.clone(),
            version: cli.mcp_version.clone(),
            ..AggregatorConfig::default()
        },
    };

    let mut descriptors: Vec<UpstreamDescriptor> = config.servers.into_values().collect();
    for raw_url in &cli.upstreams {
        let url = Url::parse(raw_url)?;
        descriptors.push(UpstreamDescriptor::from_url(url));
    }

    let registry = Arc::new(CapabilityRegistry::new());
    let server = Arc::new(ExposedServer::new(
        ServerInfo { name: config.name.clone(), version: config.version.clone() },
        Arc::clone(&registry),
    ));
    let composer = Arc::new(Composer::new(Arc::clone(&server), Arc::clone(&registry)));

    for descriptor in descriptors {
        info!(upstream = %descriptor.url, "registering upstream");
        composer.spawn_registration(descriptor);
    }

    let state = AppState::new(Arc::clone(&server), Arc::clone(&composer), Arc::clone(&registry));
    let router = build_router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::time::timeout(BIND_TIMEOUT, tokio::net::TcpListener::bind(&addr))
        .await
        .map_err(|_| AggregatorError::config(format!("timed out binding {addr}")))??;
    info!(address = %addr, "mcgravity listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
