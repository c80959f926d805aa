#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use followsync::{ChannelClient, ClientHandle, RelationSetResolver, Responder, SystemClock};
use server::config::{CliArgs, ServerConfig};
use server::telemetry::{TelemetryProviders, init_telemetry};
use server::transport::WsConnector;
use server::upstream::ScratchApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let api = ScratchApi::new(
        config.api_base_url.clone(),
        &config.user_agent,
        config.resolver.fetch_timeout,
    )?;
    let resolver = Arc::new(RelationSetResolver::new(
        api,
        config.resolver.clone(),
        SystemClock::default(),
    ));
    let responder = Responder::new(resolver, config.chunk_capacity);
    let connector = WsConnector::new(config.cloud_url.clone(), &config.user_agent)?;

    let client = ChannelClient::new(
        connector,
        responder,
        config.client.clone(),
        SystemClock::default(),
    )
    .start();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health endpoint listening on http://{addr}");

    axum::serve(listener, server::health::router(client.state()))
        .with_graceful_shutdown(shutdown_signal(client, providers))
        .await?;

    tracing::info!("Relay shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting relay with full config: {config:#?}");
    } else {
        tracing::info!(
            identity = %config.client.identity,
            project_id = %config.client.project_id,
            cloud_url = %config.cloud_url,
            "Starting relay"
        );
    }
}

async fn shutdown_signal(client: ClientHandle, providers: TelemetryProviders) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // Closes the cloud channel before the health endpoint stops answering.
    client.stop().await;
    providers.shutdown();
}
