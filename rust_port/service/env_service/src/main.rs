use std::net::SocketAddr;

use anyhow::Context;
use env_service::make_app;
use maze_core::EnvRegistry;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut registry = EnvRegistry::new();
    blocking_maze_env::register_default_env(&mut registry).context("registering BlockingMaze")?;
    let app = make_app(registry);

    let addr: SocketAddr = std::env::var("MAZE_SERVICE_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("MAZE_SERVICE_ADDR must be host:port")?;
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!("environment service listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
