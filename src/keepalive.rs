//! Tiny HTTP endpoint so an uptime monitor can tell the process is running.
//!
//! It lives on its own OS thread with its own runtime, so it keeps answering
//! even when the gateway side is busy.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Router};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::KeepaliveConfig;

async fn alive(State(message): State<Arc<str>>) -> String {
    message.to_string()
}

pub fn router(message: &str) -> Router {
    Router::new()
        .route("/", get(alive))
        .with_state(Arc::<str>::from(message))
}

pub async fn serve(listener: TcpListener, message: &str) -> Result<()> {
    axum::serve(listener, router(message))
        .await
        .context("Keep-alive server error")
}

/// Start the keep-alive server on a dedicated thread
pub fn spawn(config: KeepaliveConfig) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("keepalive".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start keep-alive runtime: {}", e);
                    return;
                }
            };
            runtime.block_on(async move {
                let addr = format!("{}:{}", config.host, config.port);
                let listener = match TcpListener::bind(&addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!("Failed to bind keep-alive server to {}: {}", addr, e);
                        return;
                    }
                };
                info!("Keep-alive server listening on http://{}", addr);
                if let Err(e) = serve(listener, &config.message).await {
                    error!("{:#}", e);
                }
            });
        })
        .context("Failed to spawn keep-alive thread")
}
