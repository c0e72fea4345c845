//! Worksheet Wizard · Backend
//!
//! - Step-by-step worksheet request wizard, one instance per session
//! - Axum HTTP + WebSocket API
//! - OpenAI worksheet generation (via environment variables), built-in
//!   templates otherwise
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables OpenAI generation if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o"
//!   OPENAI_TIMEOUT_SECS : default 60
//!   WIZARD_CONFIG_PATH  : path to TOML config (prompts + extra templates)
//!   EXPORT_SPOOL_DIR    : where PDF/Word export jobs are handed off (default ./exports)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod request;
mod validator;
mod wizard;
mod generator;
mod templates;
mod openai;
mod presenter;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "worksheet_wizard", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "worksheet_wizard", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "worksheet_wizard", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
