//! Racing championship circuit raffle.
//!
//! Once per configured race day, at the configured time, one circuit that no
//! earlier round has used is drawn at random for the next round, written to
//! the ledger and announced live to every connected viewer.
//!
//!
//!
//! # Components
//! - [`raffle::RaffleEngine`]: uniform draw over the unused circuits, one append per draw
//! - [`coordinator::RaffleCoordinator`]: the only write path, one draw per local day
//! - [`scheduler::Scheduler`]: wall-clock polling, fires inside the raffle time window
//! - [`notifier::Notifier`]: best-effort broadcast to live sessions
//! - `bank`: catalog, ledger and schedule files
//!
//!
//!
//! # API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/api/circuits` | circuit catalog |
//! | GET | `/api/raffles` | ledger and `currentRound` |
//! | GET | `/api/config` | schedule and `nextRaffleAt` |
//! | POST | `/api/raffle` | manual trigger |
//! | GET | `/ws` | live channel, see [`ws`] |
//!
//!
//!
//! # Environment
//! - `RUST_PORT`: listen port, default `3000`
//! - `DATA_DIR`: directory with `circuits.json`, `raffles.json`, `config.json`, default `data`
//! - `TICK_SECS`: scheduler interval, default `60`
//! - `RUST_LOG`: tracing filter, e.g. `info` or `server=debug`
//!
//!
//!
//! # Run
//! ```sh
//! RUST_LOG=info cargo run -p raffle
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod coordinator;
pub mod error;
pub mod notifier;
pub mod raffle;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod ws;

use config::Config;
use routes::{circuits_handler, config_handler, raffle_handler, raffles_handler};
use scheduler::Scheduler;
use state::AppState;
use ws::ws_handler;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::load(config)?;

    info!("Starting scheduler...");
    let scheduler = Scheduler::new(
        state.coordinator.clone(),
        state.schedule.clone(),
        state.config.tick,
    );
    let scheduler = tokio::spawn(scheduler.run());

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")?;

    scheduler.abort();
    info!("Server shutting down...");

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/circuits", get(circuits_handler))
        .route("/api/raffles", get(raffles_handler))
        .route("/api/config", get(config_handler))
        .route("/api/raffle", post(raffle_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
