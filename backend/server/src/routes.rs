use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use bank::{
    catalog::{Catalog, Circuit},
    ledger::RaffleRecord,
};
use chrono::Local;
use serde::Serialize;

use crate::{
    error::AppError,
    state::{AppState, ConfigView},
};

#[derive(Serialize)]
pub struct RaffleResponse {
    pub success: bool,
    pub raffle: RaffleRecord,
    pub circuit: Circuit,
}

pub async fn circuits_handler(State(state): State<Arc<AppState>>) -> Json<Catalog> {
    Json(state.catalog.as_ref().clone())
}

pub async fn raffles_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let ledger = state.coordinator.ledger()?;

    Ok(Json(ledger.snapshot()).into_response())
}

pub async fn config_handler(State(state): State<Arc<AppState>>) -> Json<ConfigView> {
    Json(state.config_view(Local::now()).await)
}

/// Manual trigger, guarded like the scheduled one.
pub async fn raffle_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RaffleResponse>, AppError> {
    let draw = state.coordinator.raffle_today(Local::now()).await?;

    Ok(Json(RaffleResponse {
        success: true,
        raffle: draw.record,
        circuit: draw.circuit,
    }))
}
