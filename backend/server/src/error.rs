use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bank::error::StoreError;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

/// Outcomes of a raffle attempt other than a successful draw.
#[derive(Error, Debug)]
pub enum RaffleError {
    #[error("All circuits have been used")]
    NoCircuitsAvailable,

    #[error("A raffle has already been held today")]
    AlreadyRaffledToday,

    #[error("Circuit catalog unavailable: {0}")]
    CatalogUnavailable(#[source] StoreError),

    #[error("Raffle ledger unavailable: {0}")]
    LedgerUnavailable(#[source] StoreError),

    #[error("Raffle task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error(transparent)]
    Raffle(#[from] RaffleError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::Raffle(RaffleError::NoCircuitsAvailable) => StatusCode::BAD_REQUEST,
            AppError::Raffle(RaffleError::AlreadyRaffledToday) => StatusCode::CONFLICT,
            AppError::Raffle(RaffleError::CatalogUnavailable(_))
            | AppError::Raffle(RaffleError::LedgerUnavailable(_))
            | AppError::Raffle(RaffleError::TaskFailed(_)) => {
                error!("Request failed: {self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
