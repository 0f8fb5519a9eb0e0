//! # Live Channel
//!
//! `GET /ws` upgrades to a WebSocket session. Every message is JSON of the
//! form `{ "type": ..., "data": ... }`.
//!
//! | Direction | Type | Meaning |
//! |-----------|------|---------|
//! | server → all | `raffleStarted` | a round was just raffled |
//! | server → one | `raffleError` | this session's command failed |
//! | server → one | `state` | snapshot reply to `requestState` |
//! | client | `requestState` | ask for a snapshot |
//! | client | `requestRaffle` | manual trigger |
//!
//! A successful `requestRaffle` gets no direct reply: the requesting session
//! receives the same `raffleStarted` broadcast as everyone else.
use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::{
    error::AppError,
    notifier::RaffleAnnouncement,
    state::{AppState, StateSnapshot},
};

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    RaffleStarted(RaffleAnnouncement),
    RaffleError { error: String },
    State(StateSnapshot),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    RequestState,
    RequestRaffle,
}

impl From<AppError> for ServerMessage {
    fn from(error: AppError) -> Self {
        ServerMessage::RaffleError {
            error: error.to_string(),
        }
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut announcements = state.coordinator.notifier().subscribe();
    debug!("Viewer connected");

    loop {
        tokio::select! {
            announcement = announcements.recv() => match announcement {
                Ok(announcement) => {
                    let message = ServerMessage::RaffleStarted(announcement);
                    if send(&mut socket, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Viewer lagged, {missed} announcements dropped")
                }
                Err(RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_command(&state, text.as_str()).await {
                        if send(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Viewer disconnected");
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(text) => socket.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!("Failed to encode live message: {e}");
            Ok(())
        }
    }
}

/// Runs one client command and returns the reply meant for that session only.
pub async fn handle_command(state: &AppState, text: &str) -> Option<ServerMessage> {
    let command = match serde_json::from_str::<ClientMessage>(text) {
        Ok(command) => command,
        Err(_) => return Some(AppError::MalformedPayload.into()),
    };

    match command {
        ClientMessage::RequestState => Some(match state.snapshot(Local::now()).await {
            Ok(snapshot) => ServerMessage::State(snapshot),
            Err(e) => AppError::from(e).into(),
        }),
        ClientMessage::RequestRaffle => match state.coordinator.raffle_today(Local::now()).await {
            Ok(_) => None,
            Err(e) => Some(AppError::from(e).into()),
        },
    }
}
