//! # Notifier
//!
//! Best-effort live announcement of finished raffles to every connected
//! viewer. Backed by a `tokio::sync::broadcast` channel: each WebSocket
//! session holds a receiver for as long as it is connected.
//!
//! Nothing is replayed. A viewer that connects after the broadcast rebuilds
//! its view from the ledger instead.
use bank::catalog::Circuit;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::raffle::Draw;

const CHANNEL_CAPACITY: usize = 16;

/// Payload of the `raffleStarted` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleAnnouncement {
    pub round: u32,
    pub circuit_id: String,
    pub circuit_name: String,
    pub date: DateTime<Utc>,
    pub circuit: Circuit,
}

impl From<&Draw> for RaffleAnnouncement {
    fn from(draw: &Draw) -> Self {
        Self {
            round: draw.record.round,
            circuit_id: draw.record.circuit_id.clone(),
            circuit_name: draw.record.circuit_name.clone(),
            date: draw.record.date,
            circuit: draw.circuit.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<RaffleAnnouncement>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleAnnouncement> {
        self.tx.subscribe()
    }

    /// Pushes `draw` to every current session and returns how many there were.
    pub fn broadcast(&self, draw: &Draw) -> usize {
        // Err only means nobody is listening right now.
        let sessions = self.tx.send(RaffleAnnouncement::from(draw)).unwrap_or(0);
        debug!("Raffle announcement sent to {sessions} sessions");

        sessions
    }
}
