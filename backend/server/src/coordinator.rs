//! # Raffle Coordinator
//!
//! The single write path to the ledger. Scheduled ticks and manual triggers
//! both end up in [`RaffleCoordinator::raffle_today`], which holds one lock
//! across "was today raffled?", the draw and the append, so a second caller
//! always sees the first caller's record.
//!
//! Ledger reads and the append are blocking file I/O, so they run on the
//! blocking pool while the lock is held.
//!
//! The announcement goes out after the lock is released. A failed broadcast
//! cannot undo or delay a write.
use std::sync::Arc;

use bank::ledger::{Ledger, LedgerStore};
use chrono::{DateTime, Local, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    error::RaffleError,
    notifier::Notifier,
    raffle::{Draw, RaffleEngine},
};

pub struct RaffleCoordinator<S> {
    engine: Arc<RaffleEngine<S>>,
    notifier: Notifier,
    write_lock: Mutex<()>,
}

impl<S: LedgerStore + 'static> RaffleCoordinator<S> {
    pub fn new(engine: RaffleEngine<S>, notifier: Notifier) -> Self {
        Self {
            engine: Arc::new(engine),
            notifier,
            write_lock: Mutex::new(()),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn ledger(&self) -> Result<Ledger, RaffleError> {
        self.engine.ledger()
    }

    /// Raffles the next round unless the ledger already holds a draw from `now`'s local day.
    pub async fn raffle_today(&self, now: DateTime<Local>) -> Result<Draw, RaffleError> {
        let draw = {
            let _guard = self.write_lock.lock().await;
            let engine = self.engine.clone();

            tokio::task::spawn_blocking(move || {
                let today = now.date_naive();
                if let Some(record) = engine.ledger()?.drawn_on(today) {
                    debug!("Round {} was already raffled on {today}", record.round);
                    return Err(RaffleError::AlreadyRaffledToday);
                }

                engine.run_raffle(now.with_timezone(&Utc))
            })
            .await??
        };

        info!(
            "Round {} raffled: {} ({})",
            draw.record.round, draw.circuit.name, draw.circuit.id
        );
        self.notifier.broadcast(&draw);

        Ok(draw)
    }
}
