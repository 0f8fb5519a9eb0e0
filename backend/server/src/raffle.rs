//! # Raffle Engine
//!
//! Picks the circuit for the next round. The engine only knows about circuit
//! availability; whether today may be raffled is decided by the caller (see
//! [`crate::coordinator`]).
//!
//! Each draw is uniform over the circuits still available at call time, so
//! every remaining circuit has the same chance no matter how many are gone.
use std::sync::Arc;

use bank::{
    catalog::{Catalog, Circuit},
    ledger::{Ledger, LedgerStore, RaffleRecord},
};
use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};

use crate::error::RaffleError;

/// A successful raffle: the persisted record and the circuit it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub record: RaffleRecord,
    pub circuit: Circuit,
}

pub struct RaffleEngine<S> {
    catalog: Arc<Catalog>,
    store: S,
}

impl<S: LedgerStore> RaffleEngine<S> {
    pub fn new(catalog: Arc<Catalog>, store: S) -> Self {
        Self { catalog, store }
    }

    pub fn ledger(&self) -> Result<Ledger, RaffleError> {
        self.store.read().map_err(RaffleError::LedgerUnavailable)
    }

    pub fn run_raffle(&self, drawn_at: DateTime<Utc>) -> Result<Draw, RaffleError> {
        self.run_raffle_with(&mut rand::thread_rng(), drawn_at)
    }

    /// Draws with the given random source. Exactly one append on success, none on failure.
    pub fn run_raffle_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        drawn_at: DateTime<Utc>,
    ) -> Result<Draw, RaffleError> {
        let ledger = self.ledger()?;
        let available = ledger.available(&self.catalog);

        let circuit = *available
            .choose(rng)
            .ok_or(RaffleError::NoCircuitsAvailable)?;

        let record = RaffleRecord::new(ledger.next_round(), circuit, drawn_at);
        self.store
            .append(&record)
            .map_err(RaffleError::LedgerUnavailable)?;

        Ok(Draw {
            record,
            circuit: circuit.clone(),
        })
    }
}
