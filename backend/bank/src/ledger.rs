//! # Raffle Ledger
//!
//! Append-only history of draws. Single source of truth for "which circuits
//! are gone", "what round is next" and "has today already been raffled".
//!
//! ## Invariants
//!
//! - Rounds are exactly `1..=N` in order, no gaps.
//! - A circuit id appears at most once.
//! - Records are never mutated or removed.
//!
//! Both are checked when a ledger is loaded and on every append, so a store
//! can never hand out (or persist) a ledger that breaks them.
//!
//! ## Durability
//!
//! [`JsonLedgerStore`] keeps the whole ledger in one JSON document, in the
//! same shape the HTTP API serves it:
//!
//! ```json
//! { "raffles": [ { "id": 1772391600000, "round": 1, "circuitId": "spa",
//!                  "circuitName": "Spa-Francorchamps", "date": "2026-03-01T19:00:00Z",
//!                  "revealed": true } ],
//!   "currentRound": 2 }
//! ```
//!
//! Appends rewrite the document into a temp file, fsync it and rename it over
//! the existing file. Readers observe either the previous ledger or the new one.
use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    catalog::{Catalog, Circuit},
    error::StoreError,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RaffleRecord {
    /// Draw time in epoch milliseconds. Unique since at most one draw happens per day.
    pub id: i64,
    pub round: u32,
    pub circuit_id: String,
    pub circuit_name: String,
    pub date: DateTime<Utc>,
    #[serde(default = "revealed_default")]
    pub revealed: bool,
}

fn revealed_default() -> bool {
    true
}

impl RaffleRecord {
    pub fn new(round: u32, circuit: &Circuit, drawn_at: DateTime<Utc>) -> Self {
        Self {
            id: drawn_at.timestamp_millis(),
            round,
            circuit_id: circuit.id.clone(),
            circuit_name: circuit.name.clone(),
            date: drawn_at,
            revealed: true,
        }
    }

    /// Calendar day of the draw in the server's local time zone.
    pub fn local_date(&self) -> NaiveDate {
        self.date.with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<RaffleRecord>,
}

/// Borrowed wire shape of a ledger, shared by the file format and the API.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot<'a> {
    pub raffles: &'a [RaffleRecord],
    pub current_round: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerDocument {
    #[serde(default)]
    raffles: Vec<RaffleRecord>,
    current_round: Option<u32>,
}

impl Ledger {
    pub fn from_records(records: Vec<RaffleRecord>) -> Result<Self, StoreError> {
        let mut ledger = Ledger::default();

        for record in records {
            ledger.push(record)?;
        }

        Ok(ledger)
    }

    pub fn records(&self) -> &[RaffleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_round(&self) -> u32 {
        self.records.len() as u32 + 1
    }

    pub fn is_used(&self, circuit_id: &str) -> bool {
        self.records.iter().any(|record| record.circuit_id == circuit_id)
    }

    pub fn round(&self, round: u32) -> Option<&RaffleRecord> {
        self.records.iter().find(|record| record.round == round)
    }

    /// The record drawn on `date` (local calendar day), if any.
    pub fn drawn_on(&self, date: NaiveDate) -> Option<&RaffleRecord> {
        self.records.iter().find(|record| record.local_date() == date)
    }

    /// Circuits of `catalog` not drawn yet, in catalog order.
    pub fn available<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Circuit> {
        catalog
            .circuits
            .iter()
            .filter(|circuit| !self.is_used(&circuit.id))
            .collect()
    }

    /// Circuit ids recorded in the ledger that the catalog does not know.
    pub fn unknown_circuits(&self, catalog: &Catalog) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| !catalog.contains(&record.circuit_id))
            .map(|record| record.circuit_id.as_str())
            .collect()
    }

    pub fn push(&mut self, record: RaffleRecord) -> Result<(), StoreError> {
        if record.round != self.next_round() {
            return Err(StoreError::Corrupt(format!(
                "expected round {}, got round {}",
                self.next_round(),
                record.round
            )));
        }

        if self.is_used(&record.circuit_id) {
            return Err(StoreError::Corrupt(format!(
                "circuit '{}' drawn twice (round {})",
                record.circuit_id, record.round
            )));
        }

        self.records.push(record);
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot<'_> {
        LedgerSnapshot {
            raffles: &self.records,
            current_round: self.next_round(),
        }
    }
}

/// Durable home of the [`Ledger`]. Implementations only need full reads and appends.
pub trait LedgerStore: Send + Sync {
    fn read(&self) -> Result<Ledger, StoreError>;

    /// Persists `record` after the existing records. On error nothing is written.
    fn append(&self, record: &RaffleRecord) -> Result<(), StoreError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn read(&self) -> Result<Ledger, StoreError> {
        (**self).read()
    }

    fn append(&self, record: &RaffleRecord) -> Result<(), StoreError> {
        (**self).append(record)
    }
}

pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&ledger.snapshot())
            .map_err(|e| StoreError::json(&self.path, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let result = write_synced(&tmp, &bytes).and_then(|_| fs::rename(&tmp, &self.path));

        result.map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io(&self.path, e)
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        sync_dir(dir).map_err(|e| StoreError::io(dir, e))
    }
}

/// Makes the rename itself durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl LedgerStore for JsonLedgerStore {
    fn read(&self) -> Result<Ledger, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Ledger::default()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let document: LedgerDocument =
            serde_json::from_str(&data).map_err(|e| StoreError::json(&self.path, e))?;
        let ledger = Ledger::from_records(document.raffles)?;

        if let Some(current_round) = document.current_round {
            if current_round != ledger.next_round() {
                warn!(
                    "Stored currentRound {current_round} disagrees with {} records, using {}",
                    ledger.len(),
                    ledger.next_round()
                );
            }
        }

        Ok(ledger)
    }

    fn append(&self, record: &RaffleRecord) -> Result<(), StoreError> {
        let mut ledger = self.read()?;
        ledger.push(record.clone())?;

        self.write(&ledger)
    }
}

/// In-memory ledger, for tests and dry runs.
#[derive(Default)]
pub struct MemoryLedgerStore {
    records: Mutex<Vec<RaffleRecord>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn read(&self) -> Result<Ledger, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        Ledger::from_records(records.clone())
    }

    fn append(&self, record: &RaffleRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let mut ledger = Ledger::from_records(records.clone())?;
        ledger.push(record.clone())?;

        records.push(record.clone());
        Ok(())
    }
}
