//! # Bank
//!
//! Data layer of the raffle: the circuit catalog, the raffle ledger and the
//! championship schedule, with the JSON files they live in.
//!
//! All three files sit in one data directory:
//!
//! | File | Contents | Written by |
//! |------|----------|------------|
//! | `circuits.json` | [`catalog::Catalog`] | operator |
//! | `raffles.json` | [`ledger::Ledger`] | raffle engine only |
//! | `config.json` | [`schedule::ScheduleConfig`] | operator |
use std::path::{Path, PathBuf};

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod schedule;

pub const CIRCUITS_FILE: &str = "circuits.json";
pub const RAFFLES_FILE: &str = "raffles.json";
pub const CONFIG_FILE: &str = "config.json";

/// Locations of the data files inside a data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub circuits: PathBuf,
    pub raffles: PathBuf,
    pub config: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            circuits: data_dir.join(CIRCUITS_FILE),
            raffles: data_dir.join(RAFFLES_FILE),
            config: data_dir.join(CONFIG_FILE),
        }
    }
}
