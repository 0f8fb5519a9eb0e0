use std::sync::Arc;

use anyhow::Result;
use bank::{
    DataPaths,
    catalog::{Catalog, Circuit},
    ledger::{JsonLedgerStore, LedgerStore, RaffleRecord},
    schedule::ScheduleConfig,
};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};

use super::{
    config::Config,
    coordinator::RaffleCoordinator,
    error::RaffleError,
    notifier::Notifier,
    raffle::RaffleEngine,
    scheduler::ScheduleSource,
};

pub type SharedStore = Arc<dyn LedgerStore>;

pub struct AppState {
    pub config: Config,
    pub catalog: Arc<Catalog>,
    pub schedule: Arc<ScheduleSource>,
    pub coordinator: Arc<RaffleCoordinator<SharedStore>>,
}

/// `GET /api/config`: the schedule plus when the next raffle opens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    #[serde(flatten)]
    pub schedule: ScheduleConfig,
    pub next_raffle_at: Option<NaiveDateTime>,
}

impl ConfigView {
    pub fn new(schedule: ScheduleConfig, now: NaiveDateTime) -> Self {
        let next_raffle_at = schedule.next_raffle_at(now);

        Self {
            schedule,
            next_raffle_at,
        }
    }
}

/// Everything a viewer needs to rebuild its page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub circuits: Vec<Circuit>,
    pub raffles: Vec<RaffleRecord>,
    pub current_round: u32,
    pub config: ConfigView,
}

impl AppState {
    /// Loads catalog, ledger and schedule from `config.data_dir`.
    pub fn load(config: Config) -> Result<Arc<Self>> {
        let paths = DataPaths::new(&config.data_dir);

        let catalog = Catalog::load(&paths.circuits).map_err(RaffleError::CatalogUnavailable)?;
        info!("Loaded {} circuits from {}", catalog.len(), paths.circuits.display());

        let store = JsonLedgerStore::new(&paths.raffles);
        let ledger = store.read().map_err(RaffleError::LedgerUnavailable)?;
        info!("Loaded {} raffles from {}", ledger.len(), store.path().display());

        for id in ledger.unknown_circuits(&catalog) {
            warn!("Ledger references circuit '{id}' which is not in the catalog");
        }

        let schedule = ScheduleConfig::load(&paths.config)?;
        let source = ScheduleSource::from_file(paths.config, schedule);

        Ok(Self::new(config, catalog, Arc::new(store), source))
    }

    pub fn new(
        config: Config,
        catalog: Catalog,
        store: SharedStore,
        schedule: ScheduleSource,
    ) -> Arc<Self> {
        let catalog = Arc::new(catalog);
        let engine = RaffleEngine::new(catalog.clone(), store);

        Arc::new(Self {
            config,
            catalog,
            schedule: Arc::new(schedule),
            coordinator: Arc::new(RaffleCoordinator::new(engine, Notifier::new())),
        })
    }

    pub async fn config_view(&self, now: DateTime<Local>) -> ConfigView {
        ConfigView::new(self.schedule.current().await, now.naive_local())
    }

    pub async fn snapshot(&self, now: DateTime<Local>) -> Result<StateSnapshot, RaffleError> {
        let ledger = self.coordinator.ledger()?;

        Ok(StateSnapshot {
            circuits: self.catalog.circuits.clone(),
            raffles: ledger.records().to_vec(),
            current_round: ledger.next_round(),
            config: self.config_view(now).await,
        })
    }
}
