//! # Scheduler
//!
//! Polls the wall clock on a fixed interval and raffles when a configured
//! race day reaches its raffle time.
//!
//! The scheduler keeps no state of its own between ticks. "Was today already
//! raffled" is answered by the ledger inside the coordinator's lock, so a
//! restart, a manual trigger or a slow tick cannot cause a second draw.
//!
//! Ticks never overlap: each one is awaited inside the loop before the next
//! interval tick is taken.
use std::{path::PathBuf, sync::Arc, time::Duration};

use bank::{ledger::LedgerStore, schedule::ScheduleConfig};
use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use tokio::{
    sync::RwLock,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{coordinator::RaffleCoordinator, error::RaffleError, raffle::Draw};

const MINUTE: Duration = Duration::from_secs(60);

/// The schedule currently in force, reloaded from disk between ticks.
pub struct ScheduleSource {
    path: Option<PathBuf>,
    current: RwLock<ScheduleConfig>,
}

impl ScheduleSource {
    pub fn from_file(path: PathBuf, initial: ScheduleConfig) -> Self {
        Self {
            path: Some(path),
            current: RwLock::new(initial),
        }
    }

    pub fn fixed(schedule: ScheduleConfig) -> Self {
        Self {
            path: None,
            current: RwLock::new(schedule),
        }
    }

    pub async fn current(&self) -> ScheduleConfig {
        self.current.read().await.clone()
    }

    /// Re-reads the file. On failure the last good schedule stays in force.
    pub async fn reload(&self) -> ScheduleConfig {
        let Some(path) = &self.path else {
            return self.current().await;
        };

        match ScheduleConfig::load(path) {
            Ok(schedule) => {
                let mut current = self.current.write().await;
                if *current != schedule {
                    info!("Schedule reloaded from {}", path.display());
                    *current = schedule.clone();
                }
                schedule
            }
            Err(e) => {
                warn!("Failed to reload schedule, keeping previous one: {e}");
                self.current().await
            }
        }
    }
}

/// True when `now` falls on a race day, inside the window opening at the
/// raffle time. The window is one minute, or one tick if ticks are longer.
pub fn is_due(schedule: &ScheduleConfig, now: NaiveDateTime, tick: Duration) -> bool {
    let today = now.date();
    if !schedule.is_race_day(today) {
        return false;
    }

    let window = chrono::Duration::from_std(tick.max(MINUTE)).unwrap_or(chrono::Duration::days(1));
    let opens = schedule.raffle_at(today);
    let now = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);

    now >= opens && now.signed_duration_since(opens) < window
}

#[derive(Debug)]
pub enum TickOutcome {
    NotDue,
    Raffled(Draw),
    AlreadyRaffled,
    Failed(RaffleError),
}

pub struct Scheduler<S> {
    coordinator: Arc<RaffleCoordinator<S>>,
    schedule: Arc<ScheduleSource>,
    interval: Duration,
}

impl<S: LedgerStore + 'static> Scheduler<S> {
    pub fn new(
        coordinator: Arc<RaffleCoordinator<S>>,
        schedule: Arc<ScheduleSource>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            schedule,
            interval,
        }
    }

    pub async fn tick(&self, now: DateTime<Local>) -> TickOutcome {
        let schedule = self.schedule.reload().await;

        if !is_due(&schedule, now.naive_local(), self.interval) {
            return TickOutcome::NotDue;
        }

        match self.coordinator.raffle_today(now).await {
            Ok(draw) => TickOutcome::Raffled(draw),
            Err(RaffleError::AlreadyRaffledToday) => {
                debug!("Scheduled raffle skipped, today is already raffled");
                TickOutcome::AlreadyRaffled
            }
            Err(e) => {
                error!("Scheduled raffle for {} failed: {e}", now.date_naive());
                TickOutcome::Failed(e)
            }
        }
    }

    /// Ticks forever. Abort the task to stop it.
    pub async fn run(self) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Scheduler running, ticking every {:?}", self.interval);

        loop {
            interval.tick().await;
            self.tick(Local::now()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bank::ledger::MemoryLedgerStore;
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::{
        notifier::Notifier,
        raffle::{RaffleEngine, tests::catalog},
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(d: u32, hour: u32, minute: u32, second: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, d, hour, minute, second).unwrap()
    }

    fn schedule() -> ScheduleConfig {
        ScheduleConfig {
            dates: vec![day(1), day(8)],
            raffle_time: "20:00".parse().unwrap(),
            ..ScheduleConfig::default()
        }
    }

    fn scheduler(ids: &[&str]) -> Scheduler<MemoryLedgerStore> {
        let coordinator = RaffleCoordinator::new(
            RaffleEngine::new(catalog(ids), MemoryLedgerStore::new()),
            Notifier::new(),
        );

        Scheduler::new(
            Arc::new(coordinator),
            Arc::new(ScheduleSource::fixed(schedule())),
            MINUTE,
        )
    }

    #[test]
    fn test_due_on_the_minute() {
        let schedule = schedule();

        assert!(is_due(&schedule, at(1, 20, 0, 0).naive_local(), MINUTE));
        assert!(is_due(&schedule, at(1, 20, 0, 59).naive_local(), MINUTE));
        assert!(!is_due(&schedule, at(1, 19, 59, 59).naive_local(), MINUTE));
        assert!(!is_due(&schedule, at(1, 20, 1, 0).naive_local(), MINUTE));
        assert!(!is_due(&schedule, at(2, 20, 0, 0).naive_local(), MINUTE));
    }

    #[test]
    fn test_due_window_follows_long_ticks() {
        let schedule = schedule();
        let five_minutes = Duration::from_secs(300);

        assert!(is_due(&schedule, at(8, 20, 4, 30).naive_local(), five_minutes));
        assert!(!is_due(&schedule, at(8, 20, 5, 0).naive_local(), five_minutes));
    }

    #[tokio::test]
    async fn test_race_day_flow() {
        let scheduler = scheduler(&["spa", "monza", "imola"]);

        assert!(matches!(
            scheduler.tick(at(1, 19, 59, 0)).await,
            TickOutcome::NotDue
        ));

        let TickOutcome::Raffled(draw) = scheduler.tick(at(1, 20, 0, 0)).await else {
            panic!("expected a raffle at 20:00 on a race day");
        };
        assert_eq!(draw.record.round, 1);

        assert!(matches!(
            scheduler.tick(at(1, 20, 0, 30)).await,
            TickOutcome::AlreadyRaffled
        ));
        assert!(matches!(
            scheduler.tick(at(1, 20, 1, 0)).await,
            TickOutcome::NotDue
        ));
        assert!(matches!(
            scheduler.tick(at(2, 20, 0, 0)).await,
            TickOutcome::NotDue
        ));

        assert_eq!(scheduler.coordinator.ledger().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_ticks_draw_once() {
        let scheduler = scheduler(&["spa", "monza", "imola"]);

        let (first, second) = tokio::join!(
            scheduler.tick(at(1, 20, 0, 0)),
            scheduler.tick(at(1, 20, 0, 10))
        );

        let raffled = [first, second]
            .iter()
            .filter(|outcome| matches!(outcome, TickOutcome::Raffled(_)))
            .count();

        assert_eq!(raffled, 1);
        assert_eq!(scheduler.coordinator.ledger().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_pool_lapses_the_day() {
        let scheduler = scheduler(&["spa"]);

        assert!(matches!(
            scheduler.tick(at(1, 20, 0, 0)).await,
            TickOutcome::Raffled(_)
        ));
        assert!(matches!(
            scheduler.tick(at(8, 20, 0, 0)).await,
            TickOutcome::Failed(RaffleError::NoCircuitsAvailable)
        ));
        assert_eq!(scheduler.coordinator.ledger().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_keeps_last_good_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "dates": ["2026-03-01"], "raffleTime": "18:30" }"#).unwrap();

        let source = ScheduleSource::from_file(path.clone(), ScheduleConfig::default());
        let loaded = source.reload().await;
        assert_eq!(loaded.dates, vec![day(1)]);
        assert_eq!(loaded.raffle_time.to_string(), "18:30");

        fs::write(&path, r#"{ "raffleTime": "half past six" }"#).unwrap();
        assert_eq!(source.reload().await, loaded);
        assert_eq!(source.current().await, loaded);
    }
}
