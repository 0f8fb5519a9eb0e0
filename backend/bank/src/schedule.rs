//! # Championship Schedule
//!
//! Race days and the time of day the raffle opens on each of them, plus the
//! display metadata the viewers render. Lives in `config.json`:
//!
//! ```json
//! { "dates": ["2026-03-01", "2026-03-08"], "raffleTime": "20:00",
//!   "championshipName": "RSR Championship", "season": "2026", "totalRounds": 10 }
//! ```
//!
//! Dates keep the order they were written in. All times are wall-clock times
//! of the server's local time zone.
use std::{collections::HashSet, fmt, fs, io::ErrorKind, path::Path, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::StoreError, ledger::Ledger};

const DEFAULT_RAFFLE_TIME: &str = "20:00";
const DEFAULT_CHAMPIONSHIP_NAME: &str = "RSR Championship";
const DEFAULT_TOTAL_ROUNDS: u32 = 10;

/// Hour and minute, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RaffleTime(NaiveTime);

impl RaffleTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for RaffleTime {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|e| StoreError::Corrupt(format!("invalid raffle time '{s}': {e}")))
    }
}

impl TryFrom<String> for RaffleTime {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RaffleTime> for String {
    fn from(value: RaffleTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RaffleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default = "default_raffle_time")]
    pub raffle_time: RaffleTime,
    #[serde(default = "default_championship_name")]
    pub championship_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
}

fn default_raffle_time() -> RaffleTime {
    RaffleTime::new(20, 0).expect("20:00 is a valid time")
}

fn default_championship_name() -> String {
    DEFAULT_CHAMPIONSHIP_NAME.to_string()
}

fn default_total_rounds() -> u32 {
    DEFAULT_TOTAL_ROUNDS
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            dates: Vec::new(),
            raffle_time: default_raffle_time(),
            championship_name: default_championship_name(),
            season: None,
            total_rounds: default_total_rounds(),
        }
    }
}

/// Where a configured race day stands, as shown on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStatus {
    Drawn { circuit_name: String },
    /// Day went by without a draw for its round.
    Lapsed,
    Today,
    Upcoming,
}

impl ScheduleConfig {
    /// Loads `config.json`. A missing file gives the default schedule.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "{} not found, using default schedule ({DEFAULT_RAFFLE_TIME}, no dates)",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let mut config: ScheduleConfig =
            serde_json::from_str(&data).map_err(|e| StoreError::json(path, e))?;
        config.dedup_dates();

        Ok(config)
    }

    /// Drops repeated race days, keeping the first occurrence.
    pub fn dedup_dates(&mut self) {
        let mut seen = HashSet::new();

        self.dates.retain(|date| {
            let first = seen.insert(*date);
            if !first {
                warn!("Duplicate race day {date} in schedule, ignoring");
            }
            first
        });
    }

    pub fn is_race_day(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn raffle_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.raffle_time.time())
    }

    /// First configured raffle strictly after `now`, in configured order.
    pub fn next_raffle_at(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.dates
            .iter()
            .map(|date| self.raffle_at(*date))
            .find(|raffle_at| *raffle_at > now)
    }

    /// Race day whose window (raffle time until midnight) contains `now`.
    pub fn current_window(&self, now: NaiveDateTime) -> Option<NaiveDate> {
        let today = now.date();

        (self.is_race_day(today) && now.time() >= self.raffle_time.time()).then_some(today)
    }

    /// Calendar view: one status per configured date, round `i + 1` for the `i`th date.
    pub fn round_statuses(
        &self,
        ledger: &Ledger,
        today: NaiveDate,
    ) -> Vec<(NaiveDate, RoundStatus)> {
        self.dates
            .iter()
            .enumerate()
            .map(|(index, date)| {
                let status = match ledger.round(index as u32 + 1) {
                    Some(record) => RoundStatus::Drawn {
                        circuit_name: record.circuit_name.clone(),
                    },
                    None if *date < today => RoundStatus::Lapsed,
                    None if *date == today => RoundStatus::Today,
                    None => RoundStatus::Upcoming,
                };

                (*date, status)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{catalog::circuit, ledger::RaffleRecord};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn at(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
        day(d).and_hms_opt(hour, minute, 0).unwrap()
    }

    fn schedule() -> ScheduleConfig {
        ScheduleConfig {
            dates: vec![day(1), day(8), day(15)],
            ..ScheduleConfig::default()
        }
    }

    #[test]
    fn test_raffle_time_parsing() {
        assert_eq!("20:00".parse::<RaffleTime>().unwrap(), RaffleTime::new(20, 0).unwrap());
        assert_eq!("07:05".parse::<RaffleTime>().unwrap().to_string(), "07:05");
        assert!("25:00".parse::<RaffleTime>().is_err());
        assert!("8pm".parse::<RaffleTime>().is_err());
    }

    #[test]
    fn test_parse_config() {
        let config: ScheduleConfig = serde_json::from_str(
            r#"{ "dates": ["2026-03-01", "2026-03-08"], "raffleTime": "21:30",
                 "championshipName": "Dark Race", "season": "Winter", "totalRounds": 8 }"#,
        )
        .unwrap();

        assert_eq!(config.dates, vec![day(1), day(8)]);
        assert_eq!(config.raffle_time, RaffleTime::new(21, 30).unwrap());
        assert_eq!(config.championship_name, "Dark Race");
        assert_eq!(config.season.as_deref(), Some("Winter"));
        assert_eq!(config.total_rounds, 8);
    }

    #[test]
    fn test_defaults() {
        let config: ScheduleConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config, ScheduleConfig::default());
        assert_eq!(config.raffle_time.to_string(), "20:00");
        assert_eq!(config.total_rounds, 10);
    }

    #[test]
    fn test_load_missing_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(ScheduleConfig::load(&path).unwrap(), ScheduleConfig::default());

        fs::write(
            &path,
            r#"{ "dates": ["2026-03-08", "2026-03-01", "2026-03-08"] }"#,
        )
        .unwrap();

        assert_eq!(ScheduleConfig::load(&path).unwrap().dates, vec![day(8), day(1)]);
    }

    #[test]
    fn test_load_bad_raffle_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "raffleTime": "noon" }"#).unwrap();

        assert!(matches!(ScheduleConfig::load(&path), Err(StoreError::Json { .. })));
    }

    #[test]
    fn test_next_raffle_at() {
        let schedule = schedule();

        assert_eq!(schedule.next_raffle_at(at(1, 12, 0)), Some(at(1, 20, 0)));
        assert_eq!(schedule.next_raffle_at(at(1, 20, 0)), Some(at(8, 20, 0)));
        assert_eq!(schedule.next_raffle_at(at(15, 20, 1)), None);
    }

    #[test]
    fn test_current_window() {
        let schedule = schedule();

        assert_eq!(schedule.current_window(at(8, 19, 59)), None);
        assert_eq!(schedule.current_window(at(8, 20, 0)), Some(day(8)));
        assert_eq!(schedule.current_window(at(8, 23, 59)), Some(day(8)));
        assert_eq!(schedule.current_window(at(9, 20, 0)), None);
    }

    #[test]
    fn test_round_statuses() {
        let schedule = schedule();
        let drawn_at = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let ledger =
            Ledger::from_records(vec![RaffleRecord::new(1, &circuit("spa"), drawn_at)]).unwrap();

        let statuses = schedule.round_statuses(&ledger, day(8));

        assert_eq!(
            statuses,
            vec![
                (
                    day(1),
                    RoundStatus::Drawn {
                        circuit_name: "Circuit spa".to_string()
                    }
                ),
                (day(8), RoundStatus::Today),
                (day(15), RoundStatus::Upcoming),
            ]
        );

        let later = schedule.round_statuses(&Ledger::default(), day(9));
        assert_eq!(later[0].1, RoundStatus::Lapsed);
        assert_eq!(later[1].1, RoundStatus::Lapsed);
    }
}
