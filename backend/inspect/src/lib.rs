//! # Inspect
//!
//! Offline view of a raffle data directory for operators.
//!
//! Read-only on purpose: the running server is the only writer of
//! `raffles.json`, so this tool never draws or edits anything.
//!
//! ```sh
//! inspect --data-dir data status
//! inspect --data-dir data check
//! ```
use std::{fmt::Write, path::Path};

use anyhow::{Context, Result, bail};
use bank::{
    DataPaths,
    catalog::Catalog,
    ledger::{JsonLedgerStore, LedgerStore},
    schedule::{RoundStatus, ScheduleConfig},
};
use chrono::{Local, NaiveDateTime};

pub fn status(data_dir: &Path) -> Result<String> {
    status_at(data_dir, Local::now().naive_local())
}

pub fn status_at(data_dir: &Path, now: NaiveDateTime) -> Result<String> {
    let paths = DataPaths::new(data_dir);

    let catalog = Catalog::load(&paths.circuits).context("Failed to load circuit catalog")?;
    let ledger = JsonLedgerStore::new(&paths.raffles)
        .read()
        .context("Failed to load raffle ledger")?;
    let schedule = ScheduleConfig::load(&paths.config).context("Failed to load schedule")?;

    let mut report = String::new();

    match &schedule.season {
        Some(season) => writeln!(report, "{} ({season})", schedule.championship_name)?,
        None => writeln!(report, "{}", schedule.championship_name)?,
    }
    writeln!(
        report,
        "Next round: {} of {}",
        ledger.next_round(),
        schedule.total_rounds
    )?;
    writeln!(
        report,
        "Circuits left: {} of {}",
        ledger.available(&catalog).len(),
        catalog.len()
    )?;
    match schedule.next_raffle_at(now) {
        Some(at) => writeln!(report, "Next raffle: {}", at.format("%Y-%m-%d %H:%M"))?,
        None => writeln!(report, "Next raffle: none scheduled")?,
    }

    writeln!(report, "\nCalendar")?;
    for (round, (date, status)) in schedule
        .round_statuses(&ledger, now.date())
        .into_iter()
        .enumerate()
    {
        let status = match status {
            RoundStatus::Drawn { circuit_name } => format!("drawn     {circuit_name}"),
            RoundStatus::Lapsed => "lapsed".to_string(),
            RoundStatus::Today => "today".to_string(),
            RoundStatus::Upcoming => "upcoming".to_string(),
        };

        writeln!(report, "  {date}  round {:<2} {status}", round + 1)?;
    }

    Ok(report)
}

/// Loads every data file and reports all problems at once.
pub fn check(data_dir: &Path) -> Result<String> {
    let paths = DataPaths::new(data_dir);
    let mut problems = Vec::new();
    let mut notes = Vec::new();

    let catalog = match Catalog::load(&paths.circuits) {
        Ok(catalog) => {
            notes.push(format!("{} circuits", catalog.len()));
            Some(catalog)
        }
        Err(e) => {
            problems.push(format!("catalog: {e}"));
            None
        }
    };

    let schedule = match ScheduleConfig::load(&paths.config) {
        Ok(schedule) => {
            notes.push(format!(
                "{} race days at {}",
                schedule.dates.len(),
                schedule.raffle_time
            ));
            Some(schedule)
        }
        Err(e) => {
            problems.push(format!("schedule: {e}"));
            None
        }
    };

    match JsonLedgerStore::new(&paths.raffles).read() {
        Ok(ledger) => {
            notes.push(format!("{} raffles", ledger.len()));

            if let Some(catalog) = &catalog {
                for id in ledger.unknown_circuits(catalog) {
                    problems.push(format!("ledger: circuit '{id}' is not in the catalog"));
                }
            }
        }
        Err(e) => problems.push(format!("ledger: {e}")),
    }

    if let (Some(catalog), Some(schedule)) = (&catalog, &schedule) {
        if schedule.dates.len() > catalog.len() {
            problems.push(format!(
                "schedule: {} race days but only {} circuits",
                schedule.dates.len(),
                catalog.len()
            ));
        }
    }

    if !problems.is_empty() {
        bail!(
            "{} problem(s) found:\n  {}",
            problems.len(),
            problems.join("\n  ")
        );
    }

    Ok(format!("OK: {}\n", notes.join(", ")))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use bank::{catalog::Circuit, ledger::RaffleRecord};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;

    const CIRCUITS: &str = r#"{ "circuits": [
        { "id": "spa", "name": "Spa-Francorchamps", "country": "Belgium",
          "length": "7.004 km", "turns": 19 },
        { "id": "monza", "name": "Monza", "country": "Italy",
          "length": "5.793 km", "turns": 11 },
        { "id": "imola", "name": "Imola", "country": "Italy",
          "length": "4.909 km", "turns": 19 }
    ] }"#;

    fn data_dir(config: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());

        fs::write(&paths.circuits, CIRCUITS).unwrap();
        fs::write(&paths.config, config).unwrap();

        dir
    }

    fn draw(dir: &TempDir, round: u32, id: &str, name: &str) {
        let circuit = Circuit {
            id: id.to_string(),
            name: name.to_string(),
            country: "Belgium".to_string(),
            length: "7.004 km".to_string(),
            turns: 19,
            description: None,
        };
        let drawn_at = Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap();

        JsonLedgerStore::new(DataPaths::new(dir.path()).raffles)
            .append(&RaffleRecord::new(round, &circuit, drawn_at))
            .unwrap();
    }

    #[test]
    fn test_status() {
        let dir = data_dir(
            r#"{ "dates": ["2026-03-01", "2026-03-08", "2026-03-15"],
                 "championshipName": "Dark Race", "season": "Winter", "totalRounds": 3 }"#,
        );
        draw(&dir, 1, "spa", "Spa-Francorchamps");

        let now = NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let report = status_at(dir.path(), now).unwrap();

        assert!(report.starts_with("Dark Race (Winter)\n"));
        assert!(report.contains("Next round: 2 of 3"));
        assert!(report.contains("Circuits left: 2 of 3"));
        assert!(report.contains("Next raffle: 2026-03-15 20:00"));
        assert!(report.contains("2026-03-01  round 1  drawn     Spa-Francorchamps"));
        assert!(report.contains("2026-03-08  round 2  lapsed"));
        assert!(report.contains("2026-03-15  round 3  upcoming"));
    }

    #[test]
    fn test_check_ok() {
        let dir = data_dir(r#"{ "dates": ["2026-03-01", "2026-03-08"] }"#);

        assert_eq!(
            check(dir.path()).unwrap(),
            "OK: 3 circuits, 2 race days at 20:00, 0 raffles\n"
        );
    }

    #[test]
    fn test_check_reports_every_problem() {
        let dir = data_dir(
            r#"{ "dates": ["2026-03-01", "2026-03-08", "2026-03-15", "2026-03-22"] }"#,
        );
        draw(&dir, 1, "nordschleife", "Nordschleife");

        let error = check(dir.path()).unwrap_err().to_string();

        assert!(error.starts_with("2 problem(s) found"));
        assert!(error.contains("circuit 'nordschleife' is not in the catalog"));
        assert!(error.contains("4 race days but only 3 circuits"));
    }

    #[test]
    fn test_check_bad_raffle_time() {
        let dir = data_dir(r#"{ "raffleTime": "teatime" }"#);

        assert!(check(dir.path()).unwrap_err().to_string().contains("schedule:"));
    }
}
