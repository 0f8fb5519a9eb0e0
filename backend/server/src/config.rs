use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use tracing::info;

pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub tick: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tick_secs: u64 = try_load(&var, "TICK_SECS", "60")?;

        Ok(Self {
            port: try_load(&var, "RUST_PORT", "3000")?,
            data_dir: try_load(&var, "DATA_DIR", "data")?,
            tick: Duration::from_secs(tick_secs.max(1)),
        })
    }
}

fn try_load<T, F>(var: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value '{value}'"))
}
