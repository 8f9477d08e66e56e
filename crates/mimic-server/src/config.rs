use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use mimic_replay::SelectionPolicy;

pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub webhook_url: String,
    pub throttle: Duration,
    pub selection_policy: SelectionPolicy,
}

impl Config {
    /// All configuration comes from MIMIC_* environment variables, with
    /// development defaults for everything.
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("MIMIC_DB_PATH")
            .unwrap_or_else(|_| "mimic.db".into())
            .into();
        let host = std::env::var("MIMIC_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("MIMIC_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("MIMIC_PORT must be a port number")?;
        let webhook_url = std::env::var("MIMIC_WEBHOOK_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8081/send".into());
        let throttle_ms: u64 = std::env::var("MIMIC_REPLAY_DELAY_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .context("MIMIC_REPLAY_DELAY_MS must be milliseconds")?;
        let selection_policy = std::env::var("MIMIC_SELECTION_POLICY")
            .unwrap_or_else(|_| "most_recent".into())
            .parse()?;

        Ok(Self {
            db_path,
            host,
            port,
            webhook_url,
            throttle: Duration::from_millis(throttle_ms),
            selection_policy,
        })
    }
}
