//! Service configuration, read from the environment (a `.env` file is
//! loaded first by `main`).
//!
//! | Variable                     | Default        |
//! |------------------------------|----------------|
//! | `LEDGER_BIND_ADDR`           | `0.0.0.0:1234` |
//! | `LEDGER_DATA_DIR`            | `data/ledger`  |
//! | `LEDGER_UTC_OFFSET_MINUTES`  | `-180`         |
//! | `LEDGER_SUMMARY_WINDOW_DAYS` | `100`          |
//! | `LEDGER_BETS_PAGE_SIZE`      | `12`           |
//! | `LEDGER_LOG_LEVEL`           | `info`         |
//! | `LEDGER_LOG_JSON`            | `false`        |

use chrono::FixedOffset;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::query::BETS_PAGE_SIZE;
use crate::summary::DEFAULT_WINDOW_DAYS;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// Display time zone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    pub summary_window_days: u32,
    pub bets_page_size: usize,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1234)),
            data_dir: PathBuf::from("data/ledger"),
            utc_offset_minutes: -180,
            summary_window_days: DEFAULT_WINDOW_DAYS,
            bets_page_size: BETS_PAGE_SIZE,
            log_level: "info".into(),
            log_json: false,
        }
    }
}

fn parsed<T: FromStr>(key: &'static str, fallback: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        _ => Ok(fallback),
    }
}

fn flag(key: &'static str, fallback: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(fallback),
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
        Err(_) => Ok(fallback),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Config::default();
        let config = Self {
            bind_addr: parsed("LEDGER_BIND_ADDR", d.bind_addr)?,
            data_dir: env::var("LEDGER_DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            utc_offset_minutes: parsed("LEDGER_UTC_OFFSET_MINUTES", d.utc_offset_minutes)?,
            summary_window_days: parsed("LEDGER_SUMMARY_WINDOW_DAYS", d.summary_window_days)?,
            bets_page_size: parsed("LEDGER_BETS_PAGE_SIZE", d.bets_page_size)?,
            log_level: env::var("LEDGER_LOG_LEVEL").unwrap_or(d.log_level),
            log_json: flag("LEDGER_LOG_JSON", d.log_json)?,
        };

        if config.bets_page_size == 0 {
            return Err(ConfigError::Invalid { key: "LEDGER_BETS_PAGE_SIZE", value: "0".into() });
        }
        if config.summary_window_days == 0 {
            return Err(ConfigError::Invalid { key: "LEDGER_SUMMARY_WINDOW_DAYS", value: "0".into() });
        }
        config.display_tz()?;
        Ok(config)
    }

    pub fn display_tz(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::OffsetOutOfRange(self.utc_offset_minutes))
    }
}
