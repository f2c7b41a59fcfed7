// Application state management

use chrono::{FixedOffset, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ConfigError, StoreError};
use crate::ledger::LedgerStore;
use crate::models::Bet;
use crate::query::{BetQuery, Page};
use crate::settings::SettingsStore;

pub type SharedState = Arc<AppState>;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sled::Error> for StartupError {
    fn from(err: sled::Error) -> Self {
        StartupError::Store(err.into())
    }
}

pub struct AppState {
    pub config: Config,
    pub store: LedgerStore,
    pub settings: SettingsStore,
    /// Display time zone for day boundaries.
    pub tz: FixedOffset,
    // ===== IN-FLIGHT ACTIONS =====
    /// Bets with a mutation currently running.
    in_flight: Mutex<HashSet<Uuid>>,
}

impl AppState {
    /// Opens (or creates) the sled database under `config.data_dir`.
    pub fn open(config: Config) -> Result<Self, StartupError> {
        let db = sled::open(&config.data_dir)?;
        Self::from_db(config, db)
    }

    pub fn from_db(config: Config, db: sled::Db) -> Result<Self, StartupError> {
        let tz = config.display_tz()?;
        let store = LedgerStore::open(&db)?;
        let settings = SettingsStore::open(&db)?;
        tracing::info!(
            data_dir = %config.data_dir.display(),
            utc_offset_minutes = config.utc_offset_minutes,
            "ledger state ready"
        );
        Ok(Self {
            config,
            store,
            settings,
            tz,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Today in the display time zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Claims `bet_id` for one mutation. A second claim while the first
    /// guard is alive fails with `Busy`.
    pub fn begin_action(&self, bet_id: Uuid) -> Result<ActionGuard<'_>, ApiError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(bet_id) {
            tracing::warn!(%bet_id, "rejected concurrent action");
            return Err(ApiError::Busy(bet_id));
        }
        Ok(ActionGuard { state: self, bet_id })
    }

    /// Every bet of `owner`, scanned on the blocking pool.
    pub async fn owner_bets(&self, owner: &str) -> Result<Vec<Bet>, StoreError> {
        let store = self.store.clone();
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || store.owner_bets(&owner)).await?
    }

    /// One page of `owner`'s bets, scanned on the blocking pool.
    pub async fn list_bets(&self, owner: &str, query: BetQuery) -> Result<Page<Bet>, StoreError> {
        let store = self.store.clone();
        let owner = owner.to_string();
        let tz = self.tz;
        tokio::task::spawn_blocking(move || store.list_bets(&owner, &query, &tz)).await?
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        self.store.flush()
    }
}

/// Releases the bet on drop, whether the action succeeded or not.
pub struct ActionGuard<'a> {
    state: &'a AppState,
    bet_id: Uuid,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.state.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.bet_id);
    }
}
