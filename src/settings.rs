// Per-user ledger settings: reference stake and preferred betting houses.
//
// Consumers never reach for ambient state: they ask the `SettingsStore` for
// the current `UserSettings` and pass that value along explicitly.

use chrono::Utc;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::StoreError;
use crate::models::UserSettings;
use crate::stake::round_amount;

pub const SETTINGS_TREE: &str = "settings";

/// Trims and collapses inner whitespace.
pub fn normalize_house_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case- and accent-insensitive comparison key.
pub fn collation_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn collate(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b)).then_with(|| a.cmp(b))
}

/// Normalized, deduplicated, sorted house list. The first spelling seen
/// for a name is the one kept.
pub fn normalize_houses<I, S>(houses: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out: Vec<String> = houses
        .into_iter()
        .map(|h| normalize_house_name(h.as_ref()))
        .filter(|h| !h.is_empty())
        .filter(|h| seen.insert(collation_key(h)))
        .collect();
    out.sort_by(|a, b| collate(a, b));
    out
}

/// Read/update contract for `UserSettings`, backed by a sled tree keyed by
/// user id.
#[derive(Clone)]
pub struct SettingsStore {
    tree: sled::Tree,
}

impl SettingsStore {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self { tree: db.open_tree(SETTINGS_TREE)? })
    }

    /// Settings of `user_id`; a user who never saved anything gets empty
    /// settings with no stake.
    pub fn current(&self, user_id: &str) -> Result<UserSettings, StoreError> {
        match self.tree.get(user_id.as_bytes())? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(UserSettings::empty(user_id)),
        }
    }

    /// Applies `change` to the latest stored settings of `user_id`. sled
    /// retries the closure if another writer got there first, so concurrent
    /// updates never overwrite each other.
    fn modify<F>(&self, user_id: &str, mut change: F) -> Result<UserSettings, StoreError>
    where
        F: FnMut(&mut UserSettings),
    {
        let mut failure: Option<StoreError> = None;
        let stored = self.tree.update_and_fetch(user_id.as_bytes(), |old| {
            failure = None;
            let decoded = match old {
                Some(raw) => serde_json::from_slice::<UserSettings>(raw),
                None => Ok(UserSettings::empty(user_id)),
            };
            let encoded = decoded.and_then(|mut settings| {
                change(&mut settings);
                settings.updated_at = Utc::now();
                serde_json::to_vec(&settings)
            });
            match encoded {
                Ok(raw) => Some(raw),
                Err(e) => {
                    failure = Some(e.into());
                    old.map(<[u8]>::to_vec)
                }
            }
        })?;

        if let Some(e) = failure {
            return Err(e);
        }
        match stored {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(UserSettings::empty(user_id)),
        }
    }

    /// Upserts the reference stake. Callers reject non-positive values first.
    pub fn save_stake(&self, user_id: &str, stake: Decimal) -> Result<UserSettings, StoreError> {
        let stake = round_amount(stake);
        let saved = self.modify(user_id, |settings| settings.stake_value = Some(stake))?;
        tracing::info!(user_id, stake = %stake, "stake saved");
        Ok(saved)
    }

    /// Replaces the whole house list.
    pub fn save_houses<S: AsRef<str>>(&self, user_id: &str, houses: &[S]) -> Result<UserSettings, StoreError> {
        let houses = normalize_houses(houses);
        let saved = self.modify(user_id, |settings| settings.betting_houses = houses.clone())?;
        tracing::info!(user_id, houses = saved.betting_houses.len(), "betting houses saved");
        Ok(saved)
    }

    /// Adds one house if no equivalent spelling is already listed.
    pub fn remember_house(&self, user_id: &str, house: &str) -> Result<UserSettings, StoreError> {
        let key = collation_key(&normalize_house_name(house));
        let listed = |settings: &UserSettings| settings.betting_houses.iter().any(|h| collation_key(h) == key);

        let settings = self.current(user_id)?;
        if key.is_empty() || listed(&settings) {
            return Ok(settings);
        }

        self.modify(user_id, |settings| {
            if !listed(settings) {
                let mut houses = std::mem::take(&mut settings.betting_houses);
                houses.push(house.to_string());
                settings.betting_houses = normalize_houses(houses);
            }
        })
    }
}
