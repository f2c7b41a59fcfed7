// Data models for the bet ledger

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::stake::NumericInput;

// ===== BET RESULT =====

/// Outcome of a bet. Every bet starts as `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    #[default]
    Pending,
    Green,
    Red,
    Refund,
    Cashout,
}

impl BetResult {
    pub const ALL: [BetResult; 5] = [
        BetResult::Pending,
        BetResult::Green,
        BetResult::Red,
        BetResult::Refund,
        BetResult::Cashout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Green => "green",
            BetResult::Red => "red",
            BetResult::Refund => "refund",
            BetResult::Cashout => "cashout",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, BetResult::Pending)
    }

    /// Settled bets are the ones that count towards staked volume and ROI.
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bet result: {0}")]
pub struct UnknownResult(pub String);

impl FromStr for BetResult {
    type Err = UnknownResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        BetResult::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| UnknownResult(s.to_string()))
    }
}

// ===== BET =====

/// A single wagering event as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: Uuid,
    pub owner_id: String,
    pub house: String,
    pub title: String,
    /// Empty when the bet has no market.
    #[serde(default)]
    pub market: String,
    pub event_at: DateTime<Utc>,
    pub odd: Decimal,
    /// Stake in risk units, 3 decimal places.
    pub units: Decimal,
    /// `units * stake_value` at the time the bet was last written, 2 decimal places.
    pub entry_amount: Decimal,
    pub result: BetResult,
    /// Only present while `result == Cashout`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cashout_return_gross: Option<Decimal>,
    pub profit_loss: Decimal,
    /// Creation sequence, used as the last ordering key.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bet {
    /// Calendar day of the event in the display time zone.
    pub fn local_date(&self, tz: &FixedOffset) -> NaiveDate {
        self.event_at.with_timezone(tz).date_naive()
    }
}

// ===== USER SETTINGS =====

/// Per-user ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    /// Currency value of one unit. `None` until the user configures it.
    #[serde(default)]
    pub stake_value: Option<Decimal>,
    #[serde(default)]
    pub betting_houses: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            stake_value: None,
            betting_houses: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

// ===== REQUEST TYPES =====

/// POST /bets/:id/result
#[derive(Debug, Deserialize)]
pub struct ResultUpdateRequest {
    pub result: String,
    #[serde(default)]
    pub cashout_return_gross: Option<NumericInput>,
    #[serde(default)]
    pub confirm: bool,
}

/// DELETE /bets/:id
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// PUT /settings/stake
#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub stake_value: NumericInput,
}

/// PUT /settings/houses
#[derive(Debug, Deserialize)]
pub struct HousesRequest {
    pub houses: Vec<String>,
}

/// POST /settings/houses
#[derive(Debug, Deserialize)]
pub struct AddHouseRequest {
    pub house: String,
}

/// GET /convert
#[derive(Debug, Default, Deserialize)]
pub struct ConvertParams {
    pub units: Option<String>,
    pub amount: Option<String>,
}
