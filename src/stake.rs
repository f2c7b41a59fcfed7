// ============================================================================
// Stake / Unit Converter
// ============================================================================
//
// A bet's size is recorded in risk units. The currency amount is always a
// view derived from `units` and the user's reference stake (the currency
// value of one unit):
//
//   entry_amount = round(units * stake_value, 2)
//   units        = round(entry_amount / stake_value, 3)
//
// Whichever field the user edited last wins and the other is recomputed.
// Without a positive stake no amount can be derived and the converter falls
// back to a neutral value instead of dividing by zero.
//
// ============================================================================

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::str::FromStr;

/// Decimal places kept for units.
pub const UNITS_DP: u32 = 3;

/// Largest accepted odd.
pub const MAX_ODD: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Largest accepted units on a single bet.
pub const MAX_UNITS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Largest accepted reference stake.
pub const MAX_STAKE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Decimal places kept for currency amounts.
pub const AMOUNT_DP: u32 = 2;

fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_units(units: Decimal) -> Decimal {
    round_half_up(units, UNITS_DP)
}

pub fn round_amount(amount: Decimal) -> Decimal {
    round_half_up(amount, AMOUNT_DP)
}

fn usable_stake(stake: Option<Decimal>) -> Option<Decimal> {
    stake.filter(|s| *s > Decimal::ZERO)
}

/// `units -> entry_amount`. Yields zero when no positive stake is configured.
pub fn amount_from_units(units: Decimal, stake: Option<Decimal>) -> Decimal {
    usable_stake(stake)
        .and_then(|s| units.checked_mul(s))
        .map(round_amount)
        .unwrap_or(Decimal::ZERO)
}

/// `entry_amount -> units`. `None` means the amount cannot be converted and
/// the caller keeps its current units.
pub fn units_from_amount(amount: Decimal, stake: Option<Decimal>) -> Option<Decimal> {
    usable_stake(stake)
        .and_then(|s| amount.checked_div(s))
        .map(round_units)
}

/// The units/amount pair of a bet being edited.
///
/// Only `units` is stored; `entry_amount` is recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeBinding {
    units: Decimal,
    stake: Option<Decimal>,
}

impl StakeBinding {
    pub fn new(units: Decimal, stake: Option<Decimal>) -> Self {
        Self { units: round_units(units), stake }
    }

    pub fn units(&self) -> Decimal {
        self.units
    }

    pub fn stake(&self) -> Option<Decimal> {
        self.stake
    }

    pub fn entry_amount(&self) -> Decimal {
        amount_from_units(self.units, self.stake)
    }

    pub fn set_units(&mut self, units: Decimal) {
        self.units = round_units(units);
    }

    /// Back-derives units from an edited amount. Returns false and leaves
    /// units untouched when there is no stake to divide by.
    pub fn set_amount(&mut self, amount: Decimal) -> bool {
        match units_from_amount(amount, self.stake) {
            Some(units) => {
                self.units = units;
                true
            }
            None => false,
        }
    }

    pub fn set_stake(&mut self, stake: Option<Decimal>) {
        self.stake = stake;
    }
}

// ===== INPUT PARSING =====

/// Parses masked numeric input: every non-digit is dropped and the result is
/// read as an integer count of `10^-decimals`. "R$ 1.234,56" with two
/// decimals is 1234.56. Empty input is no value.
pub fn parse_masked(text: &str, decimals: u32) -> Option<Decimal> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let raw = digits.parse::<i128>().ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals).ok()
}

/// Parses free-form decimal input in either `1234.56` or `1.234,56` style,
/// ignoring currency symbols and spaces.
pub fn parse_decimal_input(text: &str) -> Option<Decimal> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_comma = kept.rfind(',');
    let last_dot = kept.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (Some(_), None) => {
            if kept.matches(',').count() > 1 {
                kept.replace(',', "")
            } else {
                kept.replace(',', ".")
            }
        }
        (None, Some(_)) if kept.matches('.').count() > 1 => kept.replace('.', ""),
        _ => kept,
    };

    Decimal::from_str(&normalized).ok()
}

/// A numeric field as received over the wire: either a JSON number or text
/// typed into a masked input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl NumericInput {
    /// Unparseable input is treated as no value, never as an error.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            NumericInput::Number(n) => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .ok()
            }
            NumericInput::Text(t) => parse_decimal_input(t),
        }
    }
}

impl From<Decimal> for NumericInput {
    fn from(value: Decimal) -> Self {
        NumericInput::Text(value.to_string())
    }
}
