// Bet record validation
//
// Rejects structurally invalid submissions before they reach the store.
// Every offending field gets one message and nothing is submitted partially.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::BetResult;
use crate::stake::{round_units, NumericInput, MAX_ODD, MAX_UNITS};

/// A bet as submitted by the client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BetDraft {
    #[serde(default)]
    pub house: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub market: Option<String>,
    /// RFC 3339 instant or a `YYYY-MM-DD` day in the display time zone.
    #[serde(default)]
    pub event_at: Option<String>,
    #[serde(default)]
    pub odd: Option<NumericInput>,
    #[serde(default)]
    pub units: Option<NumericInput>,
    #[serde(default)]
    pub result: Option<String>,
}

/// A bet that passed validation. Strings are trimmed and units rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBet {
    pub house: String,
    pub title: String,
    pub market: String,
    pub event_at: DateTime<Utc>,
    pub odd: Decimal,
    pub units: Decimal,
    /// `None` when the draft left it out: pending on create, unchanged on edit.
    pub result: Option<BetResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("invalid submission: {} field(s) rejected", .fields.len())]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError { field, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.message.as_str())
    }
}

/// Parses an event date. A bare day (or a local date-time without offset)
/// is read in the display time zone.
pub fn parse_event_at(text: &str, tz: &FixedOffset) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }

    let local = match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(day) => day.and_hms_opt(0, 0, 0)?,
        Err(_) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").ok()?,
    };

    tz.from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn required_text(value: &str, field: &'static str, label: &str, errors: &mut ValidationErrors) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, format!("{} is required", label));
    }
    trimmed.to_string()
}

impl BetDraft {
    pub fn validate(&self, tz: &FixedOffset) -> Result<ValidBet, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let house = required_text(&self.house, "house", "house", &mut errors);
        let title = required_text(&self.title, "title", "event title", &mut errors);
        let market = self
            .market
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let event_at = match self.event_at.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("event_at", "event date is required");
                None
            }
            Some(text) => {
                let parsed = parse_event_at(text, tz);
                if parsed.is_none() {
                    errors.push("event_at", "event date must be a valid date");
                }
                parsed
            }
        };

        let odd = match self.odd.as_ref().and_then(NumericInput::to_decimal) {
            None => {
                errors.push("odd", "odd must be a number");
                None
            }
            Some(odd) if odd < Decimal::ONE => {
                errors.push("odd", "odd must be >= 1");
                None
            }
            Some(odd) if odd > MAX_ODD => {
                errors.push("odd", format!("odd must be <= {}", MAX_ODD));
                None
            }
            Some(odd) => Some(odd),
        };

        let units = match self.units.as_ref().and_then(NumericInput::to_decimal) {
            None => {
                errors.push("units", "units must be a number");
                None
            }
            Some(units) => {
                let rounded = round_units(units);
                if rounded <= Decimal::ZERO {
                    errors.push("units", "units must be > 0");
                    None
                } else if rounded > MAX_UNITS {
                    errors.push("units", format!("units must be <= {}", MAX_UNITS));
                    None
                } else {
                    Some(rounded)
                }
            }
        };

        let result = match self.result.as_deref() {
            None => None,
            Some(text) => match text.parse::<BetResult>() {
                Ok(result) => Some(result),
                Err(_) => {
                    errors.push(
                        "result",
                        "result must be one of pending, green, red, refund, cashout",
                    );
                    None
                }
            },
        };

        match (event_at, odd, units) {
            (Some(event_at), Some(odd), Some(units)) if errors.is_empty() => {
                Ok(ValidBet { house, title, market, event_at, odd, units, result })
            }
            _ => Err(errors),
        }
    }
}
