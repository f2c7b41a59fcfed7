/// Bet Ledger
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod query;
pub mod routes;
pub mod settings;
pub mod stake;
pub mod summary;
pub mod transitions;
pub mod validation;

pub use app_state::{AppState, SharedState, StartupError};
pub use config::Config;
pub use error::{ApiError, ConfigError, StoreError};
pub use ledger::{profit_loss, LedgerStore};
pub use models::{Bet, BetResult, UserSettings};
pub use query::{BetQuery, Page, SearchScope};
pub use settings::SettingsStore;
pub use stake::{amount_from_units, units_from_amount, NumericInput, StakeBinding};
pub use transitions::{
    allowed_transitions, available_actions, plan_transition, ActionIntent, LedgerCommand,
    PendingConfirmation, TransitionError,
};
pub use validation::{BetDraft, ValidBet, ValidationErrors};

/// Builds the HTTP application around `state`.
pub fn app(state: SharedState) -> axum::Router {
    routes::router(state)
}
