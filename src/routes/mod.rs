// Routes module - organizes all HTTP endpoints
// Bet endpoints live in `handlers`; settings and reports get their own
// sub-modules.

pub mod reports;
pub mod settings;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::handlers::*;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== BET ENDPOINTS =====
        .route("/bets", get(list_bets).post(create_bet))
        .route("/bets/:id", get(get_bet).put(update_bet).delete(delete_bet))
        .route("/bets/:id/result", post(update_result))

        // ===== SETTINGS =====
        .route("/settings", get(settings::get_settings))
        .route("/settings/stake", put(settings::save_stake))
        .route("/settings/houses", put(settings::save_houses).post(settings::add_house))

        // ===== CONVERTER =====
        .route("/convert", get(convert))

        // ===== REPORTS =====
        .route("/reports/daily", get(reports::daily))
        .route("/reports/monthly", get(reports::monthly))
        .route("/reports/summary", get(reports::summary))
        .route("/reports/balance", get(reports::balance))
        .route("/reports/recent", get(reports::recent))
        .route("/reports/houses", get(reports::houses))

        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))

        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
