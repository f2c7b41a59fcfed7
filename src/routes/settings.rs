// Settings routes: reference stake and betting houses

use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::auth::OwnerId;
use crate::error::ApiError;
use crate::models::{AddHouseRequest, HousesRequest, StakeRequest};
use crate::stake::MAX_STAKE;
use crate::validation::ValidationErrors;

// ===== ROUTE HANDLERS =====

/// GET /settings
pub async fn get_settings(
    State(state): State<SharedState>,
    owner: OwnerId,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.current(owner.as_str())?;
    Ok(Json(json!({ "success": true, "settings": settings })))
}

/// PUT /settings/stake
pub async fn save_stake(
    State(state): State<SharedState>,
    owner: OwnerId,
    Json(payload): Json<StakeRequest>,
) -> Result<Json<Value>, ApiError> {
    let stake = match payload.stake_value.to_decimal() {
        Some(v) if v > MAX_STAKE => {
            return Err(ValidationErrors::single("stake_value", format!("stake must be <= {}", MAX_STAKE)).into())
        }
        Some(v) if v > Decimal::ZERO => v,
        Some(_) => return Err(ValidationErrors::single("stake_value", "stake must be > 0").into()),
        None => return Err(ValidationErrors::single("stake_value", "stake must be a number").into()),
    };

    let settings = state.settings.save_stake(owner.as_str(), stake)?;
    Ok(Json(json!({ "success": true, "settings": settings })))
}

/// PUT /settings/houses
/// Replaces the list; names are trimmed, deduplicated and sorted.
pub async fn save_houses(
    State(state): State<SharedState>,
    owner: OwnerId,
    Json(payload): Json<HousesRequest>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.save_houses(owner.as_str(), &payload.houses)?;
    Ok(Json(json!({ "success": true, "settings": settings })))
}

/// POST /settings/houses
pub async fn add_house(
    State(state): State<SharedState>,
    owner: OwnerId,
    Json(payload): Json<AddHouseRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.house.trim().is_empty() {
        return Err(ValidationErrors::single("house", "house is required").into());
    }
    let settings = state.settings.remember_house(owner.as_str(), &payload.house)?;
    Ok(Json(json!({ "success": true, "settings": settings })))
}
