// HTTP request handlers for the bet ledger API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app_state::SharedState;
use crate::auth::OwnerId;
use crate::error::ApiError;
use crate::models::*;
use crate::query::{BetQuery, ListParams, SearchScope};
use crate::stake::{amount_from_units, parse_decimal_input, round_units, units_from_amount};
use crate::transitions::{
    available_actions, plan_transition, ActionIntent, PendingConfirmation, TransitionError,
};
use crate::validation::{BetDraft, ValidationErrors};

// ===== LISTING =====

/// GET /bets?page=&result=&title=&date=
pub async fn list_bets(
    State(state): State<SharedState>,
    owner: OwnerId,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let query = BetQuery::from_params(&params, state.config.bets_page_size, SearchScope::TitleAndMarket)?;
    let page = state.list_bets(owner.as_str(), query.clone()).await?;

    Ok(Json(json!({
        "success": true,
        "bets": page.items,
        "total": page.total,
        "page": page.page_index,
        "page_size": page.page_size,
        "page_count": page.page_count(),
        "query": query.to_query_string(),
    })))
}

/// GET /bets/:id
pub async fn get_bet(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(bet_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let bet = state.store.get_bet(owner.as_str(), bet_id)?;
    let actions = available_actions(bet.result);

    Ok(Json(json!({
        "success": true,
        "bet": bet,
        "actions": actions,
    })))
}

// ===== CREATE / EDIT =====

/// POST /bets
pub async fn create_bet(
    State(state): State<SharedState>,
    owner: OwnerId,
    Json(draft): Json<BetDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let valid = draft.validate(&state.tz)?;
    // A bet recorded as already settled goes through the same table as a
    // later result change; cashout needs its own confirmation step.
    let result = valid.result.unwrap_or_default();
    if !result.is_pending() {
        plan_transition(Uuid::nil(), BetResult::Pending, result, None)?;
    }

    let settings = state.settings.current(owner.as_str())?;
    let bet = state.store.insert_bet(owner.as_str(), valid, &settings)?;
    remember_house(&state, &owner, &bet.house);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "bet": bet,
            "stake_configured": settings.stake_value.is_some(),
        })),
    ))
}

/// PUT /bets/:id
/// Edits everything but the result. A `result` equal to the current one is
/// accepted; any other value is refused.
pub async fn update_bet(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(bet_id): Path<Uuid>,
    Json(draft): Json<BetDraft>,
) -> Result<Json<Value>, ApiError> {
    let valid = draft.validate(&state.tz)?;
    let _guard = state.begin_action(bet_id)?;

    let current = state.store.get_bet(owner.as_str(), bet_id)?;
    match valid.result {
        Some(to) if to != current.result => {
            return Err(TransitionError::ChangedByEdit { from: current.result, to }.into());
        }
        _ => {}
    }

    let settings = state.settings.current(owner.as_str())?;
    let bet = state.store.update_bet(owner.as_str(), bet_id, valid, &settings)?;
    remember_house(&state, &owner, &bet.house);

    Ok(Json(json!({ "success": true, "bet": bet })))
}

/// Adds the bet's house to the owner's list. The bet is already saved at
/// this point, so a failure here is logged and the request still succeeds.
fn remember_house(state: &SharedState, owner: &OwnerId, house: &str) {
    if let Err(e) = state.settings.remember_house(owner.as_str(), house) {
        tracing::warn!(owner = owner.as_str(), house, error = %e, "could not remember betting house");
    }
}

// ===== RESULT / DELETE =====

/// POST /bets/:id/result
pub async fn update_result(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(bet_id): Path<Uuid>,
    Json(request): Json<ResultUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let result: BetResult = request
        .result
        .parse()
        .map_err(|e: UnknownResult| ValidationErrors::single("result", e.to_string()))?;

    let _guard = state.begin_action(bet_id)?;
    let bet = state.store.get_bet(owner.as_str(), bet_id)?;

    let pending = PendingConfirmation::new(bet_id, bet.result, ActionIntent::SetResult { result })?;
    let command = pending.resolve(request.confirm, request.cashout_return_gross.as_ref())?;
    let updated = state.store.execute(owner.as_str(), &command)?;

    Ok(Json(json!({
        "success": true,
        "bet": updated,
        "actions": available_actions(result),
    })))
}

/// DELETE /bets/:id?confirm=true
pub async fn delete_bet(
    State(state): State<SharedState>,
    owner: OwnerId,
    Path(bet_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<Value>, ApiError> {
    let _guard = state.begin_action(bet_id)?;
    let bet = state.store.get_bet(owner.as_str(), bet_id)?;

    let pending = PendingConfirmation::new(bet_id, bet.result, ActionIntent::Delete)?;
    let command = pending.resolve(params.confirm, None)?;
    state.store.execute(owner.as_str(), &command)?;

    Ok(Json(json!({ "success": true, "deleted": bet_id })))
}

// ===== CONVERTER =====

/// GET /convert?units= or ?amount=
///
/// Converts against the caller's saved stake. Unparseable input yields
/// nulls, not an error.
pub async fn convert(
    State(state): State<SharedState>,
    owner: OwnerId,
    Query(params): Query<ConvertParams>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.settings.current(owner.as_str())?;
    let stake = settings.stake_value;

    let units = params.units.as_deref().and_then(parse_decimal_input);
    let amount = params.amount.as_deref().and_then(parse_decimal_input);

    let (units, amount) = match (units, amount) {
        (Some(u), _) => {
            let u = round_units(u);
            (Some(u), Some(amount_from_units(u, stake)))
        }
        (None, Some(a)) => (units_from_amount(a, stake), Some(a)),
        (None, None) => (None, None),
    };

    Ok(Json(json!({
        "success": true,
        "stake_value": stake,
        "units": units,
        "amount": amount,
    })))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "success": true, "service": "bet-ledger", "status": "ok" }))
}
