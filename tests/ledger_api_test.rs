use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use bet_ledger::{app, AppState, Config, SharedState};

const ALICE: &str = "alice";
const BOB: &str = "bob";

fn test_app_with_state() -> (Router, SharedState) {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let state: SharedState = Arc::new(AppState::from_db(Config::default(), db).unwrap());
    (app(state.clone()), state)
}

fn test_app() -> Router {
    test_app_with_state().0
}

async fn send(app: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn set_stake(app: &Router, user: &str, stake: Value) {
    let (status, _) = send(app, Method::PUT, "/settings/stake", Some(user), Some(json!({ "stake_value": stake }))).await;
    assert_eq!(status, StatusCode::OK);
}

async fn create(app: &Router, user: &str, title: &str, day: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/bets",
        Some(user),
        Some(json!({
            "house": "Betano",
            "title": title,
            "market": "Over 2.5",
            "event_at": day,
            "odd": 2.10,
            "units": 1.5,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["bet"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_missing_owner_is_unauthorized() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/bets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::POST, "/bets", Some("  "), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_create_bet_derives_amounts_from_stake() {
    let app = test_app();
    set_stake(&app, ALICE, json!("40")).await;

    let id = create(&app, ALICE, "Flamengo x Palmeiras", "2024-03-10").await;
    let (status, body) = send(&app, Method::GET, &format!("/bets/{}", id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);

    let bet = &body["bet"];
    assert_eq!(bet["result"], "pending");
    assert_eq!(decimal(&bet["entry_amount"]), dec!(60));
    assert_eq!(decimal(&bet["profit_loss"]), dec!(0));
    assert_eq!(body["actions"].as_array().unwrap().len(), 5);

    // the house is remembered in settings
    let (_, body) = send(&app, Method::GET, "/settings", Some(ALICE), None).await;
    assert_eq!(body["settings"]["betting_houses"], json!(["Betano"]));
}

#[tokio::test]
async fn test_invalid_bet_reports_every_field() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/bets",
        Some(ALICE),
        Some(json!({ "house": " ", "title": "Game", "event_at": "2024-13-40", "odd": 0.5, "units": "abc" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["house", "event_at", "odd", "units"]);

    let (_, body) = send(&app, Method::GET, "/bets", Some(ALICE), None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_create_as_cashout_needs_value() {
    let app = test_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/bets",
        Some(ALICE),
        Some(json!({ "house": "Betano", "title": "Game", "event_at": "2024-03-10", "odd": 2, "units": 1, "result": "cashout" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_listing_pagination_and_filters() {
    let app = test_app();
    for i in 0..13 {
        create(&app, ALICE, &format!("Match {:02}", i), "2024-03-10").await;
    }
    create(&app, ALICE, "Final", "2024-03-11").await;
    create(&app, ALICE, "Semi final", "2024-03-11T22:30:00-03:00").await;
    create(&app, BOB, "Match bob", "2024-03-10").await;

    let (status, body) = send(&app, Method::GET, "/bets", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 15);
    assert_eq!(body["page_count"], 2);
    assert_eq!(body["bets"].as_array().unwrap().len(), 12);
    // newest day first
    assert_eq!(body["bets"][0]["title"], "Final");

    let (_, body) = send(&app, Method::GET, "/bets?page=1", Some(ALICE), None).await;
    assert_eq!(body["bets"].as_array().unwrap().len(), 3);

    let (_, body) = send(&app, Method::GET, "/bets?date=2024-03-11", Some(ALICE), None).await;
    assert_eq!(body["total"], 2);

    let (_, body) = send(&app, Method::GET, "/bets?title=FINAL&result=all", Some(ALICE), None).await;
    assert_eq!(body["total"], 2);

    let (_, body) = send(&app, Method::GET, "/bets?title=over%202.5&result=pending", Some(ALICE), None).await;
    assert_eq!(body["total"], 15);

    let (status, _) = send(&app, Method::GET, "/bets?result=won", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_result_transitions() {
    let app = test_app();
    set_stake(&app, ALICE, json!(40)).await;
    let id = create(&app, ALICE, "Game", "2024-03-10").await;
    let uri = format!("/bets/{}/result", id);

    let (status, _) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({ "result": "green" }))).await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);

    let (status, _) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({ "result": "cashout", "confirm": true }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({ "result": "cashout", "cashout_return_gross": "-1", "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({ "result": "green", "confirm": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bet"]["result"], "green");
    assert_eq!(decimal(&body["bet"]["profit_loss"]), dec!(66));

    // settled results only go back to pending
    let (status, _) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({ "result": "red", "confirm": true }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({ "result": "pending", "confirm": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["bet"]["profit_loss"]), dec!(0));

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({ "result": "cashout", "cashout_return_gross": "75,00", "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["bet"]["cashout_return_gross"]), dec!(75));
    assert_eq!(decimal(&body["bet"]["profit_loss"]), dec!(15));

    let (status, body) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({ "result": "pending", "confirm": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["bet"].get("cashout_return_gross").is_none());
}

#[tokio::test]
async fn test_edit_refuses_result_change() {
    let app = test_app();
    let id = create(&app, ALICE, "Game", "2024-03-10").await;
    let uri = format!("/bets/{}", id);
    let edited = json!({ "house": "Pinnacle", "title": "Game 2", "event_at": "2024-03-10", "odd": 1.9, "units": 2, "result": "green" });

    let (status, body) = send(&app, Method::PUT, &uri, Some(ALICE), Some(edited)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("/result"));

    let (_, body) = send(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(body["bet"]["result"], "pending");
    assert_eq!(body["bet"]["title"], "Game");
}

#[tokio::test]
async fn test_edit_without_result_keeps_settled_result() {
    let app = test_app();
    set_stake(&app, ALICE, json!(40)).await;
    let id = create(&app, ALICE, "Game", "2024-03-10").await;
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/bets/{}/result", id),
        Some(ALICE),
        Some(json!({ "result": "green", "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/bets/{}", id);
    let renamed = json!({ "house": "Betano", "title": "Game renamed", "event_at": "2024-03-10", "odd": 2.10, "units": 1.5 });
    let (status, body) = send(&app, Method::PUT, &uri, Some(ALICE), Some(renamed.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bet"]["title"], "Game renamed");
    assert_eq!(body["bet"]["result"], "green");
    assert_eq!(decimal(&body["bet"]["profit_loss"]), dec!(66));

    // repeating the current result is not a change
    let mut same = renamed;
    same["result"] = json!("green");
    let (status, body) = send(&app, Method::PUT, &uri, Some(ALICE), Some(same)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bet"]["result"], "green");
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected() {
    let app = test_app();
    set_stake(&app, ALICE, json!(100)).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/bets",
        Some(ALICE),
        Some(json!({
            "house": "Betano",
            "title": "Game",
            "event_at": "2024-03-10",
            "odd": "79228162514264337593543950335",
            "units": 1,
            "result": "green",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "odd");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/settings/stake",
        Some(ALICE),
        Some(json!({ "stake_value": "79228162514264337593543950335" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&app, Method::GET, "/bets", Some(ALICE), None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_huge_report_window_is_clamped() {
    let app = test_app();
    create(&app, ALICE, "Game", "2024-03-10").await;

    let (status, body) = send(&app, Method::GET, "/reports/summary?days=4000000000", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["days"], 36_500);

    let (status, body) = send(&app, Method::GET, "/reports/balance?days=4000000000", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 36_500);
}

#[tokio::test]
async fn test_action_on_busy_bet_is_rejected() {
    let (app, state) = test_app_with_state();
    let id = create(&app, ALICE, "Game", "2024-03-10").await;
    let bet_id = id.parse().unwrap();

    {
        let _guard = state.begin_action(bet_id).unwrap();
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/bets/{}/result", id),
            Some(ALICE),
            Some(json!({ "result": "green", "confirm": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, Method::DELETE, &format!("/bets/{}?confirm=true", id), Some(ALICE), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    // released once the first action is done
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/bets/{}/result", id),
        Some(ALICE),
        Some(json!({ "result": "green", "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bet"]["result"], "green");
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let app = test_app();
    let id = create(&app, ALICE, "Game", "2024-03-10").await;
    let uri = format!("/bets/{}", id);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);

    let (status, _) = send(&app, Method::DELETE, &format!("{}?confirm=true", uri), Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("{}?confirm=true", uri), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings() {
    let app = test_app();

    let (status, _) = send(&app, Method::PUT, "/settings/stake", Some(ALICE), Some(json!({ "stake_value": 0 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/settings/houses",
        Some(ALICE),
        Some(json!({ "houses": ["Bet365", " bet365 ", "", "Betano"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["betting_houses"], json!(["Bet365", "Betano"]));

    let (_, body) = send(&app, Method::POST, "/settings/houses", Some(ALICE), Some(json!({ "house": "Pinnacle" }))).await;
    assert_eq!(body["settings"]["betting_houses"], json!(["Bet365", "Betano", "Pinnacle"]));

    let (_, body) = send(&app, Method::GET, "/settings", Some(BOB), None).await;
    assert_eq!(body["settings"]["betting_houses"], json!([]));
    assert!(body["settings"]["stake_value"].is_null());
}

#[tokio::test]
async fn test_convert() {
    let app = test_app();

    let (_, body) = send(&app, Method::GET, "/convert?units=1.5", Some(ALICE), None).await;
    assert_eq!(decimal(&body["amount"]), dec!(0));

    set_stake(&app, ALICE, json!("50")).await;
    let (_, body) = send(&app, Method::GET, "/convert?units=1.5", Some(ALICE), None).await;
    assert_eq!(decimal(&body["amount"]), dec!(75));

    let (_, body) = send(&app, Method::GET, "/convert?amount=80", Some(ALICE), None).await;
    assert_eq!(decimal(&body["units"]), dec!(1.6));

    let (status, body) = send(&app, Method::GET, "/convert?amount=abc", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["units"].is_null());
}

#[tokio::test]
async fn test_reports() {
    let app = test_app();
    set_stake(&app, ALICE, json!(40)).await;
    let green = create(&app, ALICE, "Game A", "2024-03-10").await;
    let red = create(&app, ALICE, "Game B", "2024-03-10").await;
    create(&app, ALICE, "Game C", "2024-04-02").await;

    for (id, result) in [(&green, "green"), (&red, "red")] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/bets/{}/result", id),
            Some(ALICE),
            Some(json!({ "result": result, "confirm": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::GET, "/reports/daily", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let days = body["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["day"], "2024-03-10");
    assert_eq!(decimal(&days[0]["total_staked"]), dec!(120));
    assert_eq!(decimal(&days[0]["net_profit"]), dec!(6));
    assert_eq!(decimal(&days[0]["roi_percent"]), dec!(5));
    assert_eq!(decimal(&days[0]["accuracy"]), dec!(50));
    assert_eq!(days[1]["pending_count"], 1);

    let (_, body) = send(&app, Method::GET, "/reports/monthly", Some(ALICE), None).await;
    assert_eq!(body["months"][0]["month"], "2024-03");

    let (_, body) = send(&app, Method::GET, "/reports/houses", Some(ALICE), None).await;
    assert_eq!(body["houses"][0]["house"], "Betano");
    assert_eq!(body["houses"][0]["bet_count"], 3);

    let (status, body) = send(&app, Method::GET, "/reports/summary?days=30", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["days"], 30);

    let (status, body) = send(&app, Method::GET, "/reports/recent", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["today"]["page"]["page_size"], 10);
}

#[tokio::test]
async fn test_failed_create_leaves_no_bet_behind() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    db.open_tree("settings")
        .unwrap()
        .insert(ALICE.as_bytes(), b"not json".to_vec())
        .unwrap();
    let state: SharedState = Arc::new(AppState::from_db(Config::default(), db).unwrap());
    let app = app(state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/bets",
        Some(ALICE),
        Some(json!({ "house": "Betano", "title": "Game", "event_at": "2024-03-10", "odd": 2, "units": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "backend call failed");
    assert!(state.store.owner_bets(ALICE).unwrap().is_empty());
}
