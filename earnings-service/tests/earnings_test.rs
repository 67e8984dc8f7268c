//! Daily earnings in summary and detailed mode, and their transactions.

mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::{dec, money, uuid_at, TestApp, TestUser};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn days_ago(n: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(n)
}

async fn record_transaction(app: &TestApp, user: &TestUser, date: NaiveDate, body: Value) -> Value {
    let response = app
        .post(&format!("/api/earnings/{}/transactions", date), &user.token, &body)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn summary_day_totals_its_amounts() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let date = days_ago(2);

    let response = app
        .put(
            &format!("/api/earnings/{}", date),
            &owner.token,
            &json!({
                "cash_amount": "120.004",
                "card_amount": "80",
                "tips_amount": "15.50",
                "notes": "Busy Saturday",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let day: Value = response.json().await.unwrap();
    assert_eq!(day["entry_mode"], "summary");
    assert_eq!(money(&day["cash_amount"]), dec("120.00"));
    assert_eq!(money(&day["total_amount"]), dec("200.00"));
    assert_eq!(money(&day["tips_amount"]), dec("15.50"));
    assert_eq!(day["transaction_count"], 0);

    // A second write updates only what it names
    let day: Value = app
        .put(
            &format!("/api/earnings/{}", date),
            &owner.token,
            &json!({ "other_amount": "10" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(money(&day["total_amount"]), dec("210.00"));
    assert_eq!(day["notes"], "Busy Saturday");

    let listed: Value = app.get("/api/earnings", &owner.token).await.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn future_dates_and_negative_amounts_are_rejected() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let tomorrow = Utc::now().date_naive() + Duration::days(1);

    let response = app
        .put(
            &format!("/api/earnings/{}", tomorrow),
            &owner.token,
            &json!({ "cash_amount": "10" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post(
            &format!("/api/earnings/{}/transactions", tomorrow),
            &owner.token,
            &json!({ "amount": "10", "payment_method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(
            &format!("/api/earnings/{}", days_ago(1)),
            &owner.token,
            &json!({ "card_amount": "-5" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(
            &format!("/api/earnings/{}", days_ago(1)),
            &owner.token,
            &json!({ "cash_amount": "99999999999.00" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let huge = "79228162514264337593543950335";
    let response = app
        .post(
            &format!("/api/earnings/{}/transactions", days_ago(1)),
            &owner.token,
            &json!({ "payments": [
                { "payment_method": "cash", "amount": huge },
                { "payment_method": "card", "amount": huge }
            ] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn list_filters_by_inclusive_date_range() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;

    for n in [1, 3, 5] {
        app.put(
            &format!("/api/earnings/{}", days_ago(n)),
            &owner.token,
            &json!({ "cash_amount": "10" }),
        )
        .await;
    }

    let listed: Value = app
        .get(
            &format!("/api/earnings?from={}&to={}", days_ago(3), days_ago(1)),
            &owner.token,
        )
        .await
        .json()
        .await
        .unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["earnings_date"], days_ago(1).to_string());

    let response = app
        .get(
            &format!("/api/earnings?from={}&to={}", days_ago(1), days_ago(3)),
            &owner.token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn transaction_switches_day_to_detailed_mode() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let date = days_ago(1);

    app.put(
        &format!("/api/earnings/{}", date),
        &owner.token,
        &json!({ "cash_amount": "500" }),
    )
    .await;

    record_transaction(
        &app,
        &owner,
        date,
        json!({ "amount": "40", "payment_method": "cash", "tip_amount": "4" }),
    )
    .await;
    record_transaction(
        &app,
        &owner,
        date,
        json!({ "amount": "60", "payment_method": "card" }),
    )
    .await;

    let day: Value = app
        .get(&format!("/api/earnings/{}", date), &owner.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(day["entry_mode"], "detailed");
    assert_eq!(money(&day["cash_amount"]), dec("40"));
    assert_eq!(money(&day["card_amount"]), dec("60"));
    assert_eq!(money(&day["total_amount"]), dec("100"));
    assert_eq!(money(&day["tips_amount"]), dec("4"));
    assert_eq!(day["transaction_count"], 2);
    assert_eq!(day["transactions"].as_array().unwrap().len(), 2);

    // Amounts of a detailed day cannot be overwritten; notes can
    let response = app
        .put(
            &format!("/api/earnings/{}", date),
            &owner.token,
            &json!({ "cash_amount": "999" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put(
            &format!("/api/earnings/{}", date),
            &owner.token,
            &json!({ "notes": "busy Saturday" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let day: Value = response.json().await.unwrap();
    assert_eq!(money(&day["total_amount"]), dec("100"));
    assert_eq!(day["notes"], "busy Saturday");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn split_payments_must_add_up() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let date = days_ago(1);

    let tx = record_transaction(
        &app,
        &owner,
        date,
        json!({
            "payments": [
                { "payment_method": "cash", "amount": "20" },
                { "payment_method": "card", "amount": "35.50" },
            ],
        }),
    )
    .await;
    assert_eq!(tx["has_multiple_payments"], true);
    assert_eq!(money(&tx["total_amount"]), dec("55.50"));
    assert_eq!(tx["payments"].as_array().unwrap().len(), 2);

    let response = app
        .post(
            &format!("/api/earnings/{}/transactions", date),
            &owner.token,
            &json!({
                "amount": "60",
                "payments": [
                    { "payment_method": "cash", "amount": "20" },
                    { "payment_method": "card", "amount": "35.50" },
                ],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A single payment line collapses to a plain transaction
    let single = record_transaction(
        &app,
        &owner,
        date,
        json!({ "payments": [{ "payment_method": "other", "amount": "12" }] }),
    )
    .await;
    assert_eq!(single["has_multiple_payments"], false);
    assert_eq!(single["payment_method"], "other");

    let day: Value = app
        .get(&format!("/api/earnings/{}", date), &owner.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(money(&day["cash_amount"]), dec("20"));
    assert_eq!(money(&day["card_amount"]), dec("35.50"));
    assert_eq!(money(&day["other_amount"]), dec("12"));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn services_price_the_transaction_at_current_prices() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let cut = app.create_service(&owner, "Haircut", "45.00").await;
    let wash = app.create_service(&owner, "Wash", "10.00").await;
    let date = days_ago(1);

    let tx = record_transaction(
        &app,
        &owner,
        date,
        json!({ "service_ids": [cut, wash, cut], "payment_method": "card" }),
    )
    .await;
    assert_eq!(money(&tx["amount"]), dec("55.00"));
    assert_eq!(tx["services"].as_array().unwrap().len(), 2);

    // Later price changes do not rewrite history
    app.patch(
        &format!("/api/services/{}", cut),
        &owner.token,
        &json!({ "price": "50.00" }),
    )
    .await;

    let day: Value = app
        .get(&format!("/api/earnings/{}", date), &owner.token)
        .await
        .json()
        .await
        .unwrap();
    let prices: Vec<_> = day["transactions"][0]["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| money(&s["price_at_time"]))
        .collect();
    assert!(prices.contains(&dec("45.00")));

    // Inactive services cannot be sold
    app.patch(
        &format!("/api/services/{}", wash),
        &owner.token,
        &json!({ "is_active": false }),
    )
    .await;
    let response = app
        .post(
            &format!("/api/earnings/{}/transactions", date),
            &owner.token,
            &json!({ "service_ids": [wash], "payment_method": "cash" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn update_and_delete_transaction() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let date = days_ago(1);

    let tx = record_transaction(
        &app,
        &owner,
        date,
        json!({ "client_name": "Walk-in", "amount": "30", "payment_method": "cash" }),
    )
    .await;
    let path = format!("/api/transactions/{}", uuid_at(&tx["transaction_id"]));

    let response = app
        .put(
            &path,
            &owner.token,
            &json!({ "client_name": "Walk-in", "amount": "35", "payment_method": "card", "tip_amount": "2" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["payment_method"], "card");
    assert_eq!(money(&updated["tip_amount"]), dec("2"));

    let response = app.delete(&path, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let day: Value = app
        .get(&format!("/api/earnings/{}", date), &owner.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(day["transaction_count"], 0);
    assert_eq!(money(&day["total_amount"]), dec("0"));

    let response = app.delete(&path, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn only_the_recording_employee_changes_transactions() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let employee = app.add_employee(&owner).await;
    let date = days_ago(1);

    let tx = record_transaction(
        &app,
        &employee,
        date,
        json!({ "amount": "30", "payment_method": "cash" }),
    )
    .await;
    let path = format!("/api/transactions/{}", uuid_at(&tx["transaction_id"]));

    let response = app.delete(&path, &owner.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Another company cannot even see it
    let (stranger, _) = app.register_owner().await;
    let response = app.delete(&path, &stranger.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn owners_read_employee_days_but_employees_do_not_read_others() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let employee = app.add_employee(&owner).await;
    let date = days_ago(1);

    app.put(
        &format!("/api/earnings/{}", date),
        &employee.token,
        &json!({ "cash_amount": "75" }),
    )
    .await;

    let response = app
        .get(
            &format!("/api/earnings/{}?user_id={}", date, employee.user_id),
            &owner.token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let day: Value = response.json().await.unwrap();
    assert_eq!(money(&day["total_amount"]), dec("75"));

    let response = app
        .get(&format!("/api/earnings?user_id={}", owner.user_id), &employee.token)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The owner's own day is separate
    let response = app.get(&format!("/api/earnings/{}", date), &owner.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn switching_back_to_summary_drops_transactions() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let client_id = app.create_client(&owner, "Maria").await;
    let date = days_ago(1);

    record_transaction(
        &app,
        &owner,
        date,
        json!({ "client_id": client_id, "amount": "40", "payment_method": "cash" }),
    )
    .await;

    let day: Value = app
        .put(
            &format!("/api/earnings/{}", date),
            &owner.token,
            &json!({ "entry_mode": "summary", "cash_amount": "90" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(day["entry_mode"], "summary");
    assert_eq!(day["transaction_count"], 0);
    assert_eq!(money(&day["total_amount"]), dec("90"));

    let client: Value = app
        .get(&format!("/api/clients/{}", client_id), &owner.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(client["total_visits"], 0);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn delete_day_removes_it() {
    let app = TestApp::spawn().await;
    let (owner, _) = app.register_owner().await;
    let date = days_ago(4);
    let path = format!("/api/earnings/{}", date);

    app.put(&path, &owner.token, &json!({ "cash_amount": "10" })).await;

    let response = app.delete(&path, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.delete(&path, &owner.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
