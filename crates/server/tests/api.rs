use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;

const PASSWORD: &str = "correct-horse-battery";

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .password_cost(4)
        .build()
        .await
        .unwrap();
    server::router(engine)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": username, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

async fn create_category(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/categories",
        Some(token),
        Some(json!({"name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn create_transaction(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/transactions", Some(token), Some(body)).await
}

#[tokio::test]
async fn register_then_login_returns_the_same_token() {
    let app = app().await;
    let token = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "alice", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], token);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn login_failures() {
    let app = app().await;
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": "alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["password"][0], "This field is required.");
}

#[tokio::test]
async fn registration_errors_are_per_field() {
    let app = app().await;
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"username": "alice", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["username"].is_array());
    assert!(body["fields"]["password"].is_array());
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    assert!(body.get("fields").is_none());

    let (status, _) = send(&app, Method::GET, "/categories", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn legacy_token_scheme_is_accepted() {
    let app = app().await;
    let token = register(&app, "alice").await;

    let request = Request::builder()
        .uri("/categories")
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let app = app().await;
    let token = register(&app, "alice").await;

    let (status, body) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, "/categories", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn category_lifecycle() {
    let app = app().await;
    let token = register(&app, "alice").await;
    let id = create_category(&app, &token, "Food").await;

    let (status, body) = send(&app, Method::GET, "/categories", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": id, "name": "Food"}]));

    let uri = format!("/categories/{id}");
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({"name": "Groceries"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Groceries");

    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Groceries");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_category_name_is_a_field_error() {
    let app = app().await;
    let token = register(&app, "alice").await;
    create_category(&app, &token, "Food").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/categories",
        Some(&token),
        Some(json!({"name": "Food"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["name"][0],
        "You already have a category with this name."
    );
}

#[tokio::test]
async fn other_users_records_answer_404() {
    let app = app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let food = create_category(&app, &alice, "Food").await;
    let (_, tx) = create_transaction(
        &app,
        &alice,
        json!({"category": food, "type": "expense", "amount": "5.00", "date": "2024-03-01"}),
    )
    .await;
    let tx_id = tx["id"].as_i64().unwrap();

    let (_, list) = send(&app, Method::GET, "/categories", Some(&bob), None).await;
    assert_eq!(list, json!([]));
    let (_, list) = send(&app, Method::GET, "/transactions", Some(&bob), None).await;
    assert_eq!(list, json!([]));

    let category_uri = format!("/categories/{food}");
    let tx_uri = format!("/transactions/{tx_id}");
    let attempts = [
        (Method::GET, category_uri.as_str(), None),
        (Method::PUT, category_uri.as_str(), Some(json!({"name": "Mine"}))),
        (Method::DELETE, category_uri.as_str(), None),
        (Method::GET, tx_uri.as_str(), None),
        (
            Method::PUT,
            tx_uri.as_str(),
            Some(json!({"category": food, "type": "income", "amount": 1, "date": "2024-03-02"})),
        ),
        (Method::PATCH, tx_uri.as_str(), Some(json!({"amount": "0"}))),
        (Method::DELETE, tx_uri.as_str(), None),
    ];
    for (method, uri, body) in attempts {
        let (status, _) = send(&app, method.clone(), uri, Some(&bob), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
    }

    let (status, body) = send(&app, Method::GET, &tx_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], "5.00");
}

#[tokio::test]
async fn transaction_create_and_update() {
    let app = app().await;
    let token = register(&app, "alice").await;
    let food = create_category(&app, &token, "Food").await;

    let (status, body) = create_transaction(
        &app,
        &token,
        json!({"category": food, "type": "expense", "amount": 12.5, "date": "2024-03-10"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({
            "id": body["id"],
            "category": food,
            "type": "expense",
            "amount": "12.50",
            "date": "2024-03-10",
            "description": ""
        })
    );
    let uri = format!("/transactions/{}", body["id"]);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({"description": "lunch"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "lunch");
    assert_eq!(body["amount"], "12.50");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({"category": food, "type": "income", "amount": "0.01", "date": "2024-03-11"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "income");
    assert_eq!(body["amount"], "0.01");
    assert_eq!(body["description"], "");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({"amount": "3.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["date"][0], "This field is required.");
}

#[tokio::test]
async fn invalid_transactions_are_rejected() {
    let app = app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let food = create_category(&app, &alice, "Food").await;
    let bob_food = create_category(&app, &bob, "Food").await;

    for amount in [json!("0"), json!(-3), json!("1.001")] {
        let (status, body) = create_transaction(
            &app,
            &alice,
            json!({"category": food, "type": "expense", "amount": amount, "date": "2024-03-10"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["amount"].is_array());
    }

    let (status, body) = create_transaction(
        &app,
        &alice,
        json!({"category": bob_food, "type": "expense", "amount": "1", "date": "2024-03-10"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["category"][0],
        "You can only use your own categories."
    );

    let (_, tx) = create_transaction(
        &app,
        &alice,
        json!({"category": food, "type": "expense", "amount": "1", "date": "2024-03-10"}),
    )
    .await;
    let uri = format!("/transactions/{}", tx["id"]);
    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&alice),
        Some(json!({"category": bob_food})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["category"].is_array());

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        Some(&alice),
        Some(json!("not an object")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn category_ids_may_arrive_as_strings() {
    let app = app().await;
    let alice = register(&app, "alice").await;
    let food = create_category(&app, &alice, "Food").await;

    let (status, body) = create_transaction(
        &app,
        &alice,
        json!({"category": food.to_string(), "type": "expense", "amount": "3", "date": "2024-03-10"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"], food);

    let (status, body) = create_transaction(
        &app,
        &alice,
        json!({"category": "food", "type": "expense", "amount": "3", "date": "2024-03-10"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["category"][0],
        "Incorrect type. Expected pk value, received str."
    );

    let (status, body) = create_transaction(
        &app,
        &alice,
        json!({"category": food, "type": "expense", "amount": "3", "date": "2024-03-10", "description": null}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["fields"]["description"][0],
        "This field may not be null."
    );
}

#[tokio::test]
async fn non_integer_ids_answer_404() {
    let app = app().await;
    let alice = register(&app, "alice").await;

    for uri in ["/categories/abc", "/transactions/1.5"] {
        let (status, _) = send(&app, Method::GET, uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _) = send(
        &app,
        Method::PATCH,
        "/transactions/abc",
        Some(&alice),
        Some(json!({"description": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transaction_filters() {
    let app = app().await;
    let token = register(&app, "alice").await;
    let food = create_category(&app, &token, "Food").await;
    let salary = create_category(&app, &token, "Salary").await;

    for (category, kind, date) in [
        (food, "expense", "2024-03-01"),
        (food, "expense", "2024-03-31"),
        (salary, "income", "2024-04-01"),
    ] {
        let (status, _) = create_transaction(
            &app,
            &token,
            json!({"category": category, "type": kind, "amount": "10", "date": date}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let count = |body: Value| body.as_array().map(Vec::len).unwrap_or_default();

    let (_, body) = send(&app, Method::GET, "/transactions?type=income", Some(&token), None).await;
    assert_eq!(count(body), 1);

    let uri = format!("/transactions?category={food}");
    let (_, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(count(body), 2);

    let (_, body) = send(
        &app,
        Method::GET,
        "/transactions?start_date=2024-03-01&end_date=2024-03-31",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(count(body), 2);

    let (_, body) = send(
        &app,
        Method::GET,
        "/transactions?start_date=2024-04-01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(count(body), 3);

    let (_, body) = send(
        &app,
        Method::GET,
        "/transactions?type=&category=&start_date=&end_date=",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(count(body), 3);

    let (status, body) = send(
        &app,
        Method::GET,
        "/transactions?type=refund",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["type"].is_array());
}

#[tokio::test]
async fn deleting_a_category_removes_its_transactions() {
    let app = app().await;
    let token = register(&app, "alice").await;
    let food = create_category(&app, &token, "Food").await;
    let rent = create_category(&app, &token, "Rent").await;

    for category in [food, rent] {
        create_transaction(
            &app,
            &token,
            json!({"category": category, "type": "expense", "amount": "10", "date": "2024-03-01"}),
        )
        .await;
    }

    let uri = format!("/categories/{food}");
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, "/transactions", Some(&token), None).await;
    let remaining = body.as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["category"], rent);
}

#[tokio::test]
async fn monthly_report_scenario() {
    let app = app().await;
    let token = register(&app, "alice").await;
    let food = create_category(&app, &token, "Food").await;

    create_transaction(
        &app,
        &token,
        json!({"category": food, "type": "expense", "amount": "50.00", "date": "2024-03-10"}),
    )
    .await;
    create_transaction(
        &app,
        &token,
        json!({"category": food, "type": "income", "amount": "200.00", "date": "2024-03-15"}),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/reports/monthly?year=2024&month=3",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "year": 2024,
            "month": 3,
            "total_income": "200.00",
            "total_expense": "50.00",
            "balance": "150.00"
        })
    );

    let (_, body) = send(
        &app,
        Method::GET,
        "/reports/monthly?year=2024&month=4",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["total_income"], "0.00");
    assert_eq!(body["balance"], "0.00");
}

#[tokio::test]
async fn monthly_report_requires_numeric_period() {
    let app = app().await;
    let token = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/reports/monthly?year=2024",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["month"].is_array());

    let (status, _) = send(
        &app,
        Method::GET,
        "/reports/monthly?year=twenty&month=3",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
