//! API integration tests
//!
//! Require a running server and an administrator created with
//! `create-superuser admin@example.com AdminPass123` (or the credentials in
//! `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`).
//! Run with: cargo test --test api_tests -- --ignored

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("TEST_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string()),
        std::env::var("TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "AdminPass123".to_string()),
    )
}

/// Obtain an access token for the given credentials
async fn get_auth_token(client: &Client, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/users/token", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send token request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse token response");
    body["access"].as_str().expect("No access token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    get_auth_token(client, &email, &password).await
}

/// Register a fresh member and return (id, access token)
async fn new_member(client: &Client) -> (i64, String) {
    let email = format!("member-{}@example.com", Uuid::new_v4());
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({ "email": email, "password": "StrongPass123" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    let token = get_auth_token(client, &email, "StrongPass123").await;
    (body["id"].as_i64().unwrap(), token)
}

/// Create a uniquely titled book and return its JSON
async fn new_book(client: &Client, token: &str, inventory: i32, daily_fee: &str) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": format!("Book {}", &Uuid::new_v4().to_string()[..8]),
            "author": "Integration Author",
            "cover": "HARD",
            "inventory": inventory,
            "daily_fee": daily_fee
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn get_book(client: &Client, id: i64) -> Value {
    client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn borrow(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    let expected = (Utc::now() + Duration::days(7)).date_naive();
    client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book": book_id, "expected_return_date": expected }))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_me() {
    let client = Client::new();
    let email = format!("bob-{}@Example.COM", Uuid::new_v4());

    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "email": email,
            "first_name": "Bob",
            "last_name": "Builder",
            "password": "StrongPass123",
            "is_staff": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["is_staff"], false);
    assert!(body.get("password").is_none());

    let token = get_auth_token(&client, &email, "StrongPass123").await;
    let me: Value = client
        .get(format!("{}/users/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["first_name"], "Bob");
    assert!(me["email"].as_str().unwrap().ends_with("@example.com"));

    // Same address again
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({ "email": email, "password": "StrongPass123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users/token", BASE_URL))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_moves_inventory() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, member) = new_member(&client).await;

    let book = new_book(&client, &admin, 2, "1.50").await;
    let book_id = book["id"].as_i64().unwrap();

    let response = borrow(&client, &member, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let borrowing: Value = response.json().await.unwrap();
    assert_eq!(borrowing["is_active"], true);
    assert_eq!(borrowing["user_id"].as_i64(), Some(member_id));
    assert_eq!(borrowing["book"]["id"].as_i64(), Some(book_id));
    assert_eq!(get_book(&client, book_id).await["inventory"], 1);

    let borrowing_id = borrowing["id"].as_i64().unwrap();
    let response = client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrowing_id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let returned: Value = response.json().await.unwrap();
    assert_eq!(returned["is_active"], false);
    assert!(returned["actual_return_date"].is_string());
    assert_eq!(get_book(&client, book_id).await["inventory"], 2);

    // Second return is refused and inventory stays put
    let response = client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrowing_id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_book(&client, book_id).await["inventory"], 2);
}

#[tokio::test]
#[ignore]
async fn test_out_of_stock_and_past_date() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, member) = new_member(&client).await;

    let book = new_book(&client, &admin, 1, "0.99").await;
    let book_id = book["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book": book_id, "expected_return_date": Utc::now().date_naive() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["expected_return_date"].is_array());

    assert_eq!(borrow(&client, &member, book_id).await.status(), StatusCode::CREATED);

    let response = borrow(&client, &member, book_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Book is out of stock.");
    assert_eq!(get_book(&client, book_id).await["inventory"], 0);

    assert_eq!(borrow(&client, &member, i32::MAX as i64).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_borrowings_are_private() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, owner) = new_member(&client).await;
    let (_, other) = new_member(&client).await;

    let book = new_book(&client, &admin, 3, "2.00").await;
    let borrowing: Value = borrow(&client, &owner, book["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let borrowing_id = borrowing["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrowing_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listed: Value = client
        .get(format!("{}/borrowings", BASE_URL))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 0);

    // Admins see it and may return it
    let response = client
        .get(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_is_active_filter() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, member) = new_member(&client).await;

    let book = new_book(&client, &admin, 5, "1.00").await;
    let book_id = book["id"].as_i64().unwrap();

    let first: Value = borrow(&client, &member, book_id).await.json().await.unwrap();
    borrow(&client, &member, book_id).await;
    client
        .post(format!("{}/borrowings/{}/return", BASE_URL, first["id"]))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();

    for (value, expected) in [("true", 1), ("1", 1), ("false", 1), ("no", 1)] {
        let listed: Value = client
            .get(format!("{}/borrowings?is_active={}", BASE_URL, value))
            .bearer_auth(&member)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), expected, "is_active={}", value);
    }

    let all: Value = client
        .get(format!("{}/borrowings", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_books_ordering_and_duplicates() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let author = format!("Ordering {}", Uuid::new_v4());

    for (title, fee) in [("Cheap", "0.50"), ("Pricey", "9.99"), ("Middle", "3.00")] {
        let response = client
            .post(format!("{}/books", BASE_URL))
            .bearer_auth(&admin)
            .json(&json!({
                "title": title,
                "author": author,
                "cover": "SOFT",
                "inventory": 1,
                "daily_fee": fee
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let books: Value = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("author", author.as_str()), ("ordering", "-daily_fee")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = books
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Pricey", "Middle", "Cheap"]);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Cheap",
            "author": author,
            "cover": "SOFT",
            "inventory": 4,
            "daily_fee": "1.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["non_field_errors"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_create_book() {
    let client = Client::new();
    let (_, member) = new_member(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({
            "title": "Forbidden",
            "author": "Nobody",
            "cover": "HARD",
            "inventory": 1,
            "daily_fee": "1.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_deleting_user_restores_inventory() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (member_id, member) = new_member(&client).await;

    let book = new_book(&client, &admin, 2, "1.25").await;
    let book_id = book["id"].as_i64().unwrap();
    assert_eq!(borrow(&client, &member, book_id).await.status(), StatusCode::CREATED);
    assert_eq!(get_book(&client, book_id).await["inventory"], 1);

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, member_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(get_book(&client, book_id).await["inventory"], 2);
}
