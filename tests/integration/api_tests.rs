//! End-to-end tests against a running server
//!
//! Requires a server on localhost:8080 started with a bootstrap superuser,
//! e.g. `TOOLCRIB_BOOTSTRAP__ADMIN_USERNAME=admin` and
//! `TOOLCRIB_BOOTSTRAP__ADMIN_PASSWORD=admin`. The same variables are read
//! here, defaulting to admin/admin.
//! Run with: cargo test -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";

fn admin_credentials() -> (String, String) {
    let username =
        std::env::var("TOOLCRIB_BOOTSTRAP__ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let password =
        std::env::var("TOOLCRIB_BOOTSTRAP__ADMIN_PASSWORD").unwrap_or_else(|_| "admin".into());
    (username, password)
}

/// Helper to get an admin access token
async fn get_auth_token(client: &Client) -> String {
    let (username, password) = admin_credentials();
    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send token request");

    let body: Value = response.json().await.expect("Failed to parse token response");
    body["access"].as_str().expect("No access token in response").to_string()
}

async fn borrow(client: &Client, token: &str, tool_id: i64, quantity: i32) -> reqwest::Response {
    client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "tool_id": tool_id, "quantity": quantity, "due_date": "2099-01-01" }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn get_tool(client: &Client, token: &str, tool_id: i64) -> Value {
    client
        .get(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response")
}

async fn create_tool(client: &Client, token: &str, name: &str, quantity: i32) -> Value {
    let response = client
        .post(format!("{}/tools", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "total_quantity": quantity,
            "unit_value": "10.00"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
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
async fn test_token_pair_and_refresh() {
    let client = Client::new();

    let (username, password) = admin_credentials();
    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let refresh = body["refresh"].as_str().expect("No refresh token").to_string();

    // a refresh token is not accepted as a bearer token
    let response = client
        .get(format!("{}/users/me", BASE_URL))
        .bearer_auth(&refresh)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    let response = client
        .post(format!("{}/token/refresh", BASE_URL))
        .json(&json!({ "refresh": refresh }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["access"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_invalid_credentials() {
    let client = Client::new();

    let (username, _) = admin_credentials();
    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": username, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    let response = client
        .post(format!("{}/token", BASE_URL))
        .json(&json!({ "username": format!("nobody-{}", uuid::Uuid::new_v4()), "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let tool = create_tool(&client, &token, &format!("Ladder {}", uuid::Uuid::new_v4()), 10).await;
    let tool_id = tool["id"].as_i64().unwrap();
    assert_eq!(tool["available_quantity"], 10);

    // borrow 4 of 10
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "tool_id": tool_id, "quantity": 4, "due_date": "2099-01-01" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    // 7 more do not fit
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "tool_id": tool_id, "quantity": 7, "due_date": "2099-01-01" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // growing the first loan to 6 counts its own reservation
    let response = client
        .patch(format!("{}/loans/{}", BASE_URL, loan_id))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 6 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let tool: Value = client
        .get(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tool["available_quantity"], 4);

    // return once, then fail the second time
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let returned: Value = response.json().await.unwrap();
    assert!(returned["returned_date"].is_string());

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .delete(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_export_tools_csv() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/export/tools", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));

    let body = response.text().await.unwrap();
    assert!(body.starts_with("\"Name\""));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_never_oversell() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let tool = create_tool(&client, &token, &format!("Torque wrench {}", uuid::Uuid::new_v4()), 3).await;
    let tool_id = tool["id"].as_i64().unwrap();

    // each request wants 2 of 3, so only one of them fits
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            let token = token.clone();
            tokio::spawn(async move { borrow(&client, &token, tool_id, 2).await.status() })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    assert_eq!(created, 1, "{:?}", statuses);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::CREATED || *s == StatusCode::BAD_REQUEST));

    let tool = get_tool(&client, &token, tool_id).await;
    assert_eq!(tool["available_quantity"], 1);
    assert!(tool["available_quantity"].as_i64().unwrap() >= 0);
}

#[tokio::test]
#[ignore]
async fn test_maintenance_with_units_on_loan_conflicts() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let tool = create_tool(&client, &token, &format!("Chainsaw {}", uuid::Uuid::new_v4()), 2).await;
    let tool_id = tool["id"].as_i64().unwrap();
    assert_eq!(borrow(&client, &token, tool_id, 1).await.status(), 201);

    let response = client
        .put(format!("{}/tools/{}/condition", BASE_URL, tool_id))
        .bearer_auth(&token)
        .json(&json!({ "condition": "maintenance", "maintenance_cost": "12.50" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 10);

    let tool = get_tool(&client, &token, tool_id).await;
    assert_eq!(tool["total_quantity"], 2);
    assert_eq!(tool["condition"], "good");
}

#[tokio::test]
#[ignore]
async fn test_deleting_tool_removes_its_loans() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let tool = create_tool(&client, &token, &format!("Jackhammer {}", uuid::Uuid::new_v4()), 2).await;
    let tool_id = tool["id"].as_i64().unwrap();

    let response = borrow(&client, &token, tool_id, 1).await;
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    let response = client
        .delete(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/loans/{}", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_put_replaces_and_patch_clears() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let name = format!("Planer {}", uuid::Uuid::new_v4());

    let response = client
        .post(format!("{}/tools", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": name,
            "description": "Bench planer",
            "total_quantity": 2,
            "supplier": "ACME"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let tool: Value = response.json().await.unwrap();
    let tool_id = tool["id"].as_i64().unwrap();

    let response = client
        .patch(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .json(&json!({ "description": null }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let tool: Value = response.json().await.unwrap();
    assert!(tool["description"].is_null());
    assert_eq!(tool["supplier"], "ACME");

    let response = client
        .put(format!("{}/tools/{}", BASE_URL, tool_id))
        .bearer_auth(&token)
        .json(&json!({ "name": name, "total_quantity": 3 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let tool: Value = response.json().await.unwrap();
    assert!(tool["supplier"].is_null());
    assert_eq!(tool["total_quantity"], 3);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_registrations_conflict() {
    let client = Client::new();
    let username = format!("dup{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            let username = username.clone();
            tokio::spawn(async move {
                client
                    .post(format!("{}/users/register", BASE_URL))
                    .json(&json!({
                        "username": username,
                        "email": "dup@example.com",
                        "password": "secret"
                    }))
                    .send()
                    .await
                    .expect("Failed to send request")
                    .status()
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::CREATED || *s == StatusCode::CONFLICT));
}
