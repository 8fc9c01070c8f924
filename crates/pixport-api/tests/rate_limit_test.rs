//! Daily quota admission tests.

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::{api_path, setup_test_app_with, test_config, TEST_PASSWORD};
use pixport_storage::Storage;
use serde_json::Value;

const CLIENT_A: &str = "203.0.113.10";
const CLIENT_B: &str = "198.51.100.7";

fn batch(count: usize) -> MultipartForm {
    let mut form = MultipartForm::new();
    for i in 0..count {
        form = form.add_part(
            "files",
            Part::bytes(vec![0u8; 8])
                .file_name(format!("img-{}.png", i))
                .mime_type("image/png"),
        );
    }
    form
}

async fn upload(
    app: &helpers::TestApp,
    client: &str,
    count: usize,
) -> axum_test::TestResponse {
    app.client()
        .post(&api_path("/images"))
        .add_header("x-gallery-password", TEST_PASSWORD)
        .add_header("x-forwarded-for", client)
        .multipart(batch(count))
        .await
}

/// The admission walkthrough: limit 10, count 8 -> batch of 5 denied with
/// remaining 2, batch of 2 admitted, final batch of 1 denied as exhausted.
#[tokio::test]
async fn test_admission_near_limit_scenario() {
    let mut config = test_config();
    config.daily_image_limit = 10;
    let app = setup_test_app_with(config).await;

    let response = upload(&app, CLIENT_A, 8).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Batch of 5 with 2 remaining: denied as a whole, nothing stored
    let response = upload(&app, CLIENT_A, 5).await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["remaining"], 2);
    assert!(body.get("resetTime").is_some());
    assert_eq!(app.state.storage.list("uploads").await.unwrap().len(), 8);

    // Batch of exactly the remaining headroom: admitted
    let response = upload(&app, CLIENT_A, 2).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["rateLimit"]["remaining"], 0);

    // Limit spent: even a single file is denied
    let response = upload(&app, CLIENT_A, 1).await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["remaining"], 0);
    assert_eq!(app.state.storage.list("uploads").await.unwrap().len(), 10);
}

/// An all-or-nothing denial consumes no quota and performs no storage I/O.
#[tokio::test]
async fn test_denied_batch_has_no_side_effects() {
    let mut config = test_config();
    config.daily_image_limit = 3;
    let app = setup_test_app_with(config).await;

    let response = upload(&app, CLIENT_A, 5).await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(app.state.quota.peek(CLIENT_A).remaining, 3);
    assert!(app.state.storage.list("uploads").await.unwrap().is_empty());
}

/// Quota is keyed per client identifier.
#[tokio::test]
async fn test_quota_is_per_client() {
    let mut config = test_config();
    config.daily_image_limit = 2;
    let app = setup_test_app_with(config).await;

    let response = upload(&app, CLIENT_A, 2).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let response = upload(&app, CLIENT_A, 1).await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);

    // A different client still has its full window
    let response = upload(&app, CLIENT_B, 2).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

/// Files that fail validation are not charged; quota tracks stored files.
#[tokio::test]
async fn test_quota_charged_by_actual_success() {
    let mut config = test_config();
    config.daily_image_limit = 10;
    let app = setup_test_app_with(config).await;

    let form = MultipartForm::new()
        .add_part(
            "files",
            Part::bytes(vec![0u8; 8])
                .file_name("ok.png")
                .mime_type("image/png"),
        )
        .add_part(
            "files",
            Part::bytes(vec![0u8; 8])
                .file_name("nope.txt")
                .mime_type("text/plain"),
        )
        .add_part(
            "files",
            Part::bytes(vec![0u8; 8])
                .file_name("also-ok.jpg")
                .mime_type("image/jpeg"),
        );
    let response = app
        .client()
        .post(&api_path("/images"))
        .add_header("x-gallery-password", TEST_PASSWORD)
        .add_header("x-forwarded-for", CLIENT_A)
        .multipart(form)
        .await;

    let body: Value = response.json();
    assert_eq!(body["uploaded"], 2);
    assert_eq!(body["rateLimit"]["remaining"], 8);
    assert_eq!(app.state.quota.peek(CLIENT_A).remaining, 8);
}

#[tokio::test]
async fn test_quota_status_endpoint() {
    let mut config = test_config();
    config.daily_image_limit = 10;
    let app = setup_test_app_with(config).await;

    let response = upload(&app, CLIENT_A, 4).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .client()
        .get(&api_path("/quota"))
        .add_header("x-gallery-password", TEST_PASSWORD)
        .add_header("x-forwarded-for", CLIENT_A)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["remaining"], 6);
    assert_eq!(body["limit"], 10);
    assert!(body.get("resetTime").is_some());
}
