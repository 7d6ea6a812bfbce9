use reqwest::StatusCode;

use serde_json::json;

use sqlx::PgPool;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

#[sqlx::test]
async fn subscribe_stores_the_subscriber_and_sends_a_welcome(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .post_json("api/subscribers", &json!({ "email": "reader@test.com" }))
        .await;
    assert_eq!(StatusCode::CREATED, res.status());

    let email: String = sqlx::query_scalar("select email from subscribers")
        .fetch_one(&pool)
        .await?;
    assert_eq!("reader@test.com", email);

    Ok(())
}

#[sqlx::test]
async fn duplicate_subscriptions_conflict(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let body = json!({ "email": "reader@test.com" });
    let first = app.post_json("api/subscribers", &body).await;
    let second = app.post_json("api/subscribers", &body).await;

    assert_eq!(StatusCode::CREATED, first.status());
    assert_eq!(StatusCode::CONFLICT, second.status());

    Ok(())
}

#[sqlx::test]
async fn a_failing_welcome_email_keeps_the_signup(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let res = app
        .post_json("api/subscribers", &json!({ "email": "reader@test.com" }))
        .await;
    assert_eq!(StatusCode::CREATED, res.status());

    Ok(())
}

#[sqlx::test]
async fn invalid_emails_are_rejected(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let test_cases = vec![
        ("malformed email", json!({ "email": "bad email address" })),
        ("empty email", json!({ "email": "" })),
        ("missing email", json!({})),
    ];

    for (desc, body) in test_cases {
        let res = app.post_json("api/subscribers", &body).await;

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "API did not fail when payload was {}",
            desc
        );
    }
    Ok(())
}
