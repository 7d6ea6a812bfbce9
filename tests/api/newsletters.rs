use reqwest::{header, Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use cafe::domain::Role;

use crate::helpers::{data, TestApp, CRON_SECRET};

async fn add_subscribers(pool: &PgPool, count: usize) {
    for i in 0..count {
        sqlx::query("insert into subscribers(email) values ($1)")
            .bind(format!("reader{}@test.com", i))
            .execute(pool)
            .await
            .expect("Failed to insert subscriber");
    }
}

fn newsletter() -> Value {
    json!({
        "subject": "Autumn specials",
        "html": "<p>Pumpkin spice is back.</p>",
    })
}

#[sqlx::test]
async fn enqueued_newsletters_reach_every_subscriber(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    add_subscribers(&pool, 3).await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&app.email_server)
        .await;

    let res = app.post_json("api/admin/newsletters", &newsletter()).await;
    assert_eq!(StatusCode::CREATED, res.status());
    let job: Value = data(res).await;
    assert_eq!("pending", job["status"]);

    let outcome: Value = data(
        app.request(Method::POST, "api/admin/newsletters/process")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(Some(true), outcome["processed"].as_bool());
    assert_eq!("completed", outcome["job"]["status"]);
    assert_eq!(Some(3), outcome["job"]["sentCount"].as_i64());

    let logs: Vec<Value> = data(app.get("api/admin/newsletters/logs").await).await;
    assert_eq!(1, logs.len());
    assert_eq!(Some(3), logs[0]["recipientCount"].as_i64());

    let id = job["id"].as_str().unwrap();
    let progress: Value = data(app.get(&format!("api/admin/newsletters/{}", id)).await).await;
    assert_eq!(Some(3), progress["totalSubscribers"].as_i64());

    Ok(())
}

#[sqlx::test]
async fn processing_with_nothing_queued_is_a_no_op(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;

    let outcome: Value = data(
        app.request(Method::POST, "api/admin/newsletters/process")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(Some(false), outcome["processed"].as_bool());

    Ok(())
}

#[sqlx::test]
async fn newsletters_need_a_subject_and_body(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;

    let test_cases = vec![
        ("missing subject", json!({ "html": "<p>Hi</p>" })),
        ("blank subject", json!({ "subject": " ", "html": "<p>Hi</p>" })),
        ("blank html", json!({ "subject": "Hi", "html": "" })),
    ];

    for (desc, body) in test_cases {
        let res = app.post_json("api/admin/newsletters", &body).await;
        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "API did not fail when payload was {}",
            desc
        );
    }

    Ok(())
}

#[sqlx::test]
async fn the_cron_trigger_requires_the_shared_secret(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .request(Method::POST, "api/cron/newsletters")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app
        .request(Method::POST, "api/cron/newsletters")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app
        .request(Method::POST, "api/cron/newsletters")
        .header(header::AUTHORIZATION, format!("Bearer {}", CRON_SECRET))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    Ok(())
}
