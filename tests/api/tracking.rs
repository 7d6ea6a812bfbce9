use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use cafe::domain::Role;

use crate::helpers::{data, TestApp};

#[sqlx::test]
async fn a_visitor_is_counted_once_per_day(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let first: Value = data(
        app.post_json("api/track/visit", &json!({ "sessionId": "session-a" }))
            .await,
    )
    .await;
    assert_eq!(Some(true), first["tracked"].as_bool());
    assert!(first["id"].is_string());

    // Same address, new browser session
    let second: Value = data(
        app.post_json("api/track/visit", &json!({ "sessionId": "session-b" }))
            .await,
    )
    .await;
    assert_eq!(Some(false), second["tracked"].as_bool());
    assert_eq!("Already tracked today", second["reason"]);

    let count: i64 = sqlx::query_scalar("select count(*) from visitors")
        .fetch_one(&pool)
        .await?;
    assert_eq!(1, count);

    Ok(())
}

#[sqlx::test]
async fn a_session_is_counted_once_per_day_across_addresses(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let body = json!({ "sessionId": "roaming" });

    let visit_from = |ip: &'static str| {
        app.request(Method::POST, "api/track/visit")
            .header("x-forwarded-for", ip)
            .json(&body)
            .send()
    };

    let first: Value = data(visit_from("203.0.113.10").await.expect("Failed to execute request")).await;
    assert_eq!(Some(true), first["tracked"].as_bool());

    let second: Value = data(visit_from("198.51.100.20").await.expect("Failed to execute request")).await;
    assert_eq!(Some(false), second["tracked"].as_bool());
    assert_eq!("Already tracked today", second["reason"]);

    let count: i64 = sqlx::query_scalar("select count(*) from visitors")
        .fetch_one(&pool)
        .await?;
    assert_eq!(1, count);

    Ok(())
}

#[sqlx::test]
async fn visits_need_a_session_id(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.post_json("api/track/visit", &json!({})).await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn repeat_blog_views_within_the_hour_collapse(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Editor).await;

    let res = app
        .post_json(
            "api/admin/blogs",
            &json!({
                "title": "Summer Menu",
                "content": "Cold brew is back.",
                "author": "Barista",
                "published": true,
            }),
        )
        .await;
    assert_eq!(StatusCode::CREATED, res.status());

    let body = json!({ "sessionId": "session-a", "blogSlug": "summer-menu" });

    let first: Value = data(app.post_json("api/track/blog-view", &body).await).await;
    assert_eq!(Some(true), first["tracked"].as_bool());
    assert_eq!(Some(1), first["totalViews"].as_i64());

    let second: Value = data(app.post_json("api/track/blog-view", &body).await).await;
    assert_eq!(Some(false), second["tracked"].as_bool());
    assert_eq!("Recently viewed", second["reason"]);
    assert_eq!(Some(1), second["totalViews"].as_i64());

    Ok(())
}

#[sqlx::test]
async fn a_new_session_from_the_same_address_does_not_count_as_a_view(
    pool: PgPool,
) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Editor).await;

    let res = app
        .post_json(
            "api/admin/blogs",
            &json!({
                "title": "Winter Roasts",
                "content": "Dark and smoky.",
                "author": "Roaster",
                "published": true,
            }),
        )
        .await;
    assert_eq!(StatusCode::CREATED, res.status());

    let first: Value = data(
        app.post_json(
            "api/track/blog-view",
            &json!({ "sessionId": "tab-one", "blogSlug": "winter-roasts" }),
        )
        .await,
    )
    .await;
    assert_eq!(Some(true), first["tracked"].as_bool());

    // Private window on the same machine
    let second: Value = data(
        app.post_json(
            "api/track/blog-view",
            &json!({ "sessionId": "tab-two", "blogSlug": "winter-roasts" }),
        )
        .await,
    )
    .await;
    assert_eq!(Some(false), second["tracked"].as_bool());
    assert_eq!("Recently viewed", second["reason"]);
    assert_eq!(Some(1), second["totalViews"].as_i64());

    Ok(())
}

#[sqlx::test]
async fn views_of_unknown_blogs_are_not_found(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .post_json(
            "api/track/blog-view",
            &json!({ "sessionId": "session-a", "blogSlug": "no-such-post" }),
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let res = app
        .post_json("api/track/blog-view", &json!({ "sessionId": "session-a" }))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}
