use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use cafe::domain::Role;

use crate::helpers::{data, TestApp};

#[sqlx::test]
async fn saved_sections_are_served_publicly(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.get("api/content/home").await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    app.login_as(&pool, Role::Editor).await;
    let saved: Value = data(
        app.send_json(
            Method::PUT,
            "api/admin/content/home",
            &json!({ "tagline": "Roasted down the road" }),
        )
        .await,
    )
    .await;
    assert_eq!("home", saved["section"]);

    let home: Value = data(app.get("api/content/home").await).await;
    assert_eq!("Roasted down the road", home["content"]["tagline"]);

    Ok(())
}

#[sqlx::test]
async fn section_names_and_bodies_are_validated(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Editor).await;

    let res = app
        .send_json(Method::PUT, "api/admin/content/Not%20A%20Slug", &json!({}))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let res = app
        .send_json(Method::PUT, "api/admin/content/about", &json!(["not", "an", "object"]))
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}
