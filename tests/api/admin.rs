use reqwest::{header, Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use uuid::Uuid;

use cafe::domain::Role;

use crate::helpers::{data, TestApp, TestUser};

#[sqlx::test]
async fn admin_api_rejects_anonymous_requests(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.get("api/admin/blogs").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(Some(false), body["success"].as_bool());

    Ok(())
}

#[sqlx::test]
async fn admin_pages_redirect_to_login(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.get("admin").await;

    assert_eq!(StatusCode::SEE_OTHER, res.status());
    assert_eq!(res.headers()[header::LOCATION], "/login");

    Ok(())
}

#[sqlx::test]
async fn wrong_passwords_are_rejected(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::register(&pool, Role::Admin).await;

    let res = app
        .post_json(
            "api/auth/login",
            &json!({ "email": user.email, "password": "not-the-password" }),
        )
        .await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let unknown = app
        .post_json(
            "api/auth/login",
            &json!({ "email": "nobody@cafe.test", "password": "whatever" }),
        )
        .await;
    assert_eq!(StatusCode::UNAUTHORIZED, unknown.status());

    Ok(())
}

#[sqlx::test]
async fn logging_in_opens_the_admin_api(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = app.login_as(&pool, Role::Editor).await;

    let me: Value = data(app.get("api/auth/me").await).await;
    assert_eq!(user.email, me["email"]);

    let res = app.get("api/admin/blogs").await;
    assert_eq!(StatusCode::OK, res.status());

    Ok(())
}

#[sqlx::test]
async fn logging_out_closes_the_admin_api(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;

    let res = app
        .request(Method::POST, "api/auth/logout")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = app.get("api/admin/orders").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}

#[sqlx::test]
async fn editors_cannot_perform_admin_only_actions(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Editor).await;

    let res = app
        .request(
            Method::DELETE,
            &format!("api/admin/subscribers/{}", Uuid::new_v4()),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    let res = app.get("api/admin/newsletters").await;
    assert_eq!(StatusCode::FORBIDDEN, res.status());

    Ok(())
}

#[sqlx::test]
async fn admins_get_not_found_for_missing_rows(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;

    let res = app
        .request(
            Method::DELETE,
            &format!("api/admin/subscribers/{}", Uuid::new_v4()),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn malformed_ids_are_bad_requests(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;

    let res = app.get("api/admin/orders/not-a-uuid").await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let body: Value = res.json().await.unwrap();
    assert_eq!(Some(false), body["success"].as_bool());

    Ok(())
}
