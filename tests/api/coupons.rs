use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use cafe::domain::Role;

use crate::helpers::{data, TestApp};

#[sqlx::test]
async fn coupons_discount_the_total(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    app.create_coupon(&json!({ "code": "save10", "type": "percentage", "value": 10 }))
        .await;

    let quote: Value = data(
        app.post_json(
            "api/coupons/apply",
            &json!({ "couponCode": "SAVE10", "totalAmount": 100.0 }),
        )
        .await,
    )
    .await;

    assert_eq!(Some(90.0), quote["discountedAmount"].as_f64());
    assert_eq!(Some(10.0), quote["discountApplied"].as_f64());
    assert_eq!("percentage", quote["couponType"]);

    Ok(())
}

#[sqlx::test]
async fn fixed_coupons_never_go_below_zero(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    app.create_coupon(&json!({ "code": "FIVER", "type": "fixed", "value": 5 }))
        .await;

    let quote: Value = data(
        app.post_json(
            "api/coupons/apply",
            &json!({ "couponCode": "fiver", "totalAmount": 3.5 }),
        )
        .await,
    )
    .await;

    assert_eq!(Some(0.0), quote["discountedAmount"].as_f64());
    assert_eq!(Some(3.5), quote["discountApplied"].as_f64());

    Ok(())
}

#[sqlx::test]
async fn inactive_and_expired_coupons_are_rejected(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    app.create_coupon(&json!({ "code": "OFF", "type": "fixed", "value": 5, "active": false }))
        .await;
    app.create_coupon(&json!({
        "code": "OLD",
        "type": "fixed",
        "value": 5,
        "expiresAt": "2020-01-01T00:00:00Z",
    }))
    .await;

    for code in ["OFF", "OLD"] {
        let res = app
            .post_json(
                "api/coupons/apply",
                &json!({ "couponCode": code, "totalAmount": 20.0 }),
            )
            .await;
        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "{} was accepted", code);
    }

    Ok(())
}

#[sqlx::test]
async fn unknown_coupons_are_not_found(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app
        .post_json(
            "api/coupons/apply",
            &json!({ "couponCode": "NOPE", "totalAmount": 20.0 }),
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn coupon_codes_are_unique(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    app.create_coupon(&json!({ "code": "SAVE10", "type": "percentage", "value": 10 }))
        .await;

    let res = app
        .send_json(
            Method::POST,
            "api/admin/coupons",
            &json!({ "code": "save10", "type": "fixed", "value": 1 }),
        )
        .await;
    assert_eq!(StatusCode::CONFLICT, res.status());

    Ok(())
}
