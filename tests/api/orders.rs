use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use sqlx::PgPool;

use uuid::Uuid;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use cafe::domain::Role;

use crate::helpers::{data, TestApp};

fn order(product_id: Uuid, quantity: i32, coupon: Option<&str>) -> Value {
    json!({
        "items": [{ "productId": product_id, "quantity": quantity }],
        "customer": {
            "name": "Ada Lovelace",
            "email": "ada@test.com",
            "phone": "555-0100",
        },
        "paymentMethod": "cash",
        "couponCode": coupon,
    })
}

async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
    sqlx::query_scalar("select stock from products where id=$1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("Failed to fetch product stock")
}

#[sqlx::test]
async fn placing_an_order_prices_it_from_the_catalog(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    let latte = app.create_product("Latte", 4.5, 10).await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app.post_json("api/orders", &order(latte, 2, None)).await;
    assert_eq!(StatusCode::CREATED, res.status());

    let placed: Value = data(res).await;
    assert_eq!(Some(9.0), placed["total"].as_f64());
    assert_eq!("pending", placed["status"]);
    assert_eq!(1, placed["items"].as_array().unwrap().len());
    assert!(placed["orderNumber"].as_str().unwrap().starts_with("FC"));

    assert_eq!(8, stock_of(&pool, latte).await);

    let number = placed["orderNumber"].as_str().unwrap();
    let found: Value = data(app.get(&format!("api/orders/{}", number)).await).await;
    assert_eq!(placed["id"], found["id"]);

    Ok(())
}

#[sqlx::test]
async fn orders_cannot_oversell_stock(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    let scone = app.create_product("Scone", 3.0, 1).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let first = app.post_json("api/orders", &order(scone, 1, None)).await;
    let second = app.post_json("api/orders", &order(scone, 1, None)).await;

    assert_eq!(StatusCode::CREATED, first.status());
    assert_eq!(StatusCode::BAD_REQUEST, second.status());
    assert_eq!(0, stock_of(&pool, scone).await);

    let count: i64 = sqlx::query_scalar("select count(*) from orders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(1, count);

    Ok(())
}

#[sqlx::test]
async fn coupons_are_applied_at_checkout(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Admin).await;
    let cake = app.create_product("Cake", 20.0, 5).await;
    app.create_coupon(&json!({ "code": "SAVE10", "type": "percentage", "value": 10 }))
        .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let placed: Value = data(
        app.post_json("api/orders", &order(cake, 1, Some("save10")))
            .await,
    )
    .await;

    assert_eq!(Some(20.0), placed["subtotal"].as_f64());
    assert_eq!(Some(2.0), placed["discount"].as_f64());
    assert_eq!(Some(18.0), placed["total"].as_f64());
    assert_eq!("SAVE10", placed["couponCode"]);

    Ok(())
}

#[sqlx::test]
async fn cancelling_an_order_restores_stock(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_as(&pool, Role::Editor).await;
    let mocha = app.create_product("Mocha", 5.0, 3).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let placed: Value = data(app.post_json("api/orders", &order(mocha, 3, None)).await).await;
    let id = placed["id"].as_str().unwrap();
    assert_eq!(0, stock_of(&pool, mocha).await);

    let res = app
        .send_json(
            Method::PATCH,
            &format!("api/admin/orders/{}", id),
            &json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(3, stock_of(&pool, mocha).await);

    // Cancelled orders are final
    let res = app
        .send_json(
            Method::PATCH,
            &format!("api/admin/orders/{}", id),
            &json!({ "status": "confirmed" }),
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn empty_carts_are_rejected(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let mut body = order(Uuid::new_v4(), 1, None);
    body["items"] = json!([]);

    let res = app.post_json("api/orders", &body).await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}
