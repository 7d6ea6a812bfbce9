use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{PgConnection, PgExecutor, PgPool};

use thiserror::Error;

use uuid::Uuid;

use crate::domain::{
    normalize_code, round_cents, CouponError, CouponKind, Discount, OrderNumber, OrderStatus,
};
use crate::error::RestError;
use crate::model::{Coupon, NewOrder, Order, OrderWithItems};
use crate::repo::{CouponsRepo, OrderPricing, OrdersRepo, ProductsRepo};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Invalid(String),
    #[error("Coupon not found")]
    CouponNotFound,
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error("Order not found")]
    OrderNotFound,
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Failed to generate a unique order number")]
    OrderNumberExhausted,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<CheckoutError> for RestError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Invalid(_)
            | CheckoutError::Coupon(_)
            | CheckoutError::InvalidTransition { .. } => RestError::Validation(e.to_string()),
            CheckoutError::CouponNotFound | CheckoutError::OrderNotFound => {
                RestError::NotFound(e.to_string())
            }
            CheckoutError::OrderNumberExhausted => RestError::InternalError(e.to_string()),
            CheckoutError::Database(e) => e.into(),
        }
    }
}

/// Discount preview returned to the storefront
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
    #[serde(flatten)]
    pub discount: Discount,
    pub coupon_type: CouponKind,
    pub coupon_value: f64,
}

async fn find_coupon<'con>(
    executor: impl PgExecutor<'con>,
    code: &str,
) -> Result<Coupon, CheckoutError> {
    let code = normalize_code(code).ok_or(CheckoutError::CouponNotFound)?;
    CouponsRepo::fetch_by_code(executor, &code)
        .await?
        .ok_or(CheckoutError::CouponNotFound)
}

/// Price `amount` with the coupon `code`, leaving the coupon untouched
#[tracing::instrument(name = "Apply coupon", skip(pool))]
pub async fn apply_coupon(
    pool: &PgPool,
    code: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> Result<CouponQuote, CheckoutError> {
    if code.trim().is_empty() {
        return Err(CheckoutError::Invalid("couponCode is required".into()));
    }
    let coupon = find_coupon(pool, code).await?;
    let discount = coupon.terms().apply(amount, now)?;

    Ok(CouponQuote {
        discount,
        coupon_type: coupon.kind,
        coupon_value: coupon.value,
    })
}

fn validate(order: &NewOrder) -> Result<(), CheckoutError> {
    if order.items.is_empty() {
        return Err(CheckoutError::Invalid("Cart is empty".into()));
    }
    if order.items.iter().any(|item| item.quantity < 1) {
        return Err(CheckoutError::Invalid("Quantities must be at least 1".into()));
    }
    if order.customer.phone.trim().is_empty() {
        return Err(CheckoutError::Invalid("Customer phone is required".into()));
    }
    Ok(())
}

/// Place an order in a single transaction.
///
/// Prices come from the catalog. Stock is taken with a conditional update,
/// so two orders racing for the last unit cannot both succeed.
#[tracing::instrument(name = "Place order", skip(pool, order), fields(items = order.items.len()))]
pub async fn place_order(
    pool: &PgPool,
    order: &NewOrder,
    now: DateTime<Utc>,
) -> Result<OrderWithItems, CheckoutError> {
    validate(order)?;

    let mut tx = pool.begin().await?;

    let mut lines = Vec::with_capacity(order.items.len());
    let mut subtotal = 0.0;
    for item in &order.items {
        let product = ProductsRepo::fetch(&mut *tx, item.product_id)
            .await?
            .filter(|product| product.active)
            .ok_or_else(|| {
                CheckoutError::Invalid(format!("Product {} is not available", item.product_id))
            })?;
        if !ProductsRepo::decrement_stock(&mut *tx, product.id, item.quantity).await? {
            return Err(CheckoutError::Invalid(format!(
                "Insufficient stock for {}",
                product.title
            )));
        }

        let line_total = round_cents(product.price * f64::from(item.quantity));
        subtotal += line_total;
        lines.push((product, item.quantity, line_total));
    }
    let subtotal = round_cents(subtotal);

    let (discount, coupon_code) = match order.coupon_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let coupon = find_coupon(&mut *tx, code).await?;
            let discount = coupon.terms().apply(subtotal, now)?;
            (discount.discount_applied, Some(coupon.code))
        }
        _ => (0.0, None),
    };
    let pricing = OrderPricing {
        subtotal,
        discount,
        total: round_cents(subtotal - discount),
        coupon_code,
    };

    let created = insert_order(&mut tx, order, &pricing, now).await?;

    let mut items = Vec::with_capacity(lines.len());
    for (product, quantity, line_total) in lines {
        let item = OrdersRepo::insert_item(
            &mut *tx,
            created.id,
            product.id,
            &product.title,
            product.price,
            quantity,
            line_total,
        )
        .await?;
        items.push(item);
    }

    tx.commit().await?;
    tracing::info!(order_number = %created.order_number, total = created.total, "Order placed");

    Ok(OrderWithItems {
        order: created,
        items,
    })
}

async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
    pricing: &OrderPricing,
    now: DateTime<Utc>,
) -> Result<Order, CheckoutError> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let number = OrderNumber::generate(now);
        let inserted = OrdersRepo::insert(
            &mut *conn,
            &number,
            &order.customer,
            order.payment_method,
            pricing,
        )
        .await?;
        match inserted {
            Some(created) => return Ok(created),
            None => tracing::warn!(order_number = %number, "Order number collision, retrying"),
        }
    }
    Err(CheckoutError::OrderNumberExhausted)
}

/// An order together with its line items
pub async fn load_order(pool: &PgPool, order: Order) -> Result<OrderWithItems, CheckoutError> {
    let items = OrdersRepo::items(pool, order.id).await?;
    Ok(OrderWithItems { order, items })
}

async fn restore_stock(conn: &mut PgConnection, order_id: Uuid) -> Result<(), CheckoutError> {
    for item in OrdersRepo::items(&mut *conn, order_id).await? {
        if let Some(product_id) = item.product_id {
            ProductsRepo::restore_stock(&mut *conn, product_id, item.quantity).await?;
        }
    }
    Ok(())
}

/// Move an order to `next`, putting stock back when it is cancelled
#[tracing::instrument(name = "Change order status", skip(pool))]
pub async fn change_status(
    pool: &PgPool,
    id: Uuid,
    next: OrderStatus,
) -> Result<OrderWithItems, CheckoutError> {
    let mut tx = pool.begin().await?;
    let current = OrdersRepo::fetch_for_update(&mut *tx, id)
        .await?
        .ok_or(CheckoutError::OrderNotFound)?;

    if !current.status.can_transition_to(next) {
        return Err(CheckoutError::InvalidTransition {
            from: current.status,
            to: next,
        });
    }

    let order = if current.status == next {
        current
    } else {
        if next == OrderStatus::Cancelled {
            restore_stock(&mut tx, id).await?;
        }
        OrdersRepo::update_status(&mut *tx, id, next).await?
    };
    let items = OrdersRepo::items(&mut *tx, id).await?;
    tx.commit().await?;

    Ok(OrderWithItems { order, items })
}

/// Delete an order; stock comes back unless the cancellation already returned it
#[tracing::instrument(name = "Delete order", skip(pool))]
pub async fn delete_order(pool: &PgPool, id: Uuid) -> Result<(), CheckoutError> {
    let mut tx = pool.begin().await?;
    let order = OrdersRepo::fetch_for_update(&mut *tx, id)
        .await?
        .ok_or(CheckoutError::OrderNotFound)?;

    if order.status != OrderStatus::Cancelled {
        restore_stock(&mut tx, id).await?;
    }
    OrdersRepo::delete(&mut *tx, id).await?;
    tx.commit().await?;

    Ok(())
}
