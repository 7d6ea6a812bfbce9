use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{OrderNumber, OrderStatus, PaymentMethod};
use crate::model::{CustomerDetails, Order, OrderItem};

const COLUMNS: &str = "id, order_number, customer_name, customer_email, customer_phone, \
                       delivery_address, notes, subtotal, discount, total, coupon_code, \
                       status, payment_method, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, title, price, quantity, total";

/// Server-side totals of an order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPricing {
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub coupon_code: Option<String>,
}

pub struct OrdersRepo;

impl OrdersRepo {
    /// Insert a pending order.
    ///
    /// Returns `None` if `number` is already taken so the caller can retry with a fresh one.
    #[tracing::instrument(name = "Insert order", skip(executor, customer, pricing), fields(order_number = %number))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        number: &OrderNumber,
        customer: &CustomerDetails,
        payment_method: PaymentMethod,
        pricing: &OrderPricing,
    ) -> sqlx::Result<Option<Order>> {
        let query = format!(
            "insert into orders(order_number, customer_name, customer_email, customer_phone, \
             delivery_address, notes, subtotal, discount, total, coupon_code, payment_method) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             on conflict (order_number) do nothing \
             returning {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(number.as_ref())
            .bind(customer.name.as_ref())
            .bind(customer.email.as_ref())
            .bind(&customer.phone)
            .bind(&customer.address)
            .bind(&customer.notes)
            .bind(pricing.subtotal)
            .bind(pricing.discount)
            .bind(pricing.total)
            .bind(&pricing.coupon_code)
            .bind(payment_method.as_ref())
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Insert order item", skip(executor))]
    pub async fn insert_item<'con>(
        executor: impl PgExecutor<'con>,
        order_id: Uuid,
        product_id: Uuid,
        title: &str,
        price: f64,
        quantity: i32,
        total: f64,
    ) -> sqlx::Result<OrderItem> {
        let query = format!(
            "insert into order_items(order_id, product_id, title, price, quantity, total) \
             values ($1, $2, $3, $4, $5, $6) returning {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .bind(product_id)
            .bind(title)
            .bind(price)
            .bind(quantity)
            .bind(total)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "List orders", skip(executor))]
    pub async fn list<'con>(
        executor: impl PgExecutor<'con>,
        status: Option<OrderStatus>,
    ) -> sqlx::Result<Vec<Order>> {
        let query = format!(
            "select {COLUMNS} from orders where $1::text is null or status=$1 \
             order by created_at desc"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(status.map(|s| s.to_string()))
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch order", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Order>> {
        let query = format!("select {COLUMNS} from orders where id=$1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Fetch and row-lock an order for a status change
    #[tracing::instrument(name = "Fetch order for update", skip(executor))]
    pub async fn fetch_for_update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Order>> {
        let query = format!("select {COLUMNS} from orders where id=$1 for update");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch order by number", skip(executor))]
    pub async fn fetch_by_number<'con>(
        executor: impl PgExecutor<'con>,
        order_number: &str,
    ) -> sqlx::Result<Option<Order>> {
        let query = format!("select {COLUMNS} from orders where order_number=$1");
        sqlx::query_as::<_, Order>(&query)
            .bind(order_number)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch order items", skip(executor))]
    pub async fn items<'con>(
        executor: impl PgExecutor<'con>,
        order_id: Uuid,
    ) -> sqlx::Result<Vec<OrderItem>> {
        let query = format!("select {ITEM_COLUMNS} from order_items where order_id=$1 order by title");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Update order status", skip(executor))]
    pub async fn update_status<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        status: OrderStatus,
    ) -> sqlx::Result<Order> {
        let query = format!(
            "update orders set status=$2, updated_at=now() where id=$1 returning {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(status.as_ref())
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Delete order", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from orders where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
