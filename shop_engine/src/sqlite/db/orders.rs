use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, UserId},
    traits::StatusChange,
};

/// Inserts a new order and its line items using the given connection. This is not atomic on its own. Embed the call
/// in a transaction and pass `&mut tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let inserted: Vec<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                user_id,
                address,
                city,
                postal_code,
                country,
                payment_method,
                items_price,
                tax_price,
                shipping_price,
                total_price,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.user_id.as_str())
    .bind(order.shipping_address.address)
    .bind(order.shipping_address.city)
    .bind(order.shipping_address.postal_code)
    .bind(order.shipping_address.country)
    .bind(order.payment_method)
    .bind(order.items_price.value())
    .bind(order.tax_price.value())
    .bind(order.shipping_price.value())
    .bind(order.total_price.value())
    .bind(OrderStatusType::AwaitingPayment.to_string())
    .bind(order.created_at)
    .fetch_all(&mut *conn)
    .await?;
    let mut saved = inserted.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    let mut items = Vec::with_capacity(order.items.len());
    for item in order.items {
        let inserted: Vec<OrderItem> = sqlx::query_as(
            r#"
                INSERT INTO order_items (order_id, product_id, name, image, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *;
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(item.product_id.as_str())
        .bind(item.name)
        .bind(item.image)
        .bind(item.quantity)
        .bind(item.unit_price.value())
        .fetch_all(&mut *conn)
        .await?;
        items.extend(inserted);
    }
    saved.items = items;
    debug!("🗃️ Order [{}] inserted with id {} and {} lines", saved.order_id, saved.id, saved.items.len());
    Ok(saved)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

async fn with_items(mut order: Order, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    order.items = fetch_order_items(&order.order_id, conn).await?;
    Ok(order)
}

async fn with_items_all(orders: Vec<Order>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        result.push(with_items(order, &mut *conn).await?);
    }
    Ok(result)
}

/// Returns the order with the corresponding `order_id`, including its line items.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .next();
    match order {
        Some(order) => Ok(Some(with_items(order, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_orders_for_user(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id.as_str())
        .fetch_all(&mut *conn)
        .await?;
    with_items_all(orders, conn).await
}

pub async fn fetch_all_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC").fetch_all(&mut *conn).await?;
    with_items_all(orders, conn).await
}

/// Moves the order from `change.from` to `change.to` in a single conditional statement. The status check and the
/// update cannot be interleaved with another writer, so exactly one of any number of racing callers gets `Some`.
///
/// Paid, shipped and delivered timestamps are only ever set once.
pub async fn compare_and_set_status(
    change: &StatusChange,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let updated: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                is_paid = is_paid OR $2,
                paid_at = CASE WHEN $2 THEN COALESCE(paid_at, $3) ELSE paid_at END,
                payment_intent_id = COALESCE($4, payment_intent_id),
                shipped_at = CASE WHEN $5 THEN COALESCE(shipped_at, $3) ELSE shipped_at END,
                is_delivered = is_delivered OR $6,
                delivered_at = CASE WHEN $6 THEN COALESCE(delivered_at, $3) ELSE delivered_at END,
                updated_at = $3
            WHERE order_id = $7 AND status = $8
            RETURNING *;
        "#,
    )
    .bind(change.to.to_string())
    .bind(change.marks_paid())
    .bind(change.at)
    .bind(change.payment_intent_id.as_deref())
    .bind(change.marks_shipped())
    .bind(change.marks_delivered())
    .bind(change.order_id.as_str())
    .bind(change.from.to_string())
    .fetch_all(&mut *conn)
    .await?;
    let order = updated.into_iter().next();
    trace!(
        "🗃️ Status change for {}: {} -> {} {}",
        change.order_id,
        change.from,
        change.to,
        if order.is_some() { "applied" } else { "not applied" }
    );
    match order {
        Some(order) => Ok(Some(with_items(order, conn).await?)),
        None => Ok(None),
    }
}

/// Stores the checkout session handle on an order that is still awaiting payment.
pub async fn save_checkout_session(
    order_id: &OrderId,
    session_id: &str,
    payment_intent_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let updated: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                checkout_session_id = $1,
                payment_intent_id = COALESCE($2, payment_intent_id),
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(session_id)
    .bind(payment_intent_id)
    .bind(order_id.as_str())
    .bind(OrderStatusType::AwaitingPayment.to_string())
    .fetch_all(&mut *conn)
    .await?;
    let order = updated.into_iter().next();
    match order {
        Some(order) => Ok(Some(with_items(order, conn).await?)),
        None => Ok(None),
    }
}
