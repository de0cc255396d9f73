use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{Cart, CartItem, ProductId, UserId};

/// Returns the user's cart, creating an empty one first if there is none.
pub async fn fetch_or_create_cart(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id.as_str())
        .execute(&mut *conn)
        .await?;
    let stamps: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as("SELECT created_at, updated_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_all(&mut *conn)
            .await?;
    let (created_at, updated_at) = stamps.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    let items = fetch_cart_items(user_id, conn).await?;
    Ok(Cart { user_id: user_id.clone(), items, created_at, updated_at })
}

/// Cart lines, in the order they were first added.
pub async fn fetch_cart_items(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT product_id, quantity, price, name, image FROM cart_items WHERE user_id = $1 ORDER BY rowid ASC",
    )
    .bind(user_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Adds the item to an existing cart. Quantities for a product that is already in the cart are summed.
pub async fn upsert_cart_item(user_id: &UserId, item: CartItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (user_id, product_id, quantity, price, name, image) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + excluded.quantity,
                price = excluded.price,
                name = excluded.name,
                image = excluded.image;
        "#,
    )
    .bind(user_id.as_str())
    .bind(item.product_id.as_str())
    .bind(item.quantity)
    .bind(item.price.value())
    .bind(item.name)
    .bind(item.image)
    .execute(&mut *conn)
    .await?;
    touch_cart(user_id, conn).await
}

/// Removes the product's line from the cart. Returns `false` if there was no such line.
pub async fn remove_cart_item(
    user_id: &UserId,
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id.as_str())
        .bind(product_id.as_str())
        .execute(&mut *conn)
        .await?;
    touch_cart(user_id, conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes every line in the cart, but keeps the cart itself. Returns the number of lines removed.
pub async fn clear_cart(user_id: &UserId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id.as_str()).execute(&mut *conn).await?;
    touch_cart(user_id, conn).await?;
    Ok(result.rows_affected())
}

async fn touch_cart(user_id: &UserId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE user_id = $1")
        .bind(user_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
