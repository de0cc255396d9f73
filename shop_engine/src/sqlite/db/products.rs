use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, OrderId, Product, ProductId};

pub async fn fetch_product(product_id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let products: Vec<Product> = sqlx::query_as("SELECT * FROM products WHERE product_id = $1")
        .bind(product_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(products.into_iter().next())
}

pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let saved: Vec<Product> = sqlx::query_as(
        r#"
            INSERT INTO products (product_id, name, image, price, stock) VALUES ($1, $2, $3, $4, MAX(0, $5))
            ON CONFLICT (product_id) DO UPDATE SET
                name = excluded.name,
                image = excluded.image,
                price = excluded.price,
                stock = excluded.stock,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(product.product_id.as_str())
    .bind(product.name)
    .bind(product.image)
    .bind(product.price.value())
    .bind(product.stock)
    .fetch_all(conn)
    .await?;
    saved.into_iter().next().ok_or(sqlx::Error::RowNotFound)
}

/// Atomically subtracts `quantity` from the stock, clamping at zero. Returns `None` if the product does not exist.
pub async fn decrement_stock(
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let stock: Vec<i64> = sqlx::query_scalar(
        "UPDATE products SET stock = MAX(0, stock - $1), updated_at = CURRENT_TIMESTAMP WHERE product_id = $2 RETURNING \
         stock",
    )
    .bind(quantity)
    .bind(product_id.as_str())
    .fetch_all(conn)
    .await?;
    let stock = stock.into_iter().next();
    trace!("🗃️ Decremented stock for {product_id} by {quantity}: {stock:?}");
    Ok(stock)
}

pub async fn increment_stock(
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let stock: Vec<i64> = sqlx::query_scalar(
        "UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE product_id = $2 RETURNING stock",
    )
    .bind(quantity)
    .bind(product_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(stock.into_iter().next())
}

pub async fn set_stock(product_id: &ProductId, stock: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let updated: Vec<i64> = sqlx::query_scalar(
        "UPDATE products SET stock = MAX(0, $1), updated_at = CURRENT_TIMESTAMP WHERE product_id = $2 RETURNING stock",
    )
    .bind(stock)
    .bind(product_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(updated.into_iter().next())
}

/// Records that stock for this order line is being taken. Returns `false` if it had already been recorded.
pub async fn record_stock_movement(
    order_id: &OrderId,
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO stock_movements (order_id, product_id, quantity) VALUES ($1, $2, $3) ON CONFLICT (order_id, \
         product_id) DO NOTHING",
    )
    .bind(order_id.as_str())
    .bind(product_id.as_str())
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
