use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cart, CartItem, LineItem, ProductId, UserId},
    shop_api::errors::ShopError,
    traits::{CartManagement, InventoryManagement},
};

/// `CartApi` manages each user's live cart, and freezes it into line items when an order is placed.
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CartApi<B>
where B: CartManagement + InventoryManagement
{
    /// Returns the user's cart. If the user has never added anything, an empty cart is created.
    pub async fn cart(&self, user_id: &UserId) -> Result<Cart, ShopError> {
        let cart = self.db.fetch_or_create_cart(user_id).await?;
        Ok(cart)
    }

    /// Adds `quantity` units of the product to the cart, capturing its current price, name and image.
    ///
    /// The combined quantity in the cart may not exceed the product's current stock.
    pub async fn add_item(&self, user_id: &UserId, product_id: &ProductId, quantity: i64) -> Result<Cart, ShopError> {
        if quantity < 1 {
            return Err(ShopError::ValidationError(format!("Quantity must be at least 1. Got {quantity}")));
        }
        let product =
            self.db.fetch_product(product_id).await?.ok_or_else(|| ShopError::ProductNotFound(product_id.clone()))?;
        let cart = self.db.fetch_or_create_cart(user_id).await?;
        let in_cart =
            cart.items.iter().find(|i| &i.product_id == product_id).map(|i| i.quantity).unwrap_or_default();
        if in_cart + quantity > product.stock {
            debug!("🛒️ {user_id} wants {} of {product_id}, but only {} are in stock", in_cart + quantity, product.stock);
            return Err(ShopError::InsufficientStock { product: product_id.clone(), available: product.stock });
        }
        let item =
            CartItem { product_id: product.product_id, quantity, price: product.price, name: product.name, image: product.image };
        let cart = self.db.add_cart_item(user_id, item).await?;
        trace!("🛒️ {user_id} added {quantity} of {product_id} to their cart");
        Ok(cart)
    }

    pub async fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart, ShopError> {
        let cart = self.db.remove_cart_item(user_id, product_id).await?;
        trace!("🛒️ {user_id} removed {product_id} from their cart");
        Ok(cart)
    }

    /// Freezes the user's cart into an immutable list of line items.
    ///
    /// Every line is re-validated against the live catalog: the product must still exist and have enough stock for the
    /// requested quantity. Unit prices, names and images are re-read from the catalog, so a stale cart price is never
    /// carried into an order.
    pub async fn snapshot(&self, user_id: &UserId) -> Result<Vec<LineItem>, ShopError> {
        let cart = self.db.fetch_or_create_cart(user_id).await?;
        if cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        let mut items = Vec::with_capacity(cart.items.len());
        for line in cart.items {
            let product = self
                .db
                .fetch_product(&line.product_id)
                .await?
                .ok_or_else(|| ShopError::ProductNotFound(line.product_id.clone()))?;
            if line.quantity > product.stock {
                info!(
                    "🛒️ Cannot snapshot cart for {user_id}. {} of {} requested, but only {} available",
                    line.quantity, product.product_id, product.stock
                );
                return Err(ShopError::InsufficientStock { product: product.product_id, available: product.stock });
            }
            if line.price != product.price {
                debug!(
                    "🛒️ Price of {} changed from {} to {} since it was added to the cart",
                    product.product_id, line.price, product.price
                );
            }
            items.push(LineItem {
                product_id: product.product_id,
                name: product.name,
                image: product.image,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }
        Ok(items)
    }

    /// Empties the user's cart. Clearing an empty cart is a no-op.
    pub async fn clear(&self, user_id: &UserId) -> Result<(), ShopError> {
        self.db.clear_cart(user_id).await?;
        debug!("🛒️ Cart for {user_id} cleared");
        Ok(())
    }
}
