use crate::{
    db_types::{Cart, CartItem, ProductId, UserId},
    traits::StoreError,
};

/// Storage for the live carts. There is at most one cart per user.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Fetches the user's cart, creating an empty one if the user does not have one yet.
    async fn fetch_or_create_cart(&self, user_id: &UserId) -> Result<Cart, StoreError>;

    /// Adds the item to the user's cart. If the product is already in the cart, the quantities are added together and
    /// the captured price, name and image are refreshed.
    async fn add_cart_item(&self, user_id: &UserId, item: CartItem) -> Result<Cart, StoreError>;

    async fn remove_cart_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart, StoreError>;

    /// Removes every line from the user's cart. Clearing an empty or missing cart is not an error.
    async fn clear_cart(&self, user_id: &UserId) -> Result<(), StoreError>;
}
