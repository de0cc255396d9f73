use crate::{
    db_types::{NewOrder, Order, OrderId, UserId},
    traits::{StatusChange, StoreError},
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order and its line items in a single atomic transaction.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// The user's orders, newest first.
    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError>;

    /// Every order in the store, newest first.
    async fn fetch_all_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Applies the status change as a single conditional update.
    ///
    /// Returns the updated order if the order was in `change.from`, or `None` if it was not (or does not exist). Of
    /// any number of concurrent callers racing on the same change, exactly one receives `Some`.
    async fn compare_and_set_status(&self, change: StatusChange) -> Result<Option<Order>, StoreError>;

    /// Stores the checkout session handle on the order, replacing any previous one. The update only takes effect while
    /// the order is still awaiting payment. Returns `None` if the order is in any other state.
    async fn save_checkout_session(
        &self,
        order_id: &OrderId,
        session_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<Option<Order>, StoreError>;
}
