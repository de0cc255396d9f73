use crate::{
    db_types::WebhookEventRecord,
    traits::{LedgerEntry, LedgerOutcome, StatusChange, StoreError},
};

/// A persistent record of the payment-provider events that have been processed.
#[allow(async_fn_in_trait)]
pub trait WebhookLedger {
    async fn fetch_webhook_event(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, StoreError>;

    /// In a single atomic transaction, records the event in the ledger and applies the status change.
    ///
    /// * A new event that wins the status change is recorded as `Applying`, claimed by this caller, and
    ///   [`LedgerOutcome::Applied`] is returned.
    /// * A new event that loses the status change is recorded as `Completed` and [`LedgerOutcome::Duplicate`] is
    ///   returned.
    /// * A known event whose order is already in `change.to` returns [`LedgerOutcome::Resumed`] only if this caller
    ///   wins the claim on it: the event was `Released`, or its claim is older than `entry.stale_before`. At most one
    ///   caller wins.
    /// * Any other known event, including one that another delivery is still applying, returns
    ///   [`LedgerOutcome::Duplicate`].
    async fn record_payment_event(&self, entry: LedgerEntry, change: StatusChange)
        -> Result<LedgerOutcome, StoreError>;

    /// Marks the event as `Completed`, once all of its follow-up effects have been applied.
    async fn complete_webhook_event(&self, event_id: &str) -> Result<(), StoreError>;

    /// Gives up the claim on an event whose follow-up effects could not be completed, so that the next delivery can
    /// take them over straight away.
    async fn release_webhook_event(&self, event_id: &str) -> Result<(), StoreError>;
}
