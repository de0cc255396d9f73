use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{WebhookEventRecord, WebhookEventStatus},
    traits::LedgerEntry,
};

/// Records a new event, claimed by the caller as `Applying`. Returns `false` if an event with the same id is already
/// in the ledger.
pub async fn insert_event(entry: &LedgerEntry, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO webhook_events (event_id, order_id, event_type, status, claimed_at) VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(entry.event_id.as_str())
    .bind(entry.order_id.as_str())
    .bind(entry.event_type.as_str())
    .bind(WebhookEventStatus::Applying.to_string())
    .bind(entry.claimed_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_event(event_id: &str, conn: &mut SqliteConnection) -> Result<Option<WebhookEventRecord>, sqlx::Error> {
    let records: Vec<WebhookEventRecord> =
        sqlx::query_as("SELECT * FROM webhook_events WHERE event_id = $1").bind(event_id).fetch_all(conn).await?;
    Ok(records.into_iter().next())
}

/// Takes over an event whose effects are unfinished. The event can be claimed if it was released, or if the previous
/// claim was made at or before `stale_before`. The check and the update are one statement, so at most one caller
/// gets `true`.
pub async fn claim_event(
    event_id: &str,
    claimed_at: DateTime<Utc>,
    stale_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE webhook_events SET status = $1, claimed_at = $2, updated_at = CURRENT_TIMESTAMP
            WHERE event_id = $3 AND (
                status = $4 OR
                (status = $1 AND (claimed_at IS NULL OR julianday(claimed_at) <= julianday($5)))
            )
        "#,
    )
    .bind(WebhookEventStatus::Applying.to_string())
    .bind(claimed_at)
    .bind(event_id)
    .bind(WebhookEventStatus::Released.to_string())
    .bind(stale_before)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_event_status(
    event_id: &str,
    status: WebhookEventStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE webhook_events SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE event_id = $2")
        .bind(status.to_string())
        .bind(event_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
