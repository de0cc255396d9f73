use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach Stripe: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Stripe request timed out")]
    Timeout,
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl StripeApiError {
    /// Whether Stripe received and refused the request, as opposed to the request never getting there.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StripeApiError::QueryError { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Malformed Stripe-Signature header: {0}")]
    MalformedHeader(String),
    #[error("Stripe-Signature header has no timestamp")]
    MissingTimestamp,
    #[error("Stripe-Signature header has no v1 signature")]
    MissingSignature,
    #[error("Timestamp is outside the tolerance zone ({age}s old, {tolerance}s allowed)")]
    TimestampOutOfTolerance { age: i64, tolerance: i64 },
    #[error("No signatures found matching the expected signature for payload")]
    NoMatch,
    #[error("Signed payload is not a Stripe event: {0}")]
    InvalidPayload(String),
}
