//! Stripe webhook signatures.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret and sends the result in the
//! `Stripe-Signature` header, which looks like `t=1492774577,v1=5257a869...,v0=6ffbb59b...`. The `v1` values are
//! HMAC-SHA256 digests of `"{t}.{raw body}"`, hex-encoded. More than one `v1` may be present while a secret is being
//! rolled.
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::SignatureError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub fn parse_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').ok_or_else(|| SignatureError::MalformedHeader(part.to_string()))?;
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|e| SignatureError::MalformedHeader(format!("Invalid timestamp '{value}'. {e}")))?;
                timestamp = Some(t);
            },
            "v1" => signatures.push(value.to_string()),
            _ => trace!("💳️ Ignoring signature scheme {key}"),
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    Ok(SignatureHeader { timestamp, signatures })
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: i64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Computes the hex-encoded `v1` signature of `payload`.
pub fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> Option<String> {
    signed_mac(payload, secret, timestamp).map(|mac| hex::encode(mac.finalize().into_bytes()))
}

/// Produces a complete `Stripe-Signature` header value for `payload`.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Option<String> {
    compute_signature(payload, secret, timestamp).map(|sig| format!("t={timestamp},v1={sig}"))
}

/// Checks the `Stripe-Signature` header against the raw request body.
///
/// At least one `v1` signature must match, and the signature may be at most `tolerance` seconds older than `now`.
/// A `tolerance` of zero disables the age check. Returns the signature timestamp.
///
/// An empty secret never verifies anything.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: i64,
    now: i64,
) -> Result<i64, SignatureError> {
    let header = parse_header(header)?;
    if secret.is_empty() {
        warn!("💳️ No webhook signing secret is configured");
        return Err(SignatureError::NoMatch);
    }
    let mac = signed_mac(payload, secret, header.timestamp).ok_or(SignatureError::NoMatch)?;
    let matched = header
        .signatures
        .iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|expected| mac.clone().verify_slice(&expected).is_ok());
    if !matched {
        return Err(SignatureError::NoMatch);
    }
    let age = now - header.timestamp;
    if tolerance > 0 && age > tolerance {
        return Err(SignatureError::TimestampOutOfTolerance { age, tolerance });
    }
    Ok(header.timestamp)
}
