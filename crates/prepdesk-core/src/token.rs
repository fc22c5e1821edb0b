//! QR token validation.
//!
//! Dynamic QR codes embed a server-signed JWT carrying the session `date`
//! and an `exp` timestamp. The kiosk holds no verification key, so the
//! token is only decoded, never verified: this is a fail-fast check for
//! stale codes. The server re-checks the token when attendance is marked.

use chrono::{DateTime, TimeZone};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const INVALID_FORMAT_MESSAGE: &str = "Invalid QR code token format.";
pub const NOT_FOR_TODAY_MESSAGE: &str = "QR code has expired. This QR code is not for today.";
pub const ELAPSED_MESSAGE: &str = "QR code has expired. Please get a new QR code.";

/// Claims carried by a dynamic QR token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrClaims {
    /// Session date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Expiry, unix seconds.
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ExpiryReason {
    /// The token's `date` is not today's local date.
    NotForToday,
    /// `exp` is in the past.
    Elapsed,
}

/// Result of validating the token from an attendance link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token: the static wall-mounted QR code. Always usable.
    Static,
    /// Dynamic token for today that has not expired yet.
    Valid(QrClaims),
    InvalidFormat,
    Expired(ExpiryReason),
}

impl TokenStatus {
    /// Whether the check-in may proceed.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Static | Self::Valid(_))
    }

    /// Whether the submission must carry the token.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// User-facing message for unusable tokens.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Static | Self::Valid(_) => None,
            Self::InvalidFormat => Some(INVALID_FORMAT_MESSAGE),
            Self::Expired(ExpiryReason::NotForToday) => Some(NOT_FOR_TODAY_MESSAGE),
            Self::Expired(ExpiryReason::Elapsed) => Some(ELAPSED_MESSAGE),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Valid(_) => "valid",
            Self::InvalidFormat => "invalid-format",
            Self::Expired(_) => "expired",
        }
    }

    pub fn claims(&self) -> Option<&QrClaims> {
        match self {
            Self::Valid(claims) => Some(claims),
            _ => None,
        }
    }
}

/// Decode the payload segment without checking the signature or any
/// registered claim.
pub fn decode_claims(token: &str) -> Result<QrClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<QrClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
}

/// Classify an attendance-link token as of `now`.
///
/// An absent or blank token is the static QR code. The date check runs
/// before the expiry check, so a stale token from another day always
/// reports "not for today". A token without `exp` never expires.
pub fn validate_token<Tz: TimeZone>(token: Option<&str>, now: &DateTime<Tz>) -> TokenStatus {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return TokenStatus::Static;
    };

    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "QR token could not be decoded");
            return TokenStatus::InvalidFormat;
        }
    };

    let today = now.date_naive().format("%Y-%m-%d").to_string();
    if claims.date.as_deref() != Some(today.as_str()) {
        debug!(date = ?claims.date, %today, "QR token is for another day");
        return TokenStatus::Expired(ExpiryReason::NotForToday);
    }

    if let Some(exp) = claims.exp {
        if exp.saturating_mul(1000) < now.timestamp_millis() {
            debug!(exp, "QR token has expired");
            return TokenStatus::Expired(ExpiryReason::Elapsed);
        }
    }

    TokenStatus::Valid(claims)
}
