//! API-key request signing.
//!
//! The canonical payload is the concatenation, in fixed order, of the decimal
//! timestamp, the upper-cased HTTP method, the leading-slash-normalized
//! request path, and the raw request body. The signature is an HMAC-SHA256
//! over that payload, encoded per policy. Pure function of its inputs; the
//! wall clock enters only through [`timestamp_now`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac as _};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret as _;
use sha2::Sha256;

use crate::auth::ApiCredentials;
use crate::config::{SignatureEncoding, TimestampUnit};
use crate::error::{Error, Result};

pub const HEADER_API_KEY: &str = "X-API-KEY";
pub const HEADER_PASSPHRASE: &str = "X-API-PASSPHRASE";
pub const HEADER_TIMESTAMP: &str = "X-API-TIMESTAMP";
pub const HEADER_SIGNATURE: &str = "X-API-SIGNATURE";

type HmacSha256 = Hmac<Sha256>;

/// Ensures the path the signature covers is the path the request uses.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

/// Computes the request signature.
#[must_use]
pub fn sign(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &str,
    encoding: SignatureEncoding,
) -> String {
    let payload = format!(
        "{timestamp}{}{}{body}",
        method.to_uppercase(),
        normalize_path(path)
    );
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();
    match encoding {
        SignatureEncoding::Hex => hex::encode(digest),
        SignatureEncoding::Base64 => BASE64.encode(digest),
    }
}

/// Current wall-clock timestamp string in the policy's unit.
#[must_use]
pub fn timestamp_now(unit: TimestampUnit) -> String {
    match unit {
        TimestampUnit::Seconds => Utc::now().timestamp().to_string(),
        TimestampUnit::Millis => Utc::now().timestamp_millis().to_string(),
    }
}

/// Builds the full authenticated header set for a request happening now.
pub fn auth_headers(
    credentials: &ApiCredentials,
    method: &str,
    path: &str,
    body: &str,
    encoding: SignatureEncoding,
    unit: TimestampUnit,
) -> Result<HeaderMap> {
    auth_headers_at(
        credentials,
        method,
        path,
        body,
        encoding,
        &timestamp_now(unit),
    )
}

/// Header set for an explicit timestamp. The timestamp header and the signed
/// payload use the same string, so the two agree bit-for-bit.
pub fn auth_headers_at(
    credentials: &ApiCredentials,
    method: &str,
    path: &str,
    body: &str,
    encoding: SignatureEncoding,
    timestamp: &str,
) -> Result<HeaderMap> {
    let signature = sign(
        credentials.secret.expose_secret(),
        timestamp,
        method,
        path,
        body,
        encoding,
    );

    let mut headers = HeaderMap::new();
    headers.insert(HEADER_API_KEY, header_value(&credentials.api_key)?);
    headers.insert(HEADER_PASSPHRASE, header_value(&credentials.passphrase)?);
    headers.insert(HEADER_TIMESTAMP, header_value(timestamp)?);
    headers.insert(HEADER_SIGNATURE, header_value(&signature)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| Error::config(format!("credential not representable as a header: {err}")))
}
