//! Exchange authentication: credential acquisition and request signing.
//!
//! Two header families exist. Wallet-attestation headers ([`l1`]) prove
//! control of the wallet key and are used only to create or derive API
//! credentials. API-key headers ([`l2`]) carry an HMAC over the request and
//! authenticate every order submission.

pub mod l1;
pub mod l2;
mod provider;

use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;

pub use provider::{ClobCredentialSource, CredentialProvider, CredentialSource, POLYGON_CHAIN_ID};

/// API credential triple, either configured statically or derived once from
/// the wallet private key. Shared by reference across signing operations.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret: SecretString,
    pub passphrase: String,
}

impl ApiCredentials {
    /// True when all three fields are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty()
            && !self.secret.expose_secret().is_empty()
            && !self.passphrase.is_empty()
    }
}
