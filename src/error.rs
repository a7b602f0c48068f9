use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the trading layer.
///
/// Policy-gate failures are not errors; they surface as
/// [`crate::engine::Verdict::Skip`]. This enum covers configuration,
/// credential, and transport faults.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither static API credentials nor a wallet private key are configured.
    #[error(
        "missing wallet private key for CLOB authentication; set \
         POLYMARKET_PRIVATE_KEY or the static POLYMARKET_CLOB_API_* triple"
    )]
    MissingPrivateKey,

    /// The credential-derivation capability errored or returned an
    /// incomplete key/secret/passphrase triple.
    #[error("credential derivation failed: {0}")]
    DerivationFailed(String),

    /// The exchange answered 401 to an order submission.
    ///
    /// The diagnostic matters: the exchange maintains two incompatible
    /// credential classes, and builder keys (obtained from the settings
    /// page rather than derived from the wallet private key) cannot
    /// authenticate orders.
    #[error(
        "CLOB order error: 401 {body} (check that you are using user API \
         credentials derived from your private key; builder API keys from \
         the exchange settings page cannot authenticate orders)"
    )]
    AuthenticationRejected {
        /// Raw response body returned with the rejection.
        body: String,
    },

    /// Any other non-success response to an order submission.
    #[error("CLOB order error: {status} {body}")]
    Gateway {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Invalid configuration value read at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Wallet signing failed while building attestation headers.
    #[error("wallet signing failed: {0}")]
    WalletSign(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}
