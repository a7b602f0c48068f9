//! Credential acquisition with single-flight derivation.

use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use alloy::signers::Signer as _;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::ExposeSecret as _;
use tokio::sync::OnceCell;
use url::Url;

use crate::auth::{ApiCredentials, l1};
use crate::config::TradingPolicy;
use crate::error::{Error, Result};

pub const POLYGON_CHAIN_ID: u64 = 137;

/// The exchange capability that mints or derives an API credential triple
/// for a wallet. Seam for tests and alternative transports.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn derive(&self) -> Result<ApiCredentials>;
}

/// Resolves API credentials for order signing.
///
/// Static credentials are returned directly. Otherwise the wallet-backed
/// source runs at most once per process: concurrent callers join the same
/// in-flight derivation, and the outcome (success or failure) is cached
/// for the process lifetime.
pub struct CredentialProvider {
    static_credentials: Option<Arc<ApiCredentials>>,
    source: Option<Arc<dyn CredentialSource>>,
    derived: OnceCell<std::result::Result<Arc<ApiCredentials>, String>>,
}

impl CredentialProvider {
    /// Wires the provider from the policy: static triple if configured,
    /// else an HTTP derivation source over the wallet private key.
    pub fn from_policy(policy: &TradingPolicy) -> Result<Self> {
        if policy.has_static_credentials() {
            let credentials = ApiCredentials {
                api_key: policy.api_key.clone().unwrap_or_default(),
                secret: policy
                    .api_secret
                    .clone()
                    .unwrap_or_else(|| String::new().into()),
                passphrase: policy.api_passphrase.clone().unwrap_or_default(),
            };
            return Ok(Self::with_static(credentials));
        }

        match &policy.private_key {
            Some(key) => {
                let source = ClobCredentialSource::new(
                    policy.clob_base_url.clone(),
                    key.expose_secret(),
                    POLYGON_CHAIN_ID,
                    policy.request_timeout,
                )?;
                Ok(Self::with_source(Arc::new(source)))
            }
            None => Ok(Self {
                static_credentials: None,
                source: None,
                derived: OnceCell::new(),
            }),
        }
    }

    #[must_use]
    pub fn with_static(credentials: ApiCredentials) -> Self {
        Self {
            static_credentials: Some(Arc::new(credentials)),
            source: None,
            derived: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_source(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            static_credentials: None,
            source: Some(source),
            derived: OnceCell::new(),
        }
    }

    /// Returns the credential triple, deriving it on first need.
    ///
    /// Fails with [`Error::MissingPrivateKey`] when neither static
    /// credentials nor a wallet key are configured, and with
    /// [`Error::DerivationFailed`] when the source errored (including on a
    /// previous, cached attempt).
    pub async fn credentials(&self) -> Result<Arc<ApiCredentials>> {
        if let Some(credentials) = &self.static_credentials {
            return Ok(Arc::clone(credentials));
        }
        let Some(source) = &self.source else {
            return Err(Error::MissingPrivateKey);
        };

        let outcome = self
            .derived
            .get_or_init(|| async {
                source.derive().await.map(Arc::new).map_err(|err| match err {
                    Error::DerivationFailed(message) => message,
                    other => other.to_string(),
                })
            })
            .await;

        outcome.clone().map_err(Error::DerivationFailed)
    }
}

/// HTTP credential source: wallet-attestation headers against the exchange's
/// key endpoints, trying creation first and falling back to derivation when
/// the key already exists.
pub struct ClobCredentialSource {
    http: Client,
    base_url: Url,
    signer: PrivateKeySigner,
    chain_id: u64,
    nonce: u32,
}

impl ClobCredentialSource {
    pub fn new(
        base_url: Url,
        private_key: &str,
        chain_id: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|err| Error::config(format!("invalid private key: {err}")))?
            .with_chain_id(Some(chain_id));
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            signer,
            chain_id,
            nonce: 0,
        })
    }

    async fn create_api_key(&self) -> Result<ApiCredentials> {
        let url = self.base_url.join("auth/api-key")?;
        let headers =
            l1::create_headers(&self.signer, self.chain_id, Utc::now().timestamp(), self.nonce)
                .await?;
        let response = self.http.post(url).headers(headers).send().await?;
        Self::parse_response(response).await
    }

    async fn derive_api_key(&self) -> Result<ApiCredentials> {
        let url = self.base_url.join("auth/derive-api-key")?;
        let headers =
            l1::create_headers(&self.signer, self.chain_id, Utc::now().timestamp(), self.nonce)
                .await?;
        let response = self.http.get(url).headers(headers).send().await?;
        Self::parse_response(response).await
    }

    async fn parse_response(response: reqwest::Response) -> Result<ApiCredentials> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::DerivationFailed(format!(
                "{} {body}",
                status.as_u16()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CredentialSource for ClobCredentialSource {
    async fn derive(&self) -> Result<ApiCredentials> {
        let credentials = match self.create_api_key().await {
            Ok(credentials) => credentials,
            // Key already exists (or creation is otherwise refused): derive it.
            Err(Error::DerivationFailed(_)) => self.derive_api_key().await?,
            Err(err) => return Err(err),
        };

        if !credentials.is_complete() {
            return Err(Error::DerivationFailed(
                "exchange returned an incomplete credential triple".to_owned(),
            ));
        }
        Ok(credentials)
    }
}
