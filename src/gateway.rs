//! Authenticated order submission against the exchange.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::auth::{CredentialProvider, l2};
use crate::config::{SignatureEncoding, TimestampUnit, TradingPolicy};
use crate::error::{Error, Result};

/// Side vocabulary of the exchange wire format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeSide {
    Buy,
    Sell,
}

/// A fully priced order, ready for serialization to the wire body.
#[derive(Clone, Debug, Serialize)]
pub struct OrderIntent {
    pub token_id: String,
    pub side: ExchangeSide,
    pub price: Decimal,
    pub size: Decimal,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
}

/// Exchange acknowledgment for an accepted order. Some deployments answer
/// with `order_id`, some with `id`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "id")]
    pub order_id: Option<String>,
}

impl OrderAck {
    #[must_use]
    pub fn status_or(&self, fallback: &str) -> String {
        self.status.clone().unwrap_or_else(|| fallback.to_owned())
    }

    #[must_use]
    pub fn order_id_or_empty(&self) -> String {
        self.order_id.clone().unwrap_or_default()
    }
}

/// Seam between the decision engine and the exchange; lets tests drive the
/// engine with fakes and keeps dry-run provably network-free.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(&self, intent: &OrderIntent) -> Result<OrderAck>;
}

/// Live order gateway: serializes the intent, signs the request, and
/// classifies the response.
pub struct OrderGateway {
    http: Client,
    base_url: Url,
    order_path: String,
    encoding: SignatureEncoding,
    timestamp_unit: TimestampUnit,
    credentials: Arc<CredentialProvider>,
}

impl OrderGateway {
    pub fn from_policy(
        policy: &TradingPolicy,
        credentials: Arc<CredentialProvider>,
    ) -> Result<Self> {
        let http = Client::builder().timeout(policy.request_timeout).build()?;
        Ok(Self {
            http,
            base_url: policy.clob_base_url.clone(),
            order_path: l2::normalize_path(&policy.order_path),
            encoding: policy.signature_encoding,
            timestamp_unit: policy.timestamp_unit,
            credentials,
        })
    }

    async fn submit_inner(&self, intent: &OrderIntent) -> Result<OrderAck> {
        let credentials = self.credentials.credentials().await?;
        let body = serde_json::to_string(intent)?;
        let headers = l2::auth_headers(
            &credentials,
            "POST",
            &self.order_path,
            &body,
            self.encoding,
            self.timestamp_unit,
        )?;
        let url = self.base_url.join(&self.order_path)?;

        let response = self
            .http
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                return Err(Error::AuthenticationRejected { body });
            }
            return Err(Error::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let ack: OrderAck = response.json().await?;
        info!(
            token_id = %intent.token_id,
            side = ?intent.side,
            price = %intent.price,
            size = %intent.size,
            order_id = %ack.order_id_or_empty(),
            "order accepted"
        );
        Ok(ack)
    }
}

#[async_trait]
impl OrderSubmitter for OrderGateway {
    async fn submit(&self, intent: &OrderIntent) -> Result<OrderAck> {
        self.submit_inner(intent).await
    }
}
