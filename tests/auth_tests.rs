//! Credential derivation over HTTP: attestation headers, the
//! create-then-derive fallback, and single-flight behavior end to end.

use std::time::Duration;

use clob_autotrader::auth::{
    ClobCredentialSource, CredentialProvider, CredentialSource as _, POLYGON_CHAIN_ID,
};
use clob_autotrader::config::TradingPolicy;
use clob_autotrader::error::Error;
use httpmock::prelude::*;
use secrecy::ExposeSecret as _;
use url::Url;

// Well-known throwaway development key.
const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn source_for(server: &MockServer) -> ClobCredentialSource {
    ClobCredentialSource::new(
        Url::parse(&server.base_url()).unwrap(),
        TEST_KEY,
        POLYGON_CHAIN_ID,
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn creation_success_skips_the_derive_fallback() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/api-key")
                .header_exists("POLY_ADDRESS")
                .header_exists("POLY_SIGNATURE")
                .header_exists("POLY_TIMESTAMP")
                .header("POLY_NONCE", "0");
            then.status(200).json_body(serde_json::json!({
                "apiKey": "created-key",
                "secret": "created-secret",
                "passphrase": "created-phrase"
            }));
        })
        .await;
    let derive = server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/derive-api-key");
            then.status(200);
        })
        .await;

    let credentials = source_for(&server).derive().await.unwrap();
    create.assert_async().await;
    assert_eq!(derive.hits_async().await, 0);
    assert_eq!(credentials.api_key, "created-key");
    assert_eq!(credentials.secret.expose_secret(), "created-secret");
}

#[tokio::test]
async fn existing_key_falls_back_to_derivation() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/api-key");
            then.status(400).body("api key already exists");
        })
        .await;
    let derive = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/derive-api-key")
                .header_exists("POLY_ADDRESS")
                .header_exists("POLY_SIGNATURE");
            then.status(200).json_body(serde_json::json!({
                "apiKey": "derived-key",
                "secret": "derived-secret",
                "passphrase": "derived-phrase"
            }));
        })
        .await;

    let credentials = source_for(&server).derive().await.unwrap();
    create.assert_async().await;
    derive.assert_async().await;
    assert_eq!(credentials.api_key, "derived-key");
}

#[tokio::test]
async fn both_endpoints_failing_is_a_derivation_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/api-key");
            then.status(400).body("nope");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/derive-api-key");
            then.status(403).body("address not registered");
        })
        .await;

    let err = source_for(&server).derive().await.unwrap_err();
    let Error::DerivationFailed(message) = &err else {
        panic!("expected DerivationFailed, got {err:?}");
    };
    assert!(message.contains("403"));
    assert!(message.contains("address not registered"));
}

#[tokio::test]
async fn incomplete_triple_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/api-key");
            then.status(200).json_body(serde_json::json!({
                "apiKey": "",
                "secret": "s",
                "passphrase": "p"
            }));
        })
        .await;

    let err = source_for(&server).derive().await.unwrap_err();
    assert!(matches!(err, Error::DerivationFailed(_)));
    assert!(err.to_string().contains("incomplete credential triple"));
}

#[tokio::test]
async fn provider_derives_once_across_repeated_calls() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/api-key");
            then.status(200).json_body(serde_json::json!({
                "apiKey": "once-key",
                "secret": "once-secret",
                "passphrase": "once-phrase"
            }));
        })
        .await;

    let policy = TradingPolicy {
        private_key: Some(TEST_KEY.to_owned().into()),
        clob_base_url: Url::parse(&server.base_url()).unwrap(),
        ..TradingPolicy::default()
    };
    let provider = CredentialProvider::from_policy(&policy).unwrap();

    let first = provider.credentials().await.unwrap();
    let second = provider.credentials().await.unwrap();
    assert_eq!(first.api_key, "once-key");
    assert_eq!(second.api_key, "once-key");
    assert_eq!(create.hits_async().await, 1);
}
