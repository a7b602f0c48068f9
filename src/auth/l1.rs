//! Wallet-attestation headers for credential derivation.
//!
//! The exchange accepts an EIP-712 signature over a fixed `ClobAuth`
//! attestation as proof of wallet control. These headers gate the
//! `auth/api-key` and `auth/derive-api-key` endpoints only; order
//! submissions use the API-key headers from [`super::l2`].

use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::signers::Signer as _;
use alloy::signers::local::PrivateKeySigner;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{Error, Result};

pub const HEADER_ADDRESS: &str = "POLY_ADDRESS";
pub const HEADER_SIGNATURE: &str = "POLY_SIGNATURE";
pub const HEADER_TIMESTAMP: &str = "POLY_TIMESTAMP";
pub const HEADER_NONCE: &str = "POLY_NONCE";

const ATTESTATION_MESSAGE: &str = "This message attests that I control the given wallet";
const DOMAIN_NAME: &str = "ClobAuthDomain";
const DOMAIN_VERSION: &str = "1";
const STRUCT_TYPE: &[u8] =
    b"ClobAuth(address address,string timestamp,uint256 nonce,string message)";
const DOMAIN_TYPE: &[u8] = b"EIP712Domain(string name,string version,uint256 chainId)";

/// EIP-712 signing hash for the attestation.
///
/// Encoded by hand: the struct's first member is named `address`, which the
/// `sol!` parser rejects as a member name, so the standard
/// hashStruct/domainSeparator composition is spelled out here.
fn signing_hash(address: Address, chain_id: u64, timestamp: &str, nonce: u32) -> B256 {
    let mut encoded = Vec::with_capacity(5 * 32);
    encoded.extend_from_slice(keccak256(STRUCT_TYPE).as_slice());
    encoded.extend_from_slice(B256::left_padding_from(address.as_slice()).as_slice());
    encoded.extend_from_slice(keccak256(timestamp.as_bytes()).as_slice());
    encoded.extend_from_slice(&U256::from(nonce).to_be_bytes::<32>());
    encoded.extend_from_slice(keccak256(ATTESTATION_MESSAGE.as_bytes()).as_slice());
    let struct_hash = keccak256(&encoded);

    let mut domain = Vec::with_capacity(4 * 32);
    domain.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
    domain.extend_from_slice(keccak256(DOMAIN_NAME.as_bytes()).as_slice());
    domain.extend_from_slice(keccak256(DOMAIN_VERSION.as_bytes()).as_slice());
    domain.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    let domain_hash = keccak256(&domain);

    let mut message = Vec::with_capacity(2 + 64);
    message.extend_from_slice(&[0x19, 0x01]);
    message.extend_from_slice(domain_hash.as_slice());
    message.extend_from_slice(struct_hash.as_slice());
    keccak256(&message)
}

/// Signs the attestation and builds the derivation header set.
pub async fn create_headers(
    signer: &PrivateKeySigner,
    chain_id: u64,
    timestamp: i64,
    nonce: u32,
) -> Result<HeaderMap> {
    let timestamp = timestamp.to_string();
    let hash = signing_hash(signer.address(), chain_id, &timestamp, nonce);
    let signature = signer
        .sign_hash(&hash)
        .await
        .map_err(|err| Error::WalletSign(err.to_string()))?;
    let signature = format!("0x{}", hex::encode(signature.as_bytes()));

    let mut headers = HeaderMap::new();
    headers.insert(HEADER_ADDRESS, header_value(&signer.address().to_string())?);
    headers.insert(HEADER_SIGNATURE, header_value(&signature)?);
    headers.insert(HEADER_TIMESTAMP, header_value(&timestamp)?);
    headers.insert(HEADER_NONCE, header_value(&nonce.to_string())?);
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| Error::WalletSign(format!("attestation header not representable: {err}")))
}
