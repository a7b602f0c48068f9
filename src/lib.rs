//! Automated trading decision layer for CLOB prediction markets.
//!
//! The crate pairs an authenticated order-submission protocol with a trade
//! decision engine:
//! - credential acquisition ([`auth::CredentialProvider`]) with single-flight
//!   derivation from a wallet private key
//! - request signing ([`auth::l2`]) producing the exchange's `X-API-*` header
//!   set
//! - order submission ([`gateway::OrderGateway`]) with error classification
//! - an ordered eligibility-gate funnel ([`engine::DecisionEngine`]) with
//!   per-market trade limits and append-only CSV audit trails
//!   ([`audit::AuditLog`])
//!
//! Market-data polling, indicator computation, and market selection are
//! external collaborators: they hand [`engine::MarketSnapshot`] values to the
//! engine, one per tick, and receive an [`engine::Verdict`] back.

pub mod audit;
pub mod auth;
mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;

pub use error::{Error, Result};
