//! Regulatory intake service integration
//!
//! - **Client**: `IntakeClient` implements the submission gateway over REST
//! - **Auth**: `CredentialManager` supplies bearer tokens to the client
//! - **Codec**: `JsonDocumentCodec` builds hashed JSON documents
//! - **Cache**: `CachedCustomerDirectory` puts a TTL cache in front of
//!   customer lookups
//! - **Health**: `probe` checks token issuance and reachability
//!
//! # Error Handling
//!
//! Non-2xx responses are parsed into `IntakeError`, which keeps the remote
//! code and message and converts into `TaxBridgeError` at the gateway
//! boundary.

pub mod auth;
pub mod cache;
pub mod client;
pub mod codec;
pub mod errors;
pub mod health;

pub use auth::{create_token_issuer, IntakeCredentialManager};
pub use cache::{CacheResult, CacheStats, CachedCustomerDirectory, CustomerCache};
pub use client::{AccessTokenProvider, IntakeClient, RawDocument};
pub use codec::{content_hash, decode_transport, encode_transport, verify_content_hash, JsonDocumentCodec};
pub use errors::{IntakeError, IntakeErrorCategory};
pub use health::{probe, ConnectivityReport};
