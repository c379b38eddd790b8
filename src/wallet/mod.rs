//! Wallet keys and chain access
//!
//! Private keys never leave this module except as the wallet store's
//! redacted `SecretString`.

mod client;
mod signer;

pub use client::{normalize_proxy, ChainClient, RpcChainClient};
pub use signer::{derive_address, SecureWallet};
