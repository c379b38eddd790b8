//! Monad Activity Scheduler
//!
//! Keeps a fleet of Monad testnet wallets active on a randomized schedule:
//! - An initial sequence of swaps up to a per-wallet quota
//! - Ongoing activity swaps at long random intervals
//! - A one-time mandatory checklist of protocol actions per wallet
//!
//! # Security Model
//!
//! - Private keys live in `wallets.json` and are never logged
//! - Each wallet's RPC traffic goes through that wallet's own proxy
//! - Completion of mandatory actions is flushed to disk per action

pub mod config;
pub mod engine;
pub mod explorer;
pub mod import;
pub mod logging;
pub mod protocols;
pub mod retry;
pub mod runner;
pub mod store;
pub mod tokens;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{FilePaths, FromTo, RpcConfig, Settings};
pub use error::{Error, Result};
pub use runner::AppRunner;
