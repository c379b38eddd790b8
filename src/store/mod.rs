//! JSON-file persistence for wallets and mandatory-task completion

mod file;
mod ledger;
mod wallets;

pub use ledger::CompletionLedger;
pub use wallets::{ImportSummary, Phase, PrivateKey, WalletImport, WalletRecord, WalletStore};
