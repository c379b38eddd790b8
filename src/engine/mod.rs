//! Scheduling engine: action selection, the two swap loops and the
//! mandatory checklist runner

mod mandatory;
mod scheduler;
mod selector;

pub use crate::store::Phase;
pub use mandatory::{ChecklistSummary, MandatoryRunner};
pub use scheduler::{next_action_time, SchedulerLoop, TickOutcome, FAILURE_BACKOFF, POLL_INTERVAL};
pub use selector::{candidates, choose, select_action, BalanceSnapshot, Selection};

use crate::protocols::{ChecklistItem, SwapExecutor};
use crate::store::WalletRecord;
use crate::wallet::ChainClient;
use crate::Result;
use std::sync::Arc;

/// Everything needed to act for one wallet
pub struct WalletSession {
    pub chain: Arc<dyn ChainClient>,
    pub swaps: Arc<dyn SwapExecutor>,
    pub checklist: Vec<ChecklistItem>,
}

/// Opens a session for a stored wallet. Called once per action, so a
/// changed proxy takes effect on the wallet's next turn.
pub trait SessionFactory: Send + Sync {
    fn open(&self, wallet: &WalletRecord) -> Result<WalletSession>;
}
