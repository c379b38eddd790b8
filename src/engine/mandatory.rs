//! Mandatory checklist runner
//!
//! Each wallet walks a shuffled checklist serially. An item is written to
//! the completion ledger only after its action succeeded and the post-action
//! delay has elapsed, so an interrupted item is retried on the next run.

use super::SessionFactory;
use crate::config::FromTo;
use crate::protocols::{ActionOutcome, ChecklistItem};
use crate::store::{CompletionLedger, WalletRecord};
use crate::Result;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Per-wallet tally of one checklist run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecklistSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_applicable: usize,
}

pub struct MandatoryRunner {
    ledger: Arc<CompletionLedger>,
    delay: FromTo<u64>,
}

impl MandatoryRunner {
    pub fn new(ledger: Arc<CompletionLedger>, delay: FromTo<u64>) -> Self {
        Self { ledger, delay }
    }

    async fn pause(&self) {
        let secs = self.delay.sample(&mut rand::thread_rng());
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    /// Work through `items` for one wallet, skipping what the ledger already holds
    pub async fn run(
        &self,
        wallet_id: &str,
        label: &str,
        mut items: Vec<ChecklistItem>,
    ) -> Result<ChecklistSummary> {
        let done = self.ledger.completed_for(wallet_id).await?;
        items.shuffle(&mut rand::thread_rng());

        let pending = items.iter().filter(|i| !done.contains(i.protocol)).count();
        info!(wallet = %label, pending, "Starting mandatory actions");
        let mut summary = ChecklistSummary::default();

        for item in items {
            if done.contains(item.protocol) {
                info!(wallet = %label, protocol = item.protocol, "Already completed, skipping");
                summary.skipped += 1;
                continue;
            }

            info!(wallet = %label, protocol = item.protocol, action = item.action, "Running mandatory action");
            match item.adapter.perform_mandatory().await {
                Ok(outcome @ ActionOutcome::Submitted(_)) => {
                    info!(wallet = %label, protocol = item.protocol, %outcome, "Mandatory action succeeded");
                    self.pause().await;

                    match self.ledger.mark_done(wallet_id, item.protocol).await {
                        Ok(()) => summary.completed += 1,
                        Err(e) => {
                            error!(wallet = %label, protocol = item.protocol, error = %e, "Failed to record completion");
                            summary.failed += 1;
                        }
                    }
                }
                Ok(ActionOutcome::NotApplicable) => {
                    warn!(wallet = %label, protocol = item.protocol, action = item.action, "Protocol has no mandatory action");
                    summary.not_applicable += 1;
                    self.pause().await;
                }
                Ok(outcome) => {
                    error!(wallet = %label, protocol = item.protocol, %outcome, "Mandatory action did not go through");
                    summary.failed += 1;
                    self.pause().await;
                }
                Err(e) => {
                    error!(wallet = %label, protocol = item.protocol, error = %e, "Mandatory action failed");
                    summary.failed += 1;
                    self.pause().await;
                }
            }
        }

        info!(
            wallet = %label,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Finished mandatory actions"
        );
        Ok(summary)
    }

    /// One task per wallet; returns once every wallet's checklist is done
    pub async fn run_fleet(
        self: Arc<Self>,
        wallets: Vec<WalletRecord>,
        sessions: Arc<dyn SessionFactory>,
    ) -> usize {
        let mut tasks = JoinSet::new();

        for wallet in wallets {
            let runner = self.clone();
            let sessions = sessions.clone();
            tasks.spawn(async move {
                let label = wallet.label();
                let session = match sessions.open(&wallet) {
                    Ok(session) => session,
                    Err(e) => {
                        error!(wallet = %label, error = %e, "Failed to open wallet session");
                        return;
                    }
                };

                if let Err(e) = runner.run(&wallet.wallet_id(), &label, session.checklist).await {
                    error!(wallet = %label, error = %e, "Mandatory run aborted");
                }
            });
        }

        let mut finished = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(()) => finished += 1,
                Err(e) => error!(error = %e, "Mandatory task panicked"),
            }
        }
        finished
    }
}
