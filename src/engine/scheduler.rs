//! Initial-sequence and activity loops
//!
//! Both loops share one shape: pick the most overdue wallet of their phase,
//! run one selected swap, write back the wallet's next time, sleep the poll
//! interval. Nothing escapes an iteration; errors and panics are logged.

use super::selector::{select_action, Selection};
use super::SessionFactory;
use crate::config::{FromTo, Settings};
use crate::explorer::HistoryApi;
use crate::protocols::ActionOutcome;
use crate::store::{Phase, WalletRecord, WalletStore};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use rand::Rng;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Sleep at the end of every iteration
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Reschedule window after a failed action, in seconds
pub const FAILURE_BACKOFF: FromTo<u64> = FromTo::new(600, 1200);

/// What one iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No wallet was due
    Idle,
    /// Selector declined; the wallet keeps its schedule
    Skipped(Selection),
    /// Initial sequence finished because the swap quota is met
    InitialCompleted,
    Succeeded(ActionOutcome),
    Failed(ActionOutcome),
    /// Session, selection or store update failed; the wallet keeps its schedule
    Errored(String),
}

/// Delay range for successful actions in `phase`
fn success_delay(phase: Phase, settings: &Settings) -> FromTo<u64> {
    match phase {
        Phase::Initial => settings.initial_actions_delay,
        Phase::Activity => settings.activity_actions_delay,
    }
}

/// Next eligible time after an action finished at `now`
pub fn next_action_time<R: Rng + ?Sized>(
    phase: Phase,
    success: bool,
    settings: &Settings,
    now: DateTime<Utc>,
    rng: &mut R,
) -> DateTime<Utc> {
    let range = if success {
        success_delay(phase, settings)
    } else {
        FAILURE_BACKOFF
    };
    now + range.sample_delay(rng)
}

pub struct SchedulerLoop {
    phase: Phase,
    store: Arc<WalletStore>,
    settings: Arc<Settings>,
    sessions: Arc<dyn SessionFactory>,
    history: Arc<dyn HistoryApi>,
}

impl SchedulerLoop {
    pub fn new(
        phase: Phase,
        store: Arc<WalletStore>,
        settings: Arc<Settings>,
        sessions: Arc<dyn SessionFactory>,
        history: Arc<dyn HistoryApi>,
    ) -> Self {
        Self {
            phase,
            store,
            settings,
            sessions,
            history,
        }
    }

    /// Run forever
    pub async fn run(&self) {
        let range = success_delay(self.phase, &self.settings);
        match self.store.spread_expired(self.phase, range, Utc::now()).await {
            Ok(0) => {}
            Ok(n) => info!(phase = self.phase.name(), wallets = n, "Re-spread overdue wallets"),
            Err(e) => error!(phase = self.phase.name(), error = %e, "Failed to re-spread overdue wallets"),
        }

        info!(phase = self.phase.name(), "Scheduler loop started");
        loop {
            match AssertUnwindSafe(self.tick(Utc::now())).catch_unwind().await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(phase = self.phase.name(), error = %e, "Failed to find a due wallet"),
                Err(_) => error!(phase = self.phase.name(), "Iteration panicked"),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// One iteration against the clock value `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let Some(wallet) = self.store.find_due(self.phase, now).await? else {
            return Ok(TickOutcome::Idle);
        };

        match self.act(&wallet, now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    wallet = %wallet.address,
                    name = %wallet.label(),
                    phase = self.phase.name(),
                    error = %e,
                    "Wallet iteration failed"
                );
                Ok(TickOutcome::Errored(e.to_string()))
            }
        }
    }

    async fn act(&self, wallet: &WalletRecord, now: DateTime<Utc>) -> Result<TickOutcome> {
        let session = self.sessions.open(wallet)?;
        let selection = select_action(
            wallet,
            session.chain.as_ref(),
            self.history.as_ref(),
            &self.settings,
            self.phase == Phase::Initial,
        )
        .await?;

        match selection {
            Selection::Action(route) => {
                info!(wallet = %wallet.address, phase = self.phase.name(), %route, "Executing swap");
                let outcome = session.swaps.execute(&route).await;
                self.record(wallet, outcome, now).await
            }
            Selection::QuotaMet if self.phase == Phase::Initial => {
                self.complete_initial(wallet, now).await?;
                Ok(TickOutcome::InitialCompleted)
            }
            Selection::InsufficientBalance => {
                error!(wallet = %wallet.address, phase = self.phase.name(), "Insufficient balance");
                Ok(TickOutcome::Skipped(selection))
            }
            other => {
                warn!(wallet = %wallet.address, phase = self.phase.name(), selection = ?other, "Can not choose an action");
                Ok(TickOutcome::Skipped(other))
            }
        }
    }

    async fn complete_initial(&self, wallet: &WalletRecord, now: DateTime<Utc>) -> Result<()> {
        let next = next_action_time(Phase::Activity, true, &self.settings, now, &mut rand::thread_rng());
        self.store
            .update(wallet.address, |w| {
                w.initial_completed = true;
                w.next_activity_action_time = next;
            })
            .await?;

        info!(
            wallet = %wallet.address,
            quota = wallet.number_of_swaps,
            next_activity = %next,
            "Initial sequence complete"
        );
        Ok(())
    }

    async fn record(
        &self,
        wallet: &WalletRecord,
        outcome: ActionOutcome,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome> {
        let success = outcome.is_success();
        let next = next_action_time(self.phase, success, &self.settings, now, &mut rand::thread_rng());
        let phase = self.phase;
        self.store
            .update(wallet.address, |w| phase.set_next_time(w, next))
            .await?;

        if !success {
            error!(wallet = %wallet.address, phase = phase.name(), %outcome, retry_at = %next, "Action failed");
            return Ok(TickOutcome::Failed(outcome));
        }

        info!(wallet = %wallet.address, phase = phase.name(), %outcome, next = %next, "Action succeeded");
        if phase == Phase::Activity {
            if let Some(closest) = self.store.min_next_activity_time().await? {
                info!(next_action_at = %closest, "Next closest activity action");
            }
        }
        Ok(TickOutcome::Succeeded(outcome))
    }
}
