//! Action selection
//!
//! Balances are read once into a snapshot, then a pure function turns the
//! snapshot into weighted candidates and draws one.

use crate::config::Settings;
use crate::explorer::{count_swaps, HistoryApi};
use crate::protocols::{routes_from, SwapRoute};
use crate::store::WalletRecord;
use crate::tokens::{Token, MON, TRACKED_TOKENS};
use crate::wallet::ChainClient;
use crate::Result;
use alloy::primitives::U256;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Weight given to every eligible route
const ROUTE_WEIGHT: u32 = 1;

/// What the selector decided for a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Action(SwapRoute),
    /// Native balance below `minimal_balance`
    InsufficientBalance,
    /// Initial sequence: the wallet already made its quota of swaps
    QuotaMet,
    /// Nothing to swap and no room to spend MON
    NoCandidate,
}

/// Balances the candidate list is built from
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    pub native: U256,
    pub tokens: Vec<(Token, U256)>,
}

/// Choose the next action for `wallet`. History is only consulted when
/// `is_initial` is set.
pub async fn select_action(
    wallet: &WalletRecord,
    chain: &dyn ChainClient,
    history: &dyn HistoryApi,
    settings: &Settings,
    is_initial: bool,
) -> Result<Selection> {
    let native = match chain.native_balance().await {
        Ok(balance) => balance,
        Err(e) => {
            tracing::warn!(wallet = %wallet.address, error = %e, "Native balance query failed, treating as zero");
            U256::ZERO
        }
    };

    if native < MON.to_wei(settings.minimal_balance) {
        return Ok(Selection::InsufficientBalance);
    }

    if is_initial {
        let txs = history.get_all_transactions(wallet.address).await?;
        let swaps = count_swaps(&txs);
        tracing::debug!(
            wallet = %wallet.address,
            swaps,
            quota = wallet.number_of_swaps,
            "Counted past swaps"
        );
        if swaps >= wallet.number_of_swaps as usize {
            return Ok(Selection::QuotaMet);
        }
    }

    let mut tokens = Vec::with_capacity(TRACKED_TOKENS.len());
    for token in TRACKED_TOKENS {
        let balance = match chain.token_balance(token.address).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(
                    wallet = %wallet.address,
                    token = token.symbol,
                    error = %e,
                    "Token balance query failed, treating as zero"
                );
                U256::ZERO
            }
        };
        tokens.push((*token, balance));
    }

    let snapshot = BalanceSnapshot { native, tokens };
    Ok(choose(&snapshot, settings, &mut rand::thread_rng()))
}

/// Every eligible route paired with its weight
pub fn candidates(snapshot: &BalanceSnapshot, settings: &Settings) -> Vec<(SwapRoute, u32)> {
    let mut candidates = Vec::new();

    for (token, balance) in &snapshot.tokens {
        if !balance.is_zero() {
            candidates.extend(routes_from(token).map(|r| (*r, ROUTE_WEIGHT)));
        }
    }

    let spend_threshold = MON.to_wei(settings.minimal_balance + settings.mod_amount_for_swap.to);
    if snapshot.native > spend_threshold {
        candidates.extend(routes_from(&MON).map(|r| (*r, ROUTE_WEIGHT)));
    }

    candidates
}

/// Weighted draw over the candidates for `snapshot`
pub fn choose<R: Rng + ?Sized>(snapshot: &BalanceSnapshot, settings: &Settings, rng: &mut R) -> Selection {
    let candidates = candidates(snapshot, settings);
    if candidates.is_empty() {
        return Selection::NoCandidate;
    }

    match WeightedIndex::new(candidates.iter().map(|(_, weight)| *weight)) {
        Ok(dist) => Selection::Action(candidates[dist.sample(rng)].0),
        Err(_) => Selection::NoCandidate,
    }
}
