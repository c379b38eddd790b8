//! Ambient (CrocSwap) DEX
//!
//! Swaps go through `userCmd(1, cmd)` where `cmd` is the ABI-encoded swap
//! tuple. MON is always the base side of the pool.

use super::{approve_if_needed, swap_amount, ActionOutcome, AMBIENT};
use crate::config::Settings;
use crate::tokens::{Token, USDC, WBTC};
use crate::wallet::ChainClient;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use std::sync::Arc;

sol! {
    struct SwapCmd {
        address base;
        address quote;
        uint256 poolIdx;
        bool isBuy;
        bool inBaseQty;
        uint128 qty;
        uint16 tip;
        uint128 limitPrice;
        uint128 minOut;
        uint8 reserveFlags;
    }

    function userCmd(uint16 callpath, bytes cmd) external payable returns (bytes);
}

const SWAP_CALLPATH: u16 = 1;
const POOL_IDX: u64 = 36000;
const BUY_LIMIT_PRICE: u128 = 0xffff5433e2b3d8211706e6102aa9471;
const SELL_LIMIT_PRICE: u128 = 0x10001;
const MIN_OUT: u128 = 1;

/// Ambient swap adapter for the MON/WBTC and MON/USDC pools
pub struct Ambient {
    chain: Arc<dyn ChainClient>,
    settings: Arc<Settings>,
}

impl Ambient {
    pub fn new(chain: Arc<dyn ChainClient>, settings: Arc<Settings>) -> Self {
        Self { chain, settings }
    }

    fn supports(token: &Token) -> bool {
        token.address == WBTC.address || token.address == USDC.address
    }

    pub async fn swap(&self, from: &Token, to: &Token) -> Result<ActionOutcome> {
        match (from.is_native, to.is_native) {
            (true, false) if Self::supports(to) => self.buy(to).await,
            (false, true) if Self::supports(from) => self.sell(from).await,
            _ => Err(Error::Protocol(format!(
                "Ambient has no pool for {}->{}",
                from.symbol, to.symbol
            ))),
        }
    }

    /// Spend MON for `token`
    async fn buy(&self, token: &Token) -> Result<ActionOutcome> {
        let amount = swap_amount(&self.settings, super::Dex::Ambient);
        let input = encode_swap(token.address, true, amount)?;

        let hash = self
            .chain
            .build_and_send(Some(AMBIENT.address), amount, input)
            .await?;
        Ok(ActionOutcome::Submitted(vec![hash]))
    }

    /// Sell the full `token` balance back to MON
    async fn sell(&self, token: &Token) -> Result<ActionOutcome> {
        let balance = self.chain.token_balance(token.address).await?;
        if balance.is_zero() {
            return Ok(ActionOutcome::InsufficientFunds(format!(
                "no {} to sell",
                token.symbol
            )));
        }

        let mut hashes = Vec::with_capacity(2);
        if let Some(approval) =
            approve_if_needed(self.chain.as_ref(), token.address, AMBIENT.address, balance).await?
        {
            hashes.push(approval);
        }

        let input = encode_swap(token.address, false, balance)?;
        let hash = self
            .chain
            .build_and_send(Some(AMBIENT.address), U256::ZERO, input)
            .await?;
        hashes.push(hash);
        Ok(ActionOutcome::Submitted(hashes))
    }
}

/// Encode `userCmd` for a MON-based pool. `buy` pays MON in, otherwise the
/// quote token is paid in.
fn encode_swap(quote: Address, buy: bool, qty: U256) -> Result<Bytes> {
    let qty = u128::try_from(qty)
        .map_err(|_| Error::InvalidArgument(format!("Swap quantity {} exceeds uint128", qty)))?;

    let cmd = SwapCmd {
        base: Address::ZERO,
        quote,
        poolIdx: U256::from(POOL_IDX),
        isBuy: buy,
        inBaseQty: buy,
        qty,
        tip: 0,
        limitPrice: if buy { BUY_LIMIT_PRICE } else { SELL_LIMIT_PRICE },
        minOut: MIN_OUT,
        reserveFlags: 0,
    };

    let call = userCmdCall {
        callpath: SWAP_CALLPATH,
        cmd: cmd.abi_encode().into(),
    };
    Ok(call.abi_encode().into())
}
