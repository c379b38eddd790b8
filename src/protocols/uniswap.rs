//! Uniswap universal router
//!
//! MON -> USDT is a two-command program: wrap the attached MON into the
//! router, then a V2 exact-in swap of that WMON paid by the router itself.

use super::{deadline, swap_amount, ActionOutcome, Dex, UNISWAP_ROUTER};
use crate::config::Settings;
use crate::tokens::{Token, USDT, WMON};
use crate::wallet::ChainClient;
use crate::{Error, Result};
use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};
use std::sync::Arc;

sol! {
    function execute(bytes commands, bytes[] inputs, uint256 deadline) external payable;
}

const WRAP_ETH: u8 = 0x0b;
const V2_SWAP_EXACT_IN: u8 = 0x08;
/// Router-internal recipient meaning "keep it in the router"
const ADDRESS_THIS: Address = address!("0000000000000000000000000000000000000002");
const MIN_OUT: u64 = 1;

pub struct UniswapRouter {
    chain: Arc<dyn ChainClient>,
    settings: Arc<Settings>,
}

impl UniswapRouter {
    pub fn new(chain: Arc<dyn ChainClient>, settings: Arc<Settings>) -> Self {
        Self { chain, settings }
    }

    pub async fn swap(&self, from: &Token, to: &Token) -> Result<ActionOutcome> {
        if !(from.is_native && to.address == USDT.address) {
            return Err(Error::Protocol(format!(
                "Uniswap route {}->{} is not supported",
                from.symbol, to.symbol
            )));
        }

        let amount = swap_amount(&self.settings, Dex::Uniswap);
        let input = encode_wrap_and_swap(amount, self.chain.address(), vec![WMON.address, USDT.address]);

        let hash = self
            .chain
            .build_and_send(Some(UNISWAP_ROUTER.address), amount, input)
            .await?;
        Ok(ActionOutcome::Submitted(vec![hash]))
    }
}

fn encode_wrap_and_swap(amount: U256, recipient: Address, path: Vec<Address>) -> Bytes {
    let wrap = (ADDRESS_THIS, amount).abi_encode_params();
    let swap = (recipient, amount, U256::from(MIN_OUT), path, false).abi_encode_params();

    executeCall {
        commands: vec![WRAP_ETH, V2_SWAP_EXACT_IN].into(),
        inputs: vec![wrap.into(), swap.into()],
        deadline: deadline(),
    }
    .abi_encode()
    .into()
}
