//! Liquid staking vaults that take native MON through ERC-4626 `deposit`

use super::{stake_amount, ActionOutcome, ProtocolAdapter, ProtocolInfo};
use crate::config::Settings;
use crate::wallet::ChainClient;
use crate::Result;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;

sol! {
    function deposit(uint256 assets, address receiver) external payable returns (uint256 shares);
}

/// Stake MON into a vault, receiving its liquid staking token
pub struct Erc4626Stake {
    vault: ProtocolInfo,
    chain: Arc<dyn ChainClient>,
    settings: Arc<Settings>,
}

impl Erc4626Stake {
    pub fn new(vault: ProtocolInfo, chain: Arc<dyn ChainClient>, settings: Arc<Settings>) -> Self {
        Self {
            vault,
            chain,
            settings,
        }
    }

    pub async fn stake_mon(&self) -> Result<ActionOutcome> {
        let amount = stake_amount(&self.settings);
        let input = depositCall {
            assets: amount,
            receiver: self.chain.address(),
        }
        .abi_encode();

        let hash = self
            .chain
            .build_and_send(Some(self.vault.address), amount, input.into())
            .await?;
        Ok(ActionOutcome::Submitted(vec![hash]))
    }
}

#[async_trait]
impl ProtocolAdapter for Erc4626Stake {
    fn name(&self) -> &'static str {
        self.vault.name
    }

    async fn perform_mandatory(&self) -> Result<ActionOutcome> {
        self.stake_mon().await
    }
}
