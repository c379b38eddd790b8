//! MultPli: claim faucet USDC, then stake part of it

use super::{approve_if_needed, uniform, ActionOutcome, ProtocolAdapter, MULTPLI_CLAIM, MULTPLI_STAKE};
use crate::tokens::amount_to_wei;
use crate::wallet::ChainClient;
use crate::Result;
use alloy::primitives::{address, Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

sol! {
    function claimToken(address token) external;
    function deposit(address token, uint256 amount) external;
}

/// MultPli's own test USDC, distinct from the DEX USDC
const MULTPLI_USDC: Address = address!("924F1Bf31b19a7f9695F3FC6c69C2BA668Ea4a0a");
const MULTPLI_USDC_DECIMALS: u8 = 6;
const CLAIM_SETTLE: Duration = Duration::from_secs(10);
const STAKE_MIN: f64 = 20.0;
const STAKE_MAX: f64 = 45.0;

pub struct MultPli {
    chain: Arc<dyn ChainClient>,
}

impl MultPli {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    pub async fn claim_and_stake(&self) -> Result<ActionOutcome> {
        let claim = claimTokenCall {
            token: MULTPLI_USDC,
        }
        .abi_encode();
        let claim_hash = self
            .chain
            .build_and_send(Some(MULTPLI_CLAIM.address), U256::ZERO, claim.into())
            .await?;
        tracing::debug!(wallet = %self.chain.address(), tx = %claim_hash, "MultPli claim sent");

        tokio::time::sleep(CLAIM_SETTLE).await;

        let amount = amount_to_wei(uniform(STAKE_MIN, STAKE_MAX), MULTPLI_USDC_DECIMALS);
        let mut hashes = vec![claim_hash];
        if let Some(approval) =
            approve_if_needed(self.chain.as_ref(), MULTPLI_USDC, MULTPLI_STAKE.address, amount).await?
        {
            hashes.push(approval);
        }

        let stake = depositCall {
            token: MULTPLI_USDC,
            amount,
        }
        .abi_encode();
        let stake_hash = self
            .chain
            .build_and_send(Some(MULTPLI_STAKE.address), U256::ZERO, stake.into())
            .await?;
        hashes.push(stake_hash);

        Ok(ActionOutcome::Submitted(hashes))
    }
}

#[async_trait]
impl ProtocolAdapter for MultPli {
    fn name(&self) -> &'static str {
        "MultPli"
    }

    async fn perform_mandatory(&self) -> Result<ActionOutcome> {
        self.claim_and_stake().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[test]
    fn test_selectors() {
        assert_eq!(claimTokenCall::SELECTOR, [0x32, 0xf2, 0x89, 0xcf]);
        assert_eq!(depositCall::SELECTOR, [0x47, 0xe7, 0xef, 0x24]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_then_stake() {
        let chain = Arc::new(MockChain::new());
        let multpli = MultPli::new(chain.clone());

        let outcome = multpli.perform_mandatory().await.unwrap();
        let ActionOutcome::Submitted(hashes) = outcome else {
            panic!("expected submission");
        };
        // claim, approve, stake
        assert_eq!(hashes.len(), 3);

        let sent = chain.sent();
        assert_eq!(sent[0].to, Some(MULTPLI_CLAIM.address));
        assert_eq!(sent[1].to, Some(MULTPLI_USDC));
        assert_eq!(sent[2].to, Some(MULTPLI_STAKE.address));

        let stake = depositCall::abi_decode(&sent[2].input).unwrap();
        assert_eq!(stake.token, MULTPLI_USDC);
        assert!(stake.amount >= U256::from(20_000_000u64));
        assert!(stake.amount <= U256::from(45_000_000u64));
    }
}
