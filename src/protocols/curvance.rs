//! Curvance test-token faucet

use super::{ActionOutcome, ProtocolAdapter, CURVANCE_FAUCET};
use crate::tokens::MON;
use crate::wallet::ChainClient;
use crate::Result;
use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use std::sync::Arc;

/// Faucet entry point taking (recipient, tokens, amounts)
const CLAIM_SELECTOR: [u8; 4] = [0x72, 0x14, 0xc2, 0x06];

/// Native balance the faucet claim requires, in MON
const MIN_NATIVE: f64 = 0.03;

const BASKET: [(Address, u128); 7] = [
    (address!("5d876d73f4441d5f2438b1a3e2a51771b337f27a"), 10_000_000_000),
    (address!("6bb379a2056d1304e73012b99338f8f581ee2e18"), 5_000_000),
    (address!("0e1c9362cdea1d556e5ff89140107126baaf6b09"), 1_000_000_000_000_000_000_000),
    (address!("5b54153100e40000f6821a7ea8101dc8f5186c2d"), 1_000_000_000_000_000_000),
    (address!("7fdf92a43c54171f9c278c67088ca43f2079d09b"), 1_000_000_000_000_000_000_000),
    (address!("dfcf14d3e2a6eb731e27a810cb1400eea42a7fdc"), 1_000_000_000_000_000_000_000),
    (address!("b5481b57ff4e23ea7d2fda70f3137b16d0d99118"), 10_000_000_000_000_000_000),
];

pub struct Curvance {
    chain: Arc<dyn ChainClient>,
}

impl Curvance {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    pub async fn claim_all_tokens(&self) -> Result<ActionOutcome> {
        let balance = self.chain.native_balance().await?;
        if balance < MON.to_wei(MIN_NATIVE) {
            return Ok(ActionOutcome::InsufficientFunds(format!(
                "Curvance needs at least {} MON",
                MIN_NATIVE
            )));
        }

        let input = encode_claim(self.chain.address());
        let hash = self
            .chain
            .build_and_send(Some(CURVANCE_FAUCET.address), U256::ZERO, input)
            .await?;
        Ok(ActionOutcome::Submitted(vec![hash]))
    }
}

fn encode_claim(recipient: Address) -> Bytes {
    let tokens: Vec<Address> = BASKET.iter().map(|(token, _)| *token).collect();
    let amounts: Vec<U256> = BASKET.iter().map(|(_, amount)| U256::from(*amount)).collect();

    let mut input = CLAIM_SELECTOR.to_vec();
    input.extend((recipient, tokens, amounts).abi_encode_params());
    input.into()
}

#[async_trait]
impl ProtocolAdapter for Curvance {
    fn name(&self) -> &'static str {
        "Curvance"
    }

    async fn perform_mandatory(&self) -> Result<ActionOutcome> {
        self.claim_all_tokens().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[test]
    fn test_claim_layout() {
        let recipient = Address::repeat_byte(0x11);
        let input = encode_claim(recipient);

        assert_eq!(&input[..4], &CLAIM_SELECTOR);
        // selector + 3 head words + (len + 7) * 2
        assert_eq!(input.len(), 4 + 32 * 3 + 32 * 8 * 2);
        // offsets of the two arrays
        assert_eq!(U256::from_be_slice(&input[36..68]), U256::from(0x60));
        assert_eq!(U256::from_be_slice(&input[68..100]), U256::from(0x160));

        let (decoded_recipient, tokens, amounts) =
            <(Address, Vec<Address>, Vec<U256>)>::abi_decode_params(&input[4..]).unwrap();
        assert_eq!(decoded_recipient, recipient);
        assert_eq!(tokens.len(), 7);
        assert_eq!(amounts[0], U256::from(10_000_000_000u64));
        assert_eq!(amounts[6], U256::from(10u128.pow(19)));
    }

    #[tokio::test]
    async fn test_low_balance_is_insufficient() {
        let chain = Arc::new(MockChain::new());
        chain.set_native(MON.to_wei(0.02));
        let curvance = Curvance::new(chain.clone());

        let outcome = curvance.perform_mandatory().await.unwrap();
        assert!(matches!(outcome, ActionOutcome::InsufficientFunds(_)));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_claim_submitted() {
        let chain = Arc::new(MockChain::new());
        chain.set_native(MON.to_wei(1.0));
        let curvance = Curvance::new(chain.clone());

        assert!(curvance.perform_mandatory().await.unwrap().is_success());
        assert_eq!(chain.sent()[0].to, Some(CURVANCE_FAUCET.address));
    }
}
