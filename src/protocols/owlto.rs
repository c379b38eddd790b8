//! OwlTo: deploy a small forwarding contract

use super::{ActionOutcome, ProtocolAdapter};
use crate::wallet::ChainClient;
use crate::{Error, Result};
use alloy::primitives::{hex, Bytes, U256};
use async_trait::async_trait;
use std::sync::Arc;

/// Creation code of the contract OwlTo counts deployments of
const BYTECODE: &str = concat!(
    "0x60806040",
    "527389a512a24e9d63e98e41f681bf77f27a7ef89eb76000806101000a815481",
    "73ffffffffffffffffffffffffffffffffffffffff021916908373ffffffffff",
    "ffffffffffffffffffffffffffffff1602179055506000806000905490610100",
    "0a900473ffffffffffffffffffffffffffffffffffffffff1673ffffffffffff",
    "ffffffffffffffffffffffffffff163460405161009f90610185565b60006040",
    "518083038185875af1925050503d80600081146100dc576040519150601f1960",
    "3f3d011682016040523d82523d6000602084013e6100e1565b606091505b5050",
    "905080610125576040517f08c379a00000000000000000000000000000000000",
    "0000000000000000000000815260040161011c9061019a565b60405180910390",
    "fd5b506101d6565b60006101386007836101c5565b91507f4661696c75726500",
    "0000000000000000000000000000000000000000000000006000830152602082",
    "019050919050565b60006101786000836101ba565b9150600082019050919050",
    "565b60006101908261016b565b9150819050919050565b600060208201905081",
    "810360008301526101b38161012b565b9050919050565b600081905092915050",
    "565b600082825260208201905092915050565b603f806101e46000396000f3fe",
    "6080604052600080fdfea264697066735822122095fed2c557b62b9f55f8b382",
    "2b0bdc6d15fd93abb95f37503d3f788da6cbb30064736f6c63430008000033",
);

pub struct OwlTo {
    chain: Arc<dyn ChainClient>,
}

impl OwlTo {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    pub async fn deploy(&self) -> Result<ActionOutcome> {
        let code = creation_code()?;
        let hash = self.chain.build_and_send(None, U256::ZERO, code).await?;
        Ok(ActionOutcome::Submitted(vec![hash]))
    }
}

fn creation_code() -> Result<Bytes> {
    hex::decode(BYTECODE)
        .map(Bytes::from)
        .map_err(|e| Error::Protocol(format!("Invalid OwlTo bytecode: {}", e)))
}

#[async_trait]
impl ProtocolAdapter for OwlTo {
    fn name(&self) -> &'static str {
        "OwlTo"
    }

    async fn perform_mandatory(&self) -> Result<ActionOutcome> {
        self.deploy().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[test]
    fn test_bytecode_decodes() {
        let code = creation_code().unwrap();
        assert_eq!(&code[..4], &[0x60, 0x80, 0x60, 0x40]);
        // solc metadata trailer
        assert_eq!(&code[code.len() - 3..], &[0x00, 0x00, 0x33]);
    }

    #[tokio::test]
    async fn test_deploy_is_contract_creation() {
        let chain = Arc::new(MockChain::new());
        let owlto = OwlTo::new(chain.clone());

        assert!(owlto.perform_mandatory().await.unwrap().is_success());
        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, None);
        assert_eq!(sent[0].value, U256::ZERO);
    }
}
