//! Bean Exchange, a Uniswap V2 style router
//!
//! Native legs go through WMON. Token-to-token swaps use the direct pair.

use super::{approve_if_needed, deadline, swap_amount, with_slippage, ActionOutcome, Dex, BEAN_EXCHANGE};
use crate::config::Settings;
use crate::tokens::{Token, WMON};
use crate::wallet::ChainClient;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::Arc;

sol! {
    interface IBeanRouter {
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
        function swapExactETHForTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) external payable returns (uint256[] amounts);
        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external returns (uint256[] amounts);
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external returns (uint256[] amounts);
    }
}

pub struct BeanExchange {
    chain: Arc<dyn ChainClient>,
    settings: Arc<Settings>,
}

impl BeanExchange {
    pub fn new(chain: Arc<dyn ChainClient>, settings: Arc<Settings>) -> Self {
        Self { chain, settings }
    }

    pub async fn swap(&self, from: &Token, to: &Token) -> Result<ActionOutcome> {
        match (from.is_native, to.is_native) {
            (true, false) => self.swap_native_for_token(to).await,
            (false, _) => self.swap_token(from, to).await,
            (true, true) => Err(Error::Protocol("Bean cannot swap MON for MON".to_string())),
        }
    }

    async fn quote(&self, amount_in: U256, path: Vec<Address>) -> Result<U256> {
        let input = IBeanRouter::getAmountsOutCall {
            amountIn: amount_in,
            path,
        }
        .abi_encode();
        let output = self.chain.call(BEAN_EXCHANGE.address, input.into()).await?;
        let amounts = IBeanRouter::getAmountsOutCall::abi_decode_returns(&output)
            .map_err(|e| Error::Protocol(format!("Bad getAmountsOut response: {}", e)))?;

        amounts
            .last()
            .copied()
            .ok_or_else(|| Error::Protocol("Empty getAmountsOut response".to_string()))
    }

    async fn swap_native_for_token(&self, to: &Token) -> Result<ActionOutcome> {
        let amount = swap_amount(&self.settings, Dex::Bean);
        let path = vec![WMON.address, to.address];
        let min_out = with_slippage(self.quote(amount, path.clone()).await?);

        let input = IBeanRouter::swapExactETHForTokensCall {
            amountOutMin: min_out,
            path,
            to: self.chain.address(),
            deadline: deadline(),
        }
        .abi_encode();

        let hash = self
            .chain
            .build_and_send(Some(BEAN_EXCHANGE.address), amount, input.into())
            .await?;
        Ok(ActionOutcome::Submitted(vec![hash]))
    }

    /// Sell the full `from` balance
    async fn swap_token(&self, from: &Token, to: &Token) -> Result<ActionOutcome> {
        let amount = self.chain.token_balance(from.address).await?;
        if amount.is_zero() {
            return Ok(ActionOutcome::InsufficientFunds(format!(
                "no {} to sell",
                from.symbol
            )));
        }

        let mut hashes = Vec::with_capacity(2);
        if let Some(approval) =
            approve_if_needed(self.chain.as_ref(), from.address, BEAN_EXCHANGE.address, amount)
                .await?
        {
            hashes.push(approval);
        }

        let recipient = self.chain.address();
        let input = if to.is_native {
            let path = vec![from.address, WMON.address];
            let min_out = with_slippage(self.quote(amount, path.clone()).await?);
            IBeanRouter::swapExactTokensForETHCall {
                amountIn: amount,
                amountOutMin: min_out,
                path,
                to: recipient,
                deadline: deadline(),
            }
            .abi_encode()
        } else {
            let path = vec![from.address, to.address];
            let min_out = with_slippage(self.quote(amount, path.clone()).await?);
            IBeanRouter::swapExactTokensForTokensCall {
                amountIn: amount,
                amountOutMin: min_out,
                path,
                to: recipient,
                deadline: deadline(),
            }
            .abi_encode()
        };

        let hash = self
            .chain
            .build_and_send(Some(BEAN_EXCHANGE.address), U256::ZERO, input.into())
            .await?;
        hashes.push(hash);
        Ok(ActionOutcome::Submitted(hashes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;
    use crate::tokens::{BEAN, JAI, MON, USDC};
    use alloy::sol_types::SolValue;

    fn chain_with_quote(out: u64) -> Arc<MockChain> {
        let chain = Arc::new(MockChain::new());
        chain.respond(
            IBeanRouter::getAmountsOutCall::SELECTOR,
            vec![U256::from(1u64), U256::from(out)].abi_encode(),
        );
        chain
    }

    #[tokio::test]
    async fn test_native_for_bean() {
        let chain = chain_with_quote(1_000);
        let bean = BeanExchange::new(chain.clone(), Arc::new(Settings::default()));

        assert!(bean.swap(&MON, &BEAN).await.unwrap().is_success());

        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, Some(BEAN_EXCHANGE.address));
        assert!(!sent[0].value.is_zero());

        let call = IBeanRouter::swapExactETHForTokensCall::abi_decode(&sent[0].input).unwrap();
        assert_eq!(call.path, vec![WMON.address, BEAN.address]);
        assert_eq!(call.amountOutMin, U256::from(990u64));
        assert_eq!(call.to, chain.address());
    }

    #[tokio::test]
    async fn test_token_for_native_via_wmon() {
        let chain = chain_with_quote(10_000);
        chain.set_token(JAI.address, U256::from(777u64));
        let bean = BeanExchange::new(chain.clone(), Arc::new(Settings::default()));

        let outcome = bean.swap(&JAI, &MON).await.unwrap();
        assert!(outcome.is_success());

        let sent = chain.sent();
        // approve + swap
        assert_eq!(sent.len(), 2);
        let call = IBeanRouter::swapExactTokensForETHCall::abi_decode(&sent[1].input).unwrap();
        assert_eq!(call.amountIn, U256::from(777u64));
        assert_eq!(call.amountOutMin, U256::from(9_900u64));
        assert_eq!(call.path, vec![JAI.address, WMON.address]);
    }

    #[tokio::test]
    async fn test_token_for_token_direct_path() {
        let chain = chain_with_quote(500);
        chain.set_token(USDC.address, U256::from(42u64));
        let bean = BeanExchange::new(chain.clone(), Arc::new(Settings::default()));

        bean.swap(&USDC, &JAI).await.unwrap();

        let sent = chain.sent();
        let last = sent.last().unwrap();
        let call = IBeanRouter::swapExactTokensForTokensCall::abi_decode(&last.input).unwrap();
        assert_eq!(call.path, vec![USDC.address, JAI.address]);
        assert_eq!(last.value, U256::ZERO);
    }

    #[tokio::test]
    async fn test_empty_token_balance() {
        let chain = chain_with_quote(500);
        let bean = BeanExchange::new(chain.clone(), Arc::new(Settings::default()));

        let outcome = bean.swap(&BEAN, &JAI).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::InsufficientFunds(_)));
        assert!(chain.sent().is_empty());
    }
}
