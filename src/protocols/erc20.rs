use crate::wallet::ChainClient;
use crate::{Error, Result};
use alloy::primitives::{Address, TxHash, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Approve `spender` for ten times `amount` when the current allowance is short.
/// Returns the approval hash if one was sent.
pub async fn approve_if_needed(
    chain: &dyn ChainClient,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<Option<TxHash>> {
    let query = IERC20::allowanceCall {
        owner: chain.address(),
        spender,
    }
    .abi_encode();
    let output = chain.call(token, query.into()).await?;
    let allowance = IERC20::allowanceCall::abi_decode_returns(&output)
        .map_err(|e| Error::Protocol(format!("Bad allowance response from {}: {}", token, e)))?;

    if allowance >= amount {
        return Ok(None);
    }

    let approve = IERC20::approveCall {
        spender,
        amount: amount.saturating_mul(U256::from(10)),
    }
    .abi_encode();
    let hash = chain
        .build_and_send(Some(token), U256::ZERO, approve.into())
        .await?;

    tracing::debug!(token = %token, spender = %spender, tx = %hash, "Approval sent");
    Ok(Some(hash))
}
