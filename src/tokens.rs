//! Monad testnet token registry
//!
//! Token metadata lives in one explicit table. The lookup map is built from
//! that table once at startup and refuses duplicate addresses.

use alloy::primitives::{address, Address, U256};
use std::collections::HashMap;

/// Token metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Token symbol (e.g., "USDC", "WBTC")
    pub symbol: &'static str,
    /// Human readable name
    pub name: &'static str,
    /// Contract address (zero address for the native token)
    pub address: Address,
    /// Number of decimals
    pub decimals: u8,
    /// Whether this is the chain's native token
    pub is_native: bool,
}

impl Token {
    const fn erc20(symbol: &'static str, name: &'static str, address: Address, decimals: u8) -> Self {
        Self {
            symbol,
            name,
            address,
            decimals,
            is_native: false,
        }
    }

    /// Convert a human amount into base units
    pub fn to_wei(&self, amount: f64) -> U256 {
        amount_to_wei(amount, self.decimals)
    }
}

pub const MON: Token = Token {
    symbol: "MON",
    name: "Monad",
    address: Address::ZERO,
    decimals: 18,
    is_native: true,
};

pub const WMON: Token = Token::erc20(
    "WMON",
    "Wrapped Monad",
    address!("760AfE86e5de5fa0Ee542fc7B7B713e1c5425701"),
    18,
);

pub const USDT: Token = Token::erc20(
    "USDT",
    "Tether USD",
    address!("fbc2d240a5ed44231aca3a9e9066bc4b33f01149"),
    6,
);

pub const BEAN: Token = Token::erc20(
    "BEAN",
    "Bean Exchange",
    address!("268E4E24E0051EC27b3D27A95977E71cE6875a05"),
    18,
);

pub const JAI: Token = Token::erc20(
    "JAI",
    "AI Jarvis",
    address!("Cc5B42F9d6144DFDFb6fb3987a2A916af902F5f8"),
    6,
);

pub const USDC: Token = Token::erc20(
    "USDC",
    "USD Coin",
    address!("f817257fed379853cDe0fa4F97AB987181B1E5Ea"),
    6,
);

pub const WBTC: Token = Token::erc20(
    "WBTC",
    "Wrapped Bitcoin",
    address!("cf5a6076cfa32686c0Df13aBaDa2b40dec133F1d"),
    8,
);

/// Every token the scheduler knows about
pub const MONAD_TOKENS: &[Token] = &[MON, WMON, USDT, BEAN, JAI, USDC, WBTC];

/// Tokens whose balances drive action selection
pub const TRACKED_TOKENS: &[Token] = &[USDC, JAI, BEAN, WBTC];

/// Token registry providing lookups by address
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    by_address: HashMap<Address, Token>,
}

impl TokenRegistry {
    /// Build a registry from a table, rejecting duplicate addresses
    pub fn from_table(table: &[Token]) -> crate::Result<Self> {
        let mut by_address = HashMap::with_capacity(table.len());
        for token in table {
            if let Some(existing) = by_address.insert(token.address, *token) {
                return Err(crate::Error::Config(format!(
                    "Duplicate token address {} ({} and {})",
                    token.address, existing.symbol, token.symbol
                )));
            }
        }
        Ok(Self { by_address })
    }

    /// Registry of the Monad testnet tokens
    pub fn monad() -> crate::Result<Self> {
        Self::from_table(MONAD_TOKENS)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

/// Convert a human amount with `decimals` into base units.
/// Negative or non-finite input yields zero.
pub fn amount_to_wei(amount: f64, decimals: u8) -> U256 {
    if !amount.is_finite() || amount <= 0.0 {
        return U256::ZERO;
    }
    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    U256::from(scaled as u128)
}

/// Round a sampled amount to 7 decimal places
pub fn round_amount(amount: f64) -> f64 {
    (amount * 1e7).round() / 1e7
}

/// Format a U256 value with decimals
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monad_registry_builds() {
        let registry = TokenRegistry::monad().unwrap();
        assert_eq!(registry.len(), MONAD_TOKENS.len());
        assert_eq!(MONAD_TOKENS.iter().filter(|t| t.is_native).count(), 1);
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let dup = Token { symbol: "USDC2", ..USDC };
        let err = TokenRegistry::from_table(&[USDC, dup]).unwrap_err();
        assert!(err.to_string().contains("Duplicate token address"));
    }

    #[test]
    fn test_amount_to_wei() {
        assert_eq!(amount_to_wei(1.5, 6), U256::from(1_500_000u64));
        assert_eq!(
            amount_to_wei(0.03, 18),
            U256::from(30_000_000_000_000_000u128)
        );
        assert_eq!(amount_to_wei(-1.0, 18), U256::ZERO);
        assert_eq!(amount_to_wei(f64::NAN, 18), U256::ZERO);
    }

    #[test]
    fn test_format_units() {
        let one_point_five = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units(one_point_five, 18), "1.5");
        assert_eq!(format_units(U256::from(1_000_000_000u64), 6), "1000");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_round_amount() {
        assert_eq!(round_amount(0.012345678), 0.0123457);
    }
}
