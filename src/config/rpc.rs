//! RPC endpoint configuration
//!
//! Resolution order:
//! 1. `MONAD_RPC_URL` env var - highest priority
//! 2. Public testnet RPC fallback (rate limited)
//!
//! # Examples
//!
//! ```bash
//! export MONAD_RPC_URL="https://monad-testnet.g.alchemy.com/v2/YOUR_KEY"
//! ```

/// Chain ID constants
pub mod chains {
    pub const MONAD_TESTNET: u64 = 10143;
}

/// Environment variable names
mod env_vars {
    pub const MONAD_RPC_URL: &str = "MONAD_RPC_URL";
}

/// Public RPC endpoints (rate limited)
mod public_rpcs {
    pub const MONAD_TESTNET: &str = "https://testnet-rpc.monad.xyz";
}

/// RPC configuration for the target chain
#[derive(Debug, Clone)]
pub struct RpcConfig {
    url: String,
    chain_id: u64,
}

impl RpcConfig {
    /// Create RPC config from environment variables, falling back to the public RPC
    pub fn from_env() -> Self {
        let url = match std::env::var(env_vars::MONAD_RPC_URL) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!("Using MONAD_RPC_URL for Monad testnet");
                url
            }
            _ => {
                tracing::warn!("No RPC configured for Monad testnet, using public RPC (rate limited)");
                public_rpcs::MONAD_TESTNET.to_string()
            }
        };

        Self {
            url,
            chain_id: chains::MONAD_TESTNET,
        }
    }

    /// Create with an explicit RPC URL
    pub fn with_url(url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            url: url.into(),
            chain_id,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Parse the endpoint into a URL
    pub fn parsed_url(&self) -> crate::Result<url::Url> {
        self.url
            .parse()
            .map_err(|e| crate::Error::Config(format!("Invalid RPC URL {}: {}", self.url, e)))
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
