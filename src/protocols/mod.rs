//! Protocol adapters
//!
//! Every DeFi action the scheduler can take lives behind one of two seams:
//! `SwapExecutor` for the randomized swap routes and `ProtocolAdapter` for
//! the one-time mandatory checklist. Both report an explicit `ActionOutcome`.

mod ambient;
mod bean;
mod curvance;
mod erc20;
mod multpli;
mod owlto;
mod staking;
mod uniswap;

pub use ambient::Ambient;
pub use bean::BeanExchange;
pub use curvance::Curvance;
pub use erc20::approve_if_needed;
pub use multpli::MultPli;
pub use owlto::OwlTo;
pub use staking::Erc4626Stake;
pub use uniswap::UniswapRouter;

use crate::config::Settings;
use crate::tokens::{self, Token, BEAN, JAI, MON, USDC, USDT, WBTC};
use crate::wallet::ChainClient;
use crate::Result;
use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Seconds added to the local clock for router deadlines
pub const DEADLINE_SECS: i64 = 1200;

/// A deployed protocol contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub name: &'static str,
    pub address: Address,
}

pub const AMBIENT: ProtocolInfo = ProtocolInfo {
    name: "Ambient",
    address: address!("88B96aF200c8a9c35442C8AC6cd3D22695AaE4F0"),
};

pub const BEAN_EXCHANGE: ProtocolInfo = ProtocolInfo {
    name: "BeanExchange",
    address: address!("Ca810D095e90Daae6e867c19DF6D9A8C56db2c89"),
};

pub const UNISWAP_ROUTER: ProtocolInfo = ProtocolInfo {
    name: "UniswapRouter",
    address: address!("3aE6D8A282D67893e17AA70ebFFb33EE5aa65893"),
};

pub const APRIORI: ProtocolInfo = ProtocolInfo {
    name: "aPriori",
    address: address!("b2f82D0f38dc453D596Ad40A37799446Cc89274A"),
};

pub const SHMONAD: ProtocolInfo = ProtocolInfo {
    name: "Shmonad",
    address: address!("3a98250F98Dd388C211206983453837C8365BDc1"),
};

pub const MULTPLI_CLAIM: ProtocolInfo = ProtocolInfo {
    name: "MultPliClaim",
    address: address!("181579497d5c4EfEC2424A21095907ED7d91ac9A"),
};

pub const MULTPLI_STAKE: ProtocolInfo = ProtocolInfo {
    name: "MultPliStake",
    address: address!("BCF1415BD456eDb3a94c9d416F9298ECF9a2cDd0"),
};

pub const CURVANCE_FAUCET: ProtocolInfo = ProtocolInfo {
    name: "CurvanceFaucet",
    address: address!("2f930b339DE82F34FDbe54e872Eb4A2855B76EA2"),
};

/// Every contract the adapters talk to
pub const MONAD_PROTOCOLS: &[ProtocolInfo] = &[
    AMBIENT,
    BEAN_EXCHANGE,
    UNISWAP_ROUTER,
    APRIORI,
    SHMONAD,
    MULTPLI_CLAIM,
    MULTPLI_STAKE,
    CURVANCE_FAUCET,
];

/// Protocol lookup by contract address
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    by_address: HashMap<Address, ProtocolInfo>,
}

impl ProtocolRegistry {
    /// Build from a table, rejecting duplicate addresses
    pub fn from_table(table: &[ProtocolInfo]) -> Result<Self> {
        let mut by_address = HashMap::with_capacity(table.len());
        for protocol in table {
            if let Some(existing) = by_address.insert(protocol.address, *protocol) {
                return Err(crate::Error::Config(format!(
                    "Duplicate protocol address {} ({} and {})",
                    protocol.address, existing.name, protocol.name
                )));
            }
        }
        Ok(Self { by_address })
    }

    pub fn monad() -> Result<Self> {
        Self::from_table(MONAD_PROTOCOLS)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

/// Result of one protocol action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Transactions accepted by the node, in submission order
    Submitted(Vec<TxHash>),
    /// The action ran but did not go through
    Failed(String),
    /// The wallet cannot afford the action
    InsufficientFunds(String),
    /// The adapter has no action for this request
    NotApplicable,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Submitted(_))
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Submitted(hashes) => {
                let hashes: Vec<String> = hashes.iter().map(|h| h.to_string()).collect();
                write!(f, "submitted [{}]", hashes.join(", "))
            }
            ActionOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            ActionOutcome::InsufficientFunds(reason) => write!(f, "insufficient funds: {}", reason),
            ActionOutcome::NotApplicable => write!(f, "not applicable"),
        }
    }
}

/// A protocol the mandatory checklist can drive
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Ledger key of this protocol
    fn name(&self) -> &'static str;

    /// The one-time action required for this protocol
    async fn perform_mandatory(&self) -> Result<ActionOutcome> {
        Ok(ActionOutcome::NotApplicable)
    }
}

/// DEX a swap route goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dex {
    Ambient,
    Bean,
    Uniswap,
}

impl Dex {
    pub fn name(&self) -> &'static str {
        match self {
            Dex::Ambient => "Ambient",
            Dex::Bean => "Bean",
            Dex::Uniswap => "Uniswap",
        }
    }

    /// Smallest native amount worth swapping on this DEX
    pub fn min_swap_amount(&self) -> f64 {
        match self {
            Dex::Ambient => 0.0015,
            Dex::Bean => 0.0001,
            Dex::Uniswap => 0.004,
        }
    }
}

/// One swap the selector can choose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRoute {
    pub dex: Dex,
    pub from: Token,
    pub to: Token,
}

impl SwapRoute {
    pub const fn new(dex: Dex, from: Token, to: Token) -> Self {
        Self { dex, from, to }
    }

    pub fn spends_native(&self) -> bool {
        self.from.is_native
    }
}

impl fmt::Display for SwapRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}->{}", self.dex.name(), self.from.symbol, self.to.symbol)
    }
}

/// Every swap the scheduler performs
pub const ROUTES: &[SwapRoute] = &[
    SwapRoute::new(Dex::Bean, USDC, MON),
    SwapRoute::new(Dex::Bean, USDC, BEAN),
    SwapRoute::new(Dex::Bean, USDC, JAI),
    SwapRoute::new(Dex::Ambient, USDC, MON),
    SwapRoute::new(Dex::Bean, JAI, MON),
    SwapRoute::new(Dex::Bean, JAI, USDC),
    SwapRoute::new(Dex::Bean, JAI, BEAN),
    SwapRoute::new(Dex::Bean, BEAN, JAI),
    SwapRoute::new(Dex::Bean, BEAN, MON),
    SwapRoute::new(Dex::Ambient, WBTC, MON),
    SwapRoute::new(Dex::Ambient, MON, WBTC),
    SwapRoute::new(Dex::Ambient, MON, USDC),
    SwapRoute::new(Dex::Bean, MON, BEAN),
    SwapRoute::new(Dex::Uniswap, MON, USDT),
];

/// Routes that consume `token`
pub fn routes_from(token: &Token) -> impl Iterator<Item = &'static SwapRoute> + '_ {
    ROUTES.iter().filter(move |r| r.from.address == token.address)
}

/// Executes a chosen swap route
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn execute(&self, route: &SwapRoute) -> ActionOutcome;
}

/// Native amount for an outgoing swap on `dex`, in wei
pub fn swap_amount(settings: &Settings, dex: Dex) -> U256 {
    let sampled = settings.mod_amount_for_swap.sample(&mut rand::thread_rng());
    let amount = tokens::round_amount(sampled.max(dex.min_swap_amount()));
    MON.to_wei(amount)
}

/// Native amount for a stake deposit, in wei
pub fn stake_amount(settings: &Settings) -> U256 {
    let sampled = settings.mod_amount_for_stake.sample(&mut rand::thread_rng());
    MON.to_wei(tokens::round_amount(sampled))
}

/// Unix deadline for router calls
pub fn deadline() -> U256 {
    let ts = chrono::Utc::now().timestamp() + DEADLINE_SECS;
    U256::from(ts.max(0) as u64)
}

/// Apply a 1% slippage haircut to a quoted output
pub fn with_slippage(quoted: U256) -> U256 {
    quoted * U256::from(99) / U256::from(100)
}

/// Dispatches swap routes to the DEX adapters
pub struct Controller {
    ambient: Ambient,
    bean: BeanExchange,
    uniswap: UniswapRouter,
}

impl Controller {
    pub fn new(chain: Arc<dyn ChainClient>, settings: Arc<Settings>) -> Self {
        Self {
            ambient: Ambient::new(chain.clone(), settings.clone()),
            bean: BeanExchange::new(chain.clone(), settings.clone()),
            uniswap: UniswapRouter::new(chain, settings),
        }
    }
}

#[async_trait]
impl SwapExecutor for Controller {
    async fn execute(&self, route: &SwapRoute) -> ActionOutcome {
        let result = match route.dex {
            Dex::Ambient => self.ambient.swap(&route.from, &route.to).await,
            Dex::Bean => self.bean.swap(&route.from, &route.to).await,
            Dex::Uniswap => self.uniswap.swap(&route.from, &route.to).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => ActionOutcome::Failed(e.to_string()),
        }
    }
}

/// One entry of the mandatory checklist
#[derive(Clone)]
pub struct ChecklistItem {
    /// Ledger key
    pub protocol: &'static str,
    /// Name of the action, for logs
    pub action: &'static str,
    pub adapter: Arc<dyn ProtocolAdapter>,
}

impl ChecklistItem {
    pub fn new(action: &'static str, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        Self {
            protocol: adapter.name(),
            action,
            adapter,
        }
    }
}

impl fmt::Debug for ChecklistItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChecklistItem")
            .field("protocol", &self.protocol)
            .field("action", &self.action)
            .finish()
    }
}

/// The five one-time actions every wallet performs
pub fn standard_checklist(chain: Arc<dyn ChainClient>, settings: Arc<Settings>) -> Vec<ChecklistItem> {
    vec![
        ChecklistItem::new("deploy", Arc::new(OwlTo::new(chain.clone()))),
        ChecklistItem::new("claim_and_stake", Arc::new(MultPli::new(chain.clone()))),
        ChecklistItem::new(
            "stake_mon",
            Arc::new(Erc4626Stake::new(APRIORI, chain.clone(), settings.clone())),
        ),
        ChecklistItem::new("claim_all_tokens", Arc::new(Curvance::new(chain.clone()))),
        ChecklistItem::new(
            "stake_mon",
            Arc::new(Erc4626Stake::new(SHMONAD, chain, settings)),
        ),
    ]
}

/// Uniform draw in `[from, to]` without holding the RNG across an await
pub(crate) fn uniform(from: f64, to: f64) -> f64 {
    rand::thread_rng().gen_range(from..=to)
}
