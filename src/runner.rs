//! Application runner
//!
//! Wires the files directory, settings, wallet store and chain access into
//! the commands the CLI exposes.

use crate::config::{FilePaths, RpcConfig, Settings};
use crate::engine::{MandatoryRunner, Phase, SchedulerLoop, SessionFactory, WalletSession};
use crate::explorer::BlockvisionClient;
use crate::import::{import_wallets, report_balances};
use crate::protocols::{standard_checklist, Controller, ProtocolRegistry};
use crate::store::{CompletionLedger, ImportSummary, WalletRecord, WalletStore};
use crate::tokens::TokenRegistry;
use crate::wallet::{ChainClient, RpcChainClient, SecureWallet};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Opens RPC-backed sessions, one signing client per wallet and proxy
pub struct RpcSessionFactory {
    rpc: RpcConfig,
    settings: Arc<Settings>,
}

impl RpcSessionFactory {
    pub fn new(rpc: RpcConfig, settings: Arc<Settings>) -> Self {
        Self { rpc, settings }
    }
}

impl SessionFactory for RpcSessionFactory {
    fn open(&self, wallet: &WalletRecord) -> Result<WalletSession> {
        let signer = SecureWallet::from_hex(wallet.private_key.expose())?;
        let client = RpcChainClient::connect(&self.rpc, &signer, wallet.proxy.as_deref())?;
        let chain: Arc<dyn ChainClient> = Arc::new(client);

        Ok(WalletSession {
            swaps: Arc::new(Controller::new(chain.clone(), self.settings.clone())),
            checklist: standard_checklist(chain.clone(), self.settings.clone()),
            chain,
        })
    }
}

/// Runs the scheduler commands against one files directory
pub struct AppRunner {
    paths: FilePaths,
    rpc: RpcConfig,
}

impl AppRunner {
    pub fn new(paths: FilePaths, rpc: RpcConfig) -> Self {
        Self { paths, rpc }
    }

    pub fn paths(&self) -> &FilePaths {
        &self.paths
    }

    /// Bootstrap the files directory, load settings and check the static tables
    pub async fn prepare(&self) -> Result<Arc<Settings>> {
        self.paths.bootstrap().await?;
        let settings = Settings::load(&self.paths.settings()).await?;

        let tokens = TokenRegistry::monad()?;
        let protocols = ProtocolRegistry::monad()?;
        info!(
            files = %self.paths.root().display(),
            rpc = %self.rpc.url(),
            tokens = tokens.len(),
            protocols = protocols.len(),
            "Loaded configuration"
        );
        Ok(Arc::new(settings))
    }

    fn store(&self) -> Arc<WalletStore> {
        Arc::new(WalletStore::new(self.paths.wallets()))
    }

    /// Import `import.csv` into the wallet store
    pub async fn import(&self) -> Result<ImportSummary> {
        let settings = self.prepare().await?;
        import_wallets(&self.paths.import_csv(), &self.store(), settings.number_of_swaps).await
    }

    /// Run the initial-sequence and activity loops side by side. Never returns
    /// unless startup fails.
    pub async fn run_swaps(&self) -> Result<()> {
        let settings = self.prepare().await?;
        if !settings.has_blockvision_key() {
            warn!("No Blockvision API key configured, swap quota lookups will fail");
        }

        let store = self.store();
        let wallets = store.load_all().await?;
        info!(wallets = wallets.len(), "Starting swap loops");

        let history = Arc::new(BlockvisionClient::new(settings.blockvision_api_key.clone())?);
        let sessions: Arc<dyn SessionFactory> =
            Arc::new(RpcSessionFactory::new(self.rpc.clone(), settings.clone()));

        let initial = SchedulerLoop::new(
            Phase::Initial,
            store.clone(),
            settings.clone(),
            sessions.clone(),
            history.clone(),
        );
        let activity = SchedulerLoop::new(Phase::Activity, store, settings, sessions, history);

        tokio::join!(initial.run(), activity.run());
        Ok(())
    }

    /// Run the mandatory checklist for every stored wallet
    pub async fn run_mandatory(&self) -> Result<usize> {
        let settings = self.prepare().await?;
        let wallets = self.store().load_all().await?;
        if wallets.is_empty() {
            warn!("No wallets imported, nothing to do");
            return Ok(0);
        }

        let ledger = Arc::new(CompletionLedger::new(self.paths.completed_actions()));
        let runner = Arc::new(MandatoryRunner::new(ledger, settings.mandatory_actions_delay));
        let sessions = Arc::new(RpcSessionFactory::new(self.rpc.clone(), settings));

        let total = wallets.len();
        let finished = runner.run_fleet(wallets, sessions).await;
        info!(finished, total, "Mandatory actions finished");
        Ok(finished)
    }

    /// Log the MON balance of every stored wallet
    pub async fn balances(&self) -> Result<()> {
        self.prepare().await?;
        report_balances(&self.store(), &self.rpc).await
    }

    /// Effective settings after bootstrap and environment overrides
    pub async fn settings(&self) -> Result<Settings> {
        let settings = self.prepare().await?;
        Ok(settings.as_ref().clone())
    }
}
