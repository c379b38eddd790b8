//! Wallet import and the balance report

use crate::config::{FromTo, RpcConfig};
use crate::store::{ImportSummary, WalletImport, WalletRecord, WalletStore};
use crate::tokens::{format_units, MON};
use crate::wallet::{ChainClient, RpcChainClient, SecureWallet};
use crate::Result;
use chrono::Utc;
use futures::future::join_all;
use rand::Rng;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

/// Upper bound of the random pause before each balance query, in milliseconds
const BALANCE_JITTER_MS: u64 = 1500;

/// Parse `private_key,proxy,name` rows. The first line is the header.
pub fn parse_import_csv(content: &str) -> Vec<WalletImport> {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut cols = line.split(',').map(str::trim);
            let private_key = cols.next().filter(|k| !k.is_empty())?;
            let proxy = cols.next().filter(|p| !p.is_empty()).map(str::to_string);
            let name = cols.next().unwrap_or_default().to_string();
            Some(WalletImport {
                private_key: private_key.to_string(),
                proxy,
                name,
            })
        })
        .collect()
}

/// Read `csv_path` into the store, drawing a swap quota for each new wallet
pub async fn import_wallets(
    csv_path: &Path,
    store: &WalletStore,
    quota: FromTo<u32>,
) -> Result<ImportSummary> {
    let content = tokio::fs::read_to_string(csv_path).await?;
    let rows = parse_import_csv(&content);
    if rows.is_empty() {
        warn!(path = %csv_path.display(), "Import file has no wallets");
    }

    let summary = store.upsert_imports(rows, quota, Utc::now()).await?;
    info!(
        imported = summary.imported,
        edited = summary.edited,
        skipped = summary.skipped,
        total = summary.total,
        "Wallet import finished"
    );
    Ok(summary)
}

async fn report_one(wallet: WalletRecord, rpc: RpcConfig) {
    let jitter = rand::thread_rng().gen_range(0..=BALANCE_JITTER_MS);
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    let label = wallet.label();
    let client = SecureWallet::from_hex(wallet.private_key.expose())
        .and_then(|signer| RpcChainClient::connect(&rpc, &signer, wallet.proxy.as_deref()));
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            error!(wallet = %label, error = %e, "Failed to connect wallet");
            return;
        }
    };

    match client.native_balance().await {
        Ok(balance) => info!(
            wallet = %label,
            address = %wallet.address,
            balance = %format_units(balance, MON.decimals),
            "MON balance"
        ),
        Err(e) => error!(wallet = %label, error = %e, "Failed to fetch MON balance"),
    }
}

/// Log the native balance of every stored wallet, concurrently
pub async fn report_balances(store: &WalletStore, rpc: &RpcConfig) -> Result<()> {
    let wallets = store.load_all().await?;
    info!(wallets = wallets.len(), "Fetching balances");

    join_all(wallets.into_iter().map(|w| report_one(w, rpc.clone()))).await;
    Ok(())
}
