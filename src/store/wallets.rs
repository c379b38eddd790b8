//! Durable wallet records
//!
//! The whole file is the unit of consistency: every change reads the array,
//! edits it and writes it back atomically while holding the store mutex.

use super::file::{read_json, write_json_atomic};
use crate::config::FromTo;
use crate::wallet::derive_address;
use crate::Result;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// A private key as stored in `wallets.json`. Never printed.
pub struct PrivateKey(SecretString);

impl PrivateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Key comparison that ignores surrounding whitespace and the 0x prefix
    pub fn matches(&self, other: &str) -> bool {
        normalize_key(self.expose()) == normalize_key(other)
    }
}

fn normalize_key(key: &str) -> String {
    let key = key.trim();
    key.strip_prefix("0x").unwrap_or(key).to_lowercase()
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for PrivateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// One imported wallet and its scheduling state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRecord {
    pub private_key: PrivateKey,
    pub address: Address,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Swap quota for the initial sequence, fixed at import
    pub number_of_swaps: u32,
    #[serde(default)]
    pub initial_completed: bool,
    #[serde(default = "Utc::now")]
    pub next_initial_action_time: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub next_activity_action_time: DateTime<Utc>,
}

impl WalletRecord {
    /// Name for logs, falling back to the address
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.address.to_string()
        } else {
            self.name.clone()
        }
    }

    /// Ledger key of this wallet
    pub fn wallet_id(&self) -> String {
        self.address.to_string().to_lowercase()
    }
}

/// Which scheduler a wallet currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    Activity,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Initial => "initial",
            Phase::Activity => "activity",
        }
    }

    /// Whether the wallet is in this phase at all
    pub fn includes(&self, record: &WalletRecord) -> bool {
        match self {
            Phase::Initial => !record.initial_completed,
            Phase::Activity => record.initial_completed,
        }
    }

    pub fn next_time(&self, record: &WalletRecord) -> DateTime<Utc> {
        match self {
            Phase::Initial => record.next_initial_action_time,
            Phase::Activity => record.next_activity_action_time,
        }
    }

    pub fn set_next_time(&self, record: &mut WalletRecord, at: DateTime<Utc>) {
        match self {
            Phase::Initial => record.next_initial_action_time = at,
            Phase::Activity => record.next_activity_action_time = at,
        }
    }

    pub fn is_due(&self, record: &WalletRecord, now: DateTime<Utc>) -> bool {
        self.includes(record) && self.next_time(record) <= now
    }
}

/// A row from the import file
#[derive(Debug, Clone)]
pub struct WalletImport {
    pub private_key: String,
    pub proxy: Option<String>,
    pub name: String,
}

/// Counts reported after an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub edited: usize,
    pub skipped: usize,
    pub total: usize,
}

/// The wallet file guarded by an async mutex
pub struct WalletStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl WalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<WalletRecord>> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }

    pub async fn load_all(&self) -> Result<Vec<WalletRecord>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// The most overdue wallet in `phase`, ties broken by file order
    pub async fn find_due(&self, phase: Phase, now: DateTime<Utc>) -> Result<Option<WalletRecord>> {
        let wallets = self.load_all().await?;
        Ok(wallets
            .into_iter()
            .filter(|w| phase.is_due(w, now))
            .min_by_key(|w| phase.next_time(w)))
    }

    /// Apply `f` to the wallet with `address` and persist. Returns false if no
    /// such wallet exists.
    pub async fn update<F>(&self, address: Address, f: F) -> Result<bool>
    where
        F: FnOnce(&mut WalletRecord),
    {
        let _guard = self.lock.lock().await;
        let mut wallets = self.read().await?;

        let Some(record) = wallets.iter_mut().find(|w| w.address == address) else {
            return Ok(false);
        };
        f(record);

        write_json_atomic(&self.path, &wallets).await?;
        Ok(true)
    }

    /// Earliest next activity time across wallets that finished the initial sequence
    pub async fn min_next_activity_time(&self) -> Result<Option<DateTime<Utc>>> {
        let wallets = self.load_all().await?;
        Ok(wallets
            .iter()
            .filter(|w| Phase::Activity.includes(w))
            .map(|w| w.next_activity_action_time)
            .min())
    }

    /// Move every overdue wallet in `phase` to `now + uniform(range)` so a
    /// restart does not fire the whole fleet at once
    pub async fn spread_expired(
        &self,
        phase: Phase,
        range: FromTo<u64>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut wallets = self.read().await?;

        let mut spread = 0;
        {
            let mut rng = rand::thread_rng();
            for wallet in wallets.iter_mut().filter(|w| phase.is_due(w, now)) {
                phase.set_next_time(wallet, now + range.sample_delay(&mut rng));
                spread += 1;
            }
        }

        if spread > 0 {
            write_json_atomic(&self.path, &wallets).await?;
        }
        Ok(spread)
    }

    /// Insert new wallets and refresh proxy/name of known ones
    pub async fn upsert_imports(
        &self,
        imports: Vec<WalletImport>,
        quota: FromTo<u32>,
        now: DateTime<Utc>,
    ) -> Result<ImportSummary> {
        let _guard = self.lock.lock().await;
        let mut wallets = self.read().await?;
        let mut summary = ImportSummary::default();

        for row in imports {
            let proxy = row.proxy.filter(|p| !p.trim().is_empty());

            if let Some(existing) = wallets
                .iter_mut()
                .find(|w| w.private_key.matches(&row.private_key))
            {
                if existing.proxy != proxy || existing.name != row.name {
                    existing.proxy = proxy;
                    existing.name = row.name;
                    summary.edited += 1;
                }
                continue;
            }

            let address = match derive_address(&row.private_key) {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!(name = %row.name, error = %e, "Skipping wallet with invalid key");
                    summary.skipped += 1;
                    continue;
                }
            };

            let number_of_swaps = quota.sample(&mut rand::thread_rng());
            wallets.push(WalletRecord {
                private_key: PrivateKey::new(row.private_key.trim()),
                address,
                proxy,
                name: row.name,
                number_of_swaps,
                initial_completed: false,
                next_initial_action_time: now,
                next_activity_action_time: now,
            });
            summary.imported += 1;
        }

        summary.total = wallets.len();
        write_json_atomic(&self.path, &wallets).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn import(key: &str, proxy: Option<&str>, name: &str) -> WalletImport {
        WalletImport {
            private_key: key.to_string(),
            proxy: proxy.map(str::to_string),
            name: name.to_string(),
        }
    }

    fn store() -> (tempfile::TempDir, WalletStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = WalletStore::new(dir.path().join("wallets.json"));
        (dir, store)
    }

    #[test]
    fn test_private_key_is_redacted() {
        let key = PrivateKey::new(KEY_A);
        assert_eq!(format!("{:?}", key), "[REDACTED]");
        assert!(key.matches(KEY_A.trim_start_matches("0x")));
    }

    #[tokio::test]
    async fn test_import_inserts_and_edits() {
        let (_dir, store) = store();
        let now = Utc::now();
        let quota = FromTo::new(5, 15);

        let summary = store
            .upsert_imports(
                vec![import(KEY_A, None, "a"), import("0xnotakey", None, "bad")],
                quota,
                now,
            )
            .await
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 1);

        let first = store.load_all().await.unwrap().remove(0);
        assert!(quota.contains(first.number_of_swaps));
        assert_eq!(
            first.wallet_id(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );

        let summary = store
            .upsert_imports(
                vec![
                    import(KEY_A, Some("1.2.3.4:8080"), "renamed"),
                    import(KEY_B, Some(""), "b"),
                ],
                quota,
                now,
            )
            .await
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.edited, 1);
        assert_eq!(summary.total, 2);

        let wallets = store.load_all().await.unwrap();
        assert_eq!(wallets[0].name, "renamed");
        assert_eq!(wallets[0].proxy.as_deref(), Some("1.2.3.4:8080"));
        // identity and quota untouched by an edit
        assert_eq!(wallets[0].address, first.address);
        assert_eq!(wallets[0].number_of_swaps, first.number_of_swaps);
        assert_eq!(wallets[1].proxy, None);
    }

    #[tokio::test]
    async fn test_find_due_picks_most_overdue() {
        let (_dir, store) = store();
        let now = Utc::now();
        store
            .upsert_imports(
                vec![import(KEY_A, None, "a"), import(KEY_B, None, "b")],
                FromTo::new(5, 5),
                now,
            )
            .await
            .unwrap();

        let b = store.load_all().await.unwrap()[1].address;
        store
            .update(b, |w| w.next_initial_action_time = now - Duration::hours(1))
            .await
            .unwrap();

        let due = store.find_due(Phase::Initial, now).await.unwrap().unwrap();
        assert_eq!(due.address, b);
        assert!(store.find_due(Phase::Activity, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_phase_membership() {
        let (_dir, store) = store();
        let now = Utc::now();
        store
            .upsert_imports(vec![import(KEY_A, None, "a")], FromTo::new(5, 5), now)
            .await
            .unwrap();
        let address = store.load_all().await.unwrap()[0].address;

        store
            .update(address, |w| {
                w.initial_completed = true;
                w.next_activity_action_time = now + Duration::hours(2);
            })
            .await
            .unwrap();

        assert!(store.find_due(Phase::Initial, now).await.unwrap().is_none());
        assert!(store.find_due(Phase::Activity, now).await.unwrap().is_none());
        assert_eq!(
            store.min_next_activity_time().await.unwrap(),
            Some(now + Duration::hours(2))
        );
        assert!(store
            .find_due(Phase::Activity, now + Duration::hours(3))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_spread_expired() {
        let (_dir, store) = store();
        let now = Utc::now();
        store
            .upsert_imports(
                vec![import(KEY_A, None, "a"), import(KEY_B, None, "b")],
                FromTo::new(5, 5),
                now - Duration::hours(5),
            )
            .await
            .unwrap();

        let spread = store
            .spread_expired(Phase::Initial, FromTo::new(100, 200), now)
            .await
            .unwrap();
        assert_eq!(spread, 2);

        for wallet in store.load_all().await.unwrap() {
            let delta = (wallet.next_initial_action_time - now).num_seconds();
            assert!((100..=200).contains(&delta));
        }
    }

    #[tokio::test]
    async fn test_update_unknown_wallet() {
        let (_dir, store) = store();
        let updated = store.update(Address::ZERO, |_| {}).await.unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_record_round_trips_through_file() {
        let (_dir, store) = store();
        let now = Utc::now();
        store
            .upsert_imports(vec![import(KEY_A, Some("p:1"), "a")], FromTo::new(7, 7), now)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["private_key"], KEY_A);
        assert_eq!(value[0]["number_of_swaps"], 7);
        assert_eq!(value[0]["initial_completed"], false);
    }
}
