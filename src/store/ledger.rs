//! Completion ledger for the mandatory checklist
//!
//! `{wallet_address_lowercase: {protocol: true}}`. Entries are only ever set,
//! and each one is flushed to disk before the next checklist item starts.

use super::file::{read_json, write_json_atomic};
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Entries = BTreeMap<String, BTreeMap<String, bool>>;

pub struct CompletionLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CompletionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Entries> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }

    /// Protocols already completed by `wallet_id`
    pub async fn completed_for(&self, wallet_id: &str) -> Result<BTreeSet<String>> {
        let _guard = self.lock.lock().await;
        let entries = self.read().await?;

        Ok(entries
            .get(&wallet_id.to_lowercase())
            .map(|done| {
                done.iter()
                    .filter(|(_, done)| **done)
                    .map(|(protocol, _)| protocol.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn is_done(&self, wallet_id: &str, protocol: &str) -> Result<bool> {
        Ok(self.completed_for(wallet_id).await?.contains(protocol))
    }

    /// Record `protocol` as done for `wallet_id` and flush immediately
    pub async fn mark_done(&self, wallet_id: &str, protocol: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;

        entries
            .entry(wallet_id.to_lowercase())
            .or_default()
            .insert(protocol.to_string(), true);

        write_json_atomic(&self.path, &entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mark_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CompletionLedger::new(dir.path().join("completed_actions.json"));

        assert!(!ledger.is_done("0xABC", "OwlTo").await.unwrap());
        ledger.mark_done("0xABC", "OwlTo").await.unwrap();

        assert!(ledger.is_done("0xabc", "OwlTo").await.unwrap());
        assert!(!ledger.is_done("0xabc", "Curvance").await.unwrap());
        assert!(!ledger.is_done("0xdef", "OwlTo").await.unwrap());

        // durable across instances
        let reopened = CompletionLedger::new(ledger.path());
        assert!(reopened.is_done("0xabc", "OwlTo").await.unwrap());
    }

    #[tokio::test]
    async fn test_false_entries_are_not_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed_actions.json");
        std::fs::write(&path, r#"{"0xabc": {"OwlTo": false, "aPriori": true}}"#).unwrap();

        let ledger = CompletionLedger::new(&path);
        let done = ledger.completed_for("0xabc").await.unwrap();
        assert_eq!(done.into_iter().collect::<Vec<_>>(), vec!["aPriori"]);
    }

    #[tokio::test]
    async fn test_concurrent_marks_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(CompletionLedger::new(dir.path().join("completed_actions.json")));

        let mut handles = Vec::new();
        for i in 0..10 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .mark_done(&format!("0x{:02}", i), "Shmonad")
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10 {
            assert!(ledger
                .is_done(&format!("0x{:02}", i), "Shmonad")
                .await
                .unwrap());
        }
    }
}
