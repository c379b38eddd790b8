//! Transaction history via the Blockvision indexer
//!
//! Only the initial sequence reads history: it counts past swaps against the
//! wallet's quota. Pages are fetched until a short page comes back.

use crate::protocols::{AMBIENT, BEAN_EXCHANGE, UNISWAP_ROUTER};
use crate::retry::retry_fixed;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

const BLOCKVISION_URL: &str = "https://api.blockvision.org/v2/monad/account/transactions";
const PAGE_LIMIT: usize = 50;
const PAGE_ATTEMPTS: usize = 3;
const PAGE_RETRY_DELAY: Duration = Duration::from_secs(3);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// One indexed transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryTx {
    pub hash: String,
    /// Recipient; absent for contract creations
    #[serde(default)]
    pub to: Option<String>,
    /// 1 for success
    #[serde(default)]
    pub status: i64,
    /// 4-byte selector name as reported by the indexer
    #[serde(rename = "methodID", default)]
    pub method_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    reason: String,
    result: Option<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(default)]
    data: Vec<HistoryTx>,
}

/// Source of a wallet's past transactions
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// Every transaction sent from `address`, across all pages
    async fn get_all_transactions(&self, address: Address) -> Result<Vec<HistoryTx>>;
}

/// Blockvision REST client
pub struct BlockvisionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl BlockvisionClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, BLOCKVISION_URL, HTTP_TIMEOUT)
    }

    fn with_endpoint(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::History(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    async fn fetch_page(&self, address: &str, page: usize) -> Result<Vec<HistoryTx>> {
        let cursor = (page - 1) * PAGE_LIMIT;
        let response = self
            .client
            .get(&self.base_url)
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .query(&[
                ("address", address.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("cursor", cursor.to_string()),
            ])
            .send()
            .await?;

        let body: ApiResponse = response.json().await?;
        parse_page(body)
    }
}

fn parse_page(body: ApiResponse) -> Result<Vec<HistoryTx>> {
    if body.code != 0 {
        return Err(Error::History(format!(
            "code {}: {} {}",
            body.code, body.message, body.reason
        )));
    }
    Ok(body.result.map(|r| r.data).unwrap_or_default())
}

#[async_trait]
impl HistoryApi for BlockvisionClient {
    async fn get_all_transactions(&self, address: Address) -> Result<Vec<HistoryTx>> {
        let address = address.to_string().to_lowercase();
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let txs = retry_fixed(
                |_| self.fetch_page(&address, page),
                PAGE_ATTEMPTS,
                PAGE_RETRY_DELAY,
            )
            .await?;

            let len = txs.len();
            all.extend(txs);
            if len < PAGE_LIMIT {
                break;
            }
            page += 1;
        }

        tracing::debug!(wallet = %address, count = all.len(), "Fetched transaction history");
        Ok(all)
    }
}

/// Count successful transactions to `contract` calling `method`, each hash once
pub fn count_matching(txs: &[HistoryTx], contract: Address, method: &str) -> usize {
    let contract = contract.to_string().to_lowercase();
    let mut seen = HashSet::new();

    txs.iter()
        .filter(|tx| tx.status == 1)
        .filter(|tx| {
            tx.to
                .as_deref()
                .is_some_and(|to| to.to_lowercase() == contract)
        })
        .filter(|tx| tx.method_id == method)
        .filter(|tx| seen.insert(tx.hash.as_str()))
        .count()
}

/// (contract, method) pairs that count toward the swap quota
pub const SWAP_SIGNATURES: &[(Address, &str)] = &[
    (AMBIENT.address, "userCmd"),
    (BEAN_EXCHANGE.address, "swapExactETHForTokens"),
    (BEAN_EXCHANGE.address, "swapExactTokensForETH"),
    (BEAN_EXCHANGE.address, "swapExactTokensForTokens"),
    (UNISWAP_ROUTER.address, "execute"),
];

/// Number of past swaps across every known DEX
pub fn count_swaps(txs: &[HistoryTx]) -> usize {
    SWAP_SIGNATURES
        .iter()
        .map(|(contract, method)| count_matching(txs, *contract, method))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tx(hash: &str, to: &str, status: i64, method: &str) -> HistoryTx {
        HistoryTx {
            hash: hash.to_string(),
            to: Some(to.to_string()),
            status,
            method_id: method.to_string(),
        }
    }

    #[test]
    fn test_count_matching_filters_and_dedups() {
        let ambient = "0x88b96af200c8a9c35442c8ac6cd3d22695aae4f0";
        let txs = vec![
            tx("0x1", ambient, 1, "userCmd"),
            tx("0x1", ambient, 1, "userCmd"),
            tx("0x2", &ambient.to_uppercase().replace("0X", "0x"), 1, "userCmd"),
            tx("0x3", ambient, 0, "userCmd"),
            tx("0x4", ambient, 1, "approve"),
            tx("0x5", "0x0000000000000000000000000000000000000001", 1, "userCmd"),
            HistoryTx {
                hash: "0x6".into(),
                to: None,
                status: 1,
                method_id: "userCmd".into(),
            },
        ];

        assert_eq!(count_matching(&txs, AMBIENT.address, "userCmd"), 2);
    }

    #[test]
    fn test_count_swaps_across_dexes() {
        let txs = vec![
            tx("0xa", "0x88b96af200c8a9c35442c8ac6cd3d22695aae4f0", 1, "userCmd"),
            tx("0xb", "0xca810d095e90daae6e867c19df6d9a8c56db2c89", 1, "swapExactETHForTokens"),
            tx("0xc", "0xca810d095e90daae6e867c19df6d9a8c56db2c89", 1, "swapExactTokensForETH"),
            tx("0xd", "0x3ae6d8a282d67893e17aa70ebffb33ee5aa65893", 1, "execute"),
            tx("0xe", "0xca810d095e90daae6e867c19df6d9a8c56db2c89", 1, "addLiquidity"),
        ];
        assert_eq!(count_swaps(&txs), 4);
    }

    #[test]
    fn test_parse_page_ok() {
        let body: ApiResponse = serde_json::from_value(json!({
            "code": 0,
            "message": "OK",
            "result": {
                "data": [
                    {"hash": "0x1", "to": "0xabc", "status": 1, "methodID": "userCmd", "value": "1"}
                ],
                "nextPageCursor": "50"
            }
        }))
        .unwrap();

        let txs = parse_page(body).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].method_id, "userCmd");
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        // accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let client =
            BlockvisionClient::with_endpoint("key", url, Duration::from_millis(200)).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), client.fetch_page("0xabc", 1))
            .await
            .expect("request should time out on its own");
        match result {
            Err(Error::Network(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
        drop(listener);
    }

    #[test]
    fn test_production_client_builds() {
        let client = BlockvisionClient::new("key").unwrap();
        assert_eq!(client.base_url, BLOCKVISION_URL);
    }

    #[test]
    fn test_parse_page_error_code() {
        let body: ApiResponse = serde_json::from_value(json!({
            "code": 401,
            "message": "Unauthorized",
            "reason": "invalid api key"
        }))
        .unwrap();

        let err = parse_page(body).unwrap_err();
        assert!(matches!(err, Error::History(_)));
        assert!(err.to_string().contains("invalid api key"));
    }
}
