//! HTTP adapters for the supported block explorers.

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;

use super::{sats_to_btc, BalanceError, BalanceLookup};
use crate::crypto::Address;

const FREE_PROVIDER_HINT: &str = "The free provider might be blocking your requests. \
     Try using a free API key from covalenthq.com (--api-key).";

const COVALENT_HINT: &str = "Please check that the API key is correct (it should start with \
     \"ckey_\") and that you have enough requests left.";

/// Sends a request and returns the body of a successful response.
fn fetch(request: RequestBuilder) -> Result<String, BalanceError> {
    let response = request.send()?;
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        return Err(BalanceError::from_status(status.as_u16(), body));
    }
    Ok(body)
}

fn trim_base(base_url: Option<String>, default: &str) -> String {
    base_url
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

// ---------------------------------------------------------------------------
// blockchain.info
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawAddr {
    final_balance: u64,
}

/// Extracts the balance from a `/rawaddr` response.
pub fn parse_blockchain_info(body: &str) -> Result<f64, BalanceError> {
    let raw: RawAddr = serde_json::from_str(body)?;
    Ok(sats_to_btc(raw.final_balance))
}

/// Free lookups through blockchain.info.
pub struct BlockchainInfo {
    client: Client,
    base_url: String,
}

impl BlockchainInfo {
    pub const DEFAULT_BASE_URL: &'static str = "https://blockchain.info";

    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: trim_base(base_url, Self::DEFAULT_BASE_URL),
        }
    }
}

impl BalanceLookup for BlockchainInfo {
    fn name(&self) -> &str {
        "blockchain.info"
    }

    fn lookup_balance(&self, address: &Address) -> Result<f64, BalanceError> {
        // limit=0 skips the transaction list
        let url = format!("{}/rawaddr/{}?limit=0", self.base_url, address);
        parse_blockchain_info(&fetch(self.client.get(url))?)
    }

    fn error_hint(&self) -> &str {
        FREE_PROVIDER_HINT
    }
}

// ---------------------------------------------------------------------------
// blockstream.info (Esplora)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: ChainStats,
}

#[derive(Debug, Deserialize)]
struct ChainStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

/// Extracts the confirmed balance from an Esplora `/address` response.
pub fn parse_blockstream(body: &str) -> Result<f64, BalanceError> {
    let info: EsploraAddress = serde_json::from_str(body)?;
    let stats = info.chain_stats;
    let sats = stats
        .funded_txo_sum
        .checked_sub(stats.spent_txo_sum)
        .ok_or_else(|| {
            BalanceError::MalformedResponse(format!(
                "spent {} exceeds funded {}",
                stats.spent_txo_sum, stats.funded_txo_sum
            ))
        })?;
    Ok(sats_to_btc(sats))
}

/// Free lookups through blockstream.info.
pub struct Blockstream {
    client: Client,
    base_url: String,
}

impl Blockstream {
    pub const DEFAULT_BASE_URL: &'static str = "https://blockstream.info/api";

    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: trim_base(base_url, Self::DEFAULT_BASE_URL),
        }
    }
}

impl BalanceLookup for Blockstream {
    fn name(&self) -> &str {
        "blockstream.info"
    }

    fn lookup_balance(&self, address: &Address) -> Result<f64, BalanceError> {
        let url = format!("{}/address/{}", self.base_url, address);
        parse_blockstream(&fetch(self.client.get(url))?)
    }

    fn error_hint(&self) -> &str {
        FREE_PROVIDER_HINT
    }
}

// ---------------------------------------------------------------------------
// covalenthq.com
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CovalentEnvelope {
    data: CovalentData,
}

#[derive(Debug, Deserialize)]
struct CovalentData {
    #[serde(default)]
    items: Vec<CovalentItem>,
}

#[derive(Debug, Deserialize)]
struct CovalentItem {
    #[serde(default)]
    balance: serde_json::Value,
}

impl CovalentItem {
    /// Balances arrive as decimal strings, occasionally as numbers or null.
    fn sats(&self) -> Result<u64, BalanceError> {
        match &self.balance {
            serde_json::Value::Null => Ok(0),
            serde_json::Value::String(s) => s.parse().map_err(|_| {
                BalanceError::MalformedResponse(format!("invalid balance string {:?}", s))
            }),
            serde_json::Value::Number(n) => n.as_u64().ok_or_else(|| {
                BalanceError::MalformedResponse(format!("invalid balance number {}", n))
            }),
            other => Err(BalanceError::MalformedResponse(format!(
                "unexpected balance value {}",
                other
            ))),
        }
    }
}

/// Sums the item balances of a `balances_v2` response.
pub fn parse_covalent(body: &str) -> Result<f64, BalanceError> {
    let envelope: CovalentEnvelope = serde_json::from_str(body)?;
    let mut total: u64 = 0;
    for item in &envelope.data.items {
        total = total.saturating_add(item.sats()?);
    }
    Ok(sats_to_btc(total))
}

/// Keyed lookups through the Covalent unified API.
pub struct Covalent {
    client: Client,
    base_url: String,
    api_key: String,
}

impl Covalent {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.covalenthq.com";

    pub fn new(client: Client, base_url: Option<String>, api_key: String) -> Self {
        Self {
            client,
            base_url: trim_base(base_url, Self::DEFAULT_BASE_URL),
            api_key,
        }
    }
}

impl BalanceLookup for Covalent {
    fn name(&self) -> &str {
        "covalenthq.com"
    }

    fn lookup_balance(&self, address: &Address) -> Result<f64, BalanceError> {
        let url = format!(
            "{}/v1/btc-mainnet/address/{}/balances_v2/",
            self.base_url, address
        );
        let request = self
            .client
            .get(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .basic_auth(&self.api_key, None::<&str>);
        parse_covalent(&fetch(request)?)
    }

    fn error_hint(&self) -> &str {
        COVALENT_HINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockchain_info_balance() {
        let body = r#"{"hash160":"62e907b15cbf27d5425399ebf6f0fb50ebb88f18",
            "address":"1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "n_tx":4000,"total_received":10000000000,"total_sent":0,
            "final_balance":5012345678,"txs":[]}"#;
        assert_eq!(parse_blockchain_info(body).unwrap(), 50.12345678);
    }

    #[test]
    fn test_blockchain_info_missing_field() {
        let err = parse_blockchain_info(r#"{"error":"Invalid Bitcoin Address"}"#).unwrap_err();
        assert!(matches!(err, BalanceError::MalformedResponse(_)));
    }

    #[test]
    fn test_blockstream_balance() {
        let body = r#"{"address":"1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH",
            "chain_stats":{"funded_tx_count":3,"funded_txo_sum":300000000,
                "spent_tx_count":1,"spent_txo_sum":100000000,"tx_count":4},
            "mempool_stats":{"funded_tx_count":0,"funded_txo_sum":0,
                "spent_tx_count":0,"spent_txo_sum":0,"tx_count":0}}"#;
        assert_eq!(parse_blockstream(body).unwrap(), 2.0);
    }

    #[test]
    fn test_blockstream_spent_exceeds_funded() {
        let body = r#"{"chain_stats":{"funded_txo_sum":1,"spent_txo_sum":2}}"#;
        assert!(matches!(
            parse_blockstream(body),
            Err(BalanceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_covalent_sums_items() {
        let body = r#"{"data":{"address":"1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "items":[{"contract_ticker_symbol":"BTC","balance":"5000000000"},
                     {"balance":25000000},{"balance":null}]},
            "error":false}"#;
        assert_eq!(parse_covalent(body).unwrap(), 50.25);
    }

    #[test]
    fn test_covalent_empty_items() {
        assert_eq!(parse_covalent(r#"{"data":{"items":[]}}"#).unwrap(), 0.0);
    }

    #[test]
    fn test_covalent_bad_balance() {
        let body = r#"{"data":{"items":[{"balance":"lots"}]}}"#;
        assert!(matches!(
            parse_covalent(body),
            Err(BalanceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = Client::new();
        let provider = Blockstream::new(client, Some("http://localhost:3000/api/".into()));
        assert_eq!(provider.base_url, "http://localhost:3000/api");
    }
}
