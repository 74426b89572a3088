//! Blocking client of the ledger node's REST API.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, trace};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::{
    Address, AppId, AssetId, GlobalState, LedgerError, LedgerResult, MicroAlgos, SuggestedParams,
    TxId,
};

/// How many rounds a composed transaction stays valid.
const VALIDITY_WINDOW: u64 = 1_000;

const TOKEN_HEADER: &str = "X-Algo-API-Token";

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LedgerError::Decode(err.to_string())
        } else {
            LedgerError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Turns a non-success response into a [`LedgerError`].
pub(crate) fn check_status(response: Response) -> LedgerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    if status == StatusCode::NOT_FOUND {
        Err(LedgerError::NotFound(message))
    } else {
        Err(LedgerError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApplicationResponse {
    params: ApplicationParams,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ApplicationParams {
    creator: String,
    #[serde(default)]
    global_state: Vec<TealKeyValue>,
}

#[derive(Debug, Deserialize)]
struct TealKeyValue {
    key: String,
    value: TealValue,
}

#[derive(Debug, Deserialize)]
struct TealValue {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    uint: u64,
}

const TEAL_UINT: u8 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AssetHoldingResponse {
    asset_holding: AssetHolding,
}

#[derive(Debug, Deserialize)]
struct AssetHolding {
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TransactionParams {
    genesis_hash: String,
    genesis_id: String,
    last_round: u64,
    min_fee: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct NodeStatus {
    last_round: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct CompileResponse {
    result: String,
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PendingTransaction {
    #[serde(default)]
    pub confirmed_round: Option<u64>,
    #[serde(default)]
    pub pool_error: String,
    #[serde(default)]
    pub asset_index: Option<u64>,
    #[serde(default)]
    pub application_index: Option<u64>,
}

/// Creator and global state of a deployed application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub creator: Address,
    pub global_state: GlobalState,
}

fn decode_global_state(entries: &[TealKeyValue]) -> GlobalState {
    let mut state = GlobalState::default();
    for entry in entries {
        if entry.value.kind != TEAL_UINT {
            continue;
        }
        let Ok(key) = STANDARD.decode(&entry.key) else {
            continue;
        };
        match key.as_slice() {
            b"unitaryPrice" => state.unitary_price = Some(MicroAlgos(entry.value.uint)),
            b"assetId" => state.asset_id = AssetId::new(entry.value.uint),
            _ => trace!("Ignoring global state key {:?}", String::from_utf8_lossy(&key)),
        }
    }
    state
}

fn decode_params(params: TransactionParams) -> LedgerResult<SuggestedParams> {
    let hash = STANDARD
        .decode(&params.genesis_hash)
        .map_err(|e| LedgerError::Decode(format!("genesis hash: {}", e)))?;
    let genesis_hash: [u8; 32] = hash
        .as_slice()
        .try_into()
        .map_err(|_| LedgerError::Decode("genesis hash is not 32 bytes".to_string()))?;
    Ok(SuggestedParams {
        min_fee: MicroAlgos(params.min_fee),
        first_valid: params.last_round,
        last_valid: params.last_round + VALIDITY_WINDOW,
        genesis_id: params.genesis_id,
        genesis_hash,
    })
}

/// REST client of one ledger node.
pub struct AlgodClient {
    http: Client,
    base_url: String,
    token: String,
}

impl AlgodClient {
    pub fn new(base_url: &str, token: &str) -> LedgerResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, builder: RequestBuilder) -> LedgerResult<Response> {
        check_status(builder.header(TOKEN_HEADER, &self.token).send()?)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> LedgerResult<T> {
        debug!("GET {}", path);
        let response = self.request(self.http.get(format!("{}{}", self.base_url, path)))?;
        Ok(response.json()?)
    }

    pub fn application(&self, app: AppId) -> LedgerResult<ApplicationInfo> {
        let response: ApplicationResponse = self.get(&format!("/v2/applications/{}", app))?;
        Ok(ApplicationInfo {
            creator: response
                .params
                .creator
                .parse()
                .map_err(|e| LedgerError::Decode(format!("creator: {}", e)))?,
            global_state: decode_global_state(&response.params.global_state),
        })
    }

    pub fn asset_holding(&self, account: &Address, asset: AssetId) -> LedgerResult<u64> {
        let response: AssetHoldingResponse =
            self.get(&format!("/v2/accounts/{}/assets/{}", account, asset))?;
        Ok(response.asset_holding.amount)
    }

    pub fn suggested_params(&self) -> LedgerResult<SuggestedParams> {
        decode_params(self.get("/v2/transactions/params")?)
    }

    /// Submits concatenated signed transactions.
    pub fn submit(&self, signed: Vec<u8>) -> LedgerResult<TxId> {
        debug!("POST /v2/transactions ({} bytes)", signed.len());
        let response = self.request(
            self.http
                .post(format!("{}/v2/transactions", self.base_url))
                .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
                .body(signed),
        )?;
        let submitted: SubmitResponse = response.json()?;
        Ok(TxId(submitted.tx_id))
    }

    pub fn pending_transaction(&self, txid: &TxId) -> LedgerResult<PendingTransaction> {
        self.get(&format!("/v2/transactions/pending/{}", txid))
    }

    /// Polls until `txid` is confirmed, giving up after `max_rounds` rounds.
    pub fn wait_for_confirmation(
        &self,
        txid: &TxId,
        max_rounds: u64,
    ) -> LedgerResult<PendingTransaction> {
        let status: NodeStatus = self.get("/v2/status")?;
        let mut round = status.last_round;
        for _ in 0..=max_rounds {
            let pending = self.pending_transaction(txid)?;
            if pending.confirmed_round.is_some_and(|r| r > 0) {
                debug!("Transaction {} confirmed in round {:?}", txid, pending.confirmed_round);
                return Ok(pending);
            }
            if !pending.pool_error.is_empty() {
                return Err(LedgerError::PoolError {
                    txid: txid.to_string(),
                    message: pending.pool_error,
                });
            }
            let _: NodeStatus = self.get(&format!("/v2/status/wait-for-block-after/{}", round))?;
            round += 1;
        }
        Err(LedgerError::Unconfirmed {
            txid: txid.to_string(),
            rounds: max_rounds,
        })
    }

    /// Compiles TEAL source into program bytes.
    pub fn compile(&self, source: &str) -> LedgerResult<Vec<u8>> {
        let response = self.request(
            self.http
                .post(format!("{}/v2/teal/compile", self.base_url))
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(source.to_string()),
        )?;
        let compiled: CompileResponse = response.json()?;
        STANDARD
            .decode(&compiled.result)
            .map_err(|e| LedgerError::Decode(format!("compiled program: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, kind: u8, uint: u64) -> TealKeyValue {
        TealKeyValue {
            key: STANDARD.encode(key),
            value: TealValue { kind, uint },
        }
    }

    #[test]
    fn test_decode_global_state() {
        let state = decode_global_state(&[
            entry("unitaryPrice", TEAL_UINT, 1_000_000),
            entry("assetId", TEAL_UINT, 1001),
            entry("other", TEAL_UINT, 5),
        ]);
        assert_eq!(state.unitary_price, Some(MicroAlgos(1_000_000)));
        assert_eq!(state.asset_id, AssetId::new(1001));
    }

    #[test]
    fn test_decode_global_state_ignores_bytes_and_zero_asset() {
        let state = decode_global_state(&[entry("unitaryPrice", 1, 0), entry("assetId", TEAL_UINT, 0)]);
        assert_eq!(state, GlobalState::default());
    }

    #[test]
    fn test_application_response_parses() {
        let json = r#"{
            "id": 2001,
            "params": {
                "creator": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ",
                "global-state": [
                    {"key": "YXNzZXRJZA==", "value": {"type": 2, "uint": 1001, "bytes": ""}}
                ]
            }
        }"#;
        let response: ApplicationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.params.global_state.len(), 1);
        let state = decode_global_state(&response.params.global_state);
        assert_eq!(state.asset_id, AssetId::new(1001));
    }

    #[test]
    fn test_application_without_global_state() {
        let json = r#"{"params": {"creator": "X"}}"#;
        let response: ApplicationResponse = serde_json::from_str(json).unwrap();
        assert!(response.params.global_state.is_empty());
    }

    #[test]
    fn test_decode_params() {
        let params = TransactionParams {
            genesis_hash: STANDARD.encode([3u8; 32]),
            genesis_id: "testnet-v1.0".to_string(),
            last_round: 500,
            min_fee: 1_000,
        };
        let decoded = decode_params(params).unwrap();
        assert_eq!(decoded.first_valid, 500);
        assert_eq!(decoded.last_valid, 1_500);
        assert_eq!(decoded.min_fee, MicroAlgos(1_000));
        assert_eq!(decoded.genesis_hash, [3u8; 32]);
    }

    #[test]
    fn test_decode_params_rejects_short_hash() {
        let params = TransactionParams {
            genesis_hash: STANDARD.encode([3u8; 8]),
            genesis_id: "x".to_string(),
            last_round: 1,
            min_fee: 1_000,
        };
        assert!(matches!(decode_params(params), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn test_pending_transaction_parses() {
        let json = r#"{"confirmed-round": 12, "pool-error": "", "asset-index": 1001, "txn": {}}"#;
        let pending: PendingTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(pending.confirmed_round, Some(12));
        assert_eq!(pending.asset_index, Some(1001));
        assert_eq!(pending.application_index, None);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = AlgodClient::new("http://localhost:4001/", "token").unwrap();
        assert_eq!(client.base_url, "http://localhost:4001");
    }
}
