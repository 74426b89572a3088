//! Wallet provider backed by the ledger's key-management daemon.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::algod::check_status;
use crate::domain::{Address, LedgerError, LedgerResult, Wallet};

const TOKEN_HEADER: &str = "X-KMD-API-Token";

#[derive(Debug, Deserialize)]
struct WalletsResponse {
    #[serde(default)]
    wallets: Vec<WalletEntry>,
}

#[derive(Debug, Deserialize)]
struct WalletEntry {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct InitRequest<'a> {
    wallet_id: &'a str,
    wallet_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    wallet_handle_token: String,
}

#[derive(Serialize)]
struct HandleRequest<'a> {
    wallet_handle_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct KeyListResponse {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    wallet_handle_token: &'a str,
    wallet_password: &'a str,
    transaction: String,
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signed_transaction: String,
}

/// Signs with keys held by a named daemon wallet.
pub struct KmdWallet {
    http: Client,
    base_url: String,
    token: String,
    wallet_name: String,
    password: String,
}

fn wallet_error(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::Wallet(_) => err,
        other => LedgerError::Wallet(other.to_string()),
    }
}

impl KmdWallet {
    pub fn new(base_url: &str, token: &str, wallet_name: &str, password: &str) -> LedgerResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            wallet_name: wallet_name.to_string(),
            password: password.to_string(),
        })
    }

    fn call<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> LedgerResult<T> {
        debug!("KMD {}", path);
        let url = format!("{}{}", self.base_url, path);
        let builder = match body {
            Some(body) => self.http.post(url).json(body),
            None => self.http.get(url),
        };
        let response = check_status(builder.header(TOKEN_HEADER, &self.token).send()?)?;
        Ok(response.json()?)
    }

    fn wallet_id(&self) -> LedgerResult<String> {
        let response: WalletsResponse = self.call::<(), _>("/v1/wallets", None)?;
        response
            .wallets
            .into_iter()
            .find(|wallet| wallet.name == self.wallet_name)
            .map(|wallet| wallet.id)
            .ok_or_else(|| LedgerError::Wallet(format!("no wallet named {}", self.wallet_name)))
    }

    /// Runs `f` with a fresh wallet handle and releases it afterwards.
    fn with_handle<T>(&self, f: impl FnOnce(&str) -> LedgerResult<T>) -> LedgerResult<T> {
        let wallet_id = self.wallet_id()?;
        let init: InitResponse = self.call(
            "/v1/wallet/init",
            Some(&InitRequest {
                wallet_id: &wallet_id,
                wallet_password: &self.password,
            }),
        )?;
        let handle = init.wallet_handle_token;
        let result = f(&handle);
        let release: LedgerResult<serde_json::Value> = self.call(
            "/v1/wallet/release",
            Some(&HandleRequest {
                wallet_handle_token: &handle,
            }),
        );
        if let Err(err) = release {
            warn!("Releasing wallet handle failed: {}", err);
        }
        result
    }
}

impl Wallet for KmdWallet {
    fn accounts(&self) -> LedgerResult<Vec<Address>> {
        self.with_handle(|handle| {
            let keys: KeyListResponse = self.call(
                "/v1/key/list",
                Some(&HandleRequest {
                    wallet_handle_token: handle,
                }),
            )?;
            keys.addresses
                .iter()
                .map(|address| {
                    address
                        .parse()
                        .map_err(|e| LedgerError::Decode(format!("wallet address: {}", e)))
                })
                .collect()
        })
        .map_err(wallet_error)
    }

    fn sign_transaction(&self, signer: &Address, transaction: &[u8]) -> LedgerResult<Vec<u8>> {
        self.with_handle(|handle| {
            let signed: SignResponse = self.call(
                "/v1/transaction/sign",
                Some(&SignRequest {
                    wallet_handle_token: handle,
                    wallet_password: &self.password,
                    transaction: STANDARD.encode(transaction),
                    public_key: STANDARD.encode(signer.public_key()),
                }),
            )?;
            STANDARD
                .decode(&signed.signed_transaction)
                .map_err(|e| LedgerError::Decode(format!("signed transaction: {}", e)))
        })
        .map_err(wallet_error)
    }
}
