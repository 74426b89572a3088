//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, ValueHint};

use crate::application::DEFAULT_SESSION_FILE;
use crate::domain::{AppId, InputRules};
use crate::infrastructure::ContractPrograms;

pub const DEFAULT_ALGOD: &str = "http://localhost:4001";
pub const DEFAULT_KMD: &str = "http://localhost:4002";
pub const DEFAULT_WALLET: &str = "unencrypted-default-wallet";
pub const DEFAULT_LOG_FILE: &str = "tixmarket.log";

/// Token accepted by the node and daemon of a local development network.
const LOCALNET_TOKEN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct NodeOpts {
    /// Ledger node REST endpoint
    #[arg(
        id = "algod_url",
        long = "algod-url",
        default_value = DEFAULT_ALGOD,
        env = "ALGOD_SERVER",
        value_hint = ValueHint::Url,
        value_name = "URL"
    )]
    pub url: String,

    /// API token of the ledger node
    #[arg(id = "algod_token", long = "algod-token", default_value = LOCALNET_TOKEN, env = "ALGOD_TOKEN", hide_default_value = true)]
    pub token: String,

    /// Rounds to wait for a submitted transaction to be confirmed
    #[arg(long, default_value_t = 10, env = "WAIT_ROUNDS")]
    pub wait_rounds: u64,
}

#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct WalletOpts {
    /// Key-management daemon endpoint
    #[arg(
        id = "kmd_url",
        long = "kmd-url",
        default_value = DEFAULT_KMD,
        env = "KMD_SERVER",
        value_hint = ValueHint::Url,
        value_name = "URL"
    )]
    pub url: String,

    /// API token of the key-management daemon
    #[arg(id = "kmd_token", long = "kmd-token", default_value = LOCALNET_TOKEN, env = "KMD_TOKEN", hide_default_value = true)]
    pub token: String,

    /// Wallet holding the signing keys
    #[arg(long = "kmd-wallet", default_value = DEFAULT_WALLET, env = "KMD_WALLET")]
    pub name: String,

    /// Wallet password
    #[arg(long = "kmd-password", default_value = "", env = "KMD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct ContractOpts {
    /// TEAL approval program of the marketplace contract
    #[arg(
        long,
        default_value = "contracts/DigitalMarketplace.approval.teal",
        env = "APPROVAL_PROGRAM",
        value_hint = ValueHint::FilePath
    )]
    pub approval_program: PathBuf,

    /// TEAL clear-state program of the marketplace contract
    #[arg(
        long,
        default_value = "contracts/DigitalMarketplace.clear.teal",
        env = "CLEAR_PROGRAM",
        value_hint = ValueHint::FilePath
    )]
    pub clear_program: PathBuf,
}

impl ContractOpts {
    pub fn programs(&self) -> ContractPrograms {
        ContractPrograms {
            approval: self.approval_program.clone(),
            clear: self.clear_program.clone(),
        }
    }
}

fn parse_app_id(value: &str) -> Result<AppId, String> {
    match InputRules::parse_app_id(value) {
        Ok(Some(app)) => Ok(app),
        Ok(None) => Err("application id must not be zero".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

/// Terminal frontend for a ticket marketplace contract.
#[derive(Parser, Clone, PartialEq, Eq, Debug)]
#[command(name = "tixmarket", bin_name = "tixmarket", author, version)]
pub struct Opts {
    /// Set verbosity level.
    ///
    /// Can be used multiple times to increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub node: NodeOpts,

    #[command(flatten)]
    pub wallet: WalletOpts,

    #[command(flatten)]
    pub contract: ContractOpts,

    /// Marketplace application to open, overriding the saved session
    #[arg(long, env = "APP_ID", value_parser = parse_app_id)]
    pub app_id: Option<AppId>,

    /// File the session is saved to and restored from
    #[arg(long, default_value = DEFAULT_SESSION_FILE, env = "SESSION_FILE", value_hint = ValueHint::FilePath)]
    pub session_file: PathBuf,

    /// File log output is written to
    #[arg(long, default_value = DEFAULT_LOG_FILE, env = "LOG_FILE", value_hint = ValueHint::FilePath)]
    pub log_file: PathBuf,
}
