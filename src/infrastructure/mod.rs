//! Infrastructure layer providing external service integrations.
//!
//! This module talks to the ledger node and the key-management daemon,
//! builds and signs transactions, and handles session files and the
//! clipboard.

pub mod abi;
pub mod algod;
pub mod clipboard;
pub mod kmd;
pub mod ledger;
pub mod persistence;
pub mod transaction;

pub use algod::AlgodClient;
pub use clipboard::ClipboardService;
pub use kmd::KmdWallet;
pub use ledger::{AlgodLedger, ContractPrograms};
pub use persistence::*;
