//! Typed seams to the remote ledger node and the wallet provider.
//!
//! Everything behind these traits is an external service; the marketplace
//! workflows only compose calls in the right order.

use std::fmt;

use super::errors::LedgerResult;
use super::models::{Address, AppId, AssetId, GlobalState, MicroAlgos};

/// Identifier of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network parameters needed to compose a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedParams {
    pub min_fee: MicroAlgos,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

/// A composed but not yet submitted payment.
///
/// Payments are passed as transaction arguments to contract calls, which
/// submit them in the same atomic group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub sender: Address,
    pub receiver: Address,
    pub amount: MicroAlgos,
    pub fee: MicroAlgos,
    pub params: SuggestedParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCreation {
    pub creator: Address,
    pub total: u64,
    pub unit_name: String,
    pub asset_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTransfer {
    pub sender: Address,
    pub receiver: Address,
    pub asset: AssetId,
    pub amount: u64,
}

/// Client of the remote ledger node, bound to a signer for submissions.
pub trait Ledger: Send + Sync {
    fn global_state(&self, app: AppId) -> LedgerResult<GlobalState>;

    fn application_creator(&self, app: AppId) -> LedgerResult<Address>;

    fn asset_balance(&self, account: &Address, asset: AssetId) -> LedgerResult<u64>;

    fn suggested_params(&self) -> LedgerResult<SuggestedParams>;

    fn create_asset(&self, creation: &AssetCreation) -> LedgerResult<AssetId>;

    /// Deploys the marketplace contract selling `asset` at `unitary_price`.
    fn create_application(
        &self,
        sender: &Address,
        asset: AssetId,
        unitary_price: MicroAlgos,
    ) -> LedgerResult<AppId>;

    /// Calls the contract's asset opt-in, grouped with its funding payment.
    fn opt_application_into_asset(
        &self,
        sender: &Address,
        app: AppId,
        asset: AssetId,
        mbr_payment: &Payment,
    ) -> LedgerResult<TxId>;

    fn transfer_asset(&self, transfer: &AssetTransfer) -> LedgerResult<TxId>;

    /// Registers `account` to hold `asset` (a zero-amount self transfer).
    fn opt_in_to_asset(&self, account: &Address, asset: AssetId) -> LedgerResult<TxId>;

    /// Calls the contract's purchase entry point, grouped with the payment.
    fn buy(
        &self,
        sender: &Address,
        app: AppId,
        asset: AssetId,
        payment: &Payment,
        quantity: u64,
    ) -> LedgerResult<TxId>;

    fn delete_application(
        &self,
        sender: &Address,
        app: AppId,
        asset: Option<AssetId>,
        fee: MicroAlgos,
    ) -> LedgerResult<TxId>;
}

/// The wallet provider: lists accounts and signs on their behalf.
pub trait Wallet: Send + Sync {
    fn accounts(&self) -> LedgerResult<Vec<Address>>;

    /// Signs a canonically encoded transaction, returning the encoded signed
    /// transaction ready for submission.
    fn sign_transaction(&self, signer: &Address, transaction: &[u8]) -> LedgerResult<Vec<u8>>;
}
