//! [`Ledger`] implementation talking to a real node and wallet.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use super::abi::{self, encode_uint64};
use super::algod::{AlgodClient, PendingTransaction};
use super::transaction::{assign_group, OnComplete, StateSchema, Transaction};
use crate::domain::{
    Address, AppId, AssetCreation, AssetId, AssetTransfer, GlobalState, Ledger, LedgerError,
    LedgerResult, MicroAlgos, Payment, SuggestedParams, TxId, Wallet,
};

/// TEAL sources of the marketplace contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractPrograms {
    pub approval: PathBuf,
    pub clear: PathBuf,
}

/// Global storage the marketplace contract declares: `assetId` and
/// `unitaryPrice`.
fn marketplace_schema() -> StateSchema {
    StateSchema {
        byte_slices: 0,
        uints: 2,
    }
}

pub struct AlgodLedger {
    algod: AlgodClient,
    wallet: Arc<dyn Wallet>,
    programs: ContractPrograms,
    wait_rounds: u64,
}

impl AlgodLedger {
    pub fn new(
        algod: AlgodClient,
        wallet: Arc<dyn Wallet>,
        programs: ContractPrograms,
        wait_rounds: u64,
    ) -> Self {
        Self {
            algod,
            wallet,
            programs,
            wait_rounds,
        }
    }

    /// Groups, signs, submits and waits for the last transaction.
    fn submit(&self, mut transactions: Vec<Transaction>) -> LedgerResult<(TxId, PendingTransaction)> {
        assign_group(&mut transactions)?;
        let mut signed = Vec::new();
        let mut last = None;
        for txn in &transactions {
            let signer = txn.signer()?;
            signed.extend(self.wallet.sign_transaction(&signer, &txn.encode()?)?);
            last = Some(txn.id()?);
        }
        let txid = last.ok_or(LedgerError::Encode("empty transaction group".to_string()))?;
        self.algod.submit(signed)?;
        let pending = self.algod.wait_for_confirmation(&txid, self.wait_rounds)?;
        Ok((txid, pending))
    }

    fn read_program(&self, path: &Path) -> LedgerResult<Vec<u8>> {
        let source = fs::read_to_string(path).map_err(|e| LedgerError::Program {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.algod.compile(&source)
    }
}

impl Ledger for AlgodLedger {
    fn global_state(&self, app: AppId) -> LedgerResult<GlobalState> {
        Ok(self.algod.application(app)?.global_state)
    }

    fn application_creator(&self, app: AppId) -> LedgerResult<Address> {
        Ok(self.algod.application(app)?.creator)
    }

    fn asset_balance(&self, account: &Address, asset: AssetId) -> LedgerResult<u64> {
        self.algod.asset_holding(account, asset)
    }

    fn suggested_params(&self) -> LedgerResult<SuggestedParams> {
        self.algod.suggested_params()
    }

    fn create_asset(&self, creation: &AssetCreation) -> LedgerResult<AssetId> {
        let params = self.algod.suggested_params()?;
        let (txid, pending) = self.submit(vec![Transaction::asset_create(creation, &params)])?;
        info!("Asset creation {} confirmed", txid);
        pending
            .asset_index
            .and_then(AssetId::new)
            .ok_or(LedgerError::MissingField("asset-index"))
    }

    fn create_application(
        &self,
        sender: &Address,
        asset: AssetId,
        unitary_price: MicroAlgos,
    ) -> LedgerResult<AppId> {
        let approval = self.read_program(&self.programs.approval)?;
        let clear = self.read_program(&self.programs.clear)?;
        let params = self.algod.suggested_params()?;
        let args = abi::CREATE_APPLICATION
            .call_args(&[encode_uint64(asset.get()), encode_uint64(unitary_price.as_u64())]);
        let txn = Transaction::app_call(
            sender,
            None,
            OnComplete::NoOp,
            args,
            vec![asset],
            params.min_fee,
            &params,
        )
        .with_programs(approval, clear, marketplace_schema());
        let (txid, pending) = self.submit(vec![txn])?;
        info!("Application creation {} confirmed", txid);
        pending
            .application_index
            .and_then(AppId::new)
            .ok_or(LedgerError::MissingField("application-index"))
    }

    fn opt_application_into_asset(
        &self,
        sender: &Address,
        app: AppId,
        asset: AssetId,
        mbr_payment: &Payment,
    ) -> LedgerResult<TxId> {
        let params = &mbr_payment.params;
        let call = Transaction::app_call(
            sender,
            Some(app),
            OnComplete::NoOp,
            abi::OPT_IN_TO_ASSET.call_args(&[]),
            vec![asset],
            params.min_fee,
            params,
        );
        let (txid, _) = self.submit(vec![Transaction::payment(mbr_payment), call])?;
        Ok(txid)
    }

    fn transfer_asset(&self, transfer: &AssetTransfer) -> LedgerResult<TxId> {
        let params = self.algod.suggested_params()?;
        let txn = Transaction::asset_transfer(
            &transfer.sender,
            &transfer.receiver,
            transfer.asset,
            transfer.amount,
            &params,
        );
        let (txid, _) = self.submit(vec![txn])?;
        Ok(txid)
    }

    fn opt_in_to_asset(&self, account: &Address, asset: AssetId) -> LedgerResult<TxId> {
        let params = self.algod.suggested_params()?;
        let (txid, _) = self.submit(vec![Transaction::asset_opt_in(account, asset, &params)])?;
        Ok(txid)
    }

    fn buy(
        &self,
        sender: &Address,
        app: AppId,
        asset: AssetId,
        payment: &Payment,
        quantity: u64,
    ) -> LedgerResult<TxId> {
        let params = &payment.params;
        let call = Transaction::app_call(
            sender,
            Some(app),
            OnComplete::NoOp,
            abi::BUY.call_args(&[encode_uint64(quantity)]),
            vec![asset],
            params.min_fee,
            params,
        );
        let (txid, _) = self.submit(vec![Transaction::payment(payment), call])?;
        Ok(txid)
    }

    fn delete_application(
        &self,
        sender: &Address,
        app: AppId,
        asset: Option<AssetId>,
        fee: MicroAlgos,
    ) -> LedgerResult<TxId> {
        let params = self.algod.suggested_params()?;
        let txn = Transaction::app_call(
            sender,
            Some(app),
            OnComplete::DeleteApplication,
            abi::DELETE_APPLICATION.call_args(&[]),
            asset.into_iter().collect(),
            fee,
            &params,
        );
        let (txid, _) = self.submit(vec![txn])?;
        Ok(txid)
    }
}
