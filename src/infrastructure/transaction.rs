//! Wire format of ledger transactions.
//!
//! Transactions are signed and identified over their canonical msgpack
//! encoding: maps with keys in lexicographic order and every zero or empty
//! value left out. Struct fields below are declared in key order and skip
//! their empty values, so `rmp_serde::to_vec_named` yields that encoding.

use data_encoding::BASE32_NOPAD;
use serde::Serialize;
use serde_bytes::ByteBuf;
use sha2::{Digest, Sha512_256};

use crate::domain::{
    Address, AppId, AssetCreation, AssetId, LedgerError, LedgerResult, MicroAlgos, Payment,
    SuggestedParams, TxId,
};

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// What happens to the calling account's relation to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnComplete {
    NoOp = 0,
    DeleteApplication = 5,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetParams {
    #[serde(rename = "an", skip_serializing_if = "String::is_empty")]
    pub asset_name: String,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub clawback: Option<ByteBuf>,
    #[serde(rename = "dc", skip_serializing_if = "is_zero")]
    pub decimals: u64,
    #[serde(rename = "f", skip_serializing_if = "Option::is_none")]
    pub freeze: Option<ByteBuf>,
    #[serde(rename = "m", skip_serializing_if = "Option::is_none")]
    pub manager: Option<ByteBuf>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub reserve: Option<ByteBuf>,
    #[serde(rename = "t", skip_serializing_if = "is_zero")]
    pub total: u64,
    #[serde(rename = "un", skip_serializing_if = "String::is_empty")]
    pub unit_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateSchema {
    #[serde(rename = "nbs", skip_serializing_if = "is_zero")]
    pub byte_slices: u64,
    #[serde(rename = "nui", skip_serializing_if = "is_zero")]
    pub uints: u64,
}

/// An unsigned transaction of any of the kinds the marketplace sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transaction {
    #[serde(rename = "aamt", skip_serializing_if = "is_zero")]
    pub asset_amount: u64,
    #[serde(rename = "amt", skip_serializing_if = "is_zero")]
    pub amount: u64,
    #[serde(rename = "apaa", skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<ByteBuf>,
    #[serde(rename = "apan", skip_serializing_if = "is_zero")]
    pub on_complete: u64,
    #[serde(rename = "apap", skip_serializing_if = "Option::is_none")]
    pub approval_program: Option<ByteBuf>,
    #[serde(rename = "apar", skip_serializing_if = "Option::is_none")]
    pub asset_params: Option<AssetParams>,
    #[serde(rename = "apas", skip_serializing_if = "Vec::is_empty")]
    pub foreign_assets: Vec<u64>,
    #[serde(rename = "apgs", skip_serializing_if = "Option::is_none")]
    pub global_schema: Option<StateSchema>,
    #[serde(rename = "apid", skip_serializing_if = "is_zero")]
    pub app_id: u64,
    #[serde(rename = "apsu", skip_serializing_if = "Option::is_none")]
    pub clear_program: Option<ByteBuf>,
    #[serde(rename = "arcv", skip_serializing_if = "Option::is_none")]
    pub asset_receiver: Option<ByteBuf>,
    #[serde(rename = "fee", skip_serializing_if = "is_zero")]
    pub fee: u64,
    #[serde(rename = "fv", skip_serializing_if = "is_zero")]
    pub first_valid: u64,
    #[serde(rename = "gen", skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,
    #[serde(rename = "gh")]
    pub genesis_hash: ByteBuf,
    #[serde(rename = "grp", skip_serializing_if = "Option::is_none")]
    pub group: Option<ByteBuf>,
    #[serde(rename = "lv", skip_serializing_if = "is_zero")]
    pub last_valid: u64,
    #[serde(rename = "rcv", skip_serializing_if = "Option::is_none")]
    pub receiver: Option<ByteBuf>,
    #[serde(rename = "snd")]
    pub sender: ByteBuf,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "xaid", skip_serializing_if = "is_zero")]
    pub asset_id: u64,
}

fn key_bytes(address: &Address) -> ByteBuf {
    ByteBuf::from(address.public_key().to_vec())
}

impl Transaction {
    fn header(kind: &str, sender: &Address, fee: MicroAlgos, params: &SuggestedParams) -> Self {
        Self {
            fee: fee.as_u64(),
            first_valid: params.first_valid,
            last_valid: params.last_valid,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: ByteBuf::from(params.genesis_hash.to_vec()),
            sender: key_bytes(sender),
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn payment(payment: &Payment) -> Self {
        Self {
            amount: payment.amount.as_u64(),
            receiver: Some(key_bytes(&payment.receiver)),
            ..Self::header("pay", &payment.sender, payment.fee, &payment.params)
        }
    }

    pub fn asset_transfer(
        sender: &Address,
        receiver: &Address,
        asset: AssetId,
        amount: u64,
        params: &SuggestedParams,
    ) -> Self {
        Self {
            asset_amount: amount,
            asset_receiver: Some(key_bytes(receiver)),
            asset_id: asset.get(),
            ..Self::header("axfer", sender, params.min_fee, params)
        }
    }

    /// A zero-amount transfer to oneself registers the account for `asset`.
    pub fn asset_opt_in(account: &Address, asset: AssetId, params: &SuggestedParams) -> Self {
        Self::asset_transfer(account, account, asset, 0, params)
    }

    /// Creates an asset with the creator holding every role.
    pub fn asset_create(creation: &AssetCreation, params: &SuggestedParams) -> Self {
        let creator = Some(key_bytes(&creation.creator));
        Self {
            asset_params: Some(AssetParams {
                asset_name: creation.asset_name.clone(),
                clawback: creator.clone(),
                decimals: 0,
                freeze: creator.clone(),
                manager: creator.clone(),
                reserve: creator,
                total: creation.total,
                unit_name: creation.unit_name.clone(),
            }),
            ..Self::header("acfg", &creation.creator, params.min_fee, params)
        }
    }

    /// Calls `app`, or creates a new application when `app` is `None`.
    pub fn app_call(
        sender: &Address,
        app: Option<AppId>,
        on_complete: OnComplete,
        args: Vec<Vec<u8>>,
        foreign_assets: Vec<AssetId>,
        fee: MicroAlgos,
        params: &SuggestedParams,
    ) -> Self {
        Self {
            app_args: args.into_iter().map(ByteBuf::from).collect(),
            on_complete: on_complete as u64,
            foreign_assets: foreign_assets.into_iter().map(AssetId::get).collect(),
            app_id: app.map(AppId::get).unwrap_or(0),
            ..Self::header("appl", sender, fee, params)
        }
    }

    /// Attaches the programs and storage schema of an application creation.
    pub fn with_programs(self, approval: Vec<u8>, clear: Vec<u8>, global_schema: StateSchema) -> Self {
        Self {
            approval_program: Some(ByteBuf::from(approval)),
            clear_program: Some(ByteBuf::from(clear)),
            global_schema: Some(global_schema),
            ..self
        }
    }

    /// The account that has to sign this transaction.
    pub fn signer(&self) -> LedgerResult<Address> {
        let key: [u8; 32] = self
            .sender
            .as_slice()
            .try_into()
            .map_err(|_| LedgerError::Encode("sender is not a 32-byte key".to_string()))?;
        Ok(Address::from_public_key(key))
    }

    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| LedgerError::Encode(e.to_string()))
    }

    fn id_bytes(&self) -> LedgerResult<[u8; 32]> {
        Ok(tagged_hash(b"TX", &self.encode()?))
    }

    pub fn id(&self) -> LedgerResult<TxId> {
        Ok(TxId(BASE32_NOPAD.encode(&self.id_bytes()?)))
    }
}

fn tagged_hash(tag: &[u8], body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(tag);
    hasher.update(body);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[derive(Serialize)]
struct TxGroup {
    txlist: Vec<ByteBuf>,
}

/// Binds `transactions` into one atomic group. A single transaction is left
/// ungrouped.
pub fn assign_group(transactions: &mut [Transaction]) -> LedgerResult<()> {
    if transactions.len() < 2 {
        return Ok(());
    }
    let mut txlist = Vec::with_capacity(transactions.len());
    for txn in transactions.iter() {
        txlist.push(ByteBuf::from(txn.id_bytes()?.to_vec()));
    }
    let encoded = rmp_serde::to_vec_named(&TxGroup { txlist })
        .map_err(|e| LedgerError::Encode(e.to_string()))?;
    let group = tagged_hash(b"TG", &encoded);
    for txn in transactions.iter_mut() {
        txn.group = Some(ByteBuf::from(group.to_vec()));
    }
    Ok(())
}
