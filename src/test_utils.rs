//! In-memory ledger and wallet used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{
    Address, AppId, AssetCreation, AssetId, AssetTransfer, GlobalState, Ledger, LedgerError,
    LedgerResult, MicroAlgos, Payment, SuggestedParams, TxId, Wallet,
};

pub fn address(seed: u8) -> Address {
    Address::from_public_key([seed; 32])
}

/// A ledger call as observed by [`FakeLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GlobalState(AppId),
    ApplicationCreator(AppId),
    AssetBalance(Address, AssetId),
    SuggestedParams,
    CreateAsset(AssetCreation),
    CreateApplication { asset: AssetId, unitary_price: MicroAlgos },
    OptApplicationIntoAsset { app: AppId, asset: AssetId, funding: MicroAlgos, fee: MicroAlgos },
    TransferAsset(AssetTransfer),
    OptInToAsset(Address, AssetId),
    Buy { app: AppId, asset: AssetId, amount: MicroAlgos, fee: MicroAlgos, quantity: u64 },
    DeleteApplication { app: AppId, fee: MicroAlgos },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::GlobalState(_) => "global_state",
            Call::ApplicationCreator(_) => "application_creator",
            Call::AssetBalance(..) => "asset_balance",
            Call::SuggestedParams => "suggested_params",
            Call::CreateAsset(_) => "create_asset",
            Call::CreateApplication { .. } => "create_application",
            Call::OptApplicationIntoAsset { .. } => "opt_application_into_asset",
            Call::TransferAsset(_) => "transfer_asset",
            Call::OptInToAsset(..) => "opt_in_to_asset",
            Call::Buy { .. } => "buy",
            Call::DeleteApplication { .. } => "delete_application",
        }
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    fail_on: Vec<&'static str>,
    global: HashMap<AppId, GlobalState>,
    creators: HashMap<AppId, Address>,
    balances: HashMap<(Address, AssetId), u64>,
    next_asset: u64,
    next_app: u64,
}

/// Records every call and keeps just enough ledger state for the workflows.
pub struct FakeLedger {
    state: Mutex<FakeState>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_asset: 1000,
                next_app: 2000,
                ..FakeState::default()
            }),
        }
    }

    /// A deployed marketplace holding `units` of `asset`.
    pub fn with_market(
        self,
        app: AppId,
        asset: AssetId,
        unitary_price: MicroAlgos,
        units: u64,
        seller: Address,
    ) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.global.insert(
                app,
                GlobalState {
                    unitary_price: Some(unitary_price),
                    asset_id: Some(asset),
                },
            );
            state.creators.insert(app, seller);
            state.balances.insert((Address::for_application(app), asset), units);
        }
        self
    }

    /// Makes every call named `name` fail with a transport error.
    pub fn fail_on(self, name: &'static str) -> Self {
        self.state.lock().unwrap().fail_on.push(name);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::name).collect()
    }

    pub fn balance(&self, account: &Address, asset: AssetId) -> u64 {
        let state = self.state.lock().unwrap();
        state.balances.get(&(*account, asset)).copied().unwrap_or(0)
    }

    fn record(&self, call: Call) -> LedgerResult<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        let name = call.name();
        state.calls.push(call);
        if state.fail_on.contains(&name) {
            return Err(LedgerError::Transport(format!("{} failed", name)));
        }
        Ok(state)
    }

    fn txid(state: &FakeState) -> TxId {
        TxId(format!("TX{}", state.calls.len()))
    }
}

impl Ledger for FakeLedger {
    fn global_state(&self, app: AppId) -> LedgerResult<GlobalState> {
        let state = self.record(Call::GlobalState(app))?;
        state
            .global
            .get(&app)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(format!("application {}", app)))
    }

    fn application_creator(&self, app: AppId) -> LedgerResult<Address> {
        let state = self.record(Call::ApplicationCreator(app))?;
        state
            .creators
            .get(&app)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(format!("application {}", app)))
    }

    fn asset_balance(&self, account: &Address, asset: AssetId) -> LedgerResult<u64> {
        let state = self.record(Call::AssetBalance(*account, asset))?;
        state
            .balances
            .get(&(*account, asset))
            .copied()
            .ok_or_else(|| LedgerError::NotFound(format!("holding of asset {}", asset)))
    }

    fn suggested_params(&self) -> LedgerResult<SuggestedParams> {
        self.record(Call::SuggestedParams)?;
        Ok(SuggestedParams {
            min_fee: MicroAlgos(1_000),
            first_valid: 100,
            last_valid: 1_100,
            genesis_id: "fakenet-v1".to_string(),
            genesis_hash: [7; 32],
        })
    }

    fn create_asset(&self, creation: &AssetCreation) -> LedgerResult<AssetId> {
        let mut state = self.record(Call::CreateAsset(creation.clone()))?;
        state.next_asset += 1;
        let Some(asset) = AssetId::new(state.next_asset) else {
            return Err(LedgerError::MissingField("asset-index"));
        };
        state.balances.insert((creation.creator, asset), creation.total);
        Ok(asset)
    }

    fn create_application(
        &self,
        sender: &Address,
        asset: AssetId,
        unitary_price: MicroAlgos,
    ) -> LedgerResult<AppId> {
        let mut state = self.record(Call::CreateApplication { asset, unitary_price })?;
        state.next_app += 1;
        let Some(app) = AppId::new(state.next_app) else {
            return Err(LedgerError::MissingField("application-index"));
        };
        state.global.insert(
            app,
            GlobalState {
                unitary_price: Some(unitary_price),
                asset_id: Some(asset),
            },
        );
        state.creators.insert(app, *sender);
        Ok(app)
    }

    fn opt_application_into_asset(
        &self,
        _sender: &Address,
        app: AppId,
        asset: AssetId,
        mbr_payment: &Payment,
    ) -> LedgerResult<TxId> {
        let mut state = self.record(Call::OptApplicationIntoAsset {
            app,
            asset,
            funding: mbr_payment.amount,
            fee: mbr_payment.fee,
        })?;
        state.balances.insert((Address::for_application(app), asset), 0);
        Ok(Self::txid(&state))
    }

    fn transfer_asset(&self, transfer: &AssetTransfer) -> LedgerResult<TxId> {
        let mut state = self.record(Call::TransferAsset(transfer.clone()))?;
        let from = (transfer.sender, transfer.asset);
        let to = (transfer.receiver, transfer.asset);
        let available = state.balances.get(&from).copied().unwrap_or(0);
        if available < transfer.amount {
            return Err(LedgerError::Rejected {
                status: 400,
                message: "underflow on asset balance".to_string(),
            });
        }
        state.balances.insert(from, available - transfer.amount);
        *state.balances.entry(to).or_insert(0) += transfer.amount;
        Ok(Self::txid(&state))
    }

    fn opt_in_to_asset(&self, account: &Address, asset: AssetId) -> LedgerResult<TxId> {
        let mut state = self.record(Call::OptInToAsset(*account, asset))?;
        state.balances.entry((*account, asset)).or_insert(0);
        Ok(Self::txid(&state))
    }

    fn buy(
        &self,
        sender: &Address,
        app: AppId,
        asset: AssetId,
        payment: &Payment,
        quantity: u64,
    ) -> LedgerResult<TxId> {
        let mut state = self.record(Call::Buy {
            app,
            asset,
            amount: payment.amount,
            fee: payment.fee,
            quantity,
        })?;
        let escrow = (Address::for_application(app), asset);
        let available = state.balances.get(&escrow).copied().unwrap_or(0);
        if available < quantity {
            return Err(LedgerError::Rejected {
                status: 400,
                message: "not enough tickets left".to_string(),
            });
        }
        state.balances.insert(escrow, available - quantity);
        *state.balances.entry((*sender, asset)).or_insert(0) += quantity;
        Ok(Self::txid(&state))
    }

    fn delete_application(
        &self,
        _sender: &Address,
        app: AppId,
        _asset: Option<AssetId>,
        fee: MicroAlgos,
    ) -> LedgerResult<TxId> {
        let mut state = self.record(Call::DeleteApplication { app, fee })?;
        state.global.remove(&app);
        state.creators.remove(&app);
        Ok(Self::txid(&state))
    }
}

/// Wallet holding a fixed set of accounts. Signing echoes the input.
pub struct FakeWallet {
    pub accounts: Vec<Address>,
    pub fail: bool,
}

impl FakeWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self { accounts, fail: false }
    }
}

impl Wallet for FakeWallet {
    fn accounts(&self) -> LedgerResult<Vec<Address>> {
        if self.fail {
            return Err(LedgerError::Wallet("wallet locked".to_string()));
        }
        Ok(self.accounts.clone())
    }

    fn sign_transaction(&self, signer: &Address, transaction: &[u8]) -> LedgerResult<Vec<u8>> {
        if self.fail || !self.accounts.contains(signer) {
            return Err(LedgerError::Wallet(format!("no key for {}", signer)));
        }
        let mut signed = b"SIGNED".to_vec();
        signed.extend_from_slice(transaction);
        Ok(signed)
    }
}
