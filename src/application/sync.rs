//! Synchronization of the on-chain marketplace state into the view.
//!
//! Reads are best effort: a failed fetch resets the affected fields to
//! empty instead of surfacing an error. Every synchronization is tagged with
//! a ticket so that a slow response for an old application id cannot
//! overwrite a newer one.

use log::{debug, warn};

use crate::domain::{Address, AppId, AssetId, Ledger, MarketView, MicroAlgos};

/// What the ledger currently says about one marketplace application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainSnapshot {
    pub app_id: Option<AppId>,
    pub unitary_price: MicroAlgos,
    pub asset_id: Option<AssetId>,
    pub units_left: u64,
    pub seller: Option<Address>,
}

impl ChainSnapshot {
    /// Copies the snapshot into the view.
    pub fn apply_to(&self, view: &mut MarketView) {
        view.unitary_price = self.unitary_price;
        view.asset_id = self.asset_id;
        view.units_left = self.units_left;
        view.seller = self.seller;
    }
}

/// Reads global state, remaining units and creator of `app`.
///
/// With no application nothing is fetched and the empty snapshot is
/// returned.
pub fn fetch_snapshot(ledger: &dyn Ledger, app: Option<AppId>) -> ChainSnapshot {
    let Some(app) = app else {
        return ChainSnapshot::default();
    };
    let mut snapshot = ChainSnapshot {
        app_id: Some(app),
        ..ChainSnapshot::default()
    };

    match ledger.global_state(app) {
        Ok(state) => {
            snapshot.unitary_price = state.unitary_price.unwrap_or_default();
            snapshot.asset_id = state.asset_id;
            if let Some(asset) = state.asset_id {
                let escrow = Address::for_application(app);
                match ledger.asset_balance(&escrow, asset) {
                    Ok(units) => snapshot.units_left = units,
                    Err(err) => debug!("No holding of asset {} for app {}: {}", asset, app, err),
                }
            }
        }
        Err(err) => warn!("Reading global state of app {} failed: {}", app, err),
    }

    match ledger.application_creator(app) {
        Ok(creator) => snapshot.seller = Some(creator),
        Err(err) => debug!("Reading creator of app {} failed: {}", app, err),
    }

    snapshot
}

/// Proof that a synchronization was started, carried back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTicket {
    pub sequence: u64,
    pub app_id: Option<AppId>,
}

/// Issues monotonically increasing tickets; only the latest one is current.
#[derive(Debug, Default)]
pub struct Synchronizer {
    latest: u64,
}

impl Synchronizer {
    pub fn begin(&mut self, app_id: Option<AppId>) -> SyncTicket {
        self.latest += 1;
        SyncTicket {
            sequence: self.latest,
            app_id,
        }
    }

    pub fn is_current(&self, ticket: &SyncTicket) -> bool {
        ticket.sequence == self.latest
    }

    /// Applies `snapshot` to `view` if `ticket` is still current.
    ///
    /// Returns whether the snapshot was applied.
    pub fn complete(&self, ticket: &SyncTicket, snapshot: &ChainSnapshot, view: &mut MarketView) -> bool {
        if !self.is_current(ticket) || view.app_id != ticket.app_id {
            debug!(
                "Discarding stale snapshot #{} for app {:?}",
                ticket.sequence, ticket.app_id
            );
            return false;
        }
        snapshot.apply_to(view);
        true
    }
}
