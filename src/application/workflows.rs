//! Transaction workflows of the ticket marketplace.
//!
//! Each workflow is a fixed pipeline of dependent ledger calls. A failing
//! call stops the pipeline; nothing that already landed on the ledger is
//! rolled back. The error names the failed step and lists the effects of
//! the steps before it.

use std::fmt;
use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::domain::{
    Address, AppId, AssetCreation, AssetId, AssetTransfer, DomainResult, Ledger, LedgerError,
    LedgerResult, MicroAlgos, Payment, Pricing, DELETE_FEE,
};

/// The user-triggered actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateToken,
    CreateMarketplace,
    Buy,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::CreateToken => "Create token",
            ActionKind::CreateMarketplace => "Create marketplace",
            ActionKind::Buy => "Buy",
            ActionKind::Delete => "Delete app",
        };
        f.write_str(label)
    }
}

/// A single ledger call inside a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AssetCreation,
    ApplicationCreation,
    SuggestedParams,
    ApplicationOptIn,
    AssetTransfer,
    BuyerOptIn,
    Purchase,
    StateRefresh,
    Deletion,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::AssetCreation => "asset creation",
            Step::ApplicationCreation => "application creation",
            Step::SuggestedParams => "fetching network parameters",
            Step::ApplicationOptIn => "application opt-in",
            Step::AssetTransfer => "ticket transfer",
            Step::BuyerOptIn => "buyer opt-in",
            Step::Purchase => "purchase call",
            Step::StateRefresh => "state refresh",
            Step::Deletion => "deletion",
        };
        f.write_str(label)
    }
}

/// An effect that reached the ledger before a workflow failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completed {
    ApplicationCreated(AppId),
    ApplicationFunded(AppId),
    BuyerOptedIn(AssetId),
    Purchased { quantity: u64 },
}

impl fmt::Display for Completed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completed::ApplicationCreated(app) => write!(f, "application {} was created", app),
            Completed::ApplicationFunded(app) => {
                write!(f, "application {} was funded and opted in", app)
            }
            Completed::BuyerOptedIn(asset) => write!(f, "buyer opted into asset {}", asset),
            Completed::Purchased { quantity } => write!(f, "{} tickets were bought", quantity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} failed at {step}: {source}")]
pub struct WorkflowError {
    pub action: ActionKind,
    pub step: Step,
    pub completed: Vec<Completed>,
    pub source: LedgerError,
}

impl WorkflowError {
    /// Message for the status bar, including what was left on the ledger.
    pub fn summary(&self) -> String {
        if self.completed.is_empty() {
            return self.to_string();
        }
        let left: Vec<String> = self.completed.iter().map(ToString::to_string).collect();
        format!("{} ({})", self, left.join(", "))
    }
}

/// Result of a workflow that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// `created` is false when the asset already existed and nothing was sent.
    TokenCreated { asset: AssetId, created: bool },
    MarketplaceCreated { app: AppId },
    Purchased { app: AppId, quantity: u64, units_left: u64 },
    Deleted { app: AppId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub creator: Address,
    pub quantity: u64,
    pub unit_name: String,
    pub asset_name: String,
    pub existing: Option<AssetId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceRequest {
    pub seller: Address,
    pub asset: AssetId,
    pub unitary_price: MicroAlgos,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub buyer: Address,
    pub app: AppId,
    pub asset: AssetId,
    pub quantity: u64,
    pub unitary_price: MicroAlgos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub seller: Address,
    pub app: AppId,
    pub asset: Option<AssetId>,
}

/// Everything needed to run one action, captured from the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    CreateToken(TokenRequest),
    CreateMarketplace(MarketplaceRequest),
    Buy(PurchaseRequest),
    Delete(DeletionRequest),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::CreateToken(_) => ActionKind::CreateToken,
            ActionRequest::CreateMarketplace(_) => ActionKind::CreateMarketplace,
            ActionRequest::Buy(_) => ActionKind::Buy,
            ActionRequest::Delete(_) => ActionKind::Delete,
        }
    }
}

/// A bound workflow, ready to run without further context.
pub type Action = Box<dyn FnOnce() -> Result<ActionOutcome, WorkflowError> + Send>;

/// Binds action requests to the ledger they run against.
#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn Ledger>,
}

impl Orchestrator {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Validates `request` and captures it in a deferred action.
    pub fn bind(&self, request: ActionRequest) -> DomainResult<Action> {
        let ledger = Arc::clone(&self.ledger);
        let action: Action = match request {
            ActionRequest::CreateToken(req) => Box::new(move || create_token(&*ledger, &req)),
            ActionRequest::CreateMarketplace(req) => {
                Box::new(move || create_marketplace(&*ledger, &req))
            }
            ActionRequest::Buy(req) => {
                let amount = Pricing::purchase_total(req.quantity, req.unitary_price)?;
                Box::new(move || buy(&*ledger, &req, amount))
            }
            ActionRequest::Delete(req) => Box::new(move || delete_app(&*ledger, &req)),
        };
        Ok(action)
    }
}

struct Progress {
    action: ActionKind,
    completed: Vec<Completed>,
}

impl Progress {
    fn new(action: ActionKind) -> Self {
        Self {
            action,
            completed: Vec::new(),
        }
    }

    fn step<T>(&self, step: Step, result: LedgerResult<T>) -> Result<T, WorkflowError> {
        result.map_err(|source| WorkflowError {
            action: self.action,
            step,
            completed: self.completed.clone(),
            source,
        })
    }

    fn done(&mut self, effect: Completed) {
        self.completed.push(effect);
    }
}

/// Creates the ticket asset unless one already exists.
pub fn create_token(ledger: &dyn Ledger, req: &TokenRequest) -> Result<ActionOutcome, WorkflowError> {
    if let Some(asset) = req.existing {
        info!("Asset {} already exists, skipping creation", asset);
        return Ok(ActionOutcome::TokenCreated {
            asset,
            created: false,
        });
    }

    let progress = Progress::new(ActionKind::CreateToken);
    let creation = AssetCreation {
        creator: req.creator,
        total: req.quantity,
        unit_name: req.unit_name.clone(),
        asset_name: req.asset_name.clone(),
    };
    let asset = progress.step(Step::AssetCreation, ledger.create_asset(&creation))?;
    info!("Created asset {} with {} units", asset, req.quantity);
    Ok(ActionOutcome::TokenCreated {
        asset,
        created: true,
    })
}

/// Deploys the marketplace, funds it, opts it into the asset and deposits
/// the tickets.
pub fn create_marketplace(
    ledger: &dyn Ledger,
    req: &MarketplaceRequest,
) -> Result<ActionOutcome, WorkflowError> {
    let mut progress = Progress::new(ActionKind::CreateMarketplace);

    let app = progress.step(
        Step::ApplicationCreation,
        ledger.create_application(&req.seller, req.asset, req.unitary_price),
    )?;
    info!("Created application {}", app);
    progress.done(Completed::ApplicationCreated(app));

    let app_address = Address::for_application(app);
    let params = progress.step(Step::SuggestedParams, ledger.suggested_params())?;
    let mbr_payment = Payment {
        sender: req.seller,
        receiver: app_address,
        amount: Pricing::marketplace_funding(),
        fee: Pricing::fee_with_inner(params.min_fee),
        params,
    };

    progress.step(
        Step::ApplicationOptIn,
        ledger.opt_application_into_asset(&req.seller, app, req.asset, &mbr_payment),
    )?;
    progress.done(Completed::ApplicationFunded(app));

    let transfer = AssetTransfer {
        sender: req.seller,
        receiver: app_address,
        asset: req.asset,
        amount: req.quantity,
    };
    progress.step(Step::AssetTransfer, ledger.transfer_asset(&transfer))?;
    info!("Deposited {} units of asset {} into app {}", req.quantity, req.asset, app);

    Ok(ActionOutcome::MarketplaceCreated { app })
}

/// Pays for and receives `quantity` tickets, then reads how many are left.
pub fn buy(
    ledger: &dyn Ledger,
    req: &PurchaseRequest,
    amount: MicroAlgos,
) -> Result<ActionOutcome, WorkflowError> {
    let mut progress = Progress::new(ActionKind::Buy);
    let app_address = Address::for_application(req.app);

    let params = progress.step(Step::SuggestedParams, ledger.suggested_params())?;
    let payment = Payment {
        sender: req.buyer,
        receiver: app_address,
        amount,
        fee: Pricing::fee_with_inner(params.min_fee),
        params,
    };

    progress.step(Step::BuyerOptIn, ledger.opt_in_to_asset(&req.buyer, req.asset))?;
    progress.done(Completed::BuyerOptedIn(req.asset));

    progress.step(
        Step::Purchase,
        ledger.buy(&req.buyer, req.app, req.asset, &payment, req.quantity),
    )?;
    info!("Bought {} tickets from app {} for {} ALGO", req.quantity, req.app, amount);
    progress.done(Completed::Purchased {
        quantity: req.quantity,
    });

    let state = progress.step(Step::StateRefresh, ledger.global_state(req.app))?;
    let asset = progress.step(
        Step::StateRefresh,
        state.asset_id.ok_or(LedgerError::MissingField("assetId")),
    )?;
    let units_left = progress.step(Step::StateRefresh, ledger.asset_balance(&app_address, asset))?;

    Ok(ActionOutcome::Purchased {
        app: req.app,
        quantity: req.quantity,
        units_left,
    })
}

/// Deletes the marketplace application.
pub fn delete_app(ledger: &dyn Ledger, req: &DeletionRequest) -> Result<ActionOutcome, WorkflowError> {
    let progress = Progress::new(ActionKind::Delete);
    progress.step(
        Step::Deletion,
        ledger.delete_application(&req.seller, req.app, req.asset, DELETE_FEE),
    )?;
    info!("Deleted application {}", req.app);
    Ok(ActionOutcome::Deleted { app: req.app })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::test_utils::{address, Call, FakeLedger};

    fn token_request(existing: Option<AssetId>) -> TokenRequest {
        TokenRequest {
            creator: address(1),
            quantity: 100,
            unit_name: "TKT".to_string(),
            asset_name: "Concert".to_string(),
            existing,
        }
    }

    fn seeded_asset(ledger: &FakeLedger) -> AssetId {
        match create_token(ledger, &token_request(None)) {
            Ok(ActionOutcome::TokenCreated { asset, .. }) => asset,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_create_token_issues_creation() {
        let ledger = FakeLedger::new();
        let outcome = create_token(&ledger, &token_request(None)).unwrap();
        let ActionOutcome::TokenCreated { asset, created } = outcome else {
            panic!("unexpected outcome");
        };
        assert!(created);
        assert_eq!(ledger.balance(&address(1), asset), 100);
        match &ledger.calls()[0] {
            Call::CreateAsset(creation) => {
                assert_eq!(creation.creator, address(1));
                assert_eq!(creation.unit_name, "TKT");
                assert_eq!(creation.asset_name, "Concert");
                assert_eq!(creation.total, 100);
            }
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[test]
    fn test_create_token_with_existing_asset_issues_no_call() {
        let ledger = FakeLedger::new();
        let existing = AssetId::new(55);
        let outcome = create_token(&ledger, &token_request(existing)).unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::TokenCreated {
                asset: existing.unwrap(),
                created: false
            }
        );
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn test_create_marketplace_call_order() {
        let ledger = FakeLedger::new();
        let asset = seeded_asset(&ledger);
        let req = MarketplaceRequest {
            seller: address(1),
            asset,
            unitary_price: MicroAlgos(1_000_000),
            quantity: 100,
        };

        let outcome = create_marketplace(&ledger, &req).unwrap();
        let ActionOutcome::MarketplaceCreated { app } = outcome else {
            panic!("unexpected outcome");
        };

        assert_eq!(
            ledger.call_names()[1..],
            [
                "create_application",
                "suggested_params",
                "opt_application_into_asset",
                "transfer_asset"
            ]
        );
        assert_eq!(ledger.balance(&Address::for_application(app), asset), 100);
        assert_eq!(ledger.balance(&address(1), asset), 0);
    }

    #[test]
    fn test_create_marketplace_funds_minimum_balance() {
        let ledger = FakeLedger::new();
        let asset = seeded_asset(&ledger);
        let req = MarketplaceRequest {
            seller: address(1),
            asset,
            unitary_price: MicroAlgos(2_000_000),
            quantity: 10,
        };
        create_marketplace(&ledger, &req).unwrap();

        let funding = ledger.calls().into_iter().find_map(|call| match call {
            Call::OptApplicationIntoAsset { funding, fee, .. } => Some((funding, fee)),
            _ => None,
        });
        assert_eq!(funding, Some((MicroAlgos(200_000), MicroAlgos(2_000))));
    }

    #[test]
    fn test_create_marketplace_stops_at_failed_step() {
        let ledger = FakeLedger::new();
        let asset = seeded_asset(&ledger);
        let ledger = ledger.fail_on("opt_application_into_asset");
        let req = MarketplaceRequest {
            seller: address(1),
            asset,
            unitary_price: MicroAlgos(1_000_000),
            quantity: 100,
        };

        let err = create_marketplace(&ledger, &req).unwrap_err();
        assert_eq!(err.step, Step::ApplicationOptIn);
        assert!(matches!(err.completed[..], [Completed::ApplicationCreated(_)]));
        assert!(!ledger.call_names().contains(&"transfer_asset"));
        assert!(err.summary().contains("was created"));
    }

    #[test]
    fn test_create_marketplace_first_step_failure_leaves_nothing() {
        let ledger = FakeLedger::new().fail_on("create_application");
        let req = MarketplaceRequest {
            seller: address(1),
            asset: AssetId::new(5).unwrap(),
            unitary_price: MicroAlgos(1),
            quantity: 1,
        };
        let err = create_marketplace(&ledger, &req).unwrap_err();
        assert_eq!(err.step, Step::ApplicationCreation);
        assert!(err.completed.is_empty());
        assert_eq!(ledger.call_names(), vec!["create_application"]);
    }

    #[test]
    fn test_buy_pays_exact_total() {
        let app = AppId::new(2001).unwrap();
        let asset = AssetId::new(1001).unwrap();
        let ledger =
            FakeLedger::new().with_market(app, asset, MicroAlgos(1_000_000), 20, address(1));
        let req = PurchaseRequest {
            buyer: address(2),
            app,
            asset,
            quantity: 5,
            unitary_price: MicroAlgos(1_000_000),
        };

        let action = Orchestrator::new(Arc::new(ledger)).bind(ActionRequest::Buy(req)).unwrap();
        let outcome = action().unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::Purchased {
                app,
                quantity: 5,
                units_left: 15
            }
        );
    }

    #[test]
    fn test_buy_call_sequence() {
        let app = AppId::new(2001).unwrap();
        let asset = AssetId::new(1001).unwrap();
        let ledger =
            FakeLedger::new().with_market(app, asset, MicroAlgos(1_000_000), 20, address(1));
        let req = PurchaseRequest {
            buyer: address(2),
            app,
            asset,
            quantity: 5,
            unitary_price: MicroAlgos(1_000_000),
        };
        buy(&ledger, &req, MicroAlgos(5_000_000)).unwrap();

        assert_eq!(
            ledger.call_names(),
            vec![
                "suggested_params",
                "opt_in_to_asset",
                "buy",
                "global_state",
                "asset_balance"
            ]
        );
        let paid = ledger.calls().into_iter().find_map(|call| match call {
            Call::Buy { amount, quantity, .. } => Some((amount, quantity)),
            _ => None,
        });
        assert_eq!(paid, Some((MicroAlgos(5_000_000), 5)));
    }

    #[test]
    fn test_buy_overflow_rejected_at_bind() {
        let ledger = Arc::new(FakeLedger::new());
        let req = PurchaseRequest {
            buyer: address(2),
            app: AppId::new(1).unwrap(),
            asset: AssetId::new(1).unwrap(),
            quantity: u64::MAX,
            unitary_price: MicroAlgos(10),
        };
        let result = Orchestrator::new(ledger.clone()).bind(ActionRequest::Buy(req));
        assert!(matches!(result, Err(DomainError::AmountOverflow { .. })));
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn test_buy_failure_after_opt_in_reports_it() {
        let app = AppId::new(2001).unwrap();
        let asset = AssetId::new(1001).unwrap();
        let ledger = FakeLedger::new()
            .with_market(app, asset, MicroAlgos(1_000_000), 20, address(1))
            .fail_on("buy");
        let req = PurchaseRequest {
            buyer: address(2),
            app,
            asset,
            quantity: 1,
            unitary_price: MicroAlgos(1_000_000),
        };
        let err = buy(&ledger, &req, MicroAlgos(1_000_000)).unwrap_err();
        assert_eq!(err.step, Step::Purchase);
        assert_eq!(err.completed, vec![Completed::BuyerOptedIn(asset)]);
        assert_eq!(ledger.balance(&address(2), asset), 0);
    }

    #[test]
    fn test_delete_uses_fee_override() {
        let app = AppId::new(2001).unwrap();
        let ledger = FakeLedger::new();
        let req = DeletionRequest {
            seller: address(1),
            app,
            asset: None,
        };
        let outcome = delete_app(&ledger, &req).unwrap();
        assert_eq!(outcome, ActionOutcome::Deleted { app });
        assert_eq!(
            ledger.calls(),
            vec![Call::DeleteApplication {
                app,
                fee: MicroAlgos(3_000)
            }]
        );
    }

    #[test]
    fn test_bound_action_runs_later() {
        let ledger = Arc::new(FakeLedger::new());
        let orchestrator = Orchestrator::new(ledger.clone());
        let action = orchestrator
            .bind(ActionRequest::CreateToken(token_request(None)))
            .unwrap();
        assert!(ledger.calls().is_empty());
        action().unwrap();
        assert_eq!(ledger.call_names(), vec!["create_asset"]);
    }
}
