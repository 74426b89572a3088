//! Application state management for the marketplace terminal.
//!
//! This module contains the main application state, the form shown for the
//! current marketplace situation, and the mode management for the terminal
//! user interface.

use std::path::PathBuf;

use log::{error, info};

use super::sync::{ChainSnapshot, SyncTicket, Synchronizer};
use super::workflows::{
    ActionKind, ActionOutcome, ActionRequest, DeletionRequest, MarketplaceRequest,
    PurchaseRequest, TokenRequest, WorkflowError,
};
use crate::domain::{
    Address, AppId, DomainError, DomainResult, InputRules, LedgerResult, MarketView, Role,
};
use crate::infrastructure::Session;

/// Default file the session is saved to.
pub const DEFAULT_SESSION_FILE: &str = ".tixmarket-session.json";

/// Represents the current mode of the application.
///
/// The mode determines how key presses are interpreted and which popups
/// are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Moving focus between the controls of the form
    Normal,
    /// Typing into a form field
    Editing,
    /// Choosing an account from the wallet
    WalletSelect,
    /// Typing the id of an existing marketplace
    OpenApp,
    /// Help screen is displayed
    Help,
}

/// Editable form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TicketName,
    AssetName,
    Quantity,
    TicketPrice,
    DesiredQuantity,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::TicketName => "Ticket Name",
            Field::AssetName => "Asset Name",
            Field::Quantity => "Quantity",
            Field::TicketPrice => "Ticket Price (ALGO)",
            Field::DesiredQuantity => "Desired Quantity",
        }
    }

    fn numeric(&self) -> bool {
        matches!(self, Field::Quantity | Field::TicketPrice | Field::DesiredQuantity)
    }
}

/// One line of the marketplace form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    ConnectWallet,
    Input(Field),
    Button(ActionKind),
    AssetId,
    UnitsLeft,
    PricePerUnit,
    SoldOut,
}

impl Control {
    pub fn is_focusable(&self) -> bool {
        matches!(
            self,
            Control::ConnectWallet | Control::Input(_) | Control::Button(_)
        )
    }
}

/// Work the event loop has to hand to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ConnectWallet,
    Run(ActionRequest),
}

/// Main application state containing the marketplace view and UI state.
///
/// # Examples
///
/// ```
/// use tixmarket::application::{App, AppMode};
///
/// let app = App::default();
/// assert!(matches!(app.mode, AppMode::Normal));
/// assert!(app.active_account.is_none());
/// ```
#[derive(Debug)]
pub struct App {
    /// What the ledger says about the marketplace
    pub view: MarketView,
    /// Current application mode
    pub mode: AppMode,
    /// Account connected through the wallet
    pub active_account: Option<Address>,
    /// Accounts offered by the wallet while choosing
    pub accounts: Vec<Address>,
    /// Highlighted entry of the account list
    pub account_cursor: usize,
    pub ticket_name: String,
    pub asset_name: String,
    /// Shared by token creation, marketplace creation and purchase
    pub quantity: String,
    pub ticket_price: String,
    /// Field being edited in editing mode
    pub editing: Option<Field>,
    /// Current input buffer (editing and app-id modes)
    pub input: String,
    /// Cursor position within the input buffer
    pub cursor_position: usize,
    /// Index of the focused control among the focusable ones
    pub focus: usize,
    /// Scroll position in help text
    pub help_scroll: usize,
    /// Temporary status message to display
    pub status_message: Option<String>,
    /// Action currently running on the ledger
    pub in_flight: Option<ActionKind>,
    /// Where Ctrl+S writes the session
    pub session_file: PathBuf,
    pub synchronizer: Synchronizer,
    sync_pending: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            view: MarketView::default(),
            mode: AppMode::Normal,
            active_account: None,
            accounts: Vec::new(),
            account_cursor: 0,
            ticket_name: String::new(),
            asset_name: String::new(),
            quantity: String::new(),
            ticket_price: String::new(),
            editing: None,
            input: String::new(),
            cursor_position: 0,
            focus: 0,
            help_scroll: 0,
            status_message: None,
            in_flight: None,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            synchronizer: Synchronizer::default(),
            // The first frame reads the chain like any later id change.
            sync_pending: true,
        }
    }
}

impl App {
    pub fn with_session_file(session_file: PathBuf) -> Self {
        Self {
            session_file,
            ..Self::default()
        }
    }

    /// Controls shown for the current wallet and marketplace situation.
    pub fn controls(&self) -> Vec<Control> {
        let view = &self.view;
        let role = self.active_account.map(|account| view.role_of(&account));
        let mut controls = vec![Control::ConnectWallet];

        if role.is_some() && view.app_id.is_none() && view.asset_id.is_none() {
            controls.extend([
                Control::Input(Field::TicketName),
                Control::Input(Field::AssetName),
                Control::Input(Field::Quantity),
                Control::Button(ActionKind::CreateToken),
            ]);
        }

        if view.asset_id.is_some() {
            controls.push(Control::AssetId);
        }
        if view.app_id.is_some() {
            controls.push(Control::UnitsLeft);
        }

        if role.is_some() && view.asset_id.is_some() && view.app_id.is_none() {
            controls.extend([
                Control::Input(Field::TicketPrice),
                Control::Input(Field::Quantity),
                Control::Button(ActionKind::CreateMarketplace),
            ]);
        }

        if view.app_id.is_some() {
            match (role, view.is_sold_out()) {
                (Some(Role::Buyer), false) => controls.extend([
                    Control::PricePerUnit,
                    Control::Input(Field::DesiredQuantity),
                    Control::Button(ActionKind::Buy),
                ]),
                (Some(Role::Seller), true) => controls.push(Control::Button(ActionKind::Delete)),
                (Some(Role::Buyer) | None, true) => controls.push(Control::SoldOut),
                _ => {}
            }
        }

        controls
    }

    pub fn focusable_controls(&self) -> Vec<Control> {
        self.controls()
            .into_iter()
            .filter(Control::is_focusable)
            .collect()
    }

    pub fn focused_control(&self) -> Option<Control> {
        let focusable = self.focusable_controls();
        focusable.get(self.focus.min(focusable.len().saturating_sub(1))).copied()
    }

    pub fn focus_next(&mut self) {
        let count = self.focusable_controls().len();
        if count > 0 {
            self.focus = (self.focus.min(count - 1) + 1) % count;
        }
    }

    pub fn focus_previous(&mut self) {
        let count = self.focusable_controls().len();
        if count > 0 {
            let current = self.focus.min(count - 1);
            self.focus = (current + count - 1) % count;
        }
    }

    fn clamp_focus(&mut self) {
        let count = self.focusable_controls().len();
        self.focus = self.focus.min(count.saturating_sub(1));
    }

    /// Activates the focused control: edits a field, opens the wallet or
    /// prepares an action.
    pub fn activate_focused(&mut self) -> Option<Command> {
        match self.focused_control()? {
            Control::ConnectWallet => {
                self.status_message = Some("Connecting to wallet...".to_string());
                Some(Command::ConnectWallet)
            }
            Control::Input(field) => {
                self.start_editing(field);
                None
            }
            Control::Button(kind) => self.request_action(kind),
            _ => None,
        }
    }

    fn field_value(&self, field: Field) -> &String {
        match field {
            Field::TicketName => &self.ticket_name,
            Field::AssetName => &self.asset_name,
            Field::Quantity | Field::DesiredQuantity => &self.quantity,
            Field::TicketPrice => &self.ticket_price,
        }
    }

    fn field_value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::TicketName => &mut self.ticket_name,
            Field::AssetName => &mut self.asset_name,
            Field::Quantity | Field::DesiredQuantity => &mut self.quantity,
            Field::TicketPrice => &mut self.ticket_price,
        }
    }

    /// Switches to editing mode for `field`, loading its current text.
    pub fn start_editing(&mut self, field: Field) {
        self.mode = AppMode::Editing;
        self.editing = Some(field);
        self.input = self.field_value(field).clone();
        self.cursor_position = self.input.len();
        self.status_message = None;
    }

    /// Inserts a typed character; numeric fields only accept digits.
    pub fn insert_char(&mut self, c: char) {
        if self.editing.is_some_and(|field| field.numeric()) && !c.is_ascii_digit() {
            return;
        }
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    /// Writes the input buffer back to the edited field.
    pub fn finish_editing(&mut self) {
        if let Some(field) = self.editing.take() {
            let value = std::mem::take(&mut self.input);
            *self.field_value_mut(field) = value;
        }
        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Cancels editing and returns to normal mode without saving changes.
    pub fn cancel_editing(&mut self) {
        self.mode = AppMode::Normal;
        self.editing = None;
        self.input.clear();
        self.cursor_position = 0;
    }

    fn require_account(&self) -> DomainResult<Address> {
        self.active_account.ok_or(DomainError::WalletNotConnected)
    }

    fn positive_quantity(&self) -> DomainResult<u64> {
        match InputRules::parse_quantity(&self.quantity)? {
            0 => Err(DomainError::InvalidQuantity(
                "must be greater than zero".to_string(),
            )),
            quantity => Ok(quantity),
        }
    }

    /// Captures the form and view into a request for `kind`.
    pub fn action_request(&self, kind: ActionKind) -> DomainResult<ActionRequest> {
        let account = self.require_account()?;
        let request = match kind {
            ActionKind::CreateToken => ActionRequest::CreateToken(TokenRequest {
                creator: account,
                quantity: self.positive_quantity()?,
                unit_name: self.ticket_name.trim().to_string(),
                asset_name: self.asset_name.trim().to_string(),
                existing: self.view.asset_id,
            }),
            ActionKind::CreateMarketplace => {
                let asset = self
                    .view
                    .asset_id
                    .ok_or(DomainError::Unavailable("Create a token first"))?;
                let unitary_price = InputRules::parse_price(&self.ticket_price)?;
                if unitary_price.as_u64() == 0 {
                    return Err(DomainError::InvalidPrice(
                        "must be greater than zero".to_string(),
                    ));
                }
                ActionRequest::CreateMarketplace(MarketplaceRequest {
                    seller: account,
                    asset,
                    unitary_price,
                    quantity: self.positive_quantity()?,
                })
            }
            ActionKind::Buy => {
                let app = self
                    .view
                    .app_id
                    .ok_or(DomainError::Unavailable("No marketplace open"))?;
                let asset = self
                    .view
                    .asset_id
                    .ok_or(DomainError::Unavailable("Marketplace has no asset"))?;
                ActionRequest::Buy(PurchaseRequest {
                    buyer: account,
                    app,
                    asset,
                    quantity: self.positive_quantity()?,
                    unitary_price: self.view.unitary_price,
                })
            }
            ActionKind::Delete => {
                let app = self
                    .view
                    .app_id
                    .ok_or(DomainError::Unavailable("No marketplace open"))?;
                ActionRequest::Delete(DeletionRequest {
                    seller: account,
                    app,
                    asset: self.view.asset_id,
                })
            }
        };
        Ok(request)
    }

    /// Prepares `kind` unless another action is still running.
    pub fn request_action(&mut self, kind: ActionKind) -> Option<Command> {
        if let Some(running) = self.in_flight {
            self.status_message = Some(format!("{} is still running", running));
            return None;
        }
        match self.action_request(kind) {
            Ok(request) => {
                self.in_flight = Some(kind);
                self.status_message = Some(format!("{}: submitting...", kind));
                Some(Command::Run(request))
            }
            Err(err) => {
                self.status_message = Some(format!("{}: {}", kind, err));
                None
            }
        }
    }

    /// Records that a prepared action could not be started.
    pub fn reject_action(&mut self, kind: ActionKind, err: DomainError) {
        self.in_flight = None;
        self.status_message = Some(format!("{}: {}", kind, err));
    }

    /// Processes the result of a finished action.
    ///
    /// The status always reports the outcome. The view only changes when it
    /// still shows the marketplace the action ran against.
    pub fn apply_action_result(
        &mut self,
        kind: ActionKind,
        result: Result<ActionOutcome, WorkflowError>,
    ) {
        self.in_flight = None;
        match result {
            Ok(ActionOutcome::TokenCreated { asset, created }) => {
                if self.view.app_id.is_none() {
                    self.view.asset_id = Some(asset);
                }
                self.status_message = Some(if created {
                    format!("Created asset {}", asset)
                } else {
                    format!("Asset {} already exists", asset)
                });
            }
            Ok(ActionOutcome::MarketplaceCreated { app }) => {
                self.set_app_id(Some(app));
                self.status_message = Some(format!("Marketplace {} is open", app));
            }
            Ok(ActionOutcome::Purchased { app, quantity, units_left }) => {
                if self.view.app_id == Some(app) {
                    self.view.units_left = units_left;
                }
                self.status_message = Some(format!(
                    "Bought {} tickets from {}, {} left",
                    quantity, app, units_left
                ));
            }
            Ok(ActionOutcome::Deleted { app }) => {
                if self.view.app_id == Some(app) {
                    self.set_app_id(None);
                }
                self.status_message = Some(format!("Deleted marketplace {}", app));
            }
            Err(err) => {
                error!("{} failed: {}", kind, err);
                self.status_message = Some(err.summary());
            }
        }
        self.clamp_focus();
    }

    /// Changes the marketplace on screen, scheduling a synchronization when
    /// the id actually changes.
    pub fn set_app_id(&mut self, app: Option<AppId>) {
        if self.view.app_id != app {
            info!("Switching to app {:?}", app.map(AppId::get));
            self.view.app_id = app;
            self.sync_pending = true;
        }
    }

    /// Asks for a fresh read of the current marketplace. Without one there
    /// is nothing to read, and a locally created asset must survive.
    pub fn request_sync(&mut self) -> bool {
        if self.view.app_id.is_none() {
            return false;
        }
        self.sync_pending = true;
        true
    }

    /// Starts the pending synchronization, if any.
    pub fn take_sync_request(&mut self) -> Option<SyncTicket> {
        if !self.sync_pending {
            return None;
        }
        self.sync_pending = false;
        Some(self.synchronizer.begin(self.view.app_id))
    }

    /// Applies a finished synchronization unless a newer one was started.
    pub fn apply_snapshot(&mut self, ticket: SyncTicket, snapshot: ChainSnapshot) {
        if self.synchronizer.complete(&ticket, &snapshot, &mut self.view) {
            self.clamp_focus();
        }
    }

    /// Processes the wallet's account list.
    pub fn set_accounts(&mut self, result: LedgerResult<Vec<Address>>) {
        match result {
            Ok(accounts) if accounts.is_empty() => {
                self.status_message = Some("Wallet has no accounts".to_string());
            }
            Ok(accounts) => {
                self.account_cursor = self
                    .active_account
                    .and_then(|active| accounts.iter().position(|a| *a == active))
                    .unwrap_or(0);
                self.accounts = accounts;
                self.mode = AppMode::WalletSelect;
                self.status_message = None;
            }
            Err(err) => {
                self.status_message = Some(format!("Wallet connection failed: {}", err));
            }
        }
    }

    /// Connects the highlighted account.
    pub fn choose_account(&mut self) {
        if let Some(account) = self.accounts.get(self.account_cursor).copied() {
            info!("Connected account {}", account);
            self.active_account = Some(account);
            self.status_message = Some(format!("Connected {}", account.abbreviated()));
        }
        self.mode = AppMode::Normal;
        self.clamp_focus();
    }

    pub fn disconnect(&mut self) {
        self.active_account = None;
        self.mode = AppMode::Normal;
        self.status_message = Some("Wallet disconnected".to_string());
        self.clamp_focus();
    }

    pub fn cancel_wallet_select(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Switches to the prompt for opening a marketplace by id.
    pub fn start_open_app(&mut self) {
        self.mode = AppMode::OpenApp;
        self.input = self.view.app_id.map(|app| app.to_string()).unwrap_or_default();
        self.cursor_position = self.input.len();
        self.status_message = None;
    }

    pub fn finish_open_app(&mut self) {
        match InputRules::parse_app_id(&self.input) {
            Ok(app) => {
                self.set_app_id(app);
                self.mode = AppMode::Normal;
                self.input.clear();
                self.cursor_position = 0;
                self.clamp_focus();
            }
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    pub fn cancel_open_app(&mut self) {
        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    /// What `y` copies: the marketplace address, or the asset id.
    pub fn clipboard_text(&self) -> Option<String> {
        self.view
            .app_address()
            .map(|address| address.to_string())
            .or_else(|| self.view.asset_id.map(|asset| asset.to_string()))
    }

    pub fn set_copy_result(&mut self, result: Result<String, String>) {
        self.status_message = Some(match result {
            Ok(text) => format!("Copied {}", text),
            Err(error) => format!("Copy failed: {}", error),
        });
    }

    pub fn session(&self) -> Session {
        Session {
            app_id: self.view.app_id,
            account: self.active_account,
        }
    }

    pub fn restore_session(&mut self, session: Session) {
        self.active_account = session.account;
        self.set_app_id(session.app_id);
    }

    /// Processes the result of a save operation.
    pub fn set_save_result(&mut self, result: Result<String, String>) {
        self.status_message = Some(match result {
            Ok(filename) => format!("Session saved to {}", filename),
            Err(error) => format!("Save failed: {}", error),
        });
    }
}
