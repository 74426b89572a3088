//! Background execution of ledger work.
//!
//! The event loop never blocks on the network. Synchronizations, wallet
//! connections and actions run on worker threads and report back through a
//! channel that the loop drains between frames.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::state::{App, Command};
use super::sync::{fetch_snapshot, ChainSnapshot, SyncTicket};
use super::workflows::{ActionKind, ActionOutcome, Orchestrator, WorkflowError};
use crate::domain::{Address, Ledger, LedgerResult, Wallet};

/// Result of background work, applied to the [`App`] on the main thread.
#[derive(Debug)]
pub enum Message {
    Synced(SyncTicket, ChainSnapshot),
    Finished(ActionKind, Result<ActionOutcome, WorkflowError>),
    Accounts(LedgerResult<Vec<Address>>),
}

impl Message {
    /// Applies this message to the application state.
    pub fn apply(self, app: &mut App) {
        match self {
            Message::Synced(ticket, snapshot) => app.apply_snapshot(ticket, snapshot),
            Message::Finished(kind, result) => app.apply_action_result(kind, result),
            Message::Accounts(result) => app.set_accounts(result),
        }
    }
}

pub struct Dispatcher {
    ledger: Arc<dyn Ledger>,
    wallet: Arc<dyn Wallet>,
    orchestrator: Orchestrator,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
}

impl Dispatcher {
    pub fn new(ledger: Arc<dyn Ledger>, wallet: Arc<dyn Wallet>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            orchestrator: Orchestrator::new(Arc::clone(&ledger)),
            ledger,
            wallet,
            sender,
            receiver,
        }
    }

    fn spawn(&self, name: &str, work: impl FnOnce() -> Message + Send + 'static) {
        let sender = self.sender.clone();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            // The receiver only goes away when the program is exiting.
            let _ = sender.send(work());
        });
        if let Err(err) = spawned {
            warn!("Could not start {} worker: {}", name, err);
        }
    }

    /// Starts the work a command asks for.
    pub fn dispatch(&self, app: &mut App, command: Command) {
        match command {
            Command::ConnectWallet => {
                let wallet = Arc::clone(&self.wallet);
                self.spawn("wallet", move || Message::Accounts(wallet.accounts()));
            }
            Command::Run(request) => {
                let kind = request.kind();
                match self.orchestrator.bind(request) {
                    Ok(action) => {
                        info!("Starting {}", kind);
                        self.spawn("action", move || Message::Finished(kind, action()));
                    }
                    Err(err) => app.reject_action(kind, err),
                }
            }
        }
    }

    /// Starts the synchronization the application asked for, if any.
    pub fn start_pending_sync(&self, app: &mut App) {
        if let Some(ticket) = app.take_sync_request() {
            debug!("Sync #{} for app {:?}", ticket.sequence, ticket.app_id);
            let ledger = Arc::clone(&self.ledger);
            self.spawn("sync", move || {
                Message::Synced(ticket, fetch_snapshot(&*ledger, ticket.app_id))
            });
        }
    }

    /// Applies every message that has already arrived. Returns how many.
    pub fn drain(&self, app: &mut App) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.receiver.try_recv() {
            message.apply(app);
            applied += 1;
        }
        applied
    }

    /// Waits up to `timeout` for one message and applies it.
    pub fn process_next(&self, app: &mut App, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                message.apply(app);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}
