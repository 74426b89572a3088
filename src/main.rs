//! tixmarket - Terminal Ticket Marketplace
//!
//! A terminal frontend for a ticket marketplace contract. Sellers mint a
//! ticket asset and open a marketplace application holding it, buyers pay
//! for tickets, and a sold out marketplace can be deleted by its seller.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use tixmarket::application::{App, AppMode, Dispatcher};
use tixmarket::config::Opts;
use tixmarket::domain::{Ledger, Wallet};
use tixmarket::infrastructure::{AlgodClient, AlgodLedger, KmdWallet, SessionRepository};
use tixmarket::logging::LogLevel;
use tixmarket::presentation::{render_ui, InputHandler};

const TICK: Duration = Duration::from_millis(100);

/// Entry point for the tixmarket terminal frontend.
///
/// Reads the configuration, connects the ledger and wallet clients, restores
/// the saved session and runs the event loop until the user quits.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened, a client cannot be
/// built, or terminal setup fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();
    LogLevel::from_verbosity_flag_count(opts.verbose).apply(&opts.log_file)?;
    debug!(
        "Node {}, key daemon {} (wallet {})",
        opts.node.url, opts.wallet.url, opts.wallet.name
    );

    let algod = AlgodClient::new(&opts.node.url, &opts.node.token)?;
    let wallet: Arc<dyn Wallet> = Arc::new(KmdWallet::new(
        &opts.wallet.url,
        &opts.wallet.token,
        &opts.wallet.name,
        &opts.wallet.password,
    )?);
    let ledger: Arc<dyn Ledger> = Arc::new(AlgodLedger::new(
        algod,
        Arc::clone(&wallet),
        opts.contract.programs(),
        opts.node.wait_rounds,
    ));
    let dispatcher = Dispatcher::new(ledger, wallet);

    let mut app = App::with_session_file(opts.session_file.clone());
    if opts.session_file.exists() {
        match SessionRepository::load_session(&opts.session_file) {
            Ok(session) => app.restore_session(session),
            Err(err) => warn!("Ignoring session file {}: {}", opts.session_file.display(), err),
        }
    }
    if let Some(app_id) = opts.app_id {
        app.set_app_id(Some(app_id));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &dispatcher);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Main application event loop.
///
/// Applies finished background work, starts pending synchronizations,
/// renders, and processes keyboard input. Continues running until the user
/// presses 'q' in normal mode.
///
/// # Errors
///
/// Returns an IO error if terminal operations fail.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, dispatcher: &Dispatcher) -> io::Result<()> {
    loop {
        dispatcher.drain(app);
        dispatcher.start_pending_sync(app);
        terminal.draw(|f| render_ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') if matches!(app.mode, AppMode::Normal) => {
                        if let Some(kind) = app.in_flight {
                            warn!("Quitting while {} is still running", kind);
                        }
                        info!("Quit");
                        return Ok(());
                    }
                    _ => {
                        if let Some(command) = InputHandler::handle_key_event(app, key.code, key.modifiers) {
                            dispatcher.dispatch(app, command);
                        }
                    }
                }
            }
        }
    }
}
