use crate::application::{ActionKind, App, AppMode, Control, Field};
use crate::domain::{InputRules, Pricing};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_form(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    match app.mode {
        AppMode::WalletSelect => render_wallet_popup(f, app),
        AppMode::Help => render_help_popup(f, app.help_scroll),
        _ => {}
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let app_id = app
        .view
        .app_id
        .map(|app| app.to_string())
        .unwrap_or_else(|| "none".to_string());
    let account = app
        .active_account
        .map(|account| account.abbreviated())
        .unwrap_or_else(|| "not connected".to_string());
    let header = Paragraph::new(format!(
        "tixmarket - Ticket Marketplace | App: {} | Account: {}",
        app_id, account
    ))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

/// Text of the buy button, e.g. `Buy 5 for 7.5 ALGO`.
pub fn buy_label(app: &App) -> String {
    let quantity = InputRules::parse_quantity(&app.quantity).unwrap_or(0);
    match Pricing::purchase_total(quantity, app.view.unitary_price) {
        Ok(total) => format!("Buy {} for {} ALGO", quantity, total),
        Err(_) => format!("Buy {}", quantity),
    }
}

/// Text shown for one control of the form.
pub fn control_text(app: &App, control: Control) -> String {
    match control {
        Control::ConnectWallet => match app.active_account {
            Some(account) => format!("[ Wallet: {} ]", account.abbreviated()),
            None => "[ Wallet Connection ]".to_string(),
        },
        Control::Input(field) => {
            let value = if app.editing == Some(field) {
                let mut value = app.input.clone();
                value.insert(app.cursor_position, '|');
                value
            } else {
                match field {
                    Field::TicketName => app.ticket_name.clone(),
                    Field::AssetName => app.asset_name.clone(),
                    Field::Quantity | Field::DesiredQuantity => app.quantity.clone(),
                    Field::TicketPrice => app.ticket_price.clone(),
                }
            };
            format!("{}: {}", field.label(), value)
        }
        Control::Button(ActionKind::Buy) => format!("[ {} ]", buy_label(app)),
        Control::Button(kind) => format!("[ {} ]", kind),
        Control::AssetId => format!(
            "Asset ID: {}",
            app.view.asset_id.map(|asset| asset.to_string()).unwrap_or_default()
        ),
        Control::UnitsLeft => format!("Tickets Left: {}", app.view.units_left),
        Control::PricePerUnit => format!("Price per unit: {} ALGO", app.view.unitary_price),
        Control::SoldOut => "[ SOLD OUT ]".to_string(),
    }
}

fn render_form(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused_control();
    let show_focus = matches!(app.mode, AppMode::Normal | AppMode::Editing);
    let lines: Vec<Line> = app
        .controls()
        .into_iter()
        .map(|control| {
            let style = match control {
                _ if show_focus && Some(control) == focused => {
                    Style::default().bg(Color::Blue).fg(Color::White)
                }
                Control::Button(kind) if app.in_flight == Some(kind) => {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
                }
                Control::Button(_) | Control::ConnectWallet => Style::default().fg(Color::Yellow),
                Control::SoldOut => Style::default().fg(Color::DarkGray),
                _ => Style::default(),
            };
            Line::from(Span::styled(control_text(app, control), style))
        })
        .collect();

    let form = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Marketplace"));
    f.render_widget(form, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let input_text = match app.mode {
        AppMode::Normal => {
            if let Some(ref status) = app.status_message {
                status.clone()
            } else if let Some(kind) = app.in_flight {
                format!("{}: waiting for confirmation...", kind)
            } else {
                "Tab/↑↓: move | Enter: select | Ctrl+G: open app | y: copy | r: refresh | Ctrl+S: save | F1/?: help | q: quit".to_string()
            }
        }
        AppMode::Editing => format!(
            "Editing {}: {} (Enter to save, Esc to cancel)",
            app.editing.map(|field| field.label()).unwrap_or_default(),
            app.input
        ),
        AppMode::WalletSelect => "↑↓: choose account | Enter: connect | d: disconnect | Esc: close".to_string(),
        AppMode::OpenApp => match app.status_message {
            Some(ref error) => format!("Open app: {} ({})", app.input, error),
            None => format!("Open app: {} (Enter to open, empty to close, Esc to cancel)", app.input),
        },
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
    };

    let input = Paragraph::new(input_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Normal => Style::default(),
            AppMode::Editing => Style::default().fg(Color::Green),
            AppMode::WalletSelect => Style::default().fg(Color::Magenta),
            AppMode::OpenApp => Style::default().fg(Color::Yellow),
            AppMode::Help => Style::default().fg(Color::Cyan),
        });
    f.render_widget(input, area);
}

fn popup_area(area: Rect) -> Rect {
    Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    }
}

fn render_wallet_popup(f: &mut Frame, app: &App) {
    let popup_area = popup_area(f.area());
    f.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = app
        .accounts
        .iter()
        .map(|account| {
            let marker = if Some(*account) == app.active_account { "* " } else { "  " };
            ListItem::new(format!("{}{}", marker, account))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Select Account")
                .style(Style::default().fg(Color::Magenta)),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White));

    let mut state = ListState::default().with_selected(Some(app.account_cursor));
    f.render_stateful_widget(list, popup_area, &mut state);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let popup_area = popup_area(f.area());

    f.render_widget(Clear, popup_area);

    let help_text = get_help_text();
    let help_lines: Vec<&str> = help_text.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let visible_text = help_lines[start_line..end_line].join("\n");

    let help_widget = Paragraph::new(visible_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(format!("tixmarket Help (Line {}/{})", start_line + 1, help_lines.len()))
            .style(Style::default().fg(Color::Cyan)))
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

fn get_help_text() -> String {
    r#"TIXMARKET - TICKET MARKETPLACE

=== SELLING TICKETS ===
1. Connect a wallet account
2. Enter Ticket Name, Asset Name and Quantity, then Create token
3. Enter the Ticket Price in whole ALGO and the Quantity to sell,
   then Create marketplace
   The marketplace is funded with its minimum balance, opts into the
   ticket asset and receives the tickets for sale
4. Once every ticket is sold, Delete app closes the marketplace

=== BUYING TICKETS ===
Ctrl+G          Open a marketplace by application id
                Enter the Desired Quantity and select the Buy button
                The button shows the total cost in ALGO
                Sold out marketplaces show SOLD OUT

=== FORM ===
Tab / ↓ / j     Next control
Shift+Tab/↑/k   Previous control
Enter / Space   Press button or edit field
Enter           Finish editing a field
Esc             Cancel editing

=== WALLET ===
↑↓              Choose account
Enter           Connect the highlighted account
d               Disconnect
Esc             Close without changes

=== OTHER ===
r               Re-read the marketplace from the ledger
y               Copy marketplace address (or asset id) to clipboard
Ctrl+S          Save open marketplace and account to the session file
F1 or ?         Show this help
q               Quit application

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window

Note: a failed action is not rolled back. The status bar lists the
steps that already completed so the action can be finished by hand."#.to_string()
}
