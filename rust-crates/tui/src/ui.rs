use crate::{
    client::AppSnapshot,
    connector::ConnectorView,
    notifications::{
        NotificationKind,
        Position,
        Toast,
    },
    panel::EntryStage,
    units::{
        BASE_ASSET_SYMBOL,
        format_base_asset,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::{
    Stream,
    StreamExt,
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const TOAST_WIDTH: u16 = 36;
const TOAST_HEIGHT: u16 = 4;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Connect,
    Enter,
    Refresh,
    Disconnect,
    Redraw,
}

#[derive(Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(term) = state.terminal.as_mut() {
        term.draw(|f| render(f, snap))?;
    }
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event<I>(events: &mut I) -> Result<Event>
where
    I: Stream<Item = std::io::Result<Event>> + Unpin,
{
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn interpret_event(event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => match k.code {
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(UserEvent::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
            KeyCode::Char('c') => Some(UserEvent::Connect),
            KeyCode::Char('e') | KeyCode::Enter => Some(UserEvent::Enter),
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            KeyCode::Char('d') => Some(UserEvent::Disconnect),
            _ => None,
        },
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

pub fn render(f: &mut Frame, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(8),    // lottery panel
            Constraint::Length(6), // status/errors
            Constraint::Length(1), // help
        ])
        .split(f.area());

    draw_header(f, chunks[0], snap);
    draw_lottery(f, chunks[1], snap);
    draw_status(f, chunks[2], snap);
    draw_help(f, chunks[3]);
    draw_toasts(f, &snap.toasts);
}

fn draw_header(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(24)])
        .split(area);

    let chain = match snap.chain_id {
        Some(id) => format!("Chain: {id}"),
        None => String::from("Chain: -"),
    };
    let title = Paragraph::new(Line::from(vec![
        Span::styled("Decentralized Lottery", Style::default().bold()),
        Span::raw(format!("  {chain}")),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, cols[0]);

    let (label, style) = match &snap.wallet {
        ConnectorView::Connected { short } => {
            (short.clone(), Style::default().fg(Color::Green))
        }
        ConnectorView::Connect { disabled: true } => (
            format!("{} Connecting", spinner(snap)),
            Style::default().fg(Color::DarkGray),
        ),
        ConnectorView::Connect { disabled: false } => {
            (String::from("[c] Connect"), Style::default().fg(Color::Cyan))
        }
    };
    let wallet = Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(wallet, cols[1]);
}

fn draw_lottery(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Lottery");
    if snap.raffle_address.is_none() {
        let message = Paragraph::new("Please connect to a supported chain")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(message, area);
        return;
    }

    let button = match snap.entry_stage {
        Some(EntryStage::Submitting) => Span::styled(
            format!("{} Submitting...", spinner(snap)),
            Style::default().fg(Color::Yellow),
        ),
        Some(EntryStage::AwaitingConfirmation) => Span::styled(
            format!("{} Waiting for confirmation...", spinner(snap)),
            Style::default().fg(Color::Yellow),
        ),
        None if snap.busy => Span::styled(
            format!("{} Loading...", spinner(snap)),
            Style::default().fg(Color::DarkGray),
        ),
        None if snap.can_enter => Span::styled(
            "[e] Enter Raffle",
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        None => Span::styled("Enter Raffle", Style::default().fg(Color::DarkGray)),
    };

    let lines = vec![
        Line::from(button),
        Line::from(""),
        Line::from(format!(
            "Entrance Fee: {} {BASE_ASSET_SYMBOL}",
            format_base_asset(snap.stats.entrance_fee)
        )),
        Line::from(format!(
            "The current number of players is: {}",
            snap.stats.players
        )),
        Line::from(format!(
            "The most previous winner was: {}",
            snap.stats.recent_winner
        )),
    ];
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    f.render_widget(widget, area);
}

fn spinner(snap: &AppSnapshot) -> &'static str {
    SPINNER[snap.spinner_frame % SPINNER.len()]
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = vec![Line::from(snap.status.clone())];
    let remaining = area.height.saturating_sub(3) as usize;
    let start = snap.errors.len().saturating_sub(remaining);
    lines.extend(
        snap.errors[start..]
            .iter()
            .map(|e| Line::styled(e.clone(), Style::default().fg(Color::Red))),
    );
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new("c connect | e enter | r refresh | d disconnect | q quit")
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, area);
}

fn draw_toasts(f: &mut Frame, toasts: &[Toast]) {
    let area = f.area();
    let mut offsets = [0u16; 4];
    for toast in toasts {
        let n = &toast.notification;
        let slot = match n.position {
            Position::TopLeft => 0,
            Position::TopRight => 1,
            Position::BottomLeft => 2,
            Position::BottomRight => 3,
        };
        let Some(rect) = toast_rect(area, n.position, offsets[slot]) else {
            continue;
        };
        offsets[slot] += TOAST_HEIGHT;

        let color = match n.kind {
            NotificationKind::Info => Color::Cyan,
            NotificationKind::Success => Color::Green,
            NotificationKind::Warning => Color::Yellow,
            NotificationKind::Error => Color::Red,
        };
        let body = vec![
            Line::from(n.message.clone()),
            Line::styled(
                toast.dispatched_at.format("%H:%M:%S").to_string(),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        let widget = Paragraph::new(body).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!("{} {}", n.icon.glyph(), n.title)),
        );
        f.render_widget(Clear, rect);
        f.render_widget(widget, rect);
    }
}

fn toast_rect(area: Rect, position: Position, offset: u16) -> Option<Rect> {
    let width = TOAST_WIDTH.min(area.width);
    if offset + TOAST_HEIGHT > area.height {
        return None;
    }
    let x = match position {
        Position::TopLeft | Position::BottomLeft => area.x,
        Position::TopRight | Position::BottomRight => area.x + area.width - width,
    };
    let y = match position {
        Position::TopLeft | Position::TopRight => area.y + offset,
        Position::BottomLeft | Position::BottomRight => {
            area.y + area.height - TOAST_HEIGHT - offset
        }
    };
    Some(Rect::new(x, y, width, TOAST_HEIGHT))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        notifications::Notification,
        panel::RaffleStats,
    };
    use chrono::Local;
    use crossterm::event::KeyEvent;
    use ratatui::backend::TestBackend;
    use std::time::Instant;

    fn snapshot() -> AppSnapshot {
        AppSnapshot {
            wallet: ConnectorView::Connected {
                short: String::from("0x1234...abcd"),
            },
            chain_id: Some(0),
            raffle_address: Some(String::from("0x2222")),
            connected: true,
            stats: RaffleStats {
                entrance_fee: 100_000_000,
                players: 3,
                recent_winner: String::from("0xfeed"),
            },
            entry_stage: None,
            can_enter: true,
            busy: false,
            spinner_frame: 0,
            toasts: Vec::new(),
            status: String::from("Raffle refreshed"),
            errors: Vec::new(),
        }
    }

    fn rendered(snap: &AppSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| render(f, snap)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn render__supported_chain__shows_fee_players_and_winner() {
        let text = rendered(&snapshot());

        assert!(text.contains("Entrance Fee: 0.1 ETH"));
        assert!(text.contains("The current number of players is: 3"));
        assert!(text.contains("The most previous winner was: 0xfeed"));
        assert!(text.contains("Enter Raffle"));
        assert!(text.contains("0x1234...abcd"));
    }

    #[test]
    fn render__unsupported_chain__shows_only_notice() {
        // given
        let mut snap = snapshot();
        snap.raffle_address = None;

        // when
        let text = rendered(&snap);

        // then
        assert!(text.contains("Please connect to a supported chain"));
        assert!(!text.contains("Entrance Fee"));
    }

    #[test]
    fn render__entry_pending__replaces_button_with_spinner() {
        // given
        let mut snap = snapshot();
        snap.entry_stage = Some(EntryStage::AwaitingConfirmation);
        snap.can_enter = false;
        snap.busy = true;

        // when
        let text = rendered(&snap);

        // then
        assert!(text.contains("Waiting for confirmation..."));
        assert!(!text.contains("Enter Raffle"));
    }

    #[test]
    fn render__toast__is_drawn_with_title_and_message() {
        // given
        let mut snap = snapshot();
        snap.toasts.push(Toast {
            notification: Notification::transaction_complete(),
            raised_at: Instant::now(),
            dispatched_at: Local::now(),
        });

        // when
        let text = rendered(&snap);

        // then
        assert!(text.contains("Tx Notification"));
        assert!(text.contains("Transaction complete!"));
    }

    #[test]
    fn render__connecting__disables_connect_control() {
        let mut snap = snapshot();
        snap.wallet = ConnectorView::Connect { disabled: true };

        let text = rendered(&snap);

        assert!(text.contains("Connecting"));
        assert!(!text.contains("[c] Connect"));
    }

    #[test]
    fn interpret_event__maps_keys_to_actions() {
        let press = |code| Event::Key(KeyEvent::new(code, KeyModifiers::NONE));

        assert_eq!(interpret_event(press(KeyCode::Char('c'))), Some(UserEvent::Connect));
        assert_eq!(interpret_event(press(KeyCode::Char('e'))), Some(UserEvent::Enter));
        assert_eq!(interpret_event(press(KeyCode::Char('d'))), Some(UserEvent::Disconnect));
        assert_eq!(interpret_event(press(KeyCode::Char('q'))), Some(UserEvent::Quit));
        assert_eq!(interpret_event(press(KeyCode::Char('x'))), None);
        assert_eq!(
            interpret_event(Event::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            ))),
            Some(UserEvent::Quit)
        );
    }
}
