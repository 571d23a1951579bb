// src/tui.rs
//
// Terminal display: counter pane, log pane, status line and a blocking error
// popup. Everything shown is read back from the session and the log on each
// frame.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::io::serial::{list_serial_ports, SerialSource};
use crate::io::{ByteSource, SourceEvent, TransportError};
use crate::log_sink::{lock_log, LogSink, SharedLog};
use crate::logging;
use crate::session::{ConnectionSession, SessionEvent, SessionState};
use crate::settings::{load_settings, AppSettings, SettingsStore};

const KEY_HINTS: &str = "r apply  d disconnect  c clear  l clear log  t timestamps  h log  q quit";

// ============================================================================
// App State
// ============================================================================

pub struct App<S: ByteSource> {
    session: ConnectionSession<S>,
    log: SharedLog,
    store: SettingsStore,
    settings_path: PathBuf,
    /// Blocking error; keys other than dismiss are ignored while set
    popup: Option<String>,
    status: String,
    show_log: bool,
    should_quit: bool,
}

impl<S: ByteSource> App<S> {
    pub fn new(
        source: S,
        settings: AppSettings,
        settings_path: PathBuf,
        source_tx: mpsc::UnboundedSender<SourceEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let log = LogSink::shared();
        lock_log(&log).set_timestamp_enabled(settings.connection.timestamp_enabled);

        let mut session = ConnectionSession::new(source, log.clone(), source_tx);
        session.set_reset_counter_on_connect(settings.reset_counter_on_connect);
        let events = session.subscribe();

        let app = Self {
            session,
            log,
            store: SettingsStore::new(settings.connection.clone()),
            settings_path,
            popup: None,
            status: String::new(),
            show_log: true,
            should_quit: false,
        };
        (app, events)
    }

    pub fn session(&self) -> &ConnectionSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ConnectionSession<S> {
        &mut self.session
    }

    pub fn popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_log(&self) -> bool {
        self.show_log
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Hand the stored config to the session as a "config applied" event.
    pub fn apply_current(&mut self) {
        if let Err(e) = self.store.current_config().validate() {
            self.popup = Some(e);
            return;
        }

        match self.session.apply_config(&self.store) {
            None => self.status = "Settings unchanged, connection kept".to_string(),
            Some(Ok(())) => self.status.clear(),
            Some(Err(TransportError::NoPortName)) => {
                self.status = format!(
                    "No port name specified: set one in {} and press r",
                    self.settings_path.display()
                );
            }
            // Reported through SessionEvent::OpenFailed
            Some(Err(_)) => {}
        }
    }

    /// Re-read the settings file and apply it.
    pub fn reload_and_apply(&mut self) {
        let settings = match load_settings(&self.settings_path) {
            Ok(s) => s,
            Err(e) => {
                tlog!("[tui] {}", e);
                self.popup = Some(e);
                return;
            }
        };

        self.session.set_reset_counter_on_connect(settings.reset_counter_on_connect);
        self.store.apply(settings.connection);
        self.apply_current();
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            // The counter pane reads session.counter() on the next frame
            SessionEvent::CounterChanged { .. } | SessionEvent::CounterReset => {}
            SessionEvent::OpenFailed(message) => {
                self.popup = Some(with_port_hint(message, available_ports()));
            }
            SessionEvent::StateChanged(state) => {
                tlog!("[tui] Session state: {:?}", state);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.popup.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                self.popup = None;
            }
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.reload_and_apply(),
            KeyCode::Char('d') => {
                self.session.close();
                self.status = "Disconnected by user".to_string();
            }
            KeyCode::Char('c') => self.session.reset_counter(),
            KeyCode::Char('l') => lock_log(&self.log).clear(),
            KeyCode::Char('t') => {
                let mut log = lock_log(&self.log);
                let enabled = !log.timestamp_enabled();
                log.set_timestamp_enabled(enabled);
            }
            KeyCode::Char('h') => self.show_log = !self.show_log,
            _ => {}
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn draw(&self, frame: &mut Frame) {
        let log_constraint = if self.show_log { Constraint::Min(3) } else { Constraint::Min(0) };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), log_constraint, Constraint::Length(1)])
            .split(frame.area());

        self.draw_counter(frame, rows[0]);
        if self.show_log {
            self.draw_log(frame, rows[1]);
        }
        frame.render_widget(Paragraph::new(self.status_line()), rows[2]);

        if let Some(message) = &self.popup {
            let area = centered(frame.area(), 60, 7);
            frame.render_widget(Clear, area);
            let popup = Paragraph::new(message.as_str())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Error (Esc to dismiss)")
                        .style(Style::default().fg(Color::Red)),
                );
            frame.render_widget(popup, area);
        }
    }

    fn draw_counter(&self, frame: &mut Frame, area: Rect) {
        let counter = self.session.counter();
        let delta_color = match counter.last_delta() {
            d if d > 0 => Color::Green,
            d if d < 0 => Color::Red,
            _ => Color::Gray,
        };
        let lines = vec![
            Line::from(vec![
                Span::raw("Value: "),
                Span::styled(counter.value_text(), Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(vec![
                Span::raw("Delta: "),
                Span::styled(counter.delta_text(), Style::default().fg(delta_color)),
            ]),
        ];
        let block = Block::default().borders(Borders::ALL).title("Counter");
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_log(&self, frame: &mut Frame, area: Rect) {
        let height = area.height.saturating_sub(2) as usize;
        let log = lock_log(&self.log);
        let lines: Vec<Line> = log
            .visible(height)
            .iter()
            .map(|entry| Line::from(entry.render()))
            .collect();
        let title = if log.timestamp_enabled() { "Log (timestamps)" } else { "Log" };
        let block = Block::default().borders(Borders::ALL).title(title);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn status_line(&self) -> String {
        let state = match self.session.state() {
            SessionState::Closed => "Closed",
            SessionState::Opening => "Opening",
            SessionState::Open => "Open",
        };
        let stats = self.session.stats();
        let mut line = format!(
            "{} | {} | bytes {} lines {} invalid {}",
            state,
            self.store.current_config().summary(),
            stats.bytes_received,
            stats.lines_received,
            stats.invalid_lines
        );
        if !self.status.is_empty() {
            line.push_str(" | ");
            line.push_str(&self.status);
        }
        line.push_str(" | ");
        line.push_str(KEY_HINTS);
        line
    }
}

/// Names of the serial ports currently present
fn available_ports() -> Vec<String> {
    match list_serial_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            tlog!("[tui] {}", e);
            Vec::new()
        }
    }
}

fn with_port_hint(message: String, ports: Vec<String>) -> String {
    if ports.is_empty() {
        format!("{}\n\nNo serial ports found.", message)
    } else {
        format!("{}\n\nAvailable ports: {}", message, ports.join(", "))
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Run the terminal UI over a serial source until the user quits.
pub async fn run(settings: AppSettings, settings_path: PathBuf) -> Result<(), String> {
    let (source_tx, mut source_rx) = mpsc::unbounded_channel();
    let (mut app, mut events_rx) = App::new(SerialSource::new(), settings, settings_path, source_tx);

    let mut terminal =
        ratatui::try_init().map_err(|e| format!("Failed to initialise terminal: {}", e))?;
    logging::set_stderr_echo(false);
    tlog!("[tui] Started");

    if !app.store.current_config().port_name.is_empty() {
        app.apply_current();
    } else {
        app.status = format!(
            "No port configured: set one in {} and press r",
            app.settings_path.display()
        );
    }

    let mut term_events = EventStream::new();
    let result = loop {
        while let Ok(event) = events_rx.try_recv() {
            app.on_session_event(event);
        }
        if let Err(e) = terminal.draw(|frame| app.draw(frame)) {
            break Err(format!("Failed to draw: {}", e));
        }
        if app.should_quit() {
            break Ok(());
        }

        tokio::select! {
            Some(event) = source_rx.recv() => app.session_mut().handle_source_event(event),
            Some(event) = events_rx.recv() => app.on_session_event(event),
            maybe = term_events.next() => match maybe {
                Some(Ok(Event::Key(key))) => app.handle_key(key),
                // Resize and the rest only need a redraw
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(format!("Terminal event error: {}", e)),
                None => break Ok(()),
            },
        }
    };

    app.session_mut().close();
    ratatui::restore();
    logging::set_stderr_echo(true);
    tlog!("[tui] Stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ConnectionConfig;
    use crate::test_support::ScriptedSource;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn app_with_port(port: &str) -> (App<ScriptedSource>, mpsc::UnboundedReceiver<SourceEvent>) {
        let mut settings = AppSettings::default();
        settings.connection = ConnectionConfig {
            port_name: port.to_string(),
            ..ConnectionConfig::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let (app, _events) = App::new(
            ScriptedSource::default(),
            settings,
            PathBuf::from("/nonexistent/settings.json"),
            tx,
        );
        (app, rx)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen(app: &App<ScriptedSource>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal.backend().buffer().content().iter().map(|c| c.symbol()).collect()
    }

    fn deliver(app: &mut App<ScriptedSource>, rx: &mut mpsc::UnboundedReceiver<SourceEvent>, bytes: &[u8]) {
        app.session_mut().source_mut().push(bytes);
        while let Ok(event) = rx.try_recv() {
            app.session_mut().handle_source_event(event);
        }
    }

    #[test]
    fn test_counter_pane_shows_session_counter() {
        let (mut app, mut rx) = app_with_port("COM3");
        let text = screen(&app);
        assert!(text.contains("Value: 0"));
        assert!(text.contains("Delta: +0"));

        app.apply_current();
        deliver(&mut app, &mut rx, b"50\n42\n");
        let text = screen(&app);
        assert!(text.contains("Value: 42"));
        assert!(text.contains("Delta: -8"));

        app.handle_key(press(KeyCode::Char('c')));
        let text = screen(&app);
        assert!(text.contains("Value: 0"));
        assert!(text.contains("Delta: +0"));
    }

    #[test]
    fn test_received_lines_reach_the_log_pane() {
        let (mut app, mut rx) = app_with_port("COM3");
        app.apply_current();
        assert!(app.session().is_open());

        deliver(&mut app, &mut rx, b"17\nabc\n");

        let text = screen(&app);
        assert!(text.contains("Connected to COM3"));
        assert!(text.contains("Invalid data received"));
        assert!(text.contains("Open | COM3 @ 115200 8N1 | bytes 7 lines 2 invalid 1"));
    }

    #[test]
    fn test_open_failure_shows_popup_until_dismissed() {
        let (mut app, _rx) = app_with_port("/dev/ttyUSB9");
        app.on_session_event(SessionEvent::OpenFailed("Failed to open /dev/ttyUSB9: No such file".into()));
        assert!(app.popup().unwrap().starts_with("Failed to open /dev/ttyUSB9"));
        assert!(screen(&app).contains("Error (Esc to dismiss)"));

        // Swallowed while the popup is up
        app.handle_key(press(KeyCode::Char('h')));
        assert!(app.show_log());
        assert!(!app.should_quit());

        app.handle_key(press(KeyCode::Esc));
        assert!(app.popup().is_none());
        assert!(!app.should_quit());
    }

    #[test]
    fn test_keys() {
        let (mut app, _rx) = app_with_port("COM3");
        app.apply_current();

        app.handle_key(press(KeyCode::Char('t')));
        assert!(lock_log(&app.log).timestamp_enabled());

        app.handle_key(press(KeyCode::Char('h')));
        assert!(!app.show_log());
        assert!(!screen(&app).contains("Connected to COM3"));

        app.handle_key(press(KeyCode::Char('l')));
        assert!(lock_log(&app.log).is_empty());

        app.handle_key(press(KeyCode::Char('d')));
        assert_eq!(app.session().state(), SessionState::Closed);
        assert_eq!(app.status(), "Disconnected by user");

        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit());
    }

    #[test]
    fn test_release_events_are_ignored() {
        let (mut app, _rx) = app_with_port("COM3");
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        app.handle_key(key);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_reapply_with_same_settings_keeps_connection() {
        let (mut app, _rx) = app_with_port("COM3");
        app.apply_current();
        app.apply_current();
        assert_eq!(app.session().source().opens, 1);
        assert_eq!(app.status(), "Settings unchanged, connection kept");
    }

    #[test]
    fn test_empty_port_name_sets_status() {
        let (mut app, _rx) = app_with_port("");
        app.apply_current();
        assert!(app.status().starts_with("No port name specified"));
        assert!(app.popup().is_none());
    }

    #[test]
    fn test_port_hint() {
        assert_eq!(
            with_port_hint("boom".into(), vec!["COM1".into(), "COM2".into()]),
            "boom\n\nAvailable ports: COM1, COM2"
        );
        assert!(with_port_hint("boom".into(), Vec::new()).ends_with("No serial ports found."));
    }

    #[test]
    fn test_centered_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 5);
        let r = centered(area, 60, 7);
        assert_eq!(r, Rect::new(0, 0, 40, 5));
        let r = centered(Rect::new(0, 0, 100, 20), 60, 7);
        assert_eq!(r, Rect::new(20, 6, 60, 7));
    }
}
