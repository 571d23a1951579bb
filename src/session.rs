// src/session.rs
//
// Connection session: owns the byte source for one open-to-close lifetime and
// drives framing, interpretation, counter tracking and the user log.
//
// State machine: Closed -> Opening -> Open -> Closed, with open failures and
// transport faults returning to Closed.

use tokio::sync::mpsc;

use crate::counter::{CounterState, UpdateResult};
use crate::interpreter::{parse_line, ParsedLine};
use crate::io::serial::LineFramer;
use crate::io::{ByteSource, SourceEvent, SourceEventKind, SourceNotifier, TransportError};
use crate::log_sink::{lock_log, SharedLog};
use crate::settings::{needs_reopen, ConnectionConfig, SettingsStore};

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Open,
}

/// Notifications for the display layer
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// New counter value; `delta` is 0 for the first value after a reset
    CounterChanged { value: u32, delta: i64 },
    CounterReset,
    /// Open failed; the display should show this as a blocking error
    OpenFailed(String),
}

/// Traffic counters for the current connection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes_received: u64,
    pub lines_received: u64,
    pub invalid_lines: u64,
}

pub const MSG_DISCONNECTED: &str = "Disconnected";
pub const MSG_INVALID_DATA: &str = "Invalid data received";

// ============================================================================
// Connection Session
// ============================================================================

pub struct ConnectionSession<S: ByteSource> {
    source: S,
    framer: LineFramer,
    counter: CounterState,
    log: SharedLog,
    state: SessionState,
    /// Incremented on every open; events from older opens are dropped
    generation: u64,
    source_tx: mpsc::UnboundedSender<SourceEvent>,
    events_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    reset_counter_on_connect: bool,
    stats: SessionStats,
}

impl<S: ByteSource> ConnectionSession<S> {
    /// `source_tx` is the sending half of the channel whose receiver the
    /// owning task feeds back into `handle_source_event`.
    pub fn new(source: S, log: SharedLog, source_tx: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self {
            source,
            framer: LineFramer::new(),
            counter: CounterState::new(),
            log,
            state: SessionState::Closed,
            generation: 0,
            source_tx,
            events_tx: None,
            reset_counter_on_connect: false,
            stats: SessionStats::default(),
        }
    }

    /// Register the display subscriber. Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events_tx = Some(tx);
        rx
    }

    pub fn set_reset_counter_on_connect(&mut self, enabled: bool) {
        self.reset_counter_on_connect = enabled;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn counter(&self) -> &CounterState {
        &self.counter
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Open with `config`, closing any current connection first.
    pub fn open(&mut self, config: ConnectionConfig) -> Result<(), TransportError> {
        self.close();

        if config.port_name.is_empty() {
            tlog!("[session] No port name specified");
            return Err(TransportError::NoPortName);
        }

        self.set_state(SessionState::Opening);
        lock_log(&self.log).set_timestamp_enabled(config.timestamp_enabled);

        self.generation += 1;
        let notifier = SourceNotifier::new(self.generation, self.source_tx.clone());
        match self.source.open(&config, notifier) {
            Ok(()) => {
                self.framer.reset();
                self.stats = SessionStats::default();
                if self.reset_counter_on_connect {
                    self.reset_counter();
                }
                lock_log(&self.log).append(format!("Connected to {}", config.port_name));
                tlog!(
                    "[session] Connected to {} via {} (generation {})",
                    config.summary(),
                    self.source.device_type(),
                    self.generation
                );
                self.set_state(SessionState::Open);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                tlog!("[session] Open error: {}", message);
                lock_log(&self.log).append(format!("Open error: {}", message));
                self.emit(SessionEvent::OpenFailed(message));
                self.set_state(SessionState::Closed);
                Err(e)
            }
        }
    }

    /// Release the source. Logs only when a connection was actually open.
    pub fn close(&mut self) {
        self.framer.reset();
        if self.state != SessionState::Open {
            return;
        }

        self.source.close();
        lock_log(&self.log).append(MSG_DISCONNECTED);
        tlog!(
            "[session] Disconnected (bytes: {}, lines: {}, invalid: {})",
            self.stats.bytes_received,
            self.stats.lines_received,
            self.stats.invalid_lines
        );
        self.set_state(SessionState::Closed);
    }

    /// React to a "config applied" event from `store`.
    ///
    /// Reopens with the store's current config when closed, or when the last
    /// apply changed it. Returns `None` when nothing was done.
    pub fn apply_config(&mut self, store: &SettingsStore) -> Option<Result<(), TransportError>> {
        if needs_reopen(self.is_open(), store.changed_on_last_apply()) {
            Some(self.open(store.current_config().clone()))
        } else {
            tlog!("[session] Settings applied but port is open and settings have not changed. Will not reopen.");
            None
        }
    }

    /// Handle one notification from the byte source.
    pub fn handle_source_event(&mut self, event: SourceEvent) {
        if event.generation != self.generation || !self.is_open() {
            // Left over from an earlier open
            return;
        }

        match event.kind {
            SourceEventKind::DataAvailable => {
                let bytes = self.source.read_available();
                self.process_bytes(&bytes);
            }
            SourceEventKind::Fault(err) => {
                tlog!("[session] Transport fault: {}", err);
                lock_log(&self.log).append(format!("Serial error: {}", err));
                self.close();
            }
        }
    }

    /// Frame, log and interpret a batch of received bytes.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.stats.bytes_received += bytes.len() as u64;

        let lines = self.framer.feed(bytes);
        if lines.is_empty() {
            return;
        }

        let mut changes = Vec::new();
        {
            let mut log = lock_log(&self.log);
            for line in lines {
                self.stats.lines_received += 1;
                log.append(String::from_utf8_lossy(&line));

                match parse_line(&line) {
                    ParsedLine::CounterValue(value) => match self.counter.update(value) {
                        UpdateResult::Initial(value) => changes.push((value, 0)),
                        UpdateResult::Changed { value, delta } => changes.push((value, delta)),
                        UpdateResult::Unchanged => {}
                    },
                    ParsedLine::Invalid => {
                        self.stats.invalid_lines += 1;
                        log.append(MSG_INVALID_DATA);
                    }
                }
            }
        }

        for (value, delta) in changes {
            self.emit(SessionEvent::CounterChanged { value, delta });
        }
    }

    /// Clear the counter display back to `0` / `+0`.
    pub fn reset_counter(&mut self) {
        self.counter.reset();
        self.emit(SessionEvent::CounterReset);
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            self.state = state;
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        if let Some(tx) = &self.events_tx {
            if tx.send(event).is_err() {
                // Subscriber went away
                self.events_tx = None;
            }
        }
    }
}

impl<S: ByteSource> Drop for ConnectionSession<S> {
    fn drop(&mut self) {
        if self.is_open() {
            self.source.close();
        }
    }
}
