// src/io/types.rs
//
// Messages passed from a byte source to the task that owns the session.

use tokio::sync::mpsc;

use super::TransportError;

// ============================================================================
// Source Messages
// ============================================================================

/// What a byte source reports
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEventKind {
    /// New bytes can be taken with `read_available()`
    DataAvailable,
    /// The transport failed while open; always `TransportError::Fault`
    Fault(TransportError),
}

/// Notification from a byte source, tagged with the open it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct SourceEvent {
    /// Generation of the `open` that produced this event
    pub generation: u64,
    pub kind: SourceEventKind,
}

/// Handed to a byte source on open; posts readiness and fault notifications
#[derive(Clone, Debug)]
pub struct SourceNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl SourceNotifier {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the receiving side is gone
    pub fn data_available(&self) -> bool {
        self.send(SourceEventKind::DataAvailable)
    }

    pub fn fault(&self, reason: impl Into<String>) -> bool {
        self.send(SourceEventKind::Fault(TransportError::Fault(reason.into())))
    }

    fn send(&self, kind: SourceEventKind) -> bool {
        self.tx
            .send(SourceEvent {
                generation: self.generation,
                kind,
            })
            .is_ok()
    }
}
