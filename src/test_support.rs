// src/test_support.rs
//
// Shared helpers for unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::io::{ByteSource, SourceNotifier, TransportError};
use crate::settings::ConnectionConfig;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh, not yet created directory under the system temp dir
pub fn temp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!(
        "counterscope-{}-{}-{}-{}",
        tag,
        std::process::id(),
        nanos,
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

/// In-memory byte source driven by the test
#[derive(Default)]
pub struct ScriptedSource {
    pub open: bool,
    pub fail_open: Option<String>,
    pub pending: Vec<u8>,
    pub notifier: Option<SourceNotifier>,
    pub opens: usize,
    pub closes: usize,
}

impl ScriptedSource {
    /// Deliver bytes as the serial thread would: buffer, then notify
    pub fn push(&mut self, bytes: &[u8]) {
        let was_empty = self.pending.is_empty();
        self.pending.extend_from_slice(bytes);
        if was_empty {
            if let Some(n) = &self.notifier {
                n.data_available();
            }
        }
    }

    pub fn fault(&self, reason: &str) {
        if let Some(n) = &self.notifier {
            n.fault(reason);
        }
    }
}

impl ByteSource for ScriptedSource {
    fn open(&mut self, config: &ConnectionConfig, notifier: SourceNotifier) -> Result<(), TransportError> {
        if let Some(reason) = &self.fail_open {
            return Err(TransportError::Open {
                port: config.port_name.clone(),
                reason: reason.clone(),
            });
        }
        self.open = true;
        self.opens += 1;
        self.pending.clear();
        self.notifier = Some(notifier);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.closes += 1;
        }
    }

    fn read_available(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
