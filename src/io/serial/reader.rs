// src/io/serial/reader.rs
//
// Serial port byte source.
// A dedicated blocking thread moves received bytes into a pending buffer and
// posts a readiness notification; the session drains the buffer on its own task.

use serde::Serialize;
use std::io::Read;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::JoinHandle;
use std::time::Duration;

use super::utils::{
    to_serialport_data_bits, to_serialport_flow_control, to_serialport_parity,
    to_serialport_stop_bits,
};
use crate::io::{ByteSource, SourceNotifier, TransportError};
use crate::settings::ConnectionConfig;

// ============================================================================
// Types and Configuration
// ============================================================================

/// How long a blocking read waits before re-checking the cancel flag.
/// Internal polling only; not a user-visible timeout.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(50);

const READ_CHUNK_SIZE: usize = 256;

/// Information about an available serial port
#[derive(Clone, Debug, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

// ============================================================================
// Serial Source
// ============================================================================

/// Serial port implementing `ByteSource`
pub struct SerialSource {
    port_name: Option<String>,
    cancel_flag: Arc<AtomicBool>,
    /// Bytes read by the thread and not yet taken by the session
    pending: Arc<Mutex<Vec<u8>>>,
    task_handle: Option<JoinHandle<()>>,
}

impl SerialSource {
    pub fn new() -> Self {
        Self {
            port_name: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(Mutex::new(Vec::with_capacity(READ_CHUNK_SIZE))),
            task_handle: None,
        }
    }
}

impl Default for SerialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSource for SerialSource {
    fn open(
        &mut self,
        config: &ConnectionConfig,
        notifier: SourceNotifier,
    ) -> Result<(), TransportError> {
        if self.is_open() {
            self.close();
        }
        if config.port_name.is_empty() {
            return Err(TransportError::NoPortName);
        }

        let mut port = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(to_serialport_data_bits(config.data_bits))
            .stop_bits(to_serialport_stop_bits(config.stop_bits))
            .parity(to_serialport_parity(&config.parity))
            .flow_control(to_serialport_flow_control(&config.flow_control))
            .timeout(READ_POLL_INTERVAL)
            .open()
            .map_err(|e| TransportError::Open {
                port: config.port_name.clone(),
                reason: e.to_string(),
            })?;

        // Many USB-serial bridges only transmit once DTR/RTS are asserted
        if let Err(e) = port.write_data_terminal_ready(true) {
            tlog!("[Serial:{}] Failed to assert DTR: {}", config.port_name, e);
        }
        if let Err(e) = port.write_request_to_send(true) {
            tlog!("[Serial:{}] Failed to assert RTS: {}", config.port_name, e);
        }

        tlog!(
            "[Serial:{}] Opened at {} baud ({}-{}-{}, flow: {:?}) [generation {}]",
            config.port_name,
            config.baud_rate,
            config.data_bits,
            config.parity.letter(),
            config.stop_bits,
            config.flow_control,
            notifier.generation()
        );

        self.cancel_flag = Arc::new(AtomicBool::new(false));
        if let Ok(mut guard) = self.pending.lock() {
            guard.clear();
        }

        let port_name = config.port_name.clone();
        let cancel_flag = self.cancel_flag.clone();
        let pending = self.pending.clone();
        let handle = std::thread::Builder::new()
            .name(format!("serial-reader-{}", notifier.generation()))
            .spawn(move || run_read_loop(port, port_name, cancel_flag, pending, notifier))
            .map_err(|e| TransportError::Open {
                port: config.port_name.clone(),
                reason: format!("Failed to spawn reader thread: {}", e),
            })?;

        self.task_handle = Some(handle);
        self.port_name = Some(config.port_name.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.cancel_flag.store(true, Ordering::Relaxed);

        if let Some(handle) = self.task_handle.take() {
            if handle.join().is_err() {
                tlog!("[Serial] Reader thread panicked");
            }
        }
        if let Ok(mut guard) = self.pending.lock() {
            guard.clear();
        }
        if let Some(name) = self.port_name.take() {
            tlog!("[Serial:{}] Closed", name);
        }
    }

    fn read_available(&mut self) -> Vec<u8> {
        match self.pending.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(e) => {
                tlog!("[Serial] Pending buffer mutex poisoned: {}", e);
                Vec::new()
            }
        }
    }

    fn is_open(&self) -> bool {
        self.task_handle.is_some()
    }

    fn device_type(&self) -> &'static str {
        "serial"
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Blocking read loop. Owns the port; dropping it on exit releases the device.
fn run_read_loop(
    mut port: Box<dyn serialport::SerialPort>,
    port_name: String,
    cancel_flag: Arc<AtomicBool>,
    pending: Arc<Mutex<Vec<u8>>>,
    notifier: SourceNotifier,
) {
    let mut buf = [0u8; READ_CHUNK_SIZE];

    while !cancel_flag.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(n) if n > 0 => {
                // Notify only on the empty -> non-empty edge; the session drains
                // everything present when it handles the notification
                let was_empty = match pending.lock() {
                    Ok(mut guard) => {
                        let was_empty = guard.is_empty();
                        guard.extend_from_slice(&buf[..n]);
                        was_empty
                    }
                    Err(e) => {
                        notifier.fault(format!("Pending buffer mutex poisoned: {}", e));
                        return;
                    }
                };
                if was_empty && !notifier.data_available() {
                    // Nobody is listening any more
                    return;
                }
            }
            Ok(_) => {
                // EOF - port closed/disconnected
                if !cancel_flag.load(Ordering::Relaxed) {
                    notifier.fault("Device disconnected");
                }
                return;
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                // Timeout is expected for serial reads
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                if !cancel_flag.load(Ordering::Relaxed) {
                    tlog!("[Serial:{}] Read error: {}", port_name, e);
                    notifier.fault(format!("Read error: {}", e));
                }
                return;
            }
        }
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// Serial ports present on this machine, in enumeration order.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|p| is_listed(&p.port_name))
        .map(SerialPortInfo::from)
        .collect())
}

/// macOS exposes every device twice; only the `/dev/cu.*` call-out side opens
/// without waiting for carrier detect.
fn is_listed(port_name: &str) -> bool {
    !(cfg!(target_os = "macos") && port_name.starts_with("/dev/tty."))
}

impl From<serialport::SerialPortInfo> for SerialPortInfo {
    fn from(p: serialport::SerialPortInfo) -> Self {
        let mut info = SerialPortInfo {
            port_name: p.port_name,
            port_type: String::new(),
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        };
        info.port_type = match p.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                info.manufacturer = usb.manufacturer;
                info.product = usb.product;
                info.serial_number = usb.serial_number;
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
                "USB"
            }
            serialport::SerialPortType::BluetoothPort => "Bluetooth",
            serialport::SerialPortType::PciPort => "PCI",
            serialport::SerialPortType::Unknown => "Unknown",
        }
        .to_string();
        info
    }
}

impl SerialPortInfo {
    /// One-line description, `N/A` for missing fields
    pub fn describe(&self) -> String {
        const BLANK: &str = "N/A";
        let hex_id = |id: Option<u16>| id.map(|v| format!("{:04x}", v)).unwrap_or_else(|| BLANK.into());
        format!(
            "{} [{}] manufacturer: {}, product: {}, serial: {}, vid: {}, pid: {}",
            self.port_name,
            self.port_type,
            self.manufacturer.as_deref().unwrap_or(BLANK),
            self.product.as_deref().unwrap_or(BLANK),
            self.serial_number.as_deref().unwrap_or(BLANK),
            hex_id(self.vid),
            hex_id(self.pid),
        )
    }
}
