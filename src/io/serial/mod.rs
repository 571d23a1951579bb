// src/io/serial/mod.rs
//
// Serial port transport with newline framing.
//
// Features:
// - Line framing of the raw byte stream
// - Event-driven reads on a dedicated blocking thread
// - Port enumeration

pub mod framer;
pub mod reader;
pub(crate) mod utils;

pub use framer::LineFramer;
pub use reader::{list_serial_ports, SerialPortInfo, SerialSource};
pub use utils::{FlowControl, Parity};
