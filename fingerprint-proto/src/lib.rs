//! Host-side protocol engine for the ZhianTec / Synochip R307-class
//! optical fingerprint scanner family.
//!
//! This crate implements only the protocol engine: packet framing and
//! checksumming, the transport-agnostic request/response exchange loop,
//! the typed command catalogue, device status classification, and the
//! derived enrollment/search procedures. Interactive menus, device
//! open/close bookkeeping beyond what a transport needs, and JSON
//! rendering are the caller's concern — see the `fingerprint-cli` crate
//! in this workspace for an example host application.

pub mod command;
pub mod error;
pub mod exchange;
pub mod packet;
pub mod procedures;
pub mod session;
pub mod status;
pub mod transport;

pub use command::{CharBuffer, Request, Response, SearchResult, SystemParameters};
pub use error::{ArgumentError, FingerprintError, ProtocolError, TransportError};
pub use exchange::CancellationToken;
pub use packet::{Packet, PacketKind};
pub use procedures::EnrollOutcome;
pub use session::{CaptureOutcome, SearchOutcome, Session};
pub use status::DeviceError;

#[cfg(feature = "serial")]
pub use session::open_serial;
#[cfg(feature = "serial")]
pub use transport::{SerialConfig, SerialTransport};

#[cfg(feature = "usb")]
pub use session::open_usb;
#[cfg(feature = "usb")]
pub use transport::{UsbBulkTransport, UsbConfig};
