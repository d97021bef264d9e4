use std::fmt;

use crate::status::DeviceError;

/// Every failure mode the protocol engine can surface. No local recovery
/// happens anywhere in this crate; every variant is handed back to the
/// caller as-is.
#[derive(Debug)]
pub enum FingerprintError {
    Transport(TransportError),
    Protocol(ProtocolError),
    Device(DeviceError),
    Argument(ArgumentError),
    Cancelled,
}

#[derive(Debug)]
pub enum TransportError {
    WriteFailed(String),
    ReadFailed(String),
    Timeout,
    EndOfStream,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    Malformed,
    ChecksumMismatch,
    ShortPayload,
    UnexpectedPacketKind(u8),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ArgumentError {
    InvalidCharBuffer(u8),
    InvalidPosition(u16),
    InvalidCount(u16),
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintError::Transport(e) => write!(f, "transport error: {}", e),
            FingerprintError::Protocol(e) => write!(f, "protocol error: {}", e),
            FingerprintError::Device(e) => write!(f, "device error: {}", e),
            FingerprintError::Argument(e) => write!(f, "invalid argument: {}", e),
            FingerprintError::Cancelled => write!(f, "exchange cancelled"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::WriteFailed(s) => write!(f, "write failed: {}", s),
            TransportError::ReadFailed(s) => write!(f, "read failed: {}", s),
            TransportError::Timeout => write!(f, "read timed out"),
            TransportError::EndOfStream => write!(f, "transport closed"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed => write!(f, "malformed packet"),
            ProtocolError::ChecksumMismatch => write!(f, "checksum mismatch"),
            ProtocolError::ShortPayload => write!(f, "response payload shorter than expected"),
            ProtocolError::UnexpectedPacketKind(k) => write!(f, "unexpected packet kind 0x{:02X}", k),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::InvalidCharBuffer(b) => write!(f, "char buffer must be 1 or 2, got {}", b),
            ArgumentError::InvalidPosition(p) => write!(f, "position {} out of range", p),
            ArgumentError::InvalidCount(c) => write!(f, "count {} must be >= 1", c),
        }
    }
}

impl std::error::Error for FingerprintError {}

impl From<TransportError> for FingerprintError {
    fn from(e: TransportError) -> Self {
        FingerprintError::Transport(e)
    }
}

impl From<ProtocolError> for FingerprintError {
    fn from(e: ProtocolError) -> Self {
        FingerprintError::Protocol(e)
    }
}

impl From<DeviceError> for FingerprintError {
    fn from(e: DeviceError) -> Self {
        FingerprintError::Device(e)
    }
}

impl From<ArgumentError> for FingerprintError {
    fn from(e: ArgumentError) -> Self {
        FingerprintError::Argument(e)
    }
}

impl From<scroll::Error> for FingerprintError {
    fn from(_err: scroll::Error) -> Self {
        FingerprintError::Protocol(ProtocolError::ShortPayload)
    }
}

#[cfg(feature = "serial")]
impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut) => TransportError::Timeout,
            _ => TransportError::ReadFailed(err.to_string()),
        }
    }
}

#[cfg(feature = "usb")]
impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => TransportError::Timeout,
            other => TransportError::ReadFailed(other.to_string()),
        }
    }
}
