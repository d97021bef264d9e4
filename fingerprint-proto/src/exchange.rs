//! Request/response engine: send one packet, reassemble the response,
//! verify it, return it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;

use crate::error::{FingerprintError, ProtocolError, TransportError};
use crate::packet::{self, Packet, PacketKind, ParseOutcome};
use crate::transport::Transport;

/// Cheap, cloneable cancellation flag. The reassembly loop observes a
/// caller-provided cancellation signal between reads, so a long-running
/// exchange can be aborted from another thread.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

const READ_CHUNK: usize = 1024;

/// Sends `payload` framed as `kind`, then blocks until a full packet is
/// reassembled from the transport, a protocol error is detected, or
/// `cancel` is set between reads.
pub fn exchange<T: Transport>(
    transport: &mut T,
    kind: PacketKind,
    payload: &[u8],
    cancel: &CancellationToken,
) -> Result<Packet, FingerprintError> {
    let bytes = packet::encode(kind, payload);

    let written = transport
        .write(&bytes)
        .map_err(FingerprintError::Transport)?;
    if written < bytes.len() {
        return Err(FingerprintError::Transport(TransportError::WriteFailed(
            format!("wrote {} of {} bytes", written, bytes.len()),
        )));
    }

    let mut buffer = Vec::new();
    loop {
        if cancel.is_cancelled() {
            return Err(FingerprintError::Cancelled);
        }

        let chunk = transport
            .read_some(READ_CHUNK)
            .map_err(FingerprintError::Transport)?;
        buffer.extend_from_slice(&chunk);
        trace!("read {} bytes, buffer now {} bytes", chunk.len(), buffer.len());

        match packet::parse(&buffer) {
            Ok(ParseOutcome::Need(_)) => continue,
            Ok(ParseOutcome::Complete { packet, .. }) => return Ok(packet),
            Err(ProtocolError::Malformed) => {
                return Err(FingerprintError::Protocol(ProtocolError::Malformed))
            }
            Err(ProtocolError::ChecksumMismatch) => {
                return Err(FingerprintError::Protocol(ProtocolError::ChecksumMismatch))
            }
            Err(other) => return Err(FingerprintError::Protocol(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;

    /// A transport backed by a fixed response, delivered in caller-chosen
    /// chunk sizes, so Property P3 (streaming reassembly) can be exercised
    /// through the real exchange loop rather than `parse` directly.
    struct ScriptedTransport {
        response: Vec<u8>,
        chunk_sizes: Vec<usize>,
        offset: usize,
        written: Vec<u8>,
    }

    impl Transport for ScriptedTransport {
        fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
            self.written.extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn read_some(&mut self, _max: usize) -> Result<Vec<u8>, TransportError> {
            if self.offset >= self.response.len() {
                return Err(TransportError::EndOfStream);
            }
            let size = self.chunk_sizes.remove(0);
            let end = (self.offset + size).min(self.response.len());
            let chunk = self.response[self.offset..end].to_vec();
            self.offset = end;
            Ok(chunk)
        }
    }

    #[test]
    fn s6_reassembly_across_uneven_chunks() {
        let ack_payload: Vec<u8> = std::iter::once(0x00u8).chain(std::iter::repeat(0xAB).take(16)).collect();
        let response = packet::encode(PacketKind::Ack, &ack_payload);
        assert_eq!(response.len(), 21);

        let mut transport = ScriptedTransport {
            response,
            chunk_sizes: vec![5, 3, 7, 6],
            offset: 0,
            written: Vec::new(),
        };

        let cancel = CancellationToken::new();
        let packet = exchange(&mut transport, PacketKind::Command, &[0x0F], &cancel).unwrap();
        assert_eq!(packet.payload, ack_payload);
    }

    #[test]
    fn cancellation_is_observed_between_reads() {
        struct NeverEndingTransport;
        impl Transport for NeverEndingTransport {
            fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
                Ok(bytes.len())
            }
            fn read_some(&mut self, _max: usize) -> Result<Vec<u8>, TransportError> {
                Ok(vec![0xEF])
            }
        }

        let mut transport = NeverEndingTransport;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = exchange(&mut transport, PacketKind::Command, &[0x01], &cancel);
        assert!(matches!(result, Err(FingerprintError::Cancelled)));
    }
}
