//! Session facade: a device handle holding the password, cached system
//! parameters, and transport.

use log::debug;

use crate::command::{self, CharBuffer, Opcode, Request, Response, SearchResult, SystemParameters};
use crate::error::{FingerprintError, ProtocolError};
use crate::exchange::{self, CancellationToken};
use crate::packet::PacketKind;
use crate::status::{self, DeviceError};
use crate::transport::Transport;

#[cfg(feature = "serial")]
use crate::transport::{SerialConfig, SerialTransport};
#[cfg(feature = "usb")]
use crate::transport::{UsbBulkTransport, UsbConfig};

/// Device handle. Owns its transport exclusively for the session's
/// lifetime; `close` (via `Drop`) releases it on every exit path.
pub struct Session<T: Transport> {
    transport: T,
    password: u32,
    system_parameters: SystemParameters,
    debug: bool,
    cancel: CancellationToken,
}

impl<T: Transport> Session<T> {
    /// Acquires system parameters over an already-open transport and caches
    /// them. Failure in either step closes the transport and returns an
    /// error; here that simply means dropping `transport` before
    /// returning, since ownership was never handed to a `Session`.
    pub fn open(mut transport: T, password: u32) -> Result<Self, FingerprintError> {
        let cancel = CancellationToken::new();
        let system_parameters =
            match Self::fetch_system_parameters(&mut transport, &cancel) {
                Ok(params) => params,
                Err(e) => return Err(e),
            };

        Ok(Session {
            transport,
            password,
            system_parameters,
            debug: false,
            cancel,
        })
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn system_parameters(&self) -> &SystemParameters {
        &self.system_parameters
    }

    pub fn storage_capacity(&self) -> u16 {
        self.system_parameters.storage_capacity
    }

    fn fetch_system_parameters(
        transport: &mut T,
        cancel: &CancellationToken,
    ) -> Result<SystemParameters, FingerprintError> {
        let req = Request::GetSystemParameters;
        let (code, remainder) = Self::raw_command(transport, &req, cancel)?;
        status::classify(code).map_err(FingerprintError::from)?;
        match command::decode(Opcode::GetSystemParameters, &remainder)? {
            Response::SystemParameters(params) => Ok(params),
            _ => Err(FingerprintError::Protocol(ProtocolError::ShortPayload)),
        }
    }

    /// Exchanges one command and returns the confirmation code plus the
    /// Ack payload with that byte stripped off, without classifying the
    /// status — callers decide what `Device` variants mean for them.
    fn raw_command(
        transport: &mut T,
        req: &Request,
        cancel: &CancellationToken,
    ) -> Result<(u8, Vec<u8>), FingerprintError> {
        let payload = req.encode();
        debug!("issuing opcode {:?}", req.opcode());
        let packet = exchange::exchange(transport, PacketKind::Command, &payload, cancel)?;

        if packet.kind != PacketKind::Ack as u8 {
            return Err(FingerprintError::Protocol(ProtocolError::UnexpectedPacketKind(
                packet.kind,
            )));
        }
        if packet.payload.is_empty() {
            return Err(FingerprintError::Protocol(ProtocolError::ShortPayload));
        }

        let code = packet.payload[0];
        debug!("confirmation code 0x{:02X}", code);
        Ok((code, packet.payload[1..].to_vec()))
    }

    fn command(&mut self, req: Request) -> Result<(u8, Vec<u8>), FingerprintError> {
        let result = Self::raw_command(&mut self.transport, &req, &self.cancel);
        if self.debug {
            debug!("{:?} -> {:?}", req, result.as_ref().map(|(c, p)| (*c, p.len())));
        }
        result
    }

    /// Runs `req`, classifies the confirmation code as an error unless it's
    /// `Ok`, and decodes the Ack payload on success.
    fn command_ok(&mut self, req: Request) -> Result<Response, FingerprintError> {
        let opcode = req.opcode();
        let (code, remainder) = self.command(req)?;
        status::classify(code)?;
        Ok(command::decode(opcode, &remainder)?)
    }

    pub fn verify_password(&mut self) -> Result<bool, FingerprintError> {
        let (code, _) = self.command(Request::VerifyPassword(self.password))?;
        match status::classify(code) {
            Ok(()) => Ok(true),
            Err(DeviceError::WrongPassword) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    pub fn set_password(&mut self, new_password: u32) -> Result<bool, FingerprintError> {
        let (code, _) = self.command(Request::SetPassword(new_password))?;
        match status::classify(code) {
            Ok(()) => {
                self.password = new_password;
                Ok(true)
            }
            Err(DeviceError::WrongPassword) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    pub fn set_address(&mut self, new_address: u32) -> Result<(), FingerprintError> {
        self.command_ok(Request::SetAddress(new_address))?;
        Ok(())
    }

    pub fn get_system_parameters(&mut self) -> Result<SystemParameters, FingerprintError> {
        match self.command_ok(Request::GetSystemParameters)? {
            Response::SystemParameters(p) => {
                self.system_parameters = p;
                Ok(p)
            }
            _ => Err(ProtocolError::ShortPayload.into()),
        }
    }

    /// Issues `ReadImage` once. `NoFinger` is a signalling outcome, not an
    /// error — callers that want "wait for a finger" (`search`/`enroll`)
    /// loop on `CaptureOutcome::NoFinger` themselves.
    pub fn read_image(&mut self) -> Result<CaptureOutcome, FingerprintError> {
        let (code, _) = self.command(Request::ReadImage)?;
        match status::classify(code) {
            Ok(()) => Ok(CaptureOutcome::FingerPresent),
            Err(DeviceError::NoFinger) => Ok(CaptureOutcome::NoFinger),
            Err(other) => Err(other.into()),
        }
    }

    pub fn convert_image(&mut self, char_buffer: CharBuffer) -> Result<(), FingerprintError> {
        self.command_ok(Request::ConvertImage(char_buffer))?;
        Ok(())
    }

    pub fn create_template(&mut self) -> Result<(), FingerprintError> {
        self.command_ok(Request::CreateTemplate)?;
        Ok(())
    }

    pub fn store_template(&mut self, char_buffer: CharBuffer, position: u16) -> Result<(), FingerprintError> {
        command::validate_position(position, self.storage_capacity())?;
        self.command_ok(Request::StoreTemplate { char_buffer, position })?;
        Ok(())
    }

    pub fn load_template(&mut self, char_buffer: CharBuffer, position: u16) -> Result<(), FingerprintError> {
        command::validate_position(position, self.storage_capacity())?;
        self.command_ok(Request::LoadTemplate { char_buffer, position })?;
        Ok(())
    }

    pub fn delete_template(&mut self, position: u16, count: u16) -> Result<(), FingerprintError> {
        command::validate_position(position, self.storage_capacity())?;
        command::validate_count(count)?;
        self.command_ok(Request::DeleteTemplate { position, count })?;
        Ok(())
    }

    pub fn clear_database(&mut self) -> Result<(), FingerprintError> {
        self.command_ok(Request::ClearDatabase)?;
        Ok(())
    }

    pub fn template_count(&mut self) -> Result<u16, FingerprintError> {
        match self.command_ok(Request::TemplateCount)? {
            Response::TemplateCount(n) => Ok(n),
            _ => Err(ProtocolError::ShortPayload.into()),
        }
    }

    pub fn template_index(&mut self, page: u8) -> Result<[u8; 32], FingerprintError> {
        match self.command_ok(Request::TemplateIndex { page })? {
            Response::TemplateIndex(bitmap) => Ok(bitmap),
            _ => Err(ProtocolError::ShortPayload.into()),
        }
    }

    /// `count <= 0` (here, `0`) means "search to capacity".
    pub fn search_template(
        &mut self,
        char_buffer: CharBuffer,
        start: u16,
        count: u16,
    ) -> Result<SearchOutcome, FingerprintError> {
        let count = if count == 0 { self.storage_capacity() } else { count };
        let (code, remainder) = self.command(Request::SearchTemplate { char_buffer, start, count })?;
        match status::classify(code) {
            Ok(()) => match command::decode(Opcode::SearchTemplate, &remainder)? {
                Response::SearchResult(SearchResult { position, accuracy }) => {
                    Ok(SearchOutcome::Match { position, accuracy })
                }
                _ => Err(ProtocolError::ShortPayload.into()),
            },
            Err(DeviceError::NoTemplateFound) => Ok(SearchOutcome::NoMatch),
            Err(other) => Err(other.into()),
        }
    }

    pub fn compare_characteristics(&mut self) -> Result<u16, FingerprintError> {
        match self.command_ok(Request::CompareCharacteristics)? {
            Response::CompareAccuracy(acc) => Ok(acc),
            _ => Err(ProtocolError::ShortPayload.into()),
        }
    }

    pub fn generate_random_number(&mut self) -> Result<[u8; 4], FingerprintError> {
        match self.command_ok(Request::GenerateRandomNumber)? {
            Response::RandomNumber(bytes) => Ok(bytes),
            _ => Err(ProtocolError::ShortPayload.into()),
        }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

/// Outcome of a search procedure: either a match with its accuracy, or
/// "no template found", treated as a signalling outcome for
/// search/enroll rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Match { position: u16, accuracy: u16 },
    NoMatch,
}

/// Outcome of a single `ReadImage` attempt. `NoFinger` is signalling, not
/// an error; see `read_image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    FingerPresent,
    NoFinger,
}

#[cfg(feature = "serial")]
pub fn open_serial(config: &SerialConfig, password: u32) -> Result<Session<SerialTransport>, FingerprintError> {
    let transport = SerialTransport::open(config)?;
    Session::open(transport, password)
}

#[cfg(feature = "usb")]
pub fn open_usb(config: &UsbConfig, password: u32) -> Result<Session<UsbBulkTransport>, FingerprintError> {
    let transport = UsbBulkTransport::open(config)?;
    Session::open(transport, password)
}
