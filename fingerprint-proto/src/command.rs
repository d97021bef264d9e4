//! Typed command catalogue: pure encoders for request payloads and
//! decoders for response payloads.

use core::convert::TryFrom;
use scroll::{Pread, BE};

use crate::error::{ArgumentError, ProtocolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharBuffer {
    One = 1,
    Two = 2,
}

impl TryFrom<u8> for CharBuffer {
    type Error = ArgumentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CharBuffer::One),
            2 => Ok(CharBuffer::Two),
            other => Err(ArgumentError::InvalidCharBuffer(other)),
        }
    }
}

pub fn validate_position(position: u16, capacity: u16) -> Result<u16, ArgumentError> {
    if position < capacity {
        Ok(position)
    } else {
        Err(ArgumentError::InvalidPosition(position))
    }
}

pub fn validate_count(count: u16) -> Result<u16, ArgumentError> {
    if count >= 1 {
        Ok(count)
    } else {
        Err(ArgumentError::InvalidCount(count))
    }
}

/// Command opcodes understood by the device. `DownloadImage` uses the
/// canonical `0x0A`, not the `ReadImage` alias some firmware revisions
/// reused for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    ReadImage = 0x01,
    ConvertImage = 0x02,
    CompareCharacteristics = 0x03,
    SearchTemplate = 0x04,
    CreateTemplate = 0x05,
    StoreTemplate = 0x06,
    LoadTemplate = 0x07,
    DownloadCharacteristics = 0x08,
    DownloadImage = 0x0A,
    DeleteTemplate = 0x0C,
    ClearDatabase = 0x0D,
    GetSystemParameters = 0x0F,
    SetPassword = 0x12,
    VerifyPassword = 0x13,
    GenerateRandomNumber = 0x14,
    SetAddress = 0x15,
    TemplateCount = 0x1D,
    TemplateIndex = 0x1F,
}

/// A fully-validated, ready-to-encode command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    VerifyPassword(u32),
    SetPassword(u32),
    SetAddress(u32),
    GetSystemParameters,
    ReadImage,
    DownloadImage,
    ConvertImage(CharBuffer),
    CreateTemplate,
    StoreTemplate { char_buffer: CharBuffer, position: u16 },
    LoadTemplate { char_buffer: CharBuffer, position: u16 },
    DeleteTemplate { position: u16, count: u16 },
    ClearDatabase,
    TemplateCount,
    TemplateIndex { page: u8 },
    SearchTemplate { char_buffer: CharBuffer, start: u16, count: u16 },
    CompareCharacteristics,
    DownloadCharacteristics(CharBuffer),
    GenerateRandomNumber,
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Request::VerifyPassword(_) => Opcode::VerifyPassword,
            Request::SetPassword(_) => Opcode::SetPassword,
            Request::SetAddress(_) => Opcode::SetAddress,
            Request::GetSystemParameters => Opcode::GetSystemParameters,
            Request::ReadImage => Opcode::ReadImage,
            Request::DownloadImage => Opcode::DownloadImage,
            Request::ConvertImage(_) => Opcode::ConvertImage,
            Request::CreateTemplate => Opcode::CreateTemplate,
            Request::StoreTemplate { .. } => Opcode::StoreTemplate,
            Request::LoadTemplate { .. } => Opcode::LoadTemplate,
            Request::DeleteTemplate { .. } => Opcode::DeleteTemplate,
            Request::ClearDatabase => Opcode::ClearDatabase,
            Request::TemplateCount => Opcode::TemplateCount,
            Request::TemplateIndex { .. } => Opcode::TemplateIndex,
            Request::SearchTemplate { .. } => Opcode::SearchTemplate,
            Request::CompareCharacteristics => Opcode::CompareCharacteristics,
            Request::DownloadCharacteristics(_) => Opcode::DownloadCharacteristics,
            Request::GenerateRandomNumber => Opcode::GenerateRandomNumber,
        }
    }

    /// Builds the command payload (opcode byte followed by big-endian
    /// arguments). Pure: no I/O, no errors — argument shapes were already
    /// validated when the `Request` was constructed.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.opcode() as u8];
        match self {
            Request::VerifyPassword(password)
            | Request::SetPassword(password)
            | Request::SetAddress(password) => {
                out.extend_from_slice(&password.to_be_bytes());
            }
            Request::ConvertImage(buf) | Request::DownloadCharacteristics(buf) => {
                out.push(*buf as u8);
            }
            Request::StoreTemplate { char_buffer, position } | Request::LoadTemplate { char_buffer, position } => {
                out.push(*char_buffer as u8);
                out.extend_from_slice(&position.to_be_bytes());
            }
            Request::DeleteTemplate { position, count } => {
                out.extend_from_slice(&position.to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
            }
            Request::TemplateIndex { page } => {
                out.push(*page);
            }
            Request::SearchTemplate { char_buffer, start, count } => {
                out.push(*char_buffer as u8);
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
            }
            Request::GetSystemParameters
            | Request::ReadImage
            | Request::DownloadImage
            | Request::CreateTemplate
            | Request::ClearDatabase
            | Request::TemplateCount
            | Request::CompareCharacteristics
            | Request::GenerateRandomNumber => {}
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    pub status_register: u16,
    pub system_id: u16,
    pub storage_capacity: u16,
    pub security_level: u16,
    pub device_address: u32,
    pub packet_size_code: u16,
    pub baud_code: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub position: u16,
    pub accuracy: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    None,
    SystemParameters(SystemParameters),
    TemplateCount(u16),
    TemplateIndex([u8; 32]),
    SearchResult(SearchResult),
    CompareAccuracy(u16),
    RandomNumber([u8; 4]),
}

/// Decodes the Ack payload minus its confirmation byte (`payload[1..]`)
/// according to the shape the issued opcode expects. A remainder shorter
/// than the opcode's expected shape fails with `ShortPayload`.
pub fn decode(opcode: Opcode, remainder: &[u8]) -> Result<Response, ProtocolError> {
    let short = || ProtocolError::ShortPayload;
    match opcode {
        Opcode::GetSystemParameters => {
            if remainder.len() < 16 {
                return Err(short());
            }
            let mut off = 0;
            let status_register = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            let system_id = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            let storage_capacity = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            let security_level = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            let device_address = remainder.gread_with::<u32>(&mut off, BE).map_err(|_| short())?;
            let packet_size_code = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            let baud_code = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            Ok(Response::SystemParameters(SystemParameters {
                status_register,
                system_id,
                storage_capacity,
                security_level,
                device_address,
                packet_size_code,
                baud_code,
            }))
        }
        Opcode::TemplateCount => {
            if remainder.len() < 2 {
                return Err(short());
            }
            let count = remainder.pread_with::<u16>(0, BE).map_err(|_| short())?;
            Ok(Response::TemplateCount(count))
        }
        Opcode::TemplateIndex => {
            if remainder.len() < 32 {
                return Err(short());
            }
            let mut page = [0u8; 32];
            page.copy_from_slice(&remainder[..32]);
            Ok(Response::TemplateIndex(page))
        }
        Opcode::SearchTemplate => {
            if remainder.len() < 4 {
                return Err(short());
            }
            let mut off = 0;
            let position = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            let accuracy = remainder.gread_with::<u16>(&mut off, BE).map_err(|_| short())?;
            Ok(Response::SearchResult(SearchResult { position, accuracy }))
        }
        Opcode::CompareCharacteristics => {
            if remainder.len() < 2 {
                return Err(short());
            }
            let accuracy = remainder.pread_with::<u16>(0, BE).map_err(|_| short())?;
            Ok(Response::CompareAccuracy(accuracy))
        }
        Opcode::GenerateRandomNumber => {
            if remainder.len() < 4 {
                return Err(short());
            }
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&remainder[..4]);
            Ok(Response::RandomNumber(bytes))
        }
        _ => Ok(Response::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p4_invalid_char_buffer_rejected() {
        assert_eq!(CharBuffer::try_from(0), Err(ArgumentError::InvalidCharBuffer(0)));
        assert_eq!(CharBuffer::try_from(3), Err(ArgumentError::InvalidCharBuffer(3)));
        assert!(CharBuffer::try_from(1).is_ok());
        assert!(CharBuffer::try_from(2).is_ok());
    }

    #[test]
    fn p4_invalid_position_rejected() {
        assert_eq!(validate_position(1000, 1000), Err(ArgumentError::InvalidPosition(1000)));
        assert!(validate_position(999, 1000).is_ok());
    }

    #[test]
    fn p4_invalid_count_rejected() {
        assert_eq!(validate_count(0), Err(ArgumentError::InvalidCount(0)));
        assert!(validate_count(1).is_ok());
    }

    #[test]
    fn s4_search_template_payload_ends_with_start_and_count() {
        let req = Request::SearchTemplate {
            char_buffer: CharBuffer::One,
            start: 0,
            count: 1000,
        };
        let bytes = req.encode();
        assert_eq!(&bytes[bytes.len() - 4..], &[0x00, 0x00, 0x03, 0xE8]);
    }

    #[test]
    fn s3_system_parameters_decode() {
        let payload = [
            0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x20, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
            0x20, 0x00, 0x06,
        ];
        // payload[0] is the confirmation byte; decode() receives the remainder.
        let resp = decode(Opcode::GetSystemParameters, &payload[1..]).unwrap();
        assert_eq!(
            resp,
            Response::SystemParameters(SystemParameters {
                status_register: 0,
                system_id: 0x0003,
                storage_capacity: 0x0020,
                security_level: 0x0003,
                device_address: 0xFFFF_FFFF,
                packet_size_code: 0x0020,
                baud_code: 0x0006,
            })
        );
    }

    #[test]
    fn short_payload_errors() {
        assert_eq!(decode(Opcode::TemplateCount, &[0x01]), Err(ProtocolError::ShortPayload));
    }
}
