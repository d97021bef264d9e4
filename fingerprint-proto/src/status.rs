//! Status classification: maps the one-byte confirmation code that begins
//! every Ack payload into the device error taxonomy.

use std::fmt;

/// The confirmation-code taxonomy the device's firmware defines.
/// `NoFinger` and `NoTemplateFound` are signalling outcomes the derived
/// procedures branch on, not failures; they still round-trip through this
/// type because the session layer decides, per call site, whether to
/// treat them as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    Communication,
    NoFinger,
    ImageCaptureFailed,
    MessyImage,
    FewFeaturePoints,
    NotMatching,
    NoTemplateFound,
    CharacteristicsMismatch,
    InvalidPosition,
    DeleteFailed,
    ClearFailed,
    WrongPassword,
    InvalidImage,
    InvalidRegister,
    Unknown(u8),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Communication => write!(f, "packet receive error"),
            DeviceError::NoFinger => write!(f, "no finger on sensor"),
            DeviceError::ImageCaptureFailed => write!(f, "image capture failed"),
            DeviceError::MessyImage => write!(f, "image too messy"),
            DeviceError::FewFeaturePoints => write!(f, "too few feature points"),
            DeviceError::NotMatching => write!(f, "fingerprints do not match"),
            DeviceError::NoTemplateFound => write!(f, "no template found"),
            DeviceError::CharacteristicsMismatch => write!(f, "characteristics do not match"),
            DeviceError::InvalidPosition => write!(f, "invalid position"),
            DeviceError::DeleteFailed => write!(f, "delete operation failed"),
            DeviceError::ClearFailed => write!(f, "clear database failed"),
            DeviceError::WrongPassword => write!(f, "wrong password"),
            DeviceError::InvalidImage => write!(f, "invalid image"),
            DeviceError::InvalidRegister => write!(f, "invalid register"),
            DeviceError::Unknown(code) => write!(f, "unknown confirmation code 0x{:02X}", code),
        }
    }
}

/// Confirmation code `0x00` means the command succeeded; every other code
/// classifies as a `DeviceError`.
pub fn classify(code: u8) -> Result<(), DeviceError> {
    match code {
        0x00 => Ok(()),
        0x01 => Err(DeviceError::Communication),
        0x02 => Err(DeviceError::NoFinger),
        0x03 => Err(DeviceError::ImageCaptureFailed),
        0x06 => Err(DeviceError::MessyImage),
        0x07 => Err(DeviceError::FewFeaturePoints),
        0x08 => Err(DeviceError::NotMatching),
        0x09 => Err(DeviceError::NoTemplateFound),
        0x0A => Err(DeviceError::CharacteristicsMismatch),
        0x0B => Err(DeviceError::InvalidPosition),
        0x0D => Err(DeviceError::DeleteFailed),
        0x0E => Err(DeviceError::ClearFailed),
        0x13 => Err(DeviceError::WrongPassword),
        0x15 => Err(DeviceError::InvalidImage),
        0x1A => Err(DeviceError::InvalidRegister),
        other => Err(DeviceError::Unknown(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p6_status_exhaustive_never_panics() {
        for code in 0..=255u8 {
            let result = classify(code);
            if code == 0x00 {
                assert_eq!(result, Ok(()));
            } else {
                assert!(result.is_err());
            }
        }
    }

    #[test]
    fn unmapped_codes_become_unknown() {
        assert_eq!(classify(0xFE), Err(DeviceError::Unknown(0xFE)));
    }

    #[test]
    fn wrong_password_is_distinct() {
        assert_eq!(classify(0x13), Err(DeviceError::WrongPassword));
    }
}
