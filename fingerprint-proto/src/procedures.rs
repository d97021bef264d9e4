//! Derived procedures built on top of the raw session operations:
//! `find_free_position`, `search`, `enroll`.

use log::info;

use crate::command::CharBuffer;
use crate::error::FingerprintError;
use crate::session::{CaptureOutcome, SearchOutcome, Session};
use crate::transport::Transport;

/// Outcome of an enrollment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Stored(u16),
    AlreadyEnrolled(u16),
    FingersDoNotMatch,
    DatabaseFull,
}

impl<T: Transport> Session<T> {
    /// Scans the template-index bitmap page by page, LSB-first within each
    /// byte, and returns the first cleared slot. Bit ordering is LSB-first
    /// within a byte by design — do not reinterpret MSB-first.
    pub fn find_free_position(&mut self) -> Result<Option<u16>, FingerprintError> {
        let capacity = self.storage_capacity();
        let pages = ((capacity as u32 + 255) / 256).max(1);

        for page in 0..pages {
            let bitmap = self.template_index(page as u8)?;
            if let Some(slot) = first_cleared_bit(&bitmap) {
                let position = page as u32 * 256 + slot as u32;
                if (position as u16) < capacity {
                    return Ok(Some(position as u16));
                }
            }
        }
        Ok(None)
    }

    /// Spins on `ReadImage` until a finger is present, converts it into
    /// `char_buffer`, then searches the whole database (or
    /// `[start, start+count)` when called indirectly with a narrower
    /// range via `search_template`). `cancel_requested` lets an external
    /// caller break out of the `NoFinger` poll loop — the engine itself
    /// has no notion of user input.
    pub fn search(
        &mut self,
        char_buffer: CharBuffer,
        mut cancel_requested: impl FnMut() -> bool,
    ) -> Result<SearchOutcome, FingerprintError> {
        loop {
            if cancel_requested() {
                return Err(FingerprintError::Cancelled);
            }
            match self.read_image()? {
                CaptureOutcome::FingerPresent => break,
                CaptureOutcome::NoFinger => continue,
            }
        }

        self.convert_image(char_buffer)?;
        self.search_template(char_buffer, 0, 0)
    }

    /// Two-capture enrollment merge. `prompt_operator` is the external UI
    /// collaborator — it's called once, between the two captures, to ask
    /// the operator to lift and re-present their finger; this procedure
    /// never touches stdin/stdout itself.
    pub fn enroll(
        &mut self,
        mut cancel_requested: impl FnMut() -> bool,
        mut prompt_operator: impl FnMut(),
    ) -> Result<EnrollOutcome, FingerprintError> {
        if let SearchOutcome::Match { position, .. } = self.search(CharBuffer::One, &mut cancel_requested)? {
            return Ok(EnrollOutcome::AlreadyEnrolled(position));
        }

        prompt_operator();

        loop {
            if cancel_requested() {
                return Err(FingerprintError::Cancelled);
            }
            match self.read_image()? {
                CaptureOutcome::FingerPresent => break,
                CaptureOutcome::NoFinger => continue,
            }
        }
        self.convert_image(CharBuffer::Two)?;

        let accuracy = self.compare_characteristics()?;
        if accuracy == 0 {
            return Ok(EnrollOutcome::FingersDoNotMatch);
        }

        self.create_template()?;

        let position = match self.find_free_position()? {
            Some(p) => p,
            None => return Ok(EnrollOutcome::DatabaseFull),
        };

        self.store_template(CharBuffer::One, position)?;
        info!("enrolled template at position {}", position);
        Ok(EnrollOutcome::Stored(position))
    }
}

/// LSB-first scan across an occupancy bitmap: byte 0 holds slots 0..7 with
/// bit 0 as slot 0, byte 1 holds slots 8..15, and so on.
fn first_cleared_bit(bitmap: &[u8]) -> Option<u8> {
    for (byte_index, byte) in bitmap.iter().enumerate() {
        if *byte != 0xFF {
            for bit in 0..8u8 {
                if byte & (1 << bit) == 0 {
                    return Some(byte_index as u8 * 8 + bit);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p5_free_position_is_lowest_cleared_bit() {
        let mut bitmap = [0u8; 32];
        assert_eq!(first_cleared_bit(&bitmap), Some(0));

        bitmap[0] = 0b0000_0011; // slots 0,1 occupied
        assert_eq!(first_cleared_bit(&bitmap), Some(2));

        bitmap[0] = 0xFF;
        assert_eq!(first_cleared_bit(&bitmap), Some(8));
    }

    #[test]
    fn p5_fully_set_bitmap_yields_none() {
        let bitmap = [0xFFu8; 32];
        assert_eq!(first_cleared_bit(&bitmap), None);
    }

    #[test]
    fn s5_bit_pattern_from_spec() {
        // bits 0 and 1 of the first occupancy byte set -> bits 2..7 of that
        // byte and every later byte cleared -> lowest cleared bit is 2.
        let mut bitmap = [0u8; 32];
        bitmap[0] = 0x03;
        assert_eq!(first_cleared_bit(&bitmap), Some(2));
    }
}
