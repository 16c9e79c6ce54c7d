//! Bounds-checked big-endian cursor over a codestream buffer.

use crate::error::DecodeError;
use crate::marker_code::J2kMarker;

pub struct CodestreamReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> CodestreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.source.len()
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.position >= self.source.len() {
            return Err(DecodeError::NeedMoreData);
        }
        let val = self.source[self.position];
        self.position += 1;
        Ok(val)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_array::<2>()?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self
            .position
            .checked_add(N)
            .ok_or(DecodeError::NeedMoreData)?;
        let slice = self
            .source
            .get(self.position..end)
            .ok_or(DecodeError::NeedMoreData)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(slice);
        self.position = end;
        Ok(bytes)
    }

    /// Reads `count` bytes and returns them as a sub-slice of the source.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .position
            .checked_add(count)
            .ok_or(DecodeError::NeedMoreData)?;
        let slice = self
            .source
            .get(self.position..end)
            .ok_or(DecodeError::NeedMoreData)?;
        self.position = end;
        Ok(slice)
    }

    /// Moves the cursor forward. Fails without moving if that would pass the end.
    pub fn advance(&mut self, count: usize) -> Result<(), DecodeError> {
        match self.position.checked_add(count) {
            Some(end) if end <= self.source.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(DecodeError::NeedMoreData),
        }
    }

    /// Moves the cursor back. Fails without moving if that would pass the start.
    pub fn rewind(&mut self, count: usize) -> Result<(), DecodeError> {
        self.position = self
            .position
            .checked_sub(count)
            .ok_or(DecodeError::InvalidArgument)?;
        Ok(())
    }
}

/// True if the two bytes of `source` at `offset` spell `marker`.
pub fn is_marker_at(source: &[u8], offset: usize, marker: J2kMarker) -> bool {
    match source.get(offset..offset.saturating_add(2)) {
        Some(bytes) => u16::from_be_bytes([bytes[0], bytes[1]]) == marker as u16,
        None => false,
    }
}
