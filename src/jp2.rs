//! JP2 box structure (ISO/IEC 15444-1 Annex I), enough to find the codestream.

use crate::error::DecodeError;
use crate::stream_reader::CodestreamReader;

const JP2_SIGNATURE: &[u8; 12] = b"\x00\x00\x00\x0CjP  \r\n\x87\n";

pub struct Jp2Box {
    pub box_type: [u8; 4],
    pub data_range: std::ops::Range<usize>,
}

pub struct Jp2Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Jp2Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn is_jp2(data: &[u8]) -> bool {
        data.starts_with(JP2_SIGNATURE)
    }

    /// Returns the payload of the first `jp2c` box, or `None` when `data` is
    /// not a JP2 file or has no codestream box.
    pub fn find_codestream(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        if !Self::is_jp2(self.data) {
            return Ok(None);
        }

        self.position = 0;
        while let Some(b) = self.read_box()? {
            if b.box_type == *b"jp2c" {
                return Ok(Some(&self.data[b.data_range]));
            }
        }
        Ok(None)
    }

    pub fn read_box(&mut self) -> Result<Option<Jp2Box>, DecodeError> {
        if self.position + 8 > self.data.len() {
            return Ok(None);
        }

        let start_pos = self.position;
        let mut reader = CodestreamReader::new(&self.data[start_pos..]);
        let mut length = reader.read_u32()? as u64;
        let mut box_type = [0u8; 4];
        box_type.copy_from_slice(reader.read_bytes(4)?);

        let mut header_size = 8;
        if length == 1 {
            let high = reader.read_u32()? as u64;
            let low = reader.read_u32()? as u64;
            length = (high << 32) | low;
            header_size += 8;
        } else if length == 0 {
            length = (self.data.len() - start_pos) as u64;
        }

        if length < header_size as u64 {
            return Err(DecodeError::InvalidData);
        }
        let data_start = start_pos + header_size;
        let data_end = usize::try_from(length)
            .ok()
            .and_then(|len| start_pos.checked_add(len))
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::InvalidData)?;

        self.position = data_end;

        Ok(Some(Jp2Box {
            box_type,
            data_range: data_start..data_end,
        }))
    }
}

/// Returns the raw codestream inside `data`.
///
/// JP2 files are unwrapped to their `jp2c` payload; anything else, including a
/// JP2 file whose boxes cannot be walked, is returned unchanged so the header
/// parsers can judge it.
pub fn codestream(data: &[u8]) -> &[u8] {
    match Jp2Reader::new(data).find_codestream() {
        Ok(Some(cs)) => cs,
        Ok(None) => data,
        Err(e) => {
            log::warn!("JP2 box walk failed: {}", e);
            data
        }
    }
}
