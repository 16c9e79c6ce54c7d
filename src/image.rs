//! Caller-owned image objects: the encoded J2C image and the decoded raster.

use crate::error::DecodeError;

/// Host raster with interleaved channels.
///
/// Rows are stored bottom-to-top: row 0 is the last row of the picture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    components: u32,
    bytes_per_sample: usize,
    data: Vec<u8>,
}

impl RawImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes the raster and zero-fills it.
    ///
    /// Fails with `InvalidData`, leaving the raster untouched, when the byte
    /// size does not fit in `usize`.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        components: u32,
        bytes_per_sample: usize,
    ) -> Result<(), DecodeError> {
        let len = [height as usize, components as usize, bytes_per_sample]
            .into_iter()
            .try_fold(width as usize, usize::checked_mul)
            .ok_or(DecodeError::InvalidData)?;
        self.width = width;
        self.height = height;
        self.components = components;
        self.bytes_per_sample = bytes_per_sample;
        self.data.clear();
        self.data.resize(len, 0);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn components(&self) -> u32 {
        self.components
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Sample bytes at (`row`, `col`, `channel`), in storage order.
    pub fn sample(&self, row: u32, col: u32, channel: u32) -> Option<&[u8]> {
        if row >= self.height || col >= self.width || channel >= self.components {
            return None;
        }
        let index = ((row as usize * self.width as usize + col as usize) * self.components as usize
            + channel as usize)
            * self.bytes_per_sample;
        self.data.get(index..index + self.bytes_per_sample)
    }
}

/// An encoded JPEG 2000 image and the metadata the decoder reports about it.
#[derive(Debug, Clone, Default)]
pub struct J2cImage {
    data: Vec<u8>,
    size: Option<(u32, u32, u32)>,
    levels: Option<u32>,
    discard_level: Option<u32>,
    raw_discard_level: u32,
    decode_failed: bool,
    last_error: Option<String>,
}

impl J2cImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn set_size(&mut self, width: u32, height: u32, components: u32) {
        self.size = Some((width, height, components));
    }

    /// `(width, height, components)`, unset until a decode or metadata read succeeds.
    pub fn size(&self) -> Option<(u32, u32, u32)> {
        self.size
    }

    pub fn set_levels(&mut self, levels: u32) {
        self.levels = Some(levels);
    }

    pub fn levels(&self) -> Option<u32> {
        self.levels
    }

    /// Requests a decode with `level` resolution levels discarded.
    pub fn set_discard_level(&mut self, level: Option<u32>) {
        self.discard_level = level;
    }

    pub fn discard_level(&self) -> Option<u32> {
        self.discard_level
    }

    /// The discard level implied by how much of the file is present.
    pub fn set_raw_discard_level(&mut self, level: u32) {
        self.raw_discard_level = level;
    }

    pub fn raw_discard_level(&self) -> u32 {
        self.raw_discard_level
    }

    /// The requested discard level, else the raw one.
    pub fn effective_discard_level(&self) -> u32 {
        self.discard_level.unwrap_or(self.raw_discard_level)
    }

    pub fn decode_failed(&mut self) {
        self.decode_failed = true;
    }

    pub fn has_decode_failed(&self) -> bool {
        self.decode_failed
    }

    pub fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
