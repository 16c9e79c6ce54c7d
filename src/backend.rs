//! The hardware decode backend seen by the [`Decoder`](crate::decoder::Decoder).
//!
//! A backend wraps a device decode library: a library handle (context), a
//! decode state, a stream parser, decode parameters, execution streams, timing
//! events and pitched device memory. The decoder only talks to it through this
//! trait; handles are opaque associated types and every `create_*` call has a
//! matching `destroy_*` call.
//!
//! All methods take `&self`. Backends wrapping a C library keep their state on
//! the library side; the decoder guarantees that one session's handles are
//! never used from two threads at once.

use crate::error::DecodeError;

/// Image-level information reported by the backend's stream parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub component_count: u32,
}

/// Per-component information reported by the backend's stream parser.
///
/// Subsampled components report their own, smaller, dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentInfo {
    pub width: u32,
    pub height: u32,
    pub precision: u8,
    pub is_signed: bool,
}

/// Sample type of the decoded output planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    U8,
    U16,
}

impl PixelType {
    /// Picks the sample type for a component precision.
    pub fn for_precision(precision: u8) -> Result<Self, DecodeError> {
        match precision {
            8 => Ok(Self::U8),
            9..=16 => Ok(Self::U16),
            _ => Err(DecodeError::UnsupportedPrecision(precision)),
        }
    }

    pub fn bytes_per_element(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }
}

/// A pitched device allocation returned by [`DecodeBackend::allocate_plane`].
#[derive(Debug)]
pub struct DevicePlane<P> {
    pub memory: P,
    /// Row pitch in bytes, at least the requested row width.
    pub pitch: usize,
    pub row_bytes: usize,
    pub rows: usize,
}

/// Output description handed to [`DecodeBackend::decode_tile`].
pub struct OutputImage<'a, P> {
    pub pixel_type: PixelType,
    pub planes: &'a [DevicePlane<P>],
}

pub trait DecodeBackend {
    type Context;
    type DecodeState;
    type StreamParser;
    type DecodeParams;
    type Stream;
    type Event;
    type DeviceMemory;

    /// Library and device description for diagnostics.
    fn engine_info(&self) -> String;

    /// Whether decode parameters can request RGB-interleaved output, where
    /// every component is written at full image resolution.
    fn supports_rgb_output(&self) -> bool {
        true
    }

    fn create_context(&self) -> Result<Self::Context, DecodeError>;
    fn create_decode_state(&self, context: &Self::Context) -> Result<Self::DecodeState, DecodeError>;
    fn create_stream_parser(&self) -> Result<Self::StreamParser, DecodeError>;
    fn create_stream(&self) -> Result<Self::Stream, DecodeError>;
    fn create_event(&self) -> Result<Self::Event, DecodeError>;
    fn create_decode_params(&self) -> Result<Self::DecodeParams, DecodeError>;
    fn set_rgb_output(&self, params: &mut Self::DecodeParams, enabled: bool) -> Result<(), DecodeError>;

    fn parse_stream(
        &self,
        context: &Self::Context,
        parser: &mut Self::StreamParser,
        data: &[u8],
    ) -> Result<(), DecodeError>;
    fn image_info(&self, parser: &Self::StreamParser) -> Result<ImageInfo, DecodeError>;
    fn component_info(&self, parser: &Self::StreamParser, index: u32) -> Result<ComponentInfo, DecodeError>;
    fn resolution_levels(&self, parser: &Self::StreamParser, tile_index: u32) -> Result<u32, DecodeError>;

    fn allocate_plane(&self, row_bytes: usize, rows: usize) -> Result<DevicePlane<Self::DeviceMemory>, DecodeError>;
    /// Copies `rows` rows of `row_bytes` bytes from `plane` into `dst`, which is
    /// tightly packed.
    fn copy_plane_to_host(
        &self,
        plane: &DevicePlane<Self::DeviceMemory>,
        dst: &mut [u8],
        row_bytes: usize,
        rows: usize,
    ) -> Result<(), DecodeError>;
    fn free_plane(&self, plane: DevicePlane<Self::DeviceMemory>) -> Result<(), DecodeError>;

    #[allow(clippy::too_many_arguments)]
    fn decode_tile(
        &self,
        context: &Self::Context,
        state: &mut Self::DecodeState,
        parser: &Self::StreamParser,
        params: &Self::DecodeParams,
        tile_index: u32,
        discard_level: u32,
        output: &OutputImage<'_, Self::DeviceMemory>,
        stream: &Self::Stream,
    ) -> Result<(), DecodeError>;

    fn synchronize_stream(&self, stream: &Self::Stream) -> Result<(), DecodeError>;
    fn record_event(&self, event: &Self::Event, stream: &Self::Stream) -> Result<(), DecodeError>;
    fn synchronize_event(&self, event: &Self::Event) -> Result<(), DecodeError>;
    /// Milliseconds elapsed between two recorded events.
    fn elapsed_time(&self, start: &Self::Event, stop: &Self::Event) -> Result<f32, DecodeError>;

    fn destroy_decode_params(&self, params: Self::DecodeParams) -> Result<(), DecodeError>;
    fn destroy_event(&self, event: Self::Event) -> Result<(), DecodeError>;
    fn destroy_stream(&self, stream: Self::Stream) -> Result<(), DecodeError>;
    fn destroy_stream_parser(&self, parser: Self::StreamParser) -> Result<(), DecodeError>;
    fn destroy_decode_state(&self, state: Self::DecodeState) -> Result<(), DecodeError>;
    fn destroy_context(&self, context: Self::Context) -> Result<(), DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_type_for_precision() {
        assert_eq!(PixelType::for_precision(8), Ok(PixelType::U8));
        assert_eq!(PixelType::for_precision(9), Ok(PixelType::U16));
        assert_eq!(PixelType::for_precision(12), Ok(PixelType::U16));
        assert_eq!(PixelType::for_precision(16), Ok(PixelType::U16));
        assert_eq!(
            PixelType::for_precision(0),
            Err(DecodeError::UnsupportedPrecision(0))
        );
        assert_eq!(
            PixelType::for_precision(7),
            Err(DecodeError::UnsupportedPrecision(7))
        );
        assert_eq!(
            PixelType::for_precision(17),
            Err(DecodeError::UnsupportedPrecision(17))
        );
        assert_eq!(PixelType::U16.bytes_per_element(), 2);
    }
}
