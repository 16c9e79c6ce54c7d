//! JPEG 2000 texture decoding on a hardware decode backend.
//!
//! The crate has two halves. The header side ([`header`], [`metadata`],
//! [`jp2`]) reads image shape straight from the codestream bytes, either by
//! walking marker segments or, when that fails, from fixed SIZ offsets. The
//! decode side ([`decoder`], [`session`]) drives a [`DecodeBackend`] through
//! parse, decode and readback, producing a bottom-to-top interleaved
//! [`RawImage`].

pub mod backend;
pub mod decoder;
pub mod error;
pub mod header;
pub mod image;
pub mod jp2;
pub mod marker_code;
pub mod metadata;
pub mod session;
pub mod stream_reader;

pub use backend::{ComponentInfo, DecodeBackend, DevicePlane, ImageInfo, OutputImage, PixelType};
pub use decoder::{DecodeOutcome, DecodeRequest, DecodedImage, Decoder, DecoderConfig};
pub use error::DecodeError;
pub use header::{CodestreamDescriptor, parse_header, parse_header_fast};
pub use image::{J2cImage, RawImage};
pub use marker_code::J2kMarker;
pub use metadata::{MetadataSource, get_metadata};
