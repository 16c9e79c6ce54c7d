//! Tiered metadata recovery: full header walk first, fixed-offset read second.

use crate::header::{CodestreamDescriptor, parse_header, parse_header_fast};
use crate::image::J2cImage;
use crate::jp2;

/// Which parser produced a recovered shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    FullHeader,
    FastPath,
}

/// Result of [`recover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredMetadata {
    /// The full-walk descriptor, kept even when it is not valid so callers
    /// can report what the walk saw.
    pub header: CodestreamDescriptor,
    /// The shape to use; `valid` is false when both tiers failed.
    pub descriptor: CodestreamDescriptor,
    pub source: Option<MetadataSource>,
}

/// Runs the full header walk and, if it cannot confirm SOC and SIZ, the fast path.
///
/// JP2 files are unwrapped to their codestream first.
pub fn recover(data: &[u8]) -> RecoveredMetadata {
    let codestream = jp2::codestream(data);
    let header = parse_header(codestream);
    if header.valid {
        return RecoveredMetadata {
            descriptor: header.clone(),
            header,
            source: Some(MetadataSource::FullHeader),
        };
    }

    log::info!("header decode failed, falling back to fixed-offset read");
    match parse_header_fast(codestream) {
        Some(fast) => RecoveredMetadata {
            header,
            descriptor: CodestreamDescriptor::from_fast(fast),
            source: Some(MetadataSource::FastPath),
        },
        None => {
            log::info!("fixed-offset header read failed");
            RecoveredMetadata {
                header,
                descriptor: CodestreamDescriptor::default(),
                source: None,
            }
        }
    }
}

/// Describes the image in `data` without decoding pixels.
pub fn get_metadata(data: &[u8]) -> CodestreamDescriptor {
    recover(data).descriptor
}

/// Sets the size of `image` from its header. Returns false, leaving the size
/// unset, when neither tier recovers a shape.
pub fn apply_metadata(image: &mut J2cImage) -> bool {
    let descriptor = get_metadata(image.data());
    if !descriptor.valid {
        return false;
    }
    image.set_size(
        descriptor.width,
        descriptor.height,
        descriptor.component_count as u32,
    );
    true
}
