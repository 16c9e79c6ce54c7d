//! JPEG 2000 main header parsing.
//!
//! Two readers recover the image shape from the start of a codestream:
//!
//! - [`parse_header`] walks marker segments from SOC until the coding style
//!   default (COD) segment and decodes SIZ and COD on the way.
//! - [`parse_header_fast`] assumes the canonical layout where SIZ directly
//!   follows SOC and reads its fields at fixed offsets.
//!
//! Neither reader trusts the declared segment lengths: every read goes through
//! [`CodestreamReader`], and a truncated or inconsistent segment ends the walk
//! with whatever was recovered so far.

use crate::error::DecodeError;
use crate::marker_code::{J2kMarker, MARKER_SIZE, SEGMENT_LENGTH_SIZE};
use crate::stream_reader::{CodestreamReader, is_marker_at};

/// Length of the canonical SOC + SIZ prefix read by [`parse_header_fast`].
pub const FAST_HEADER_LEN: usize = 42;

const FAST_OFFSET_XSIZ: usize = 8;
const FAST_OFFSET_YSIZ: usize = 12;
const FAST_OFFSET_XOSIZ: usize = 16;
const FAST_OFFSET_YOSIZ: usize = 20;
const FAST_OFFSET_CSIZ: usize = 40;

// Minimum COD segment length: Lcod(2) + Scod(1) + SGcod(4) + SPcod(5).
const MIN_COD_LENGTH: usize = 12;

// COM registration value for Latin-1 text.
const COMMENT_REGISTRATION_LATIN1: u16 = 1;

/// Per-component entry of the SIZ segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentSize {
    /// Bit depth, `(Ssiz & 0x7F) + 1`.
    pub precision: u8,
    pub is_signed: bool,
    /// Horizontal subsampling factor (XRsiz).
    pub dx: u8,
    /// Vertical subsampling factor (YRsiz).
    pub dy: u8,
}

/// Decoded SIZ segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SizeSegment {
    /// Rsiz capabilities.
    pub capabilities: u16,
    /// Xsiz: width of the reference grid.
    pub grid_width: u32,
    /// Ysiz: height of the reference grid.
    pub grid_height: u32,
    /// XOsiz: horizontal offset of the image area.
    pub x_origin: u32,
    /// YOsiz: vertical offset of the image area.
    pub y_origin: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_x_origin: u32,
    pub tile_y_origin: u32,
    pub components: Vec<ComponentSize>,
}

/// Decoded COD segment (Scod, SGcod and the fixed part of SPcod).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodingStyleDefault {
    pub coding_style: u8,
    pub progression_order: u8,
    pub number_of_layers: u16,
    pub mct: u8,
    pub decomposition_levels: u8,
    pub codeblock_width_exp: u8,
    pub codeblock_height_exp: u8,
    pub codeblock_style: u8,
    pub transformation: u8,
}

/// SOT segment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TilePartHeader {
    pub tile_index: u16,
    /// Psot: tile-part length, zero when it runs to EOC.
    pub length: u32,
    pub part_index: u8,
    pub part_count: u8,
}

/// Image shape recovered from a codestream header.
///
/// `width`, `height`, `component_count` and `component_precision_bits` are
/// meaningless unless `valid` is set, which requires both the SOC marker and a
/// complete SIZ segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodestreamDescriptor {
    pub width: u32,
    pub height: u32,
    pub component_count: u16,
    /// Precision of the first component, zero when there are no components.
    pub component_precision_bits: u8,
    pub valid: bool,
    pub size: Option<SizeSegment>,
    pub coding_style: Option<CodingStyleDefault>,
    /// Sqcd of the QCD segment.
    pub quantization_style: Option<u8>,
    pub tile_parts: Vec<TilePartHeader>,
    pub comments: Vec<String>,
}

impl CodestreamDescriptor {
    /// Descriptor for a shape recovered by the fast path.
    pub fn from_fast(fast: FastHeader) -> Self {
        Self {
            width: fast.width,
            height: fast.height,
            component_count: fast.component_count,
            valid: true,
            ..Self::default()
        }
    }
}

/// One marker segment as seen by the header walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSegment {
    /// Raw marker code, `0xFFxx` for well-formed streams.
    pub code: u16,
    /// Offset of the marker code in the buffer.
    pub offset: usize,
    /// Declared segment length including the length field itself.
    pub length: Option<u16>,
}

impl MarkerSegment {
    pub fn marker(&self) -> Option<J2kMarker> {
        J2kMarker::try_from(self.code).ok()
    }

    pub fn name(&self) -> &'static str {
        self.marker().map_or("???", J2kMarker::mnemonic)
    }
}

/// Shape read from fixed offsets by [`parse_header_fast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastHeader {
    pub width: u32,
    pub height: u32,
    pub component_count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Continue,
    Stop,
}

/// Walks the main header marker by marker.
pub struct HeaderParser<'a> {
    reader: CodestreamReader<'a>,
    descriptor: CodestreamDescriptor,
}

impl<'a> HeaderParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: CodestreamReader::new(data),
            descriptor: CodestreamDescriptor::default(),
        }
    }

    pub fn parse(self) -> CodestreamDescriptor {
        self.parse_with(|_| {})
    }

    /// Runs the walk, calling `visit` for every marker segment encountered.
    pub fn parse_with(mut self, mut visit: impl FnMut(&MarkerSegment)) -> CodestreamDescriptor {
        match self.reader.read_u16() {
            Ok(soc) if soc == J2kMarker::StartOfCodestream as u16 => {
                visit(&MarkerSegment {
                    code: soc,
                    offset: 0,
                    length: None,
                });
            }
            other => {
                log::warn!(
                    "header decode failed: SOC={:04X?}",
                    other.ok()
                );
                return self.descriptor;
            }
        }

        while !self.reader.is_exhausted() {
            match self.parse_segment(&mut visit) {
                Ok(Walk::Continue) => {}
                Ok(Walk::Stop) => break,
                Err(e) => {
                    log::debug!(
                        "header walk stopped at offset {}: {}",
                        self.reader.position(),
                        e
                    );
                    break;
                }
            }
        }

        self.descriptor
    }

    fn parse_segment(&mut self, visit: &mut impl FnMut(&MarkerSegment)) -> Result<Walk, DecodeError> {
        let offset = self.reader.position();
        let code = self.reader.read_u16()?;
        let marker = J2kMarker::try_from(code).ok();

        let length = match marker {
            Some(m) if !m.has_length() => None,
            // Unknown codes are treated as length-prefixed.
            _ => Some(self.reader.read_u16()?),
        };

        let segment = MarkerSegment {
            code,
            offset,
            length,
        };
        log::trace!(
            "{} (0x{:04X}) at offset {} length {:?}",
            segment.name(),
            code,
            offset,
            length
        );
        visit(&segment);

        let Some(length) = length else {
            return match marker {
                Some(J2kMarker::StartOfData) => {
                    self.skip_entropy_data();
                    Ok(Walk::Continue)
                }
                Some(J2kMarker::EndOfCodestream) => Ok(Walk::Stop),
                _ => Ok(Walk::Continue),
            };
        };

        let body_len = (length as usize)
            .checked_sub(SEGMENT_LENGTH_SIZE)
            .ok_or(DecodeError::InvalidData)?;
        let body = self.reader.read_bytes(body_len)?;

        match marker {
            Some(J2kMarker::ImageAndTileSize) => {
                self.parse_siz(body)?;
                Ok(Walk::Continue)
            }
            Some(J2kMarker::CodingStyleDefault) => {
                self.parse_cod(body)?;
                // Nothing after COD is needed to describe the image.
                Ok(Walk::Stop)
            }
            Some(J2kMarker::QuantizationDefault) => {
                self.descriptor.quantization_style = body.first().copied();
                Ok(Walk::Continue)
            }
            Some(J2kMarker::Comment) => {
                self.parse_com(offset, body)?;
                Ok(Walk::Continue)
            }
            Some(J2kMarker::StartOfTile) => {
                self.parse_sot(body)?;
                Ok(Walk::Continue)
            }
            _ => Ok(Walk::Continue),
        }
    }

    fn parse_siz(&mut self, body: &[u8]) -> Result<(), DecodeError> {
        let mut reader = CodestreamReader::new(body);
        let capabilities = reader.read_u16()?;
        if capabilities != 0 {
            log::debug!("SIZ capabilities (Rsiz) are 0x{:04X}", capabilities);
        }
        let grid_width = reader.read_u32()?;
        let grid_height = reader.read_u32()?;
        let x_origin = reader.read_u32()?;
        let y_origin = reader.read_u32()?;
        let tile_width = reader.read_u32()?;
        let tile_height = reader.read_u32()?;
        let tile_x_origin = reader.read_u32()?;
        let tile_y_origin = reader.read_u32()?;
        let component_count = reader.read_u16()?;

        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let ssiz = reader.read_u8()?;
            let dx = reader.read_u8()?;
            let dy = reader.read_u8()?;
            components.push(ComponentSize {
                precision: (ssiz & 0x7F) + 1,
                is_signed: (ssiz & 0x80) != 0,
                dx,
                dy,
            });
        }

        let width = grid_width
            .checked_sub(x_origin)
            .ok_or(DecodeError::InvalidData)?;
        let height = grid_height
            .checked_sub(y_origin)
            .ok_or(DecodeError::InvalidData)?;

        self.descriptor.width = width;
        self.descriptor.height = height;
        self.descriptor.component_count = component_count;
        self.descriptor.component_precision_bits = components.first().map_or(0, |c| c.precision);
        self.descriptor.size = Some(SizeSegment {
            capabilities,
            grid_width,
            grid_height,
            x_origin,
            y_origin,
            tile_width,
            tile_height,
            tile_x_origin,
            tile_y_origin,
            components,
        });
        self.descriptor.valid = true;
        Ok(())
    }

    fn parse_cod(&mut self, body: &[u8]) -> Result<(), DecodeError> {
        if body.len() + SEGMENT_LENGTH_SIZE < MIN_COD_LENGTH {
            return Err(DecodeError::InvalidData);
        }
        // Precinct sizes may follow the fixed fields; they were consumed with the body.
        let mut reader = CodestreamReader::new(body);
        self.descriptor.coding_style = Some(CodingStyleDefault {
            coding_style: reader.read_u8()?,
            progression_order: reader.read_u8()?,
            number_of_layers: reader.read_u16()?,
            mct: reader.read_u8()?,
            decomposition_levels: reader.read_u8()?,
            codeblock_width_exp: reader.read_u8()?,
            codeblock_height_exp: reader.read_u8()?,
            codeblock_style: reader.read_u8()?,
            transformation: reader.read_u8()?,
        });
        Ok(())
    }

    fn parse_com(&mut self, offset: usize, body: &[u8]) -> Result<(), DecodeError> {
        let mut reader = CodestreamReader::new(body);
        let registration = reader.read_u16()?;
        if registration == COMMENT_REGISTRATION_LATIN1 {
            let text: String = reader.remaining_data().iter().map(|&b| b as char).collect();
            log::info!("header has COM at offset {}: {}", offset, text);
            self.descriptor.comments.push(text);
        } else {
            log::debug!(
                "header has binary COM at offset {} (Rcme=0x{:X})",
                offset,
                registration
            );
        }
        Ok(())
    }

    fn parse_sot(&mut self, body: &[u8]) -> Result<(), DecodeError> {
        let mut reader = CodestreamReader::new(body);
        self.descriptor.tile_parts.push(TilePartHeader {
            tile_index: reader.read_u16()?,
            length: reader.read_u32()?,
            part_index: reader.read_u8()?,
            part_count: reader.read_u8()?,
        });
        Ok(())
    }

    /// Scans entropy-coded data after SOD up to the next SOT or EOC marker.
    ///
    /// The cursor is left on that marker so the next step reads it; without
    /// one the cursor ends at the end of the buffer.
    fn skip_entropy_data(&mut self) {
        while let Ok(candidate) = self.reader.read_u16() {
            if candidate == J2kMarker::StartOfTile as u16
                || candidate == J2kMarker::EndOfCodestream as u16
            {
                let _ = self.reader.rewind(MARKER_SIZE);
                return;
            }
            // Step one byte so every byte pair is a candidate.
            let _ = self.reader.rewind(1);
        }
        let _ = self.reader.advance(self.reader.remaining_data().len());
    }
}

/// Walks the main header of `data` and describes the image.
pub fn parse_header(data: &[u8]) -> CodestreamDescriptor {
    HeaderParser::new(data).parse()
}

/// Reads the image shape from the canonical fixed layout of SOC followed by SIZ.
///
/// Returns `None` when `data` is shorter than [`FAST_HEADER_LEN`], when the
/// SOC/SIZ markers are not where the layout expects them, or when the image
/// offsets exceed the grid size. Tile fields are not recovered.
pub fn parse_header_fast(data: &[u8]) -> Option<FastHeader> {
    if data.len() < FAST_HEADER_LEN {
        return None;
    }
    if !is_marker_at(data, 0, J2kMarker::StartOfCodestream)
        || !is_marker_at(data, MARKER_SIZE, J2kMarker::ImageAndTileSize)
    {
        return None;
    }

    let grid_width = read_u32_at(data, FAST_OFFSET_XSIZ)?;
    let grid_height = read_u32_at(data, FAST_OFFSET_YSIZ)?;
    let x_origin = read_u32_at(data, FAST_OFFSET_XOSIZ)?;
    let y_origin = read_u32_at(data, FAST_OFFSET_YOSIZ)?;
    let component_count = read_u16_at(data, FAST_OFFSET_CSIZ)?;

    Some(FastHeader {
        width: grid_width.checked_sub(x_origin)?,
        height: grid_height.checked_sub(y_origin)?,
        component_count,
    })
}

fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}
