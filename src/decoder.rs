//! Decode orchestration over a [`DecodeBackend`].
//!
//! A [`Decoder`] owns one [`DecodeSession`] for its lifetime. Each call to
//! [`Decoder::decode`] parses the codestream on the backend, allocates one
//! device plane per component, decodes tile 0 into them, and copies the
//! requested channels back into a host raster, flipping rows so that the
//! raster is stored bottom-to-top.
//!
//! [`Decoder::decode_into`] adds the failure policy used by image pipelines:
//! when the backend cannot decode, the image size is recovered from the
//! header instead (full walk, then the fixed-offset read) and the image is
//! marked failed.

use std::time::{Duration, Instant};

use crate::backend::{DecodeBackend, DevicePlane, OutputImage, PixelType};
use crate::error::DecodeError;
use crate::header::CodestreamDescriptor;
use crate::image::{J2cImage, RawImage};
use crate::jp2;
use crate::metadata::{self, MetadataSource};
use crate::session::DecodeSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Ask the backend to write every component at full image resolution.
    /// Readback assumes this for subsampled images.
    pub rgb_output: bool,
    pub tile_index: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            rgb_output: true,
            tile_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeRequest {
    pub first_channel: u32,
    pub max_channel_count: u32,
    /// Number of highest resolution levels to skip.
    pub discard_level: u32,
}

/// What a successful [`Decoder::decode`] reports about the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub component_count: u32,
    /// Channels written to the raster.
    pub channels: u32,
    pub pixel_type: PixelType,
    /// Resolution levels of the decoded tile.
    pub levels: u32,
    /// Host parse time plus device decode time.
    pub decode_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Decoded(DecodedImage),
    /// The decode failed. `recovered` names the header tier that still
    /// provided the image size, if any.
    Failed {
        error: DecodeError,
        recovered: Option<MetadataSource>,
    },
}

/// Number of channels to extract starting at `first_channel`.
pub fn channel_span(
    component_count: u32,
    first_channel: u32,
    max_channel_count: u32,
) -> Result<u32, DecodeError> {
    let available = component_count
        .checked_sub(first_channel)
        .ok_or(DecodeError::InvalidArgument)?;
    match available.min(max_channel_count) {
        0 => Err(DecodeError::InvalidArgument),
        channels => Ok(channels),
    }
}

/// Writes one tightly packed plane into channel `dest` of an interleaved
/// raster, mapping plane row 0 to the last raster row.
pub fn flip_interleave(
    strip: &[u8],
    raster: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    dest: usize,
    bytes_per_sample: usize,
) {
    let src_row_bytes = width * bytes_per_sample;
    let dst_row_bytes = width * channels * bytes_per_sample;
    if src_row_bytes == 0 {
        return;
    }
    for (y, src_row) in strip.chunks_exact(src_row_bytes).take(height).enumerate() {
        let out_row = height - 1 - y;
        let dst_row = &mut raster[out_row * dst_row_bytes..(out_row + 1) * dst_row_bytes];
        for (x, sample) in src_row.chunks_exact(bytes_per_sample).enumerate() {
            let at = (x * channels + dest) * bytes_per_sample;
            dst_row[at..at + bytes_per_sample].copy_from_slice(sample);
        }
    }
}

fn plane_bytes(width: u32, height: u32, bytes_per_sample: usize) -> Result<(usize, usize), DecodeError> {
    let row_bytes = (width as usize)
        .checked_mul(bytes_per_sample)
        .ok_or(DecodeError::InvalidData)?;
    row_bytes
        .checked_mul(height as usize)
        .ok_or(DecodeError::InvalidData)?;
    Ok((row_bytes, height as usize))
}

/// Device planes owned by one decode call, freed when dropped.
struct DevicePlanes<'b, B: DecodeBackend> {
    backend: &'b B,
    planes: Vec<DevicePlane<B::DeviceMemory>>,
}

impl<'b, B: DecodeBackend> DevicePlanes<'b, B> {
    fn with_capacity(backend: &'b B, capacity: usize) -> Self {
        Self {
            backend,
            planes: Vec::with_capacity(capacity),
        }
    }

    fn allocate(&mut self, row_bytes: usize, rows: usize) -> Result<(), DecodeError> {
        let plane = self.backend.allocate_plane(row_bytes, rows)?;
        self.planes.push(plane);
        Ok(())
    }

    fn get(&self, index: usize) -> Result<&DevicePlane<B::DeviceMemory>, DecodeError> {
        self.planes.get(index).ok_or(DecodeError::InvalidArgument)
    }
}

impl<B: DecodeBackend> Drop for DevicePlanes<'_, B> {
    fn drop(&mut self) {
        for plane in self.planes.drain(..) {
            if let Err(e) = self.backend.free_plane(plane) {
                log::warn!("could not free device plane: {}", e);
            }
        }
    }
}

pub struct Decoder<B: DecodeBackend> {
    session: DecodeSession<B>,
    config: DecoderConfig,
}

impl<B: DecodeBackend> Decoder<B> {
    /// Opens a backend session. A decoder that fails here never exists.
    pub fn new(backend: B, config: DecoderConfig) -> Result<Self, DecodeError> {
        let session = DecodeSession::open(backend, config.rgb_output).inspect_err(|e| {
            log::warn!("could not initialize decode session: {}", e);
        })?;
        Ok(Self { session, config })
    }

    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    pub fn engine_info(&self) -> String {
        self.session.backend().engine_info()
    }

    pub fn backend(&self) -> &B {
        self.session.backend()
    }

    /// Releases the session, reporting the first release failure.
    pub fn close(self) -> Result<(), DecodeError> {
        self.session.close()
    }

    /// Decodes `data` (a raw codestream or a JP2 file) into `raw`.
    pub fn decode(
        &mut self,
        data: &[u8],
        request: &DecodeRequest,
        raw: &mut RawImage,
    ) -> Result<DecodedImage, DecodeError> {
        let tile_index = self.config.tile_index;
        let rgb_output = self.session.rgb_output();
        let (backend, h) = self.session.parts()?;
        let codestream = jp2::codestream(data);

        backend.synchronize_stream(&h.stream)?;
        backend.record_event(&h.start_event, &h.stream)?;

        let parse_start = Instant::now();
        backend.parse_stream(&h.context, &mut h.parser, codestream)?;
        let parse_time = parse_start.elapsed();

        let info = backend.image_info(&h.parser)?;
        let levels = backend.resolution_levels(&h.parser, tile_index)?;
        let components = (0..info.component_count)
            .map(|c| backend.component_info(&h.parser, c))
            .collect::<Result<Vec<_>, _>>()?;

        let precision = components.first().ok_or(DecodeError::InvalidData)?.precision;
        let pixel_type = PixelType::for_precision(precision).inspect_err(|_| {
            log::warn!("precision value {} not supported", precision);
        })?;
        let bytes_per_sample = pixel_type.bytes_per_element();

        let subsampled = components
            .iter()
            .any(|c| c.width != info.width || c.height != info.height);
        if subsampled && !rgb_output {
            return Err(DecodeError::SubsampledReadback);
        }

        let mut planes = DevicePlanes::with_capacity(backend, components.len());
        for component in &components {
            let (width, height) = if rgb_output {
                (info.width, info.height)
            } else {
                (component.width, component.height)
            };
            let (row_bytes, rows) = plane_bytes(width, height, bytes_per_sample)?;
            planes.allocate(row_bytes, rows)?;
        }

        backend.decode_tile(
            &h.context,
            &mut h.decode_state,
            &h.parser,
            &h.params,
            tile_index,
            request.discard_level,
            &OutputImage {
                pixel_type,
                planes: &planes.planes,
            },
            &h.stream,
        )?;

        backend.synchronize_stream(&h.stream)?;
        backend.record_event(&h.stop_event, &h.stream)?;
        backend.synchronize_event(&h.stop_event)?;
        let device_ms = backend.elapsed_time(&h.start_event, &h.stop_event)?;
        let decode_time = parse_time + Duration::from_secs_f32(device_ms.max(0.0) / 1000.0);

        let channels = channel_span(
            info.component_count,
            request.first_channel,
            request.max_channel_count,
        )?;
        raw.resize(info.width, info.height, channels, bytes_per_sample)?;

        let (row_bytes, rows) = plane_bytes(info.width, info.height, bytes_per_sample)?;
        let mut strip = vec![0u8; row_bytes * rows];
        for dest in 0..channels {
            let plane = planes.get((request.first_channel + dest) as usize)?;
            backend.copy_plane_to_host(plane, &mut strip, row_bytes, rows)?;
            flip_interleave(
                &strip,
                raw.data_mut(),
                info.width as usize,
                rows,
                channels as usize,
                dest as usize,
                bytes_per_sample,
            );
        }
        drop(planes);

        Ok(DecodedImage {
            width: info.width,
            height: info.height,
            component_count: info.component_count,
            channels,
            pixel_type,
            levels,
            decode_time,
        })
    }

    /// Decodes `image` into `raw`, falling back to header metadata on failure.
    ///
    /// On success the image receives its size and resolution level count. On
    /// failure it receives whatever size the header parsers recover, the last
    /// error is set to `"decode failed"` and the image is marked failed.
    pub fn decode_into(
        &mut self,
        image: &mut J2cImage,
        raw: &mut RawImage,
        first_channel: u32,
        max_channel_count: u32,
    ) -> DecodeOutcome {
        let request = DecodeRequest {
            first_channel,
            max_channel_count,
            discard_level: image.effective_discard_level(),
        };

        match self.decode(image.data(), &request, raw) {
            Ok(decoded) => {
                image.set_size(decoded.width, decoded.height, decoded.component_count);
                image.set_levels(decoded.levels);
                DecodeOutcome::Decoded(decoded)
            }
            Err(error) => {
                let recovered = metadata::recover(image.data());
                let descriptor = &recovered.descriptor;
                if descriptor.valid {
                    image.set_size(
                        descriptor.width,
                        descriptor.height,
                        descriptor.component_count as u32,
                    );
                }
                log_failure(image, &request, error, &recovered.header);
                image.set_last_error("decode failed");
                image.decode_failed();
                DecodeOutcome::Failed {
                    error,
                    recovered: recovered.source,
                }
            }
        }
    }

    /// Sets the size of `image` from its header without decoding.
    pub fn get_metadata(&self, image: &mut J2cImage) -> bool {
        metadata::apply_metadata(image)
    }
}

fn log_failure(
    image: &J2cImage,
    request: &DecodeRequest,
    error: DecodeError,
    header: &CodestreamDescriptor,
) {
    let size = header.size.clone().unwrap_or_default();
    let cod = header.coding_style.unwrap_or_default();
    log::warn!(
        "texture failed to decode: {}; discard used: {}, asked: {:?}, data size: {}; \
         XYsiz: {}x{} XYOsiz: {}x{} XYTsiz: {}x{} XYTOsiz: {}x{} Csiz: {} size: {}x{} valid: {}; \
         decomposition_levels: {} progression_order: {} layers: {} code_block: {}x{} \
         code_block_style: 0x{:X} transform: {} mct: {}",
        error,
        request.discard_level,
        image.discard_level(),
        image.data_size(),
        size.grid_width,
        size.grid_height,
        size.x_origin,
        size.y_origin,
        size.tile_width,
        size.tile_height,
        size.tile_x_origin,
        size.tile_y_origin,
        header.component_count,
        header.width,
        header.height,
        header.valid,
        cod.decomposition_levels,
        cod.progression_order,
        cod.number_of_layers,
        cod.codeblock_width_exp,
        cod.codeblock_height_exp,
        cod.codeblock_style,
        cod.transformation,
        cod.mct,
    );
}
