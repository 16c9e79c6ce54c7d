//! Counting mock backend shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use texj2k_rs::{
    ComponentInfo, DecodeBackend, DecodeError, DevicePlane, ImageInfo, OutputImage, PixelType,
};

/// What the mock saw, shared with the test after the backend moves into a decoder.
#[derive(Default)]
pub struct Ledger {
    pub calls: RefCell<Vec<String>>,
    pub acquired: Cell<u32>,
    pub released: Cell<u32>,
    pub planes_allocated: Cell<u32>,
    pub planes_freed: Cell<u32>,
    pub decode_calls: Cell<u32>,
    pub copies: Cell<u32>,
    pub last_discard: Cell<Option<u32>>,
    pub rgb_output: Cell<Option<bool>>,
}

impl Ledger {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn push(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub image: ImageInfo,
    pub components: Vec<ComponentInfo>,
    pub levels: u32,
    /// Handle kind whose creation fails: "context", "decode state",
    /// "parser", "stream", "event" or "params".
    pub fail_create: Option<&'static str>,
    pub fail_set_rgb: bool,
    pub fail_parse: bool,
    /// Zero-based plane allocation that fails.
    pub fail_allocate_at: Option<u32>,
    pub fail_decode: bool,
    /// Zero-based plane readback that fails.
    pub fail_copy: Option<u32>,
    /// Handle kinds whose release reports an error. The handle is still
    /// counted as released.
    pub fail_destroy: &'static [&'static str],
    pub rgb_capable: bool,
    pub elapsed_ms: f32,
}

impl MockConfig {
    pub fn new(width: u32, height: u32, components: u32, precision: u8) -> Self {
        Self {
            image: ImageInfo {
                width,
                height,
                component_count: components,
            },
            components: (0..components)
                .map(|_| ComponentInfo {
                    width,
                    height,
                    precision,
                    is_signed: false,
                })
                .collect(),
            levels: 6,
            fail_create: None,
            fail_set_rgb: false,
            fail_parse: false,
            fail_allocate_at: None,
            fail_decode: false,
            fail_copy: None,
            fail_destroy: &[],
            rgb_capable: true,
            elapsed_ms: 2.0,
        }
    }
}

/// Error code a failing release of `what` reports.
pub fn destroy_code(what: &str) -> i32 {
    match what {
        "params" => 1,
        "event" => 2,
        "stream" => 3,
        "parser" => 4,
        "decode state" => 5,
        _ => 6,
    }
}

/// Value the mock writes at (`x`, `y`) of component `c`.
pub fn pattern(c: usize, x: usize, y: usize) -> u16 {
    (c * 64 + y * 8 + x) as u16
}

pub struct MockBackend {
    pub config: MockConfig,
    pub ledger: Rc<Ledger>,
}

impl MockBackend {
    pub fn new(config: MockConfig) -> (Self, Rc<Ledger>) {
        let ledger = Rc::new(Ledger::default());
        (
            Self {
                config,
                ledger: Rc::clone(&ledger),
            },
            ledger,
        )
    }

    fn acquire(&self, what: &'static str) -> Result<u32, DecodeError> {
        if self.config.fail_create == Some(what) {
            self.ledger.push(format!("fail {}", what));
            return Err(DecodeError::AllocatorFailure);
        }
        let id = self.ledger.acquired.get() + 1;
        self.ledger.acquired.set(id);
        self.ledger.push(format!("create {}", what));
        Ok(id)
    }

    fn release(&self, what: &'static str) -> Result<(), DecodeError> {
        self.ledger.released.set(self.ledger.released.get() + 1);
        self.ledger.push(format!("destroy {}", what));
        if self.config.fail_destroy.contains(&what) {
            return Err(DecodeError::Device(destroy_code(what)));
        }
        Ok(())
    }
}

impl DecodeBackend for MockBackend {
    type Context = u32;
    type DecodeState = u32;
    type StreamParser = u32;
    type DecodeParams = u32;
    type Stream = u32;
    type Event = u32;
    type DeviceMemory = RefCell<Vec<u8>>;

    fn engine_info(&self) -> String {
        "mock decoder 1.0 on test device".to_string()
    }

    fn supports_rgb_output(&self) -> bool {
        self.config.rgb_capable
    }

    fn create_context(&self) -> Result<u32, DecodeError> {
        self.acquire("context")
    }

    fn create_decode_state(&self, _context: &u32) -> Result<u32, DecodeError> {
        self.acquire("decode state")
    }

    fn create_stream_parser(&self) -> Result<u32, DecodeError> {
        self.acquire("parser")
    }

    fn create_stream(&self) -> Result<u32, DecodeError> {
        self.acquire("stream")
    }

    fn create_event(&self) -> Result<u32, DecodeError> {
        self.acquire("event")
    }

    fn create_decode_params(&self) -> Result<u32, DecodeError> {
        self.acquire("params")
    }

    fn set_rgb_output(&self, _params: &mut u32, enabled: bool) -> Result<(), DecodeError> {
        if self.config.fail_set_rgb {
            return Err(DecodeError::InvalidParameter);
        }
        self.ledger.rgb_output.set(Some(enabled));
        Ok(())
    }

    fn parse_stream(&self, _context: &u32, _parser: &mut u32, data: &[u8]) -> Result<(), DecodeError> {
        if self.config.fail_parse || data.is_empty() {
            return Err(DecodeError::BadJpeg);
        }
        Ok(())
    }

    fn image_info(&self, _parser: &u32) -> Result<ImageInfo, DecodeError> {
        Ok(self.config.image)
    }

    fn component_info(&self, _parser: &u32, index: u32) -> Result<ComponentInfo, DecodeError> {
        self.config
            .components
            .get(index as usize)
            .copied()
            .ok_or(DecodeError::InvalidParameter)
    }

    fn resolution_levels(&self, _parser: &u32, tile_index: u32) -> Result<u32, DecodeError> {
        match tile_index {
            0 => Ok(self.config.levels),
            _ => Err(DecodeError::InvalidParameter),
        }
    }

    fn allocate_plane(
        &self,
        row_bytes: usize,
        rows: usize,
    ) -> Result<DevicePlane<RefCell<Vec<u8>>>, DecodeError> {
        if self.config.fail_allocate_at == Some(self.ledger.planes_allocated.get()) {
            return Err(DecodeError::AllocatorFailure);
        }
        let pitch = row_bytes.next_multiple_of(8);
        self.ledger
            .planes_allocated
            .set(self.ledger.planes_allocated.get() + 1);
        Ok(DevicePlane {
            memory: RefCell::new(vec![0; pitch * rows]),
            pitch,
            row_bytes,
            rows,
        })
    }

    fn copy_plane_to_host(
        &self,
        plane: &DevicePlane<RefCell<Vec<u8>>>,
        dst: &mut [u8],
        row_bytes: usize,
        rows: usize,
    ) -> Result<(), DecodeError> {
        let copy = self.ledger.copies.get();
        self.ledger.copies.set(copy + 1);
        if self.config.fail_copy == Some(copy) {
            return Err(DecodeError::Device(700));
        }
        if row_bytes > plane.row_bytes || rows > plane.rows || dst.len() < row_bytes * rows {
            return Err(DecodeError::InvalidParameter);
        }
        let memory = plane.memory.borrow();
        for (y, dst_row) in dst.chunks_exact_mut(row_bytes).take(rows).enumerate() {
            let start = y * plane.pitch;
            dst_row.copy_from_slice(&memory[start..start + row_bytes]);
        }
        Ok(())
    }

    fn free_plane(&self, _plane: DevicePlane<RefCell<Vec<u8>>>) -> Result<(), DecodeError> {
        self.ledger.planes_freed.set(self.ledger.planes_freed.get() + 1);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_tile(
        &self,
        _context: &u32,
        _state: &mut u32,
        _parser: &u32,
        _params: &u32,
        _tile_index: u32,
        discard_level: u32,
        output: &OutputImage<'_, RefCell<Vec<u8>>>,
        _stream: &u32,
    ) -> Result<(), DecodeError> {
        self.ledger.decode_calls.set(self.ledger.decode_calls.get() + 1);
        self.ledger.last_discard.set(Some(discard_level));
        if self.config.fail_decode {
            return Err(DecodeError::ExecutionFailed);
        }

        let bytes = output.pixel_type.bytes_per_element();
        for (c, plane) in output.planes.iter().enumerate() {
            let mut memory = plane.memory.borrow_mut();
            for y in 0..plane.rows {
                for x in 0..plane.row_bytes / bytes {
                    let at = y * plane.pitch + x * bytes;
                    let value = pattern(c, x, y);
                    match output.pixel_type {
                        PixelType::U8 => memory[at] = value as u8,
                        PixelType::U16 => memory[at..at + 2].copy_from_slice(&value.to_ne_bytes()),
                    }
                }
            }
        }
        Ok(())
    }

    fn synchronize_stream(&self, _stream: &u32) -> Result<(), DecodeError> {
        Ok(())
    }

    fn record_event(&self, _event: &u32, _stream: &u32) -> Result<(), DecodeError> {
        Ok(())
    }

    fn synchronize_event(&self, _event: &u32) -> Result<(), DecodeError> {
        Ok(())
    }

    fn elapsed_time(&self, _start: &u32, _stop: &u32) -> Result<f32, DecodeError> {
        Ok(self.config.elapsed_ms)
    }

    fn destroy_decode_params(&self, _params: u32) -> Result<(), DecodeError> {
        self.release("params")
    }

    fn destroy_event(&self, _event: u32) -> Result<(), DecodeError> {
        self.release("event")
    }

    fn destroy_stream(&self, _stream: u32) -> Result<(), DecodeError> {
        self.release("stream")
    }

    fn destroy_stream_parser(&self, _parser: u32) -> Result<(), DecodeError> {
        self.release("parser")
    }

    fn destroy_decode_state(&self, _state: u32) -> Result<(), DecodeError> {
        self.release("decode state")
    }

    fn destroy_context(&self, _context: u32) -> Result<(), DecodeError> {
        self.release("context")
    }
}

/// SOC, a SIZ segment with 8-bit unsigned components, then EOC.
pub fn codestream(width: u32, height: u32, components: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0x4F, 0xFF, 0x51];
    data.extend_from_slice(&(38 + 3 * components).to_be_bytes());
    data.extend_from_slice(&[0x00, 0x00]);
    for v in [width, height, 0, 0, width, height, 0, 0] {
        data.extend_from_slice(&v.to_be_bytes());
    }
    data.extend_from_slice(&components.to_be_bytes());
    for _ in 0..components {
        data.extend_from_slice(&[0x07, 1, 1]);
    }
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}
