use num_enum::TryFromPrimitive;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    // Backend status codes
    #[error("Backend not initialized")]
    NotInitialized,
    #[error("Invalid backend parameter")]
    InvalidParameter,
    #[error("Codestream rejected by backend")]
    BadJpeg,
    #[error("Codestream feature not supported by backend")]
    JpegNotSupported,
    #[error("Backend allocator failure")]
    AllocatorFailure,
    #[error("Backend execution failed")]
    ExecutionFailed,
    #[error("Device architecture mismatch")]
    ArchMismatch,
    #[error("Backend internal error")]
    InternalError,
    #[error("Operation not implemented by backend")]
    ImplementationNotSupported,

    // Device runtime failures carry the runtime's own error code
    #[error("Device runtime failure #{0}")]
    Device(i32),

    // Codestream and argument errors
    #[error("Need more data")]
    NeedMoreData,
    #[error("Invalid data")]
    InvalidData,
    #[error("Component precision of {0} bits not supported")]
    UnsupportedPrecision(u8),
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Subsampled components require RGB-interleaved output for readback")]
    SubsampledReadback,
}

/// Raw status codes reported by C-style decode backends.
///
/// Zero is success; every other value maps onto a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum BackendStatus {
    Success = 0,
    NotInitialized = 1,
    InvalidParameter = 2,
    BadJpeg = 3,
    JpegNotSupported = 4,
    AllocatorFailure = 5,
    ExecutionFailed = 6,
    ArchMismatch = 7,
    InternalError = 8,
    ImplementationNotSupported = 9,
}

impl BackendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "STATUS_SUCCESS",
            Self::NotInitialized => "STATUS_NOT_INITIALIZED",
            Self::InvalidParameter => "STATUS_INVALID_PARAMETER",
            Self::BadJpeg => "STATUS_BAD_JPEG",
            Self::JpegNotSupported => "STATUS_JPEG_NOT_SUPPORTED",
            Self::AllocatorFailure => "STATUS_ALLOCATOR_FAILURE",
            Self::ExecutionFailed => "STATUS_EXECUTION_FAILED",
            Self::ArchMismatch => "STATUS_ARCH_MISMATCH",
            Self::InternalError => "STATUS_INTERNAL_ERROR",
            Self::ImplementationNotSupported => "STATUS_IMPLEMENTATION_NOT_SUPPORTED",
        }
    }

    /// Converts a raw status into a `Result`.
    ///
    /// Codes outside the known range are reported as [`DecodeError::InternalError`].
    pub fn check(raw: u32) -> Result<(), DecodeError> {
        let status = Self::try_from(raw).map_err(|_| DecodeError::InternalError)?;
        match status {
            Self::Success => Ok(()),
            Self::NotInitialized => Err(DecodeError::NotInitialized),
            Self::InvalidParameter => Err(DecodeError::InvalidParameter),
            Self::BadJpeg => Err(DecodeError::BadJpeg),
            Self::JpegNotSupported => Err(DecodeError::JpegNotSupported),
            Self::AllocatorFailure => Err(DecodeError::AllocatorFailure),
            Self::ExecutionFailed => Err(DecodeError::ExecutionFailed),
            Self::ArchMismatch => Err(DecodeError::ArchMismatch),
            Self::InternalError => Err(DecodeError::InternalError),
            Self::ImplementationNotSupported => Err(DecodeError::ImplementationNotSupported),
        }
    }
}

/// Converts a device runtime error code (zero is success) into a `Result`.
pub fn check_device(code: i32) -> Result<(), DecodeError> {
    if code == 0 {
        Ok(())
    } else {
        Err(DecodeError::Device(code))
    }
}
