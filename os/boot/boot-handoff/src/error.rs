//! # Loader error types

use uefi::Status;

/// A firmware capability call returned a non-success status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("firmware call failed: {0:?}")]
pub struct FirmwareError(pub Status);

impl FirmwareError {
    #[inline]
    #[must_use]
    pub const fn status(self) -> Status {
        self.0
    }
}

impl From<Status> for FirmwareError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl From<FirmwareError> for Status {
    fn from(value: FirmwareError) -> Self {
        value.0
    }
}

/// Why a volume-based kernel lookup failed.
///
/// Never escapes [`KernelResolver::resolve`](crate::KernelResolver::resolve);
/// every variant ends in the built-in fallback image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no file system on the boot device")]
    NoVolume(#[source] FirmwareError),
    #[error("unable to open the volume root directory")]
    NoRootDirectory(#[source] FirmwareError),
    #[error("no kernel at any of the {tried} candidate paths")]
    NotFound { tried: usize },
    #[error("unable to query the size of {path}")]
    Size {
        path: &'static str,
        #[source]
        source: FirmwareError,
    },
    #[error("{path} is empty")]
    Empty { path: &'static str },
    #[error("{path} is too large to address ({size} bytes)")]
    TooLarge { path: &'static str, size: u64 },
    #[error("unable to allocate {size} bytes for {path}")]
    Allocation { path: &'static str, size: usize },
    #[error("unable to read {path}")]
    Read {
        path: &'static str,
        #[source]
        source: FirmwareError,
    },
    #[error("short read on {path}: got {read} of {expected} bytes")]
    ShortRead {
        path: &'static str,
        read: usize,
        expected: usize,
    },
}

/// A fatal failure before the point of no return.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    #[error("unable to claim the kernel load region")]
    LoadRegion(#[source] FirmwareError),
    #[error("load region holds {available} bytes, image needs {required}")]
    LoadRegionTooSmall { required: usize, available: usize },
    #[error("memory map size query returned {0:?} instead of BUFFER_TOO_SMALL")]
    UnexpectedSizeStatus(Status),
    #[error("memory map buffer size overflow")]
    MapSizeOverflow,
    #[error("unable to allocate {size} bytes for the memory map")]
    MapAllocation {
        size: usize,
        #[source]
        source: FirmwareError,
    },
    #[error("unable to fetch the memory map")]
    MemoryMap(#[source] FirmwareError),
    #[error("ExitBootServices failed ({first}), then the retry size query returned {status:?}")]
    RetrySizeStatus {
        first: FirmwareError,
        status: Status,
    },
    #[error("ExitBootServices failed twice (first: {first}, retry: {retry})")]
    ExitBootServices {
        first: FirmwareError,
        retry: FirmwareError,
    },
}

impl From<HandoffError> for Status {
    fn from(value: HandoffError) -> Self {
        match value {
            HandoffError::LoadRegion(e)
            | HandoffError::MapAllocation { source: e, .. }
            | HandoffError::MemoryMap(e) => e.status(),
            HandoffError::ExitBootServices { retry, .. } => retry.status(),
            HandoffError::UnexpectedSizeStatus(status)
            | HandoffError::RetrySizeStatus { status, .. } => {
                if status.is_success() {
                    Self::ABORTED
                } else {
                    status
                }
            }
            HandoffError::LoadRegionTooSmall { .. } => Self::BUFFER_TOO_SMALL,
            HandoffError::MapSizeOverflow => Self::BAD_BUFFER_SIZE,
        }
    }
}
