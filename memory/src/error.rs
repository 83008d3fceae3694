//! Failures reported by the external allocator.

/// Host or device heap exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum OutOfMemoryError {
    /// No host memory left.
    #[fail(display = "Host memory exhausted")]
    OutOfHostMemory,

    /// No device memory left.
    #[fail(display = "Device memory exhausted")]
    OutOfDeviceMemory,
}

/// Memory of an allocation could not be mapped for a host write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum MappingError {
    /// Allocation lives in memory the host can't see.
    #[fail(display = "Allocation is not host visible")]
    NotHostVisible,

    /// Requested range exceeds the allocation.
    #[fail(display = "Range {}..{} exceeds allocation of {} bytes", start, end, size)]
    OutOfBounds {
        /// First byte.
        start: u64,
        /// One past the last byte.
        end: u64,
        /// Allocation size.
        size: u64,
    },

    /// Mapping call failed.
    #[fail(display = "Failed to map memory")]
    Failed,

    /// Heap exhausted while mapping.
    #[fail(display = "{}", _0)]
    OutOfMemory(OutOfMemoryError),
}

impl From<OutOfMemoryError> for MappingError {
    fn from(error: OutOfMemoryError) -> Self {
        MappingError::OutOfMemory(error)
    }
}

/// Buffer or image could not be created.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum AllocationError {
    /// Heap exhausted.
    #[fail(display = "{}", _0)]
    OutOfMemory(OutOfMemoryError),

    /// Driver object count limit reached.
    #[fail(display = "Too many allocations")]
    TooManyObjects,

    /// Image format can't be used for the requested usage.
    #[fail(display = "Format {:?} is not supported for '{}'", _0, _1)]
    UnsupportedFormat(crate::ImageFormat, String),
}

impl From<OutOfMemoryError> for AllocationError {
    fn from(error: OutOfMemoryError) -> Self {
        AllocationError::OutOfMemory(error)
    }
}

/// Pixels could not be uploaded into an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum TransferError {
    /// Pixel data doesn't cover the image exactly.
    #[fail(display = "Image takes {} bytes, {} given", expected, actual)]
    DataSizeMismatch {
        /// `ImageInfo::data_size` of the target.
        expected: u64,
        /// Length of the given data.
        actual: u64,
    },

    /// Heap exhausted while staging.
    #[fail(display = "{}", _0)]
    OutOfMemory(OutOfMemoryError),

    /// Transfer submission failed or its wait returned an error.
    #[fail(display = "Upload submission failed")]
    SubmissionFailed,
}

impl From<OutOfMemoryError> for TransferError {
    fn from(error: OutOfMemoryError) -> Self {
        TransferError::OutOfMemory(error)
    }
}
