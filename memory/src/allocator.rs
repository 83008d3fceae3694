use std::{fmt::Debug, ops::Range, ptr::NonNull};

use crate::{
    error::{AllocationError, MappingError, TransferError},
    usage::{BufferUsage, ImageInfo},
};

/// Resource handle bound to the memory the allocator gave it.
#[derive(Debug)]
pub struct Allocation<T, M> {
    raw: T,
    memory: M,
    size: u64,
    name: String,
}

impl<T, M> Allocation<T, M> {
    /// Wrap a resource created by an allocator.
    pub fn new(raw: T, memory: M, size: u64, name: impl Into<String>) -> Self {
        Allocation {
            raw,
            memory,
            size,
            name: name.into(),
        }
    }

    /// Raw resource handle.
    pub fn raw(&self) -> &T {
        &self.raw
    }

    /// Memory object the resource is bound to.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Size of the bound memory range in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Debug name given on allocation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Split into raw parts.
    pub fn into_parts(self) -> (T, M) {
        (self.raw, self.memory)
    }
}

/// External GPU allocator.
///
/// Implemented by the application on top of its memory manager.
/// Prism calls it from the thread that owns the resource model only.
pub trait Allocator {
    /// Buffer handle type.
    type Buffer: Debug;

    /// Image handle type.
    type Image: Debug;

    /// Memory object type.
    type Memory: Debug;

    /// Create a buffer bound to host-visible memory.
    fn allocate_buffer(
        &mut self,
        size: u64,
        usage: BufferUsage,
        name: &str,
    ) -> Result<Allocation<Self::Buffer, Self::Memory>, AllocationError>;

    /// Create a device-local image.
    fn allocate_image(
        &mut self,
        info: &ImageInfo,
        name: &str,
    ) -> Result<Allocation<Self::Image, Self::Memory>, AllocationError>;

    /// Map memory range.
    /// Only one range for the given memory object can be mapped.
    ///
    /// # Safety
    ///
    /// `memory` must come from an allocation of this allocator that was not deallocated.
    unsafe fn map_memory(
        &mut self,
        memory: &Self::Memory,
        range: Range<u64>,
    ) -> Result<NonNull<u8>, MappingError>;

    /// Unmap memory.
    ///
    /// # Safety
    ///
    /// `memory` must be mapped.
    unsafe fn unmap_memory(&mut self, memory: &Self::Memory);

    /// Destroy buffer and release its memory.
    ///
    /// # Safety
    ///
    /// The device must not use the buffer anymore.
    unsafe fn deallocate_buffer(&mut self, allocation: Allocation<Self::Buffer, Self::Memory>);

    /// Destroy image and release its memory.
    ///
    /// # Safety
    ///
    /// The device must not use the image anymore.
    unsafe fn deallocate_image(&mut self, allocation: Allocation<Self::Image, Self::Memory>);

    /// Upload `data` into the whole image and transition it for shader reads.
    /// Blocks until the transfer completes.
    fn transfer_image_memory(
        &mut self,
        image: &Allocation<Self::Image, Self::Memory>,
        info: &ImageInfo,
        data: &[u8],
    ) -> Result<(), TransferError>;
}

/// Copy `data` into the buffer at `offset` through a temporary mapping.
pub fn write_bytes<A>(
    allocator: &mut A,
    buffer: &Allocation<A::Buffer, A::Memory>,
    offset: u64,
    data: &[u8],
) -> Result<(), MappingError>
where
    A: Allocator + ?Sized,
{
    let end = match offset.checked_add(data.len() as u64) {
        Some(end) if end <= buffer.size() => end,
        _ => {
            return Err(MappingError::OutOfBounds {
                start: offset,
                end: offset.saturating_add(data.len() as u64),
                size: buffer.size(),
            })
        }
    };

    if data.is_empty() {
        return Ok(());
    }

    log::trace!("Write {} bytes at {} into '{}'", data.len(), offset, buffer.name());
    unsafe {
        let ptr = allocator.map_memory(buffer.memory(), offset..end)?;
        std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
        allocator.unmap_memory(buffer.memory());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::MockAllocator;

    #[test]
    fn write_bytes_lands_at_offset() {
        let mut allocator = MockAllocator::new();
        let buffer = allocator
            .allocate_buffer(16, BufferUsage::UNIFORM, "ubo")
            .unwrap();

        write_bytes(&mut allocator, &buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            allocator.contents(buffer.memory()),
            &[0, 0, 0, 0, 1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0][..]
        );
        assert_eq!(allocator.mapped(), 0);

        unsafe { allocator.deallocate_buffer(buffer) };
        assert_eq!(allocator.live(), 0);
    }

    #[test]
    fn write_bytes_out_of_bounds() {
        let mut allocator = MockAllocator::new();
        let buffer = allocator
            .allocate_buffer(8, BufferUsage::STORAGE, "ssbo")
            .unwrap();

        let err = write_bytes(&mut allocator, &buffer, 6, &[0; 4]).unwrap_err();
        assert_eq!(
            err,
            MappingError::OutOfBounds {
                start: 6,
                end: 10,
                size: 8
            }
        );

        unsafe { allocator.deallocate_buffer(buffer) };
    }

    #[test]
    fn write_bytes_offset_overflow() {
        let mut allocator = MockAllocator::new();
        let buffer = allocator
            .allocate_buffer(16, BufferUsage::UNIFORM, "ubo")
            .unwrap();

        let err = write_bytes(&mut allocator, &buffer, std::u64::MAX, &[1, 2]).unwrap_err();
        assert_eq!(
            err,
            MappingError::OutOfBounds {
                start: std::u64::MAX,
                end: std::u64::MAX,
                size: 16
            }
        );
        assert_eq!(allocator.mapped(), 0);
        assert!(allocator.contents(buffer.memory()).iter().all(|&b| b == 0));

        unsafe { allocator.deallocate_buffer(buffer) };
    }
}
