use core::ptr;

use gpuflip::{BufferMemory, BufferMemoryError};

/// Buffer memory of the host process, reached through raw addresses.
///
/// Only the null page and ranges that wrap the address space are refused; everything else is
/// trusted to lie inside a buffer the driver reported.
#[derive(Debug, Clone, Copy)]
pub struct RawBufferMemory {
    _private: (),
}

impl RawBufferMemory {
    /// # Safety
    ///
    /// Every address range later passed to [`BufferMemory::read`] / [`BufferMemory::write`] must
    /// be valid for reads and writes of that many bytes.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn check(addr: usize, len: usize) -> Result<(), BufferMemoryError> {
        if addr == 0 || addr.checked_add(len).is_none() {
            return Err(BufferMemoryError::OutOfBounds { addr, len });
        }
        Ok(())
    }
}

impl BufferMemory for RawBufferMemory {
    fn read(&self, addr: usize, dst: &mut [u8]) -> Result<(), BufferMemoryError> {
        Self::check(addr, dst.len())?;
        // SAFETY: `new`'s contract covers every range the engine asks for; `dst` is a distinct
        // Rust allocation.
        unsafe { ptr::copy_nonoverlapping(addr as *const u8, dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    fn write(&mut self, addr: usize, src: &[u8]) -> Result<(), BufferMemoryError> {
        Self::check(addr, src.len())?;
        // SAFETY: as above.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), addr as *mut u8, src.len()) };
        Ok(())
    }
}
