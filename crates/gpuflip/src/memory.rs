use core::ops::Range;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferMemoryError {
    #[error("buffer access out of bounds (addr=0x{addr:x}, len={len})")]
    OutOfBounds { addr: usize, len: usize },
}

/// Byte-level access to the memory backing tracked buffers.
///
/// Addresses are the raw base addresses handed out by the driver. The engine only ever touches
/// `[start, start + length)` of a registered buffer, so implementations may assume accesses stay
/// inside regions that were valid at registration time.
pub trait BufferMemory {
    fn read(&self, addr: usize, dst: &mut [u8]) -> Result<(), BufferMemoryError>;
    fn write(&mut self, addr: usize, src: &[u8]) -> Result<(), BufferMemoryError>;

    /// Native-endian 32-bit load.
    fn read_u32(&self, addr: usize) -> Result<u32, BufferMemoryError> {
        let mut buf = [0u8; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_ne_bytes(buf))
    }

    /// Native-endian 32-bit store.
    fn write_u32(&mut self, addr: usize, value: u32) -> Result<(), BufferMemoryError> {
        self.write(addr, &value.to_ne_bytes())
    }
}

/// A flat address space backed by a single `Vec<u8>`, starting at `base`.
///
/// Used by tests and the fuzz target in place of driver-owned memory. Several buffers can be
/// carved out of one instance at different offsets.
#[derive(Debug, Clone)]
pub struct VecBufferMemory {
    base: usize,
    data: Vec<u8>,
}

impl VecBufferMemory {
    pub fn new(base: usize, size_bytes: usize) -> Self {
        Self {
            base,
            data: vec![0u8; size_bytes],
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Borrow `len` bytes at `addr`, if the whole range is backed.
    pub fn bytes(&self, addr: usize, len: usize) -> Option<&[u8]> {
        let range = self.range(addr, len).ok()?;
        self.data.get(range)
    }

    fn range(&self, addr: usize, len: usize) -> Result<Range<usize>, BufferMemoryError> {
        let oob = BufferMemoryError::OutOfBounds { addr, len };
        let start = addr.checked_sub(self.base).ok_or(oob)?;
        let end = start.checked_add(len).ok_or(oob)?;
        if end > self.data.len() {
            return Err(oob);
        }
        Ok(start..end)
    }
}

impl BufferMemory for VecBufferMemory {
    fn read(&self, addr: usize, dst: &mut [u8]) -> Result<(), BufferMemoryError> {
        let range = self.range(addr, dst.len())?;
        dst.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, addr: usize, src: &[u8]) -> Result<(), BufferMemoryError> {
        let range = self.range(addr, src.len())?;
        self.data[range].copy_from_slice(src);
        Ok(())
    }
}
