//! Fixed-capacity store of the GPU-visible buffers discovered by the allocation hooks.
//!
//! The registry is append-only; buffers are never removed. Once full, newly discovered buffers
//! are not tracked.

use core::num::NonZeroUsize;

use thiserror::Error;

/// Number of buffers tracked per process.
pub const REGISTRY_CAPACITY: usize = 15;

/// Why a buffer was not admitted. None of these are errors for the caller; they only feed
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterRejection {
    #[error("null buffer address")]
    NullAddress,

    #[error("zero-length buffer")]
    ZeroLength,

    #[error("buffer length 0x{len:x} exceeds limit 0x{max:x}")]
    TooLarge { len: usize, max: usize },

    #[error("registry full ({capacity} buffers tracked)")]
    Full { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    start: NonZeroUsize,
    length: NonZeroUsize,
    /// Known-good copy captured before the first corruption pass.
    snapshot: Option<Box<[u8]>>,
}

impl BufferDescriptor {
    pub fn start(&self) -> usize {
        self.start.get()
    }

    pub fn length(&self) -> usize {
        self.length.get()
    }

    pub fn snapshot(&self) -> Option<&[u8]> {
        self.snapshot.as_deref()
    }

    /// Store the known-good copy of this buffer.
    ///
    /// The snapshot is write-once: returns `false` (and drops `bytes`) if one was already
    /// captured or if `bytes` does not cover the whole buffer.
    pub fn capture_snapshot(&mut self, bytes: Box<[u8]>) -> bool {
        if self.snapshot.is_some() || bytes.len() != self.length() {
            return false;
        }
        self.snapshot = Some(bytes);
        true
    }
}

#[derive(Debug, Clone)]
pub struct BufferRegistry {
    descriptors: Vec<BufferDescriptor>,
    capacity: usize,
    max_buffer_len: usize,
}

impl BufferRegistry {
    pub fn new(max_buffer_len: usize) -> Self {
        Self::with_capacity(REGISTRY_CAPACITY, max_buffer_len)
    }

    pub fn with_capacity(capacity: usize, max_buffer_len: usize) -> Self {
        Self {
            descriptors: Vec::with_capacity(capacity),
            capacity,
            max_buffer_len,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_buffer_len(&self) -> usize {
        self.max_buffer_len
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.descriptors.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&BufferDescriptor> {
        self.descriptors.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, BufferDescriptor> {
        self.descriptors.iter()
    }

    /// Admit `[start, start + length)`, returning the slot index it landed in.
    pub fn try_register(&mut self, start: usize, length: usize) -> Result<usize, RegisterRejection> {
        let start = NonZeroUsize::new(start).ok_or(RegisterRejection::NullAddress)?;
        let length = NonZeroUsize::new(length).ok_or(RegisterRejection::ZeroLength)?;
        if length.get() > self.max_buffer_len {
            return Err(RegisterRejection::TooLarge {
                len: length.get(),
                max: self.max_buffer_len,
            });
        }
        if self.is_full() {
            return Err(RegisterRejection::Full {
                capacity: self.capacity,
            });
        }

        self.descriptors.push(BufferDescriptor {
            start,
            length,
            snapshot: None,
        });
        Ok(self.descriptors.len() - 1)
    }

    /// Best-effort tracking: rejection is logged and otherwise ignored.
    pub fn register(&mut self, start: usize, length: usize) -> bool {
        match self.try_register(start, length) {
            Ok(slot) => {
                tracing::info!(
                    slot,
                    base = format_args!("0x{start:x}"),
                    size = format_args!("0x{length:x}"),
                    "registered buffer"
                );
                true
            }
            Err(reason) => {
                tracing::debug!(
                    base = format_args!("0x{start:x}"),
                    size = format_args!("0x{length:x}"),
                    %reason,
                    "buffer not tracked"
                );
                false
            }
        }
    }

    /// Visit every descriptor in discovery order.
    pub fn for_each<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut BufferDescriptor),
    {
        for desc in &mut self.descriptors {
            visitor(desc);
        }
    }
}

impl<'a> IntoIterator for &'a BufferRegistry {
    type Item = &'a BufferDescriptor;
    type IntoIter = core::slice::Iter<'a, BufferDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
