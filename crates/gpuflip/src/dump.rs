//! Raw buffer dumps, used instead of corruption when inspecting what the driver puts in tracked
//! buffers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::memory::{BufferMemory, BufferMemoryError};
use crate::registry::{BufferDescriptor, BufferRegistry};
use crate::seed::unix_seconds;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to read buffer 0x{addr:x}: {source}")]
    Read {
        addr: usize,
        #[source]
        source: BufferMemoryError,
    },

    #[error("failed to write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `GPU_<unix-seconds>_0x<base>_<length-hex>`
pub fn dump_file_name(timestamp: u64, desc: &BufferDescriptor) -> String {
    format!(
        "GPU_{timestamp}_{:#x}_{:x}",
        desc.start(),
        desc.length()
    )
}

pub fn dump_buffer(
    dir: &Path,
    timestamp: u64,
    desc: &BufferDescriptor,
    mem: &dyn BufferMemory,
) -> Result<PathBuf, DumpError> {
    let mut bytes = vec![0u8; desc.length()];
    mem.read(desc.start(), &mut bytes)
        .map_err(|source| DumpError::Read {
            addr: desc.start(),
            source,
        })?;

    let path = dir.join(dump_file_name(timestamp, desc));
    fs::write(&path, &bytes).map_err(|source| DumpError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Dump every tracked buffer into `dir`. A buffer that fails to dump is logged and skipped.
pub fn dump_registry(dir: &Path, registry: &BufferRegistry, mem: &dyn BufferMemory) -> Vec<PathBuf> {
    tracing::info!(total = registry.len(), dir = %dir.display(), "dumping GPU buffers");

    let timestamp = unix_seconds();
    let mut written = Vec::with_capacity(registry.len());
    for desc in registry {
        match dump_buffer(dir, timestamp, desc, mem) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "dumped buffer");
                written.push(path);
            }
            Err(err) => tracing::warn!("{err}"),
        }
    }
    written
}
