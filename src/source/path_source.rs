//! Path-backed byte spans with memory mapping support

use crate::config::VolumeOptions;
use crate::error::Result;
use crate::source::stream_source::StreamObject;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

/// Byte span backed by a file opened from a path.
///
/// Exclusively owns the descriptor it opens; the descriptor is released
/// when the span is dropped. Eligible images are memory-mapped with a
/// positioned-read fallback for everything else.
#[derive(Debug)]
pub struct PathSource {
    /// Memory-mapped image (if available)
    mmap: Option<Mmap>,
    /// Owned descriptor, also the fallback read path
    file: File,
    /// Size of the image, fixed at acquisition time
    size: u64,
}

impl PathSource {
    /// Open a span over the file at `path`.
    pub fn open(path: &Path, options: &VolumeOptions) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        debug!("Opening volume image: {:?} (size: {} bytes)", path, size);

        let mmap = if options.use_memory_mapping && size > 0 && Self::can_memory_map(size) {
            match unsafe { MmapOptions::new().map(&file) } {
                Ok(mmap) => {
                    debug!("Successfully memory-mapped volume image");
                    Some(mmap)
                }
                Err(e) => {
                    debug!("Failed to memory-map volume image, using positioned reads: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { mmap, file, size })
    }

    /// Whether an image of `size` bytes is eligible for memory mapping.
    ///
    /// 32-bit targets cannot map anything approaching their address space;
    /// on 64-bit targets very large images stay on the positioned-read path
    /// to avoid exhausting virtual memory.
    pub fn can_memory_map(size: u64) -> bool {
        #[cfg(target_pointer_width = "32")]
        {
            size < 2 * 1024 * 1024 * 1024
        }
        #[cfg(not(target_pointer_width = "32"))]
        {
            size <= 128 * 1024 * 1024 * 1024
        }
    }

    /// Total length in bytes, fixed at acquisition time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Check if memory mapping is active
    pub fn is_memory_mapped(&self) -> bool {
        self.mmap.is_some()
    }

    /// Read up to `buf.len()` bytes at `offset`, clamped to the span.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.size {
            return Ok(0);
        }
        let want = (self.size - offset).min(buf.len() as u64) as usize;

        if let Some(ref mmap) = self.mmap {
            // Fast path: copy straight out of the mapping
            let start = offset as usize;
            buf[..want].copy_from_slice(&mmap[start..start + want]);
            return Ok(want);
        }

        let mut total = 0;
        while total < want {
            match StreamObject::read_at(&self.file, offset + total as u64, &mut buf[total..want]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }
}
