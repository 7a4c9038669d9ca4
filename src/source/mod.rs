//! Byte source abstraction over path and stream backings

mod path_source;
mod stream_source;

pub use path_source::PathSource;
pub use stream_source::{SeekStream, StreamObject, StreamSource};

use crate::config::VolumeOptions;
use crate::error::{Result, VolumeError};
use crate::types::SourceKind;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// A finite, addressable span of bytes backing a volume.
///
/// Provides uniform size, positioned-read, and cursor access regardless of
/// whether the bytes come from a path or a caller-supplied stream object.
/// The span's size is queried once at acquisition and treated as immutable
/// for the lifetime of the source.
#[derive(Debug)]
pub struct ByteSource {
    backend: SourceBackend,
    size: u64,
    position: u64,
}

#[derive(Debug)]
enum SourceBackend {
    Path(PathSource),
    Stream(StreamSource),
}

impl ByteSource {
    /// Acquire a span over the file at `path`.
    pub fn open_path(path: impl AsRef<Path>, options: &VolumeOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(VolumeError::MissingCapability(
                "path must be a non-empty string".into(),
            ));
        }

        let backend = PathSource::open(path, options)?;
        let size = backend.size();
        Ok(Self {
            backend: SourceBackend::Path(backend),
            size,
            position: 0,
        })
    }

    /// Acquire a span over a caller-owned stream object.
    ///
    /// Only a weak reference to `stream` is retained; the caller keeps
    /// ownership and may drop the object at any time.
    pub fn open_stream<S>(stream: &Arc<S>) -> Result<Self>
    where
        S: StreamObject + 'static,
    {
        let backend = StreamSource::open(stream)?;
        let size = backend.size();
        Ok(Self {
            backend: SourceBackend::Stream(backend),
            size,
            position: 0,
        })
    }

    /// Total length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current cursor for sequential reads.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Backing strategy of this span.
    pub fn kind(&self) -> SourceKind {
        match self.backend {
            SourceBackend::Path(_) => SourceKind::PathBacked,
            SourceBackend::Stream(_) => SourceKind::StreamBacked,
        }
    }

    /// Check if memory mapping is active (always false for stream backings)
    pub fn is_memory_mapped(&self) -> bool {
        match &self.backend {
            SourceBackend::Path(source) => source.is_memory_mapped(),
            SourceBackend::Stream(_) => false,
        }
    }

    /// Read up to `length` bytes from the cursor, advancing it.
    ///
    /// Returns fewer bytes than requested only at end-of-span.
    pub fn read_buffer(&mut self, length: usize) -> Result<Vec<u8>> {
        let data = self.read_at(self.position, length)?;
        self.position += data.len() as u64;
        Ok(data)
    }

    /// Read up to `length` bytes at `offset` without moving the cursor.
    ///
    /// Clamped to the span: returns fewer bytes than requested only at
    /// end-of-span.
    pub fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let want = if offset >= self.size {
            0
        } else {
            (self.size - offset).min(length as u64) as usize
        };

        let mut data = vec![0u8; want];
        let n = self.backend_read_at(offset, &mut data)?;
        data.truncate(n);
        Ok(data)
    }

    /// Read exactly `buf.len()` bytes at `offset`.
    ///
    /// Fails with an IO error when the span cannot satisfy the full
    /// request.
    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let n = self.backend_read_at(offset, buf)?;
        if n != buf.len() {
            return Err(VolumeError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read beyond source bounds: offset={}, length={}, size={}",
                    offset,
                    buf.len(),
                    self.size
                ),
            )));
        }
        Ok(())
    }

    fn backend_read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        match &self.backend {
            SourceBackend::Path(source) => source.read_at(offset, buf),
            SourceBackend::Stream(source) => source.read_at(offset, buf),
        }
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self
            .backend_read_at(self.position, buf)
            .map_err(|e| match e {
                VolumeError::Io(e) => e,
                other => io::Error::other(other),
            })?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for ByteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let position = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        self.position = position.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the source",
            )
        })?;
        Ok(self.position)
    }
}
