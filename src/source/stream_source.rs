//! Stream-backed byte spans over caller-supplied objects

use crate::error::{Result, VolumeError};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Capability set required of a caller-supplied stream object.
///
/// A stream must support positioned reads and report its total length.
/// Implementations must not require exclusive access for reads; the volume
/// layer calls these methods through a shared reference.
pub trait StreamObject: Send + Sync {
    /// Read up to `buf.len()` bytes at `offset`, returning the number of
    /// bytes read. A return of 0 means end-of-stream.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Total length of the stream in bytes.
    fn len(&self) -> io::Result<u64>;
}

impl StreamObject for File {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        #[cfg(unix)]
        {
            std::os::unix::fs::FileExt::read_at(self, buf, offset)
        }
        #[cfg(windows)]
        {
            std::os::windows::fs::FileExt::seek_read(self, buf, offset)
        }
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Adapter exposing positioned reads over a sequential `Read + Seek` stream.
///
/// The inner stream's cursor is repositioned on every read, so the caller
/// must not rely on its position while the adapter is in use.
pub struct SeekStream<T> {
    inner: Mutex<T>,
}

impl<T: Read + Seek + Send> SeekStream<T> {
    /// Wrap a sequential stream.
    pub fn new(inner: T) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Unwrap the adapter, returning the inner stream.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Read + Seek + Send> StreamObject for SeekStream<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        inner.seek(SeekFrom::Start(offset))?;
        inner.read(buf)
    }

    fn len(&self) -> io::Result<u64> {
        let mut inner = self.inner.lock();
        let position = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;
        Ok(end)
    }
}

/// Byte span backed by a caller-owned stream object.
///
/// Holds a weak reference only: the caller keeps ownership of the stream
/// and may drop it at any time. Reads after that fail with an IO error;
/// releasing the span never touches the caller's object.
pub struct StreamSource {
    stream: Weak<dyn StreamObject>,
    size: u64,
}

impl StreamSource {
    /// Acquire a span over `stream`, probing its capabilities eagerly.
    ///
    /// The size query doubles as the capability check: a stream that cannot
    /// report its length is rejected before any content is read.
    pub fn open<S>(stream: &Arc<S>) -> Result<Self>
    where
        S: StreamObject + 'static,
    {
        let size = stream.len().map_err(|e| {
            VolumeError::MissingCapability(format!("stream object must report a size: {e}"))
        })?;

        debug!("Acquired stream-backed source ({size} bytes)");

        let stream: Arc<dyn StreamObject> = stream.clone();
        let stream: Weak<dyn StreamObject> = Arc::downgrade(&stream);
        Ok(Self { stream, size })
    }

    /// Total length in bytes, fixed at acquisition time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read up to `buf.len()` bytes at `offset`, clamped to the span.
    ///
    /// Fails with an IO error if the caller has dropped the underlying
    /// stream object in the meantime.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.size {
            return Ok(0);
        }
        let want = (self.size - offset).min(buf.len() as u64) as usize;

        let stream = self.stream.upgrade().ok_or_else(|| {
            warn!("Read on stream-backed source whose object was dropped");
            VolumeError::Io(io::Error::other(
                "stream object was dropped while the volume was open",
            ))
        })?;

        let mut total = 0;
        while total < want {
            match stream.read_at(offset + total as u64, &mut buf[total..want]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }
}

impl std::fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("size", &self.size)
            .field("alive", &(self.stream.strong_count() > 0))
            .finish()
    }
}
