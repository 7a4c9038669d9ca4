//! Volume handle lifecycle and cancellation

use crate::config::VolumeOptions;
use crate::error::{Result, VolumeError};
use crate::source::{ByteSource, StreamObject};
use crate::types::{OpenMode, SourceKind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Cloneable cross-thread view of a volume handle's abort flag.
///
/// Signaling never blocks and never fails, regardless of the handle's
/// state.
#[derive(Debug, Clone)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Request cancellation of work issued through the owning handle.
    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been requested
    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle onto one EXT-family filesystem image.
///
/// Owns at most one active [`ByteSource`] and enforces the open/close
/// state machine: a handle is constructed closed, becomes open only
/// through a successful [`open`](VolumeHandle::open) or
/// [`open_file_object`](VolumeHandle::open_file_object), and returns to
/// closed only through [`close`](VolumeHandle::close). Reopening without
/// an intervening close is rejected so that decode-time metadata caches
/// can never outlive the backing bytes they were built from.
///
/// The handle performs no internal locking; sharing one across threads
/// requires external mutual exclusion. The abort flag is the exception:
/// [`signal_abort`](VolumeHandle::signal_abort) and [`AbortSignal`] are
/// safe to use from any thread at any time.
#[derive(Debug)]
pub struct VolumeHandle {
    /// Active byte source; `Some` exactly while the handle is open
    source: Option<ByteSource>,
    /// Sticky cancellation flag, cleared on close
    abort: Arc<AtomicBool>,
    /// Acquisition options, fixed per handle
    options: VolumeOptions,
}

impl VolumeHandle {
    /// Construct a closed handle with no associated source.
    pub fn new() -> Self {
        Self::with_options(VolumeOptions::default())
    }

    /// Construct a closed handle with explicit acquisition options.
    pub fn with_options(options: VolumeOptions) -> Self {
        Self {
            source: None,
            abort: Arc::new(AtomicBool::new(false)),
            options,
        }
    }

    /// Open the volume image at `path`.
    ///
    /// Validation order: mode, then path, then state. A failed open leaves
    /// the handle closed with no dangling source.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: OpenMode) -> Result<()> {
        Self::check_mode(mode)?;

        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(VolumeError::MissingCapability(
                "path must be a non-empty string".into(),
            ));
        }
        if self.source.is_some() {
            return Err(VolumeError::AlreadyOpen);
        }

        let source = ByteSource::open_path(path, &self.options)?;
        debug!(
            "Opened volume from {:?} ({} bytes, memory-mapped: {})",
            path,
            source.size(),
            source.is_memory_mapped()
        );
        self.source = Some(source);
        Ok(())
    }

    /// Open the volume from a caller-owned stream object.
    ///
    /// Only a weak reference to `stream` is retained: the caller keeps
    /// ownership, may keep using the object for unrelated purposes after
    /// [`close`](VolumeHandle::close), and may drop it at any time (reads
    /// issued after that fail with an IO error, close still succeeds).
    pub fn open_file_object<S>(&mut self, stream: &Arc<S>, mode: OpenMode) -> Result<()>
    where
        S: StreamObject + 'static,
    {
        Self::check_mode(mode)?;

        let source = ByteSource::open_stream(stream)?;
        if self.source.is_some() {
            return Err(VolumeError::AlreadyOpen);
        }

        debug!("Opened volume from stream object ({} bytes)", source.size());
        self.source = Some(source);
        Ok(())
    }

    /// Close the volume, releasing the owned byte source exactly once.
    ///
    /// Clears the abort flag along with the rest of the per-open state, so
    /// a close-then-reopen resumes normal operation. Closing a handle that
    /// is not open fails with [`VolumeError::NotOpen`].
    pub fn close(&mut self) -> Result<()> {
        match self.source.take() {
            Some(source) => {
                debug!("Closing volume ({:?})", source.kind());
                drop(source);
                self.abort.store(false, Ordering::SeqCst);
                Ok(())
            }
            None => Err(VolumeError::NotOpen),
        }
    }

    /// Request cancellation of in-progress or subsequent decode work.
    ///
    /// Valid in any state, never blocks, never fails. The flag is sticky
    /// until the next [`close`](VolumeHandle::close).
    pub fn signal_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been requested
    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Fail with [`VolumeError::Aborted`] once cancellation was requested.
    ///
    /// Decode loops call this between steps so cancellation takes effect
    /// mid-scan rather than only at call boundaries.
    pub fn checkpoint(&self) -> Result<()> {
        if self.abort_requested() {
            return Err(VolumeError::Aborted);
        }
        Ok(())
    }

    /// Cloneable abort flag for signaling from other threads.
    pub fn abort_signal(&self) -> AbortSignal {
        AbortSignal(Arc::clone(&self.abort))
    }

    /// Check whether the handle is open
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Borrow the active byte source.
    pub fn source(&self) -> Result<&ByteSource> {
        self.source.as_ref().ok_or(VolumeError::NotOpen)
    }

    /// Total size of the open volume in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.source()?.size())
    }

    /// Read up to `length` bytes at `offset`.
    ///
    /// Clamped at end-of-volume; observes the abort flag before touching
    /// the source.
    pub fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.checkpoint()?;
        self.source()?.read_at(offset, length)
    }

    /// Read exactly `buf.len()` bytes at `offset`.
    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.checkpoint()?;
        self.source()?.read_exact_at(offset, buf)
    }

    /// Read up to `length` bytes from the volume cursor, advancing it.
    pub fn read_buffer(&mut self, length: usize) -> Result<Vec<u8>> {
        self.checkpoint()?;
        self.source
            .as_mut()
            .ok_or(VolumeError::NotOpen)?
            .read_buffer(length)
    }

    /// Backing strategy of the open volume.
    pub fn kind(&self) -> Result<SourceKind> {
        Ok(self.source()?.kind())
    }

    fn check_mode(mode: OpenMode) -> Result<()> {
        match mode {
            OpenMode::Read => Ok(()),
            OpenMode::Write => Err(VolumeError::UnsupportedMode(mode)),
        }
    }
}

impl Default for VolumeHandle {
    fn default() -> Self {
        Self::new()
    }
}
