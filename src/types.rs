//! Common types used throughout the volume access layer

/// Access mode requested when opening a volume.
///
/// Only [`OpenMode::Read`] is supported. [`OpenMode::Write`] exists so that
/// write intent is rejected explicitly instead of being downgraded to a
/// silent read-only open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access
    Read,
    /// Write access (rejected, the volume layer is read-only)
    Write,
}

/// Backing strategy of an acquired byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The source owns a file descriptor opened from a path
    PathBacked,
    /// The source borrows a caller-supplied stream object
    StreamBacked,
}
