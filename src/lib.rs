//! Read-only volume access for EXT2/EXT3/EXT4 filesystem images
//!
//! This crate provides the handle layer that decoding engines read raw
//! bytes through: a strict open/close state machine over a single owned
//! byte source, acquired either from a filesystem path or from a
//! caller-supplied stream object, with cooperative cancellation for
//! long-running decode operations.

pub mod config;
pub mod error;
pub mod source;
pub mod types;
pub mod volume;

pub use config::VolumeOptions;
pub use error::{Result, VolumeError};
pub use types::{OpenMode, SourceKind};
pub use volume::{AbortSignal, VolumeHandle};

// Re-export commonly used types
pub use source::{ByteSource, SeekStream, StreamObject};
