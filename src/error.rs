//! Error types for volume access operations

use std::io;
use thiserror::Error;

use crate::types::OpenMode;

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("missing required capability: {0}")]
    MissingCapability(String),

    #[error("unsupported open mode {0:?}: only read access is supported")]
    UnsupportedMode(OpenMode),

    #[error("volume is already open")]
    AlreadyOpen,

    #[error("volume is not open")]
    NotOpen,

    #[error("operation aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, VolumeError>;
