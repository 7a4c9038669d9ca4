//! Volume handle implementation

mod volume_handle;

pub use volume_handle::{AbortSignal, VolumeHandle};
