//! Configuration for volume handles

/// Options applied when a volume handle acquires a byte source.
///
/// Fixed for the lifetime of the handle; they only influence how a
/// path-backed source is set up at open time.
#[derive(Debug, Clone)]
pub struct VolumeOptions {
    /// Memory-map path-backed images when the size gate allows it
    pub use_memory_mapping: bool,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            use_memory_mapping: true,
        }
    }
}
