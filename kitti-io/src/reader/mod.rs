pub mod pcd;

use std::path::Path;

use kitti_core::{AttributeRecord, Result};

/// Reads one per-point scalar attribute out of a point container file.
pub trait AttributeReader: Send + Sync {
    fn read_attribute(&self, path: &Path) -> Result<AttributeRecord>;
}
