pub mod ancillary;
pub mod flat;
pub mod layout;
pub mod reader;

pub use flat::{read_labels, read_points, write_bytes, write_labels, write_points};
pub use layout::{locate_attribute_file, SceneLayout};
pub use reader::{pcd::PcdAttributeReader, AttributeReader};
