pub mod error;
pub mod frame;

pub use error::{FrameError, Result};
pub use frame::{
    key::{FrameId, FrameKey, SceneId},
    record::{AttributeRecord, LabelRecord, Point, PointRecord, POINT_WIDTH},
    selection::Selection,
};
