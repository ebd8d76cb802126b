pub mod config;
pub mod error;
pub mod filter;
pub mod inject;
pub mod merge;
pub mod planner;
pub mod report;
pub mod runner;

pub use config::{AncillaryConfig, ConfigError, FramePolicy, PipelineConfig, SensorConfig};
pub use error::PipelineError;
pub use filter::{FilteredFrame, FrameFilter};
pub use inject::{AttributeAlignment, IntensityInjector, INTENSITY_SCALE};
pub use merge::{FrameMerger, MergedFrame, SensorContribution, SensorCount};
pub use planner::UnitPlanner;
pub use report::{FrameReport, FrameStatus, RunSummary};
pub use runner::FramePipeline;
