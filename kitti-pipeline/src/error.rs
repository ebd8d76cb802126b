use std::path::PathBuf;

use kitti_core::FrameError;
use thiserror::Error;

use crate::config::ConfigError;

/// Failures that stop a whole run. Per-frame failures never surface here;
/// they end up in the run's [`crate::RunSummary`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to serialize run report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("report collector thread panicked")]
    Collector,
}
