use std::path::Path;

use kitti_core::{FrameError, FrameId, FrameKey, SceneId};
use serde::Serialize;

use crate::{error::PipelineError, merge::MergedFrame, merge::SensorCount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FrameStatus {
    Merged,
    Skipped { check: &'static str, detail: String },
}

/// Outcome of one (scene, frame) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub scene: SceneId,
    pub frame: FrameId,
    #[serde(flatten)]
    pub status: FrameStatus,
    pub sensors: Vec<SensorCount>,
    pub merged_points: usize,
}

impl FrameReport {
    pub fn merged(key: &FrameKey, merged: &MergedFrame) -> Self {
        Self {
            scene: key.scene,
            frame: key.frame,
            status: FrameStatus::Merged,
            sensors: merged.provenance.clone(),
            merged_points: merged.len(),
        }
    }

    pub fn skipped(key: &FrameKey, error: &FrameError) -> Self {
        Self {
            scene: key.scene,
            frame: key.frame,
            status: FrameStatus::Skipped {
                check: error.check(),
                detail: error.to_string(),
            },
            sensors: Vec::new(),
            merged_points: 0,
        }
    }

    pub fn key(&self) -> FrameKey {
        FrameKey::new(self.scene, self.frame)
    }

    pub fn is_merged(&self) -> bool {
        self.status == FrameStatus::Merged
    }
}

/// Totals for a whole run plus every unit's report, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub units: usize,
    pub merged: usize,
    pub skipped: usize,
    /// Merged units that ended up with zero points.
    pub empty: usize,
    pub merged_points: usize,
    pub reports: Vec<FrameReport>,
}

impl RunSummary {
    pub fn record(&mut self, report: FrameReport) {
        self.units += 1;
        if report.is_merged() {
            self.merged += 1;
            self.merged_points += report.merged_points;
            if report.merged_points == 0 {
                self.empty += 1;
            }
        } else {
            self.skipped += 1;
        }
        self.reports.push(report);
    }

    pub fn finish(mut self) -> Self {
        self.reports.sort_by_key(FrameReport::key);
        self
    }

    pub fn skipped_reports(&self) -> impl Iterator<Item = &FrameReport> {
        self.reports.iter().filter(|r| !r.is_merged())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| PipelineError::Report {
            path: path.to_path_buf(),
            source,
        })?;
        kitti_io::write_bytes(path, &json)?;
        Ok(())
    }
}
