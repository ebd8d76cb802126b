use std::collections::BTreeSet;

use itertools::Itertools as _;
use kitti_core::{FrameId, FrameKey, Result, SceneId};
use kitti_io::SceneLayout;

use crate::config::{FramePolicy, PipelineConfig};

/// Combines per-sensor frame lists (each sorted, in sensor order) under `policy`.
pub fn combine_frames(policy: FramePolicy, per_sensor: &[Vec<FrameId>]) -> Vec<FrameId> {
    match policy {
        FramePolicy::Primary => per_sensor.first().cloned().unwrap_or_default(),
        FramePolicy::Union => per_sensor
            .iter()
            .map(|frames| frames.iter().copied())
            .kmerge()
            .dedup()
            .collect(),
        FramePolicy::Intersection => {
            let Some((first, rest)) = per_sensor.split_first() else {
                return Vec::new();
            };
            let rest: Vec<BTreeSet<FrameId>> = rest
                .iter()
                .map(|frames| frames.iter().copied().collect())
                .collect();
            first
                .iter()
                .copied()
                .filter(|frame| rest.iter().all(|set| set.contains(frame)))
                .collect()
        }
    }
}

/// Decides which (scene, frame) units a run processes.
pub struct UnitPlanner<'a> {
    config: &'a PipelineConfig,
    layouts: Vec<SceneLayout>,
}

impl<'a> UnitPlanner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        let layouts = config
            .sensors
            .iter()
            .map(|sensor| SceneLayout::new(&sensor.source_root))
            .collect();
        Self { config, layouts }
    }

    /// Configured scenes in order, else every scene found under any sensor root.
    pub fn scenes(&self) -> Result<Vec<SceneId>> {
        if !self.config.scene_ids.is_empty() {
            return Ok(self.config.scene_ids.clone());
        }
        let mut scenes = BTreeSet::new();
        for layout in self.layouts.iter().unique_by(|layout| layout.root().to_path_buf()) {
            scenes.extend(layout.discover_scenes()?);
        }
        Ok(scenes.into_iter().collect())
    }

    pub fn frames(&self, scene: &SceneId) -> Result<Vec<FrameId>> {
        let per_sensor = self
            .layouts
            .iter()
            .map(|layout| layout.discover_frames(scene))
            .collect::<Result<Vec<_>>>()?;

        let mut frames = combine_frames(self.config.frame_policy, &per_sensor);
        if let Some(allowed) = &self.config.frames {
            frames.retain(|frame| allowed.contains(frame));
        }
        Ok(frames)
    }

    pub fn plan(&self) -> Result<Vec<FrameKey>> {
        let mut units = Vec::new();
        for scene in self.scenes()? {
            let frames = self.frames(&scene)?;
            if frames.is_empty() {
                log::warn!("scene {scene}: no frames to merge");
            } else {
                log::debug!("scene {scene}: {} frames", frames.len());
            }
            units.extend(frames.into_iter().map(|frame| FrameKey::new(scene, frame)));
        }
        Ok(units)
    }
}
