//! Run configuration, loaded from a JSON file.

use std::{
    collections::HashSet,
    fs,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};

use kitti_core::{FrameId, SceneId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inject::AttributeAlignment;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no sensors configured")]
    NoSensors,

    #[error("sensor #{0} has an empty name")]
    EmptySensorName(usize),

    #[error("duplicate sensor name: {0}")]
    DuplicateSensor(String),

    #[error("sensor {0}: discriminator must be a finite number")]
    NonFiniteDiscriminator(String),

    #[error("duplicate scene id: {0}")]
    DuplicateScene(SceneId),

    #[error("unknown frame policy {0:?} (expected primary, union or intersection)")]
    UnknownFramePolicy(String),
}

/// Which frames of a scene become merge units when sensors disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePolicy {
    /// Frames of the first sensor only.
    Primary,
    /// Frames present for any sensor.
    #[default]
    Union,
    /// Frames present for every sensor.
    Intersection,
}

impl FromStr for FramePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(FramePolicy::Primary),
            "union" => Ok(FramePolicy::Union),
            "intersection" => Ok(FramePolicy::Intersection),
            _ => Err(ConfigError::UnknownFramePolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    /// Root of this sensor's `<scene>/velodyne` and `<scene>/labels` trees.
    pub source_root: PathBuf,
    /// channel4 value attributing a point to this sensor.
    pub discriminator: f32,
    /// Root of `<scene>/<frame>.pcd` intensity containers; no injection without it.
    #[serde(default)]
    pub intensity_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncillaryConfig {
    #[serde(default = "default_ancillary_files")]
    pub files: Vec<String>,
    #[serde(default = "default_ancillary_folders")]
    pub folders: Vec<String>,
}

fn default_ancillary_files() -> Vec<String> {
    ["calib.txt", "poses.txt", "times.txt", "instances.txt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ancillary_folders() -> Vec<String> {
    vec!["cameras".to_string(), "image_2".to_string()]
}

impl Default for AncillaryConfig {
    fn default() -> Self {
        Self {
            files: default_ancillary_files(),
            folders: default_ancillary_folders(),
        }
    }
}

fn default_attribute_fields() -> Vec<String> {
    vec!["intensity".to_string(), "remission".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub output_root: PathBuf,

    /// Merge order is the order listed here.
    pub sensors: Vec<SensorConfig>,

    /// Scenes to process in order; discovered from the sensor roots when empty.
    #[serde(default)]
    pub scene_ids: Vec<SceneId>,

    /// Restricts every scene to these frames.
    #[serde(default)]
    pub frames: Option<Vec<FrameId>>,

    #[serde(default)]
    pub frame_policy: FramePolicy,

    #[serde(default)]
    pub attribute_alignment: AttributeAlignment,

    /// Container fields tried in order for the raw intensity.
    #[serde(default = "default_attribute_fields")]
    pub attribute_fields: Vec<String>,

    /// Also write each sensor's filtered frames under `<output_root>/sensors/<name>`.
    #[serde(default)]
    pub emit_sensor_frames: bool,

    /// Worker threads; defaults to the number of CPUs.
    #[serde(default)]
    pub jobs: Option<usize>,

    #[serde(default)]
    pub ancillary: AncillaryConfig,
}

impl PipelineConfig {
    pub fn new(output_root: impl Into<PathBuf>, sensors: Vec<SensorConfig>) -> Self {
        Self {
            output_root: output_root.into(),
            sensors,
            scene_ids: Vec::new(),
            frames: None,
            frame_policy: FramePolicy::default(),
            attribute_alignment: AttributeAlignment::default(),
            attribute_fields: default_attribute_fields(),
            emit_sensor_frames: false,
            jobs: None,
            ancillary: AncillaryConfig::default(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::NoSensors);
        }

        let mut names = HashSet::new();
        for (index, sensor) in self.sensors.iter().enumerate() {
            if sensor.name.trim().is_empty() {
                return Err(ConfigError::EmptySensorName(index));
            }
            if !names.insert(sensor.name.as_str()) {
                return Err(ConfigError::DuplicateSensor(sensor.name.clone()));
            }
            if !sensor.discriminator.is_finite() {
                return Err(ConfigError::NonFiniteDiscriminator(sensor.name.clone()));
            }
        }

        let mut scenes = HashSet::new();
        for scene in &self.scene_ids {
            if !scenes.insert(scene) {
                return Err(ConfigError::DuplicateScene(*scene));
            }
        }
        Ok(())
    }

    pub fn jobs(&self) -> usize {
        self.jobs.filter(|&jobs| jobs > 0).unwrap_or_else(num_cpus::get)
    }
}
