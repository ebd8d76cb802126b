use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use glob::{glob, Pattern};
use kitti_core::{FrameError, FrameId, FrameKey, Result, SceneId};

pub const VELODYNE_DIR: &str = "velodyne";
pub const LABELS_DIR: &str = "labels";
pub const POINTS_EXTENSION: &str = "bin";
pub const LABELS_EXTENSION: &str = "label";
pub const ATTRIBUTE_EXTENSION: &str = "pcd";

/// Semantic-KITTI sequence layout under one root:
/// `<root>/<scene>/velodyne/<frame>.bin` and `<root>/<scene>/labels/<frame>.label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLayout {
    root: PathBuf,
}

impl SceneLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scene_dir(&self, scene: &SceneId) -> PathBuf {
        self.root.join(scene.to_string())
    }

    pub fn points_path(&self, key: &FrameKey) -> PathBuf {
        self.scene_dir(&key.scene)
            .join(VELODYNE_DIR)
            .join(format!("{}.{POINTS_EXTENSION}", key.frame))
    }

    pub fn labels_path(&self, key: &FrameKey) -> PathBuf {
        self.scene_dir(&key.scene)
            .join(LABELS_DIR)
            .join(format!("{}.{LABELS_EXTENSION}", key.frame))
    }

    /// Scene directories whose names are scene ids, sorted. A missing root has no scenes.
    pub fn discover_scenes(&self) -> Result<Vec<SceneId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                let err = FrameError::from_io(&self.root, e);
                if err.is_missing_source() {
                    log::warn!("scene root {:?} does not exist", self.root);
                    return Ok(Vec::new());
                }
                return Err(err);
            }
        };

        let mut scenes = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| FrameError::from_io(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().to_str().map(str::parse::<SceneId>) {
                Some(Ok(scene)) => {
                    scenes.insert(scene);
                }
                _ => log::debug!("ignoring non-scene directory {:?}", entry.path()),
            }
        }
        Ok(scenes.into_iter().collect())
    }

    /// Frames with a point file in `scene`, normalized to three digits and sorted.
    pub fn discover_frames(&self, scene: &SceneId) -> Result<Vec<FrameId>> {
        let dir = self.scene_dir(scene).join(VELODYNE_DIR);
        Ok(numeric_stems(&dir, POINTS_EXTENSION)?
            .into_iter()
            .map(|(frame, _)| frame)
            .collect())
    }
}

// Files `<dir>/*.<extension>` keyed by their numeric stem; non-numeric stems are skipped.
fn numeric_stems(dir: &Path, extension: &str) -> Result<Vec<(FrameId, PathBuf)>> {
    let pattern = format!(
        "{}/*.{extension}",
        Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob(&pattern).map_err(|e| FrameError::Io {
        path: dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.msg),
    })?;

    let mut frames = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("unreadable entry under {:?}: {}", dir, e);
                continue;
            }
        };
        let stem = path.file_stem().and_then(|s| s.to_str());
        match stem.map(str::parse::<FrameId>) {
            Some(Ok(frame)) => frames.push((frame, path)),
            _ => log::warn!("ignoring {:?}: stem is not a frame id", path),
        }
    }
    frames.sort();
    frames.dedup_by(|a, b| a.0 == b.0);
    Ok(frames)
}

/// Finds the attribute container for `frame` in `dir` by numeric stem, so
/// `5.pcd`, `005.pcd` and `000005.pcd` all belong to frame `005`.
pub fn locate_attribute_file(dir: &Path, frame: &FrameId) -> Result<Option<PathBuf>> {
    let exact = dir.join(format!("{frame}.{ATTRIBUTE_EXTENSION}"));
    if exact.is_file() {
        return Ok(Some(exact));
    }
    Ok(numeric_stems(dir, ATTRIBUTE_EXTENSION)?
        .into_iter()
        .find(|(candidate, _)| candidate == frame)
        .map(|(_, path)| path))
}
