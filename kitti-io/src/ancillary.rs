//! Verbatim passthrough of per-scene metadata (calibration, poses, camera
//! folders) next to the merged frames. Contents are never interpreted.

use std::{fs, path::Path};

use glob::{glob, Pattern};
use kitti_core::{FrameError, Result};

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| FrameError::from_io(parent, e))?;
    }
    fs::copy(src, dst).map_err(|e| FrameError::from_io(src, e))?;
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| FrameError::from_io(dst, e))?;
    let pattern = format!("{}/**/*", Pattern::escape(&src.to_string_lossy()));
    let entries = glob(&pattern).map_err(|e| FrameError::Io {
        path: src.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.msg),
    })?;

    for entry in entries {
        let path = entry.map_err(|e| FrameError::from_io(src, e.into_error()))?;
        let Ok(relative) = path.strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if path.is_dir() {
            fs::create_dir_all(&target).map_err(|e| FrameError::from_io(&target, e))?;
        } else {
            copy_file(&path, &target)?;
        }
    }
    Ok(())
}

/// Copies the named files and folders from `src_scene` into `dst_scene`.
///
/// Absent entries are skipped and failures are logged; returns how many
/// entries were copied.
pub fn copy_ancillary(
    src_scene: &Path,
    dst_scene: &Path,
    files: &[String],
    folders: &[String],
) -> usize {
    let mut copied = 0;

    for name in files {
        let src = src_scene.join(name);
        if !src.is_file() {
            continue;
        }
        match copy_file(&src, &dst_scene.join(name)) {
            Ok(()) => copied += 1,
            Err(e) => log::warn!("failed to copy {:?}: {}", src, e),
        }
    }

    for name in folders {
        let src = src_scene.join(name);
        if !src.is_dir() {
            continue;
        }
        match copy_tree(&src, &dst_scene.join(name)) {
            Ok(()) => copied += 1,
            Err(e) => log::warn!("failed to copy folder {:?}: {}", src, e),
        }
    }

    copied
}
