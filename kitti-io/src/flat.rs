//! Raw little-endian frame files: `velodyne/<frame>.bin` holds f32
//! `(x, y, z, channel4)` tuples and `labels/<frame>.label` holds one u32 per point.

use std::{fs, io::Write as _, path::Path};

use byteorder::{ByteOrder as _, LittleEndian};
use kitti_core::{FrameError, LabelRecord, PointRecord, Result, POINT_WIDTH};
use tempfile::NamedTempFile;

/// Bytes per stored point.
pub const POINT_STRIDE: usize = POINT_WIDTH * 4;
/// Bytes per stored label.
pub const LABEL_STRIDE: usize = 4;

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| FrameError::from_io(path, e))
}

fn check_stride(path: &Path, bytes: &[u8], stride: usize) -> Result<()> {
    if bytes.len() % stride != 0 {
        return Err(FrameError::MalformedRecord {
            origin: path.display().to_string(),
            len: bytes.len(),
            width: stride,
        });
    }
    Ok(())
}

pub fn read_points(path: &Path) -> Result<PointRecord> {
    let bytes = read_bytes(path)?;
    check_stride(path, &bytes, POINT_STRIDE)?;

    let mut values = vec![0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(&bytes, &mut values);
    PointRecord::from_flat(&values)
}

pub fn read_labels(path: &Path) -> Result<LabelRecord> {
    let bytes = read_bytes(path)?;
    check_stride(path, &bytes, LABEL_STRIDE)?;

    let mut labels = vec![0u32; bytes.len() / LABEL_STRIDE];
    LittleEndian::read_u32_into(&bytes, &mut labels);
    Ok(LabelRecord::new(labels))
}

pub fn write_points(path: &Path, points: &PointRecord) -> Result<()> {
    let flat = points.as_flat();
    let mut bytes = vec![0u8; flat.len() * 4];
    LittleEndian::write_f32_into(flat, &mut bytes);
    write_bytes(path, &bytes)
}

pub fn write_labels(path: &Path, labels: &LabelRecord) -> Result<()> {
    let mut bytes = vec![0u8; labels.len() * LABEL_STRIDE];
    LittleEndian::write_u32_into(labels.as_slice(), &mut bytes);
    write_bytes(path, &bytes)
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so the target is either fully written or left untouched.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| FrameError::from_io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FrameError::from_io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| FrameError::from_io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| FrameError::from_io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use kitti_core::Point;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn points_round_trip_bit_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("velodyne/000.bin");
        let points = PointRecord::new(vec![
            Point::new(1.5, -2.25, 1e-30, 0.0),
            Point::new(f32::MAX, f32::MIN_POSITIVE, -0.0, 1.0),
            Point::new(0.1, 0.2, 0.3, 0.5),
        ]);

        write_points(&path, &points).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 3 * POINT_STRIDE as u64);

        let loaded = read_points(&path).unwrap();
        let original: Vec<u32> = points.as_flat().iter().map(|v| v.to_bits()).collect();
        let reloaded: Vec<u32> = loaded.as_flat().iter().map(|v| v.to_bits()).collect();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn labels_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels/000.label");
        let labels = LabelRecord::new(vec![0, 1, 40, 0x0001_000A, u32::MAX]);

        write_labels(&path, &labels).unwrap();
        assert_eq!(read_labels(&path).unwrap(), labels);
    }

    #[test]
    fn stored_layout_is_little_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.label");
        write_labels(&path, &LabelRecord::new(vec![0x0403_0201])).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn truncated_point_file_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000.bin");
        fs::write(&path, [0u8; POINT_STRIDE + 8]).unwrap();

        match read_points(&path).unwrap_err() {
            FrameError::MalformedRecord { len, width, .. } => {
                assert_eq!(len, POINT_STRIDE + 8);
                assert_eq!(width, POINT_STRIDE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn absent_and_empty_files() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.bin");
        assert!(read_points(&missing).unwrap_err().is_missing_source());

        let empty = dir.path().join("empty.label");
        fs::write(&empty, b"").unwrap();
        assert!(read_labels(&empty).unwrap().is_empty());
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("000.label");
        write_labels(&path, &LabelRecord::new(vec![1, 2, 3])).unwrap();
        write_labels(&path, &LabelRecord::new(vec![9])).unwrap();
        assert_eq!(read_labels(&path).unwrap().as_slice(), &[9]);
    }
}
