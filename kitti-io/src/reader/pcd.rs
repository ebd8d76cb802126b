use std::path::Path;

use kitti_core::{AttributeRecord, FrameError, Result};
use pcd_rs::{DynReader, Field};

use super::AttributeReader;

// Upper bound on the up-front allocation; a header may claim any point count.
const PREALLOCATE_LIMIT: u64 = 1 << 20;

/// Reads a scalar field (intensity, falling back to remission by default)
/// from a PCD file.
#[derive(Debug, Clone)]
pub struct PcdAttributeReader {
    pub fields: Vec<String>,
}

impl Default for PcdAttributeReader {
    fn default() -> Self {
        Self {
            fields: vec!["intensity".to_string(), "remission".to_string()],
        }
    }
}

impl PcdAttributeReader {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

fn scalar(field: &Field) -> Option<f64> {
    let value = match field {
        Field::I8(v) => f64::from(*v.first()?),
        Field::I16(v) => f64::from(*v.first()?),
        Field::I32(v) => f64::from(*v.first()?),
        Field::U8(v) => f64::from(*v.first()?),
        Field::U16(v) => f64::from(*v.first()?),
        Field::U32(v) => f64::from(*v.first()?),
        Field::F32(v) => f64::from(*v.first()?),
        Field::F64(v) => *v.first()?,
    };
    Some(value)
}

impl AttributeReader for PcdAttributeReader {
    fn read_attribute(&self, path: &Path) -> Result<AttributeRecord> {
        if !path.is_file() {
            return Err(FrameError::MissingSource(path.to_path_buf()));
        }
        let container = |reason: String| FrameError::Container {
            path: path.to_path_buf(),
            reason,
        };

        let reader = DynReader::open(path).map_err(|e| container(e.to_string()))?;
        let meta = reader.meta();
        let (index, field) = self
            .fields
            .iter()
            .find_map(|name| {
                meta.field_defs
                    .fields
                    .iter()
                    .enumerate()
                    .find(|(_, field)| field.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| FrameError::MissingAttribute {
                path: path.to_path_buf(),
                fields: self.fields.clone(),
            })?;
        if field.count != 1 {
            return Err(container(format!(
                "field {} has COUNT {}, expected a single value",
                field.name, field.count
            )));
        }
        let name = field.name.clone();
        let declared = meta.num_points;

        let mut values = Vec::with_capacity(declared.min(PREALLOCATE_LIMIT) as usize);
        for record in reader {
            let record = record.map_err(|e| container(e.to_string()))?;
            let value = record.0.get(index).and_then(scalar).ok_or_else(|| {
                container(format!("record {} has no {name} value", values.len()))
            })?;
            values.push(value);
        }

        if values.len() as u64 != declared {
            return Err(container(format!(
                "header declares {declared} points, body holds {}",
                values.len()
            )));
        }

        log::trace!("read {} {name} values from {:?}", values.len(), path);
        Ok(AttributeRecord::new(values))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn header(fields: &str, sizes: &str, types: &str, points: usize, data: &str) -> String {
        let count = fields.split_whitespace().count();
        format!(
            "VERSION 0.7\nFIELDS {fields}\nSIZE {sizes}\nTYPE {types}\nCOUNT {}\n\
             WIDTH {points}\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS {points}\nDATA {data}\n",
            vec!["1"; count].join(" ")
        )
    }

    fn ascii_pcd(fields: &str, rows: &[&str]) -> Vec<u8> {
        let count = fields.split_whitespace().count();
        let mut out = header(
            fields,
            &vec!["4"; count].join(" "),
            &vec!["F"; count].join(" "),
            rows.len(),
            "ascii",
        );
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
        out.into_bytes()
    }

    fn read(bytes: &[u8]) -> Result<AttributeRecord> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("5.pcd");
        fs::write(&path, bytes).unwrap();
        PcdAttributeReader::default().read_attribute(&path)
    }

    #[test]
    fn reads_ascii_intensity() {
        let bytes = ascii_pcd(
            "x y z intensity",
            &["0 0 0 12", "1 1 1 255", "2 2 2 300.5"],
        );
        let attribute = read(&bytes).unwrap();
        assert_eq!(attribute.as_slice(), &[12.0, 255.0, 300.5]);
    }

    #[test]
    fn falls_back_to_remission() {
        let bytes = ascii_pcd("x y z remission", &["0 0 0 7"]);
        assert_eq!(read(&bytes).unwrap().as_slice(), &[7.0]);
    }

    #[test]
    fn missing_attribute_field() {
        let bytes = ascii_pcd("x y z", &["0 0 0"]);
        match read(&bytes).unwrap_err() {
            FrameError::MissingAttribute { fields, .. } => {
                assert_eq!(fields, vec!["intensity", "remission"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn absent_file_is_missing_source() {
        let dir = tempdir().unwrap();
        let err = PcdAttributeReader::default()
            .read_attribute(&dir.path().join("000.pcd"))
            .unwrap_err();
        assert!(err.is_missing_source());
    }

    #[test]
    fn reads_binary_mixed_field_types() {
        // x y z as f32, intensity as u8, ring as u16
        let mut bytes = header("x y z intensity ring", "4 4 4 1 2", "F F F U U", 2, "binary")
            .into_bytes();
        for (x, intensity, ring) in [(1.0f32, 17u8, 3u16), (2.0, 250, 4)] {
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&0f32.to_le_bytes());
            bytes.extend_from_slice(&0f32.to_le_bytes());
            bytes.push(intensity);
            bytes.extend_from_slice(&ring.to_le_bytes());
        }

        assert_eq!(read(&bytes).unwrap().as_slice(), &[17.0, 250.0]);
    }

    #[test]
    fn binary_body_too_short() {
        let mut bytes = header("x intensity", "4 4", "F F", 3, "binary").into_bytes();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(read(&bytes).unwrap_err().check(), "container");
    }

    #[test]
    fn corrupt_headers_are_container_errors() {
        let zero_size = header("x intensity", "0 0", "F F", 3, "binary");
        assert_eq!(read(zero_size.as_bytes()).unwrap_err().check(), "container");

        let mut huge = header("x intensity", "4 4", "F F", 1, "binary")
            .replace("POINTS 1", "POINTS 18446744073709551615")
            .into_bytes();
        huge.extend_from_slice(&[0u8; 8]);
        assert_eq!(read(&huge).unwrap_err().check(), "container");

        assert_eq!(read(b"not a point cloud\n").unwrap_err().check(), "container");
    }
}
