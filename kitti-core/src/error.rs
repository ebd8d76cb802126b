use std::{io, path::PathBuf};

use thiserror::Error;

/// Every way a single (scene, frame) unit can fail.
///
/// None of these abort a batch: the unit that raised one is reported and
/// skipped, and processing moves on to the next unit.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("point/label count mismatch: {points} points vs {labels} labels")]
    Alignment { points: usize, labels: usize },

    #[error("point/attribute count mismatch: expected {expected} attribute values, found {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("malformed record {origin}: length {len} is not a multiple of the record width {width}")]
    MalformedRecord {
        origin: String,
        len: usize,
        width: usize,
    },

    #[error("missing source file: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("invalid {kind} id: {value:?}")]
    InvalidKey { kind: &'static str, value: String },

    #[error("unreadable point container {}: {reason}", path.display())]
    Container { path: PathBuf, reason: String },

    #[error("{} has none of the attribute fields {fields:?}", path.display())]
    MissingAttribute { path: PathBuf, fields: Vec<String> },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("frame processing panicked: {0}")]
    Panicked(String),

    #[error("sensor {sensor}: {source}")]
    Sensor {
        sensor: String,
        #[source]
        source: Box<FrameError>,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl FrameError {
    /// Maps an I/O failure on `path`, turning "not found" into [`FrameError::MissingSource`].
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            FrameError::MissingSource(path)
        } else {
            FrameError::Io { path, source }
        }
    }

    /// Attributes the error to one sensor stream.
    pub fn in_sensor(self, sensor: impl Into<String>) -> Self {
        FrameError::Sensor {
            sensor: sensor.into(),
            source: Box::new(self),
        }
    }

    /// Short stable name of the failed check, used in run reports.
    pub fn check(&self) -> &'static str {
        match self {
            FrameError::Alignment { .. } => "alignment",
            FrameError::CountMismatch { .. } => "count-mismatch",
            FrameError::MalformedRecord { .. } => "malformed-record",
            FrameError::MissingSource(_) => "missing-source",
            FrameError::InvalidKey { .. } => "invalid-key",
            FrameError::Container { .. } => "container",
            FrameError::MissingAttribute { .. } => "missing-attribute",
            FrameError::Io { .. } => "io",
            FrameError::Panicked(_) => "panic",
            FrameError::Sensor { source, .. } => source.check(),
        }
    }

    pub fn is_missing_source(&self) -> bool {
        match self {
            FrameError::MissingSource(_) => true,
            FrameError::Sensor { source, .. } => source.is_missing_source(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_becomes_missing_source() {
        let err = FrameError::from_io(
            "a/000.bin",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_missing_source());
        assert_eq!(err.check(), "missing-source");

        let err = FrameError::from_io(
            "a/000.bin",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(!err.is_missing_source());
        assert_eq!(err.check(), "io");
    }

    #[test]
    fn sensor_context_keeps_check_and_counts() {
        let err = FrameError::Alignment {
            points: 10,
            labels: 9,
        }
        .in_sensor("lidar1");
        assert_eq!(err.check(), "alignment");
        assert_eq!(
            err.to_string(),
            "sensor lidar1: point/label count mismatch: 10 points vs 9 labels"
        );
    }

    #[test]
    fn panics_report_their_own_check() {
        let err = FrameError::Panicked("boom".to_string()).in_sensor("lidar0");
        assert_eq!(err.check(), "panic");
        assert!(!err.is_missing_source());
    }
}
