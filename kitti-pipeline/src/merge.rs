use kitti_core::{FrameError, FrameKey, LabelRecord, Point, PointRecord, Result};
use serde::Serialize;

/// One sensor's input to a merge, in the caller's fixed sensor order.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorContribution {
    Present {
        sensor: String,
        points: PointRecord,
        labels: LabelRecord,
    },
    Missing {
        sensor: String,
        reason: String,
    },
}

impl SensorContribution {
    pub fn present(sensor: impl Into<String>, points: PointRecord, labels: LabelRecord) -> Self {
        SensorContribution::Present {
            sensor: sensor.into(),
            points,
            labels,
        }
    }

    pub fn missing(sensor: impl Into<String>, reason: impl Into<String>) -> Self {
        SensorContribution::Missing {
            sensor: sensor.into(),
            reason: reason.into(),
        }
    }

    pub fn sensor(&self) -> &str {
        match self {
            SensorContribution::Present { sensor, .. } | SensorContribution::Missing { sensor, .. } => {
                sensor
            }
        }
    }

    pub fn point_count(&self) -> usize {
        match self {
            SensorContribution::Present { points, .. } => points.len(),
            SensorContribution::Missing { .. } => 0,
        }
    }
}

/// Points one sensor contributed to a merged frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorCount {
    pub sensor: String,
    pub points: usize,
}

/// The concatenation of all contributing sensors for one frame.
///
/// `provenance` lists every sensor in merge order with its point count, so
/// rows can be traced back to a sensor by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedFrame {
    pub points: PointRecord,
    pub labels: LabelRecord,
    pub provenance: Vec<SensorCount>,
}

impl MergedFrame {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMerger;

impl FrameMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, key: &FrameKey, contributions: Vec<SensorContribution>) -> Result<MergedFrame> {
        for contribution in &contributions {
            if let SensorContribution::Present {
                sensor,
                points,
                labels,
            } = contribution
            {
                if points.len() != labels.len() {
                    return Err(FrameError::Alignment {
                        points: points.len(),
                        labels: labels.len(),
                    }
                    .in_sensor(sensor.as_str()));
                }
            }
        }

        let total: usize = contributions.iter().map(SensorContribution::point_count).sum();
        let mut points: Vec<Point> = Vec::with_capacity(total);
        let mut labels: Vec<u32> = Vec::with_capacity(total);
        let mut provenance = Vec::with_capacity(contributions.len());

        for contribution in contributions {
            provenance.push(SensorCount {
                sensor: contribution.sensor().to_string(),
                points: contribution.point_count(),
            });
            match contribution {
                SensorContribution::Present {
                    sensor,
                    points: sensor_points,
                    labels: sensor_labels,
                } => {
                    if sensor_points.is_empty() {
                        log::debug!("{key}: {sensor} kept no points, skipped");
                        continue;
                    }
                    points.extend(sensor_points.into_inner());
                    labels.extend(sensor_labels.into_inner());
                }
                SensorContribution::Missing { sensor, reason } => {
                    log::info!("{key}: {sensor} unavailable, skipped ({reason})");
                }
            }
        }

        Ok(MergedFrame {
            points: PointRecord::new(points),
            labels: LabelRecord::new(labels),
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> FrameKey {
        FrameKey::new("00".parse().unwrap(), "000".parse().unwrap())
    }

    fn sensor(name: &str, n: usize, label: u32) -> SensorContribution {
        let points = (0..n)
            .map(|i| Point::new(label as f32, i as f32, 0.0, 0.5))
            .collect();
        SensorContribution::present(name, points, LabelRecord::new(vec![label; n]))
    }

    #[test]
    fn concatenates_in_sensor_order_skipping_empty() {
        let merged = FrameMerger::new()
            .merge(&key(), vec![sensor("a", 5, 0), sensor("b", 0, 1), sensor("c", 3, 2)])
            .unwrap();

        assert_eq!(merged.len(), 8);
        assert_eq!(merged.labels.len(), 8);
        let rows: Vec<(f32, f32)> = merged.points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            rows,
            vec![
                (0.0, 0.0),
                (0.0, 1.0),
                (0.0, 2.0),
                (0.0, 3.0),
                (0.0, 4.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (2.0, 2.0)
            ]
        );
        let counts: Vec<usize> = merged.provenance.iter().map(|c| c.points).collect();
        assert_eq!(counts, vec![5, 0, 3]);
    }

    #[test]
    fn labels_follow_sensor_order() {
        let merged = FrameMerger::new()
            .merge(&key(), vec![sensor("a", 3, 1), sensor("b", 2, 2)])
            .unwrap();
        assert_eq!(merged.labels.as_slice(), &[1, 1, 1, 2, 2]);
    }

    #[test]
    fn all_sensors_missing_yields_empty_frame() {
        let merged = FrameMerger::new()
            .merge(
                &key(),
                vec![
                    SensorContribution::missing("a", "no file"),
                    sensor("b", 0, 1),
                ],
            )
            .unwrap();
        assert!(merged.is_empty());
        assert!(merged.labels.is_empty());
        assert_eq!(merged.provenance.len(), 2);
    }

    #[test]
    fn no_contributions_yields_empty_frame() {
        let merged = FrameMerger::new().merge(&key(), Vec::new()).unwrap();
        assert!(merged.is_empty());
        assert!(merged.provenance.is_empty());
    }

    #[test]
    fn misaligned_contribution_fails_the_frame() {
        let broken = SensorContribution::present(
            "b",
            vec![Point::default(); 2].into(),
            LabelRecord::new(vec![1]),
        );
        let err = FrameMerger::new()
            .merge(&key(), vec![sensor("a", 1, 0), broken])
            .unwrap_err();
        assert_eq!(err.check(), "alignment");
        assert!(err.to_string().starts_with("sensor b:"));
    }
}
