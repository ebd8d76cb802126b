use kitti_core::{FrameError, LabelRecord, PointRecord, Result, Selection};

/// A filtered point set, its labels, and the selection that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredFrame {
    pub points: PointRecord,
    pub labels: LabelRecord,
    pub selection: Selection,
}

/// Keeps the points of one sensor stream whose channel4 equals the
/// configured discriminator value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFilter {
    discriminator: f32,
}

impl FrameFilter {
    pub fn new(discriminator: f32) -> Self {
        Self { discriminator }
    }

    pub fn filter(&self, points: &PointRecord, labels: &LabelRecord) -> Result<FilteredFrame> {
        if points.len() != labels.len() {
            return Err(FrameError::Alignment {
                points: points.len(),
                labels: labels.len(),
            });
        }

        // Exact equality, no tolerance.
        let mask: Vec<bool> = points
            .iter()
            .map(|p| p.channel4 == self.discriminator)
            .collect();
        let selection = Selection::from_mask(&mask);

        Ok(FilteredFrame {
            points: PointRecord::new(selection.apply(points.points())?),
            labels: LabelRecord::new(selection.apply(labels.as_slice())?),
            selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use kitti_core::Point;

    use super::*;

    fn frame(flags: &[f32]) -> (PointRecord, LabelRecord) {
        let points = flags
            .iter()
            .enumerate()
            .map(|(i, &flag)| Point::new(i as f32, 0.0, 0.0, flag))
            .collect();
        let labels = (0..flags.len() as u32).map(|i| 100 + i).collect();
        (points, labels)
    }

    #[test]
    fn keeps_matching_points_in_order() {
        let (points, labels) = frame(&[1.0, 0.0, 1.0, 1.0, 0.0]);
        let filtered = FrameFilter::new(1.0).filter(&points, &labels).unwrap();

        let xs: Vec<f32> = filtered.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 3.0]);
        assert_eq!(filtered.labels.as_slice(), &[100, 102, 103]);
        assert_eq!(filtered.selection.indices(), &[0, 2, 3]);
        assert_eq!(filtered.selection.source_len(), 5);
    }

    #[test]
    fn absent_discriminator_yields_empty_frame() {
        let (points, labels) = frame(&[0.0, 0.0]);
        let filtered = FrameFilter::new(7.0).filter(&points, &labels).unwrap();
        assert!(filtered.points.is_empty());
        assert!(filtered.labels.is_empty());
    }

    #[test]
    fn no_epsilon_tolerance() {
        let (points, labels) = frame(&[1.0, 1.0 + f32::EPSILON, 0.999_999_9]);
        let filtered = FrameFilter::new(1.0).filter(&points, &labels).unwrap();
        assert_eq!(filtered.points.len(), 1);
    }

    #[test]
    fn misaligned_labels_are_rejected() {
        let (points, _) = frame(&[1.0, 1.0, 1.0]);
        let labels = LabelRecord::new(vec![1, 2]);
        match FrameFilter::new(1.0).filter(&points, &labels).unwrap_err() {
            FrameError::Alignment { points, labels } => assert_eq!((points, labels), (3, 2)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inputs_are_left_untouched() {
        let (points, labels) = frame(&[0.0, 1.0]);
        let before = (points.clone(), labels.clone());
        let _ = FrameFilter::new(1.0).filter(&points, &labels).unwrap();
        assert_eq!((points, labels), before);
    }
}
