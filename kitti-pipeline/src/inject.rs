use kitti_core::{AttributeRecord, FrameError, PointRecord, Result, Selection};
use serde::{Deserialize, Serialize};

/// Divisor mapping an 8-bit-range raw intensity into [0, 1].
pub const INTENSITY_SCALE: f64 = 255.0;

/// Which point ordering an attribute container is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeAlignment {
    /// Aligned with the unfiltered sensor stream; sliced with the filter's selection.
    #[default]
    Source,
    /// Already holds exactly the filtered points, in order.
    Filtered,
}

/// Replaces channel4 of a filtered point set with normalized intensity.
///
/// Normalizing twice is not idempotent: feeding an already-normalized array
/// back in divides by 255 again. Always inject from the raw attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityInjector {
    scale: f64,
}

impl Default for IntensityInjector {
    fn default() -> Self {
        Self {
            scale: INTENSITY_SCALE,
        }
    }
}

impl IntensityInjector {
    /// `clip(raw / 255, 0, 1)`; NaN maps to 0 so channel4 always stays in range.
    pub fn normalize(&self, raw: f64) -> f32 {
        let value = raw / self.scale;
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(0.0, 1.0) as f32
    }

    /// Injects an attribute array already index-aligned with `points`.
    pub fn inject(&self, points: &PointRecord, attribute: &AttributeRecord) -> Result<PointRecord> {
        if points.is_empty() {
            return Ok(points.clone());
        }
        if points.len() != attribute.len() {
            return Err(FrameError::CountMismatch {
                expected: points.len(),
                actual: attribute.len(),
            });
        }

        let injected: PointRecord = points
            .iter()
            .zip(attribute.as_slice())
            .map(|(point, &raw)| point.with_channel4(self.normalize(raw)))
            .collect();

        if log::log_enabled!(log::Level::Debug) {
            if let Some((min, max)) = attribute.range() {
                log::debug!(
                    "intensity range [{:.3}, {:.3}] -> normalized [{:.3}, {:.3}]",
                    min,
                    max,
                    self.normalize(min),
                    self.normalize(max)
                );
            }
        }
        Ok(injected)
    }

    /// Slices `raw`, aligned with the unfiltered stream, using the same
    /// selection that produced `points`, then injects it.
    pub fn inject_selected(
        &self,
        points: &PointRecord,
        raw: &AttributeRecord,
        selection: &Selection,
    ) -> Result<PointRecord> {
        if points.is_empty() {
            return Ok(points.clone());
        }
        if selection.len() != points.len() {
            return Err(FrameError::CountMismatch {
                expected: points.len(),
                actual: selection.len(),
            });
        }
        let sliced = selection.slice(raw)?;
        self.inject(points, &sliced)
    }
}
