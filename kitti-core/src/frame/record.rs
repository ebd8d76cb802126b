use bytemuck::{Pod, Zeroable};

use crate::error::{FrameError, Result};

/// Number of f32 values stored per point: x, y, z, channel4.
pub const POINT_WIDTH: usize = 4;

// channel4 is overloaded: before injection it holds the raw discriminator
// (e.g. a sensor-origin flag), afterwards a normalized intensity in [0, 1].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub channel4: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32, channel4: f32) -> Self {
        Self { x, y, z, channel4 }
    }

    pub fn with_channel4(self, channel4: f32) -> Self {
        Self { channel4, ..self }
    }
}

/// Ordered per-point tuples of one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointRecord {
    points: Vec<Point>,
}

impl PointRecord {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Builds a record from flat `(x, y, z, channel4)` values.
    pub fn from_flat(values: &[f32]) -> Result<Self> {
        if values.len() % POINT_WIDTH != 0 {
            return Err(FrameError::MalformedRecord {
                origin: "flat point buffer".to_string(),
                len: values.len(),
                width: POINT_WIDTH,
            });
        }
        let points: &[Point] = bytemuck::cast_slice(values);
        Ok(Self::new(points.to_vec()))
    }

    /// Flat view, `len() * POINT_WIDTH` values long.
    pub fn as_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_inner(self) -> Vec<Point> {
        self.points
    }
}

impl From<Vec<Point>> for PointRecord {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point> for PointRecord {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Semantic label codes, index-aligned with a [`PointRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRecord {
    labels: Vec<u32>,
}

impl LabelRecord {
    pub fn new(labels: Vec<u32>) -> Self {
        Self { labels }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.labels
    }
}

impl From<Vec<u32>> for LabelRecord {
    fn from(labels: Vec<u32>) -> Self {
        Self::new(labels)
    }
}

impl FromIterator<u32> for LabelRecord {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Raw, un-normalized per-point attribute values (intensity or remission)
/// read from a point container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeRecord {
    values: Vec<f64>,
}

impl AttributeRecord {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest and largest non-NaN value.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }
}

impl From<Vec<f64>> for AttributeRecord {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<f64> for AttributeRecord {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
