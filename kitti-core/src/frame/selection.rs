use crate::{
    error::{FrameError, Result},
    frame::record::AttributeRecord,
};

/// The indices a filter kept, in their original order, together with the
/// length of the stream they were selected from.
///
/// Any array index-aligned with that stream can be sliced with the same
/// selection, which keeps parallel arrays aligned by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
    source_len: usize,
}

impl Selection {
    pub fn from_mask(mask: &[bool]) -> Self {
        let indices = mask
            .iter()
            .enumerate()
            .filter_map(|(index, &keep)| keep.then_some(index))
            .collect();
        Self {
            indices,
            source_len: mask.len(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Length of the unfiltered stream.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Number of kept elements.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Gathers the kept elements of `values` into a new vector.
    pub fn apply<T: Copy>(&self, values: &[T]) -> Result<Vec<T>> {
        if values.len() != self.source_len {
            return Err(FrameError::CountMismatch {
                expected: self.source_len,
                actual: values.len(),
            });
        }
        Ok(self.indices.iter().map(|&index| values[index]).collect())
    }

    /// Slices a raw attribute array aligned with the unfiltered stream.
    pub fn slice(&self, attribute: &AttributeRecord) -> Result<AttributeRecord> {
        self.apply(attribute.as_slice()).map(AttributeRecord::new)
    }
}
