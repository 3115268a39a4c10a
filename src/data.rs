//! Labelled samples fed to the network engine.

use briny::prelude::*;

use crate::error::{Error, Result};
use crate::tensors::{Ten64, Tensor};

/// An input tensor and the indices of its correct outputs.
///
/// `input` carries a leading batch dimension (normally 1). `correct` holds a
/// single index for single-label targets or several for multi-label ones.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub input: Ten64,
    pub correct: Vec<usize>,
}

impl Validate for DataPoint {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        let expected = self.input.shape.iter().product::<usize>();
        if self.input.data.len() != expected || self.correct.is_empty() {
            return Err(ValidationError);
        }
        Ok(())
    }
}

impl DataPoint {
    /// Wraps an input and its correct indices without checking them.
    pub fn new(input: Ten64, correct: Vec<usize>) -> Self {
        Self { input, correct }
    }

    /// A single sample given as flat features: the input is shaped `[1, len]`.
    pub fn sample(features: Vec<f64>, correct: Vec<usize>) -> Self {
        let len = features.len();
        Self::new(Tensor::new(vec![1, len], features), correct)
    }

    /// Builds a data point, checking that the correct set is non-empty, the
    /// input is consistent and every index is below `classes`.
    ///
    /// # Errors
    /// [`Error::InvalidDataPoint`] for an empty correct set or inconsistent
    /// input, [`Error::LabelOutOfRange`] for an index `>= classes`.
    pub fn checked(input: Ten64, correct: Vec<usize>, classes: usize) -> Result<Self> {
        let point = TrustedData::new(Self::new(input, correct))?.into_inner();
        if let Some(&index) = point.correct.iter().find(|&&i| i >= classes) {
            return Err(Error::LabelOutOfRange { index, classes });
        }
        Ok(point)
    }

    /// Number of samples in the input batch.
    pub fn batch(&self) -> usize {
        self.input.batch_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor;

    #[test]
    fn sample_adds_batch_dimension() {
        let p = DataPoint::sample(vec![0.5, 1.5, 2.5], vec![2]);
        assert_eq!(p.input.shape, vec![1, 3]);
        assert_eq!(p.batch(), 1);
    }

    #[test]
    fn checked_accepts_multi_label() {
        let p = DataPoint::checked(tensor!([[1.0, 0.0, 1.0]]), vec![0, 2], 3).unwrap();
        assert_eq!(p.correct, vec![0, 2]);
    }

    #[test]
    fn checked_rejects_empty_labels() {
        let err = DataPoint::checked(tensor!([[1.0]]), vec![], 1).unwrap_err();
        assert!(matches!(err, Error::InvalidDataPoint(_)));
    }

    #[test]
    fn checked_rejects_out_of_range_label() {
        let err = DataPoint::checked(tensor!([[1.0, 2.0]]), vec![1, 4], 2).unwrap_err();
        assert!(matches!(err, Error::LabelOutOfRange { index: 4, classes: 2 }));
    }

    #[test]
    fn validate_catches_inconsistent_input() {
        let mut p = DataPoint::sample(vec![1.0, 2.0], vec![0]);
        assert!(p.validate().is_ok());
        p.input.data.pop();
        assert!(p.validate().is_err());
    }
}
