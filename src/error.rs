//! Recoverable errors and network validation issues.
//!
//! Kernel contract violations (out-of-range indices, mismatched operand
//! shapes) are not represented here: they panic, and training cannot
//! continue after one.

use briny::prelude::ValidationError;
use thiserror::Error;

/// Custom error type for the ffnet crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("a thread pool needs at least one worker thread")]
    ZeroThreads,

    #[error("data point failed validation: {0}")]
    InvalidDataPoint(ValidationError),

    #[error("correct index {index} is out of range for {classes} output classes")]
    LabelOutOfRange { index: usize, classes: usize },
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::InvalidDataPoint(err)
    }
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// One architectural mismatch found by [`crate::network::Network::validate`].
///
/// The `Display` output is the human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error(
        "component {index} ({producer}) outputs dimensions {output:?}, \
         but component {next} ({consumer}) expects input dimensions {input:?}"
    )]
    ComponentMismatch {
        index: usize,
        next: usize,
        producer: String,
        consumer: String,
        output: Vec<usize>,
        input: Vec<usize>,
    },

    #[error(
        "final component ({producer}) outputs dimensions {output:?}, \
         but the loss function ({loss}) expects input dimensions {expected:?}"
    )]
    LossMismatch {
        producer: String,
        loss: String,
        output: Vec<usize>,
        expected: Vec<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_mismatch_message_names_both_sides() {
        let issue = ValidationIssue::ComponentMismatch {
            index: 0,
            next: 1,
            producer: "Dense(3 -> 4)".into(),
            consumer: "Relu(5)".into(),
            output: vec![4],
            input: vec![5],
        };
        let msg = issue.to_string();
        assert!(msg.contains("component 0 (Dense(3 -> 4))"));
        assert!(msg.contains("component 1 (Relu(5))"));
        assert!(msg.contains("[4]") && msg.contains("[5]"));
    }

    #[test]
    fn label_error_reports_bounds() {
        let err = Error::LabelOutOfRange { index: 7, classes: 3 };
        assert_eq!(
            err.to_string(),
            "correct index 7 is out of range for 3 output classes"
        );
    }
}
