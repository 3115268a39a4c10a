//! Reference loss functions.
//!
//! Both losses sum over every active batch row of the output, scoring each
//! row against the same set of correct indices.

use crate::component::LossFunction;
use crate::ops::dispatch;
use crate::tensors::Ten64;

#[inline]
fn check_labels(output: &Ten64, correct: &[usize], classes: usize) {
    assert_eq!(output.row_len(), classes, "loss expects rows of {classes} values");
    assert!(
        correct.iter().all(|&y| y < classes),
        "correct indices {correct:?} out of range for {classes} classes"
    );
}

/// Negative log-likelihood of the correct classes of a probability vector:
/// $$ L = -\sum_s \sum_{y \in \text{correct}} \ln p_{s,y} $$
///
/// Meant to follow a [`Softmax`](crate::layers::Softmax).
#[derive(Debug, Clone)]
pub struct CrossEntropy {
    classes: usize,
}

impl CrossEntropy {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl LossFunction for CrossEntropy {
    fn dimensions(&self) -> Vec<usize> {
        vec![self.classes]
    }

    fn apply(&self, output: &Ten64, correct: &[usize]) -> f64 {
        check_labels(output, correct, self.classes);
        let mut loss = 0.0;
        for row in output.data.chunks(self.classes) {
            for &y in correct {
                loss -= row[y].ln();
            }
        }
        loss
    }

    fn backprop(&self, output: &Ten64, correct: &[usize]) -> Ten64 {
        check_labels(output, correct, self.classes);
        let mut grad = output.zeros_like();
        for s in 0..output.batch_capacity() {
            for &y in correct {
                let at = s * self.classes + y;
                dispatch::one_hot_accumulate(&mut grad, at, -1.0 / output.data[at]);
            }
        }
        grad
    }

    fn copy(&self) -> Box<dyn LossFunction> {
        Box::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("CrossEntropy({})", self.classes)
    }
}

/// Squared distance to the one-hot (or multi-hot) target `t`:
/// $$ L = \sum_s \sum_i (o_{s,i} - t_i)^2 $$
#[derive(Debug, Clone)]
pub struct SquaredError {
    classes: usize,
}

impl SquaredError {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl LossFunction for SquaredError {
    fn dimensions(&self) -> Vec<usize> {
        vec![self.classes]
    }

    fn apply(&self, output: &Ten64, correct: &[usize]) -> f64 {
        check_labels(output, correct, self.classes);
        let mut loss = 0.0;
        for row in output.data.chunks(self.classes) {
            for (i, &o) in row.iter().enumerate() {
                let t = if correct.contains(&i) { 1.0 } else { 0.0 };
                loss += (o - t) * (o - t);
            }
        }
        loss
    }

    fn backprop(&self, output: &Ten64, correct: &[usize]) -> Ten64 {
        check_labels(output, correct, self.classes);
        let s = output.batch_capacity();
        let mut grad = output.clone();
        // the target is multi-hot, so a repeated index still counts once
        for row in 0..s {
            for y in (0..self.classes).filter(|y| correct.contains(y)) {
                dispatch::one_hot_accumulate(&mut grad, row * self.classes + y, -1.0);
            }
        }
        dispatch::scale(&mut grad, 2.0, s);
        grad
    }

    fn copy(&self) -> Box<dyn LossFunction> {
        Box::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("SquaredError({})", self.classes)
    }
}
