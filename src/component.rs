//! Capability traits for the pieces a network is assembled from.
//!
//! A [`Component`] is one layer of the chain; a [`LossFunction`] closes it.
//! The engine only ever talks to these traits, so any layer type can be
//! plugged in. Tensors exchanged with either trait carry a leading batch
//! dimension; the dimensions they *declare* do not.

use core::fmt::Debug;

use crate::ops::dispatch;
use crate::tensors::{Ten64, WithGrad};

/// Declared per-sample input and output shapes of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub input: Vec<usize>,
    pub output: Vec<usize>,
}

impl Dimensions {
    pub fn new(input: impl Into<Vec<usize>>, output: impl Into<Vec<usize>>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// One layer of a feed-forward chain.
///
/// The forward output is not cached inside the component. The network keeps
/// it and passes it back to [`Component::backprop`], so the data dependency
/// between the two passes is explicit.
pub trait Component: Send + Sync + Debug {
    /// Declared input and output dimensions, excluding the batch dimension.
    fn dimensions(&self) -> Dimensions;

    /// Forward pass. Writes the result into `output`, reshaping it as needed.
    fn apply(&self, input: &Ten64, output: &mut Ten64);

    /// Backward pass.
    ///
    /// `input` and `output` are the tensors of the matching forward pass.
    /// Returns the gradient with respect to `input`. Parameter gradients are
    /// **added** to the ones already held, never overwritten.
    fn backprop(&mut self, input: &Ten64, output: &Ten64, output_gradient: &Ten64) -> Ten64;

    /// Parameters in a fixed order, each pairing a weight with its gradient.
    fn params(&self) -> &[WithGrad<Ten64>];

    /// Mutable access to the same parameters, in the same order.
    fn params_mut(&mut self) -> &mut [WithGrad<Ten64>];

    /// Weight tensors, index-paired with [`Component::gradients`].
    fn weights(&self) -> Vec<&Ten64> {
        self.params().iter().map(|p| &p.value).collect()
    }

    /// Gradient tensors, index-paired with [`Component::weights`].
    fn gradients(&self) -> Vec<&Ten64> {
        self.params().iter().map(|p| &p.grad).collect()
    }

    /// Sets every gradient to zero.
    fn zero_grad(&mut self) {
        for p in self.params_mut() {
            dispatch::assign(&mut p.grad, 0.0);
        }
    }

    /// Deep copy: same weights, zeroed gradients, no scratch state.
    fn copy(&self) -> Box<dyn Component>;

    /// Short human-readable description, e.g. `Dense(3 -> 4)`.
    fn describe(&self) -> String;
}

/// The scalar loss at the end of a chain.
pub trait LossFunction: Send + Sync + Debug {
    /// Expected per-sample input dimensions.
    fn dimensions(&self) -> Vec<usize>;

    /// Loss of `output` against the set of correct output indices.
    fn apply(&self, output: &Ten64, correct: &[usize]) -> f64;

    /// Gradient of the loss with respect to `output`, shaped like `output`.
    fn backprop(&self, output: &Ten64, correct: &[usize]) -> Ten64;

    fn copy(&self) -> Box<dyn LossFunction>;

    fn describe(&self) -> String;
}
