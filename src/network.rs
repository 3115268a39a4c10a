//! The network engine.
//!
//! A [`Network`] owns an ordered chain of components and one loss function,
//! and drives them through evaluation, backpropagation and mini-batch
//! gradient descent.
//!
//! # Derived caches
//!
//! Two caches are derived from the component list and rebuilt by
//! [`Network::refresh_derived_caches`] whenever the list is replaced:
//!
//! - a parameter arena of `(component, slot)` indices, through which
//!   [`Network::weights`] and [`Network::gradients`] resolve in component
//!   order, so `gradients()[i]` always pairs with `weights()[i]`;
//! - one output buffer per component, holding its most recent forward
//!   output. Backprop reads these instead of re-running the forward pass.
//!
//! # Training contract
//!
//! [`Network::validate`] is the only soft check. Every other operation
//! assumes a validated network and panics on a shape mismatch.

use core::ops::Range;

use log::{debug, trace, warn};

use crate::component::{Component, LossFunction};
use crate::data::DataPoint;
use crate::error::ValidationIssue;
use crate::ops::dispatch;
use crate::tensors::{Ten64, WithGrad};

/// Position of one parameter inside the component chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParamSlot {
    component: usize,
    slot: usize,
}

/// A feed-forward chain of components closed by a loss function.
#[derive(Debug)]
pub struct Network {
    components: Vec<Box<dyn Component>>,
    loss: Box<dyn LossFunction>,
    params: Vec<ParamSlot>,
    out_bufs: Vec<Ten64>,
}

impl Network {
    /// Assembles a network and derives its caches.
    pub fn new(components: Vec<Box<dyn Component>>, loss: Box<dyn LossFunction>) -> Self {
        let mut net = Self {
            components,
            loss,
            params: Vec::new(),
            out_bufs: Vec::new(),
        };
        net.refresh_derived_caches();
        net
    }

    /// Rebuilds the parameter arena and the output buffers from the current
    /// component list. Previous outputs are discarded.
    pub fn refresh_derived_caches(&mut self) {
        self.params = self
            .components
            .iter()
            .enumerate()
            .flat_map(|(component, c)| {
                (0..c.params().len()).map(move |slot| ParamSlot { component, slot })
            })
            .collect();
        self.out_bufs = self.components.iter().map(|_| Ten64::default()).collect();
    }

    /// Replaces the component chain and re-derives the caches.
    pub fn set_components(&mut self, components: Vec<Box<dyn Component>>) {
        self.components = components;
        self.refresh_derived_caches();
    }

    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }

    pub fn loss(&self) -> &dyn LossFunction {
        self.loss.as_ref()
    }

    /// Number of parameter tensors across the chain.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    fn param(&self, i: usize) -> &WithGrad<Ten64> {
        let ParamSlot { component, slot } = self.params[i];
        &self.components[component].params()[slot]
    }

    /// Every weight tensor, in component order.
    pub fn weights(&self) -> Vec<&Ten64> {
        (0..self.params.len()).map(|i| &self.param(i).value).collect()
    }

    /// Every gradient tensor, index-paired with [`Network::weights`].
    pub fn gradients(&self) -> Vec<&Ten64> {
        (0..self.params.len()).map(|i| &self.param(i).grad).collect()
    }

    /// Weight `i` of [`Network::weights`].
    ///
    /// # Panics
    /// Panics if `i >= self.num_params()`.
    pub fn weight(&self, i: usize) -> &Ten64 {
        &self.param(i).value
    }

    /// Mutable weight `i`; writes land in the owning component.
    ///
    /// # Panics
    /// Panics if `i >= self.num_params()`.
    pub fn weight_mut(&mut self, i: usize) -> &mut Ten64 {
        let ParamSlot { component, slot } = self.params[i];
        &mut self.components[component].params_mut()[slot].value
    }

    /// Gradient `i` of [`Network::gradients`].
    ///
    /// # Panics
    /// Panics if `i >= self.num_params()`.
    pub fn gradient(&self, i: usize) -> &Ten64 {
        &self.param(i).grad
    }

    /// The most recent forward output of each component.
    pub fn out_bufs(&self) -> &[Ten64] {
        &self.out_bufs
    }

    /// One line per component followed by the loss function.
    pub fn describe(&self) -> String {
        let mut lines: Vec<String> = self.components.iter().map(|c| c.describe()).collect();
        lines.push(self.loss.describe());
        lines.join("\n")
    }

    /// Checks that declared dimensions line up along the chain.
    ///
    /// Compares each component's output dimensions with the next one's input
    /// dimensions, and the last component's output with the loss function's
    /// input. Every mismatch is reported; `None` means the chain is
    /// consistent. A network without components has nothing to check.
    pub fn validate(&self) -> Option<Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        for (index, pair) in self.components.windows(2).enumerate() {
            let (output, input) = (pair[0].dimensions().output, pair[1].dimensions().input);
            if output != input {
                issues.push(ValidationIssue::ComponentMismatch {
                    index,
                    next: index + 1,
                    producer: pair[0].describe(),
                    consumer: pair[1].describe(),
                    output,
                    input,
                });
            }
        }

        if let Some(last) = self.components.last() {
            let (output, expected) = (last.dimensions().output, self.loss.dimensions());
            if output != expected {
                issues.push(ValidationIssue::LossMismatch {
                    producer: last.describe(),
                    loss: self.loss.describe(),
                    output,
                    expected,
                });
            }
        }

        if issues.is_empty() {
            return None;
        }
        for issue in &issues {
            warn!("invalid network: {issue}");
        }
        Some(issues)
    }

    /// Forward pass.
    ///
    /// Feeds `input` through every component in order, leaving each output
    /// in its buffer. Returns the last output, or `input` itself when there
    /// are no components.
    pub fn eval<'a>(&'a mut self, input: &'a Ten64) -> &'a Ten64 {
        for i in 0..self.components.len() {
            let (done, rest) = self.out_bufs.split_at_mut(i);
            let prev = done.last().unwrap_or(input);
            self.components[i].apply(prev, &mut rest[0]);
        }
        self.out_bufs.last().unwrap_or(input)
    }

    /// Loss of the network's output for `point`.
    pub fn compute_loss(&mut self, point: &DataPoint) -> f64 {
        self.eval(&point.input);
        let output = self.out_bufs.last().unwrap_or(&point.input);
        self.loss.apply(output, &point.correct)
    }

    /// Adds the gradient of the loss for `point` into every component.
    ///
    /// Runs the forward pass first so the output buffers belong to `point`.
    /// Gradients are not zeroed here; call [`Network::zero_grad`] at the
    /// start of a batch to get the batch sum.
    pub fn backprop(&mut self, point: &DataPoint) {
        let n = self.components.len();
        if n == 0 {
            return;
        }

        self.eval(&point.input);
        let mut grad = self
            .loss
            .backprop(&self.out_bufs[n - 1], &point.correct);
        trace!("backprop through {n} components");

        // component i reads the output of i - 1, or the raw input for i = 0
        for i in (0..n).rev() {
            let input = if i == 0 { &point.input } else { &self.out_bufs[i - 1] };
            grad = self.components[i].backprop(input, &self.out_bufs[i], &grad);
        }
    }

    /// Sets every gradient in the chain to zero.
    pub fn zero_grad(&mut self) {
        for c in &mut self.components {
            c.zero_grad();
        }
    }

    /// One mini-batch gradient-descent step over `batch`.
    ///
    /// See [`Network::gradient_descent_step_range`].
    pub fn gradient_descent_step(&mut self, alpha: f64, lambda: f64, batch: &[DataPoint]) {
        self.gradient_descent_step_range(alpha, lambda, batch, 0..batch.len());
    }

    /// One mini-batch gradient-descent step over `data[range]`.
    ///
    /// In order: zero gradients; backprop every point (gradients sum); scale
    /// by `1 / range.len()`; if `lambda != 0`, add `2·lambda·w`; then
    /// `w += -alpha·grad`. When `lambda == 0` the regularization pass is
    /// skipped entirely. An empty range only zeroes the gradients.
    ///
    /// # Panics
    /// Panics if `range` is out of bounds for `data`.
    pub fn gradient_descent_step_range(
        &mut self,
        alpha: f64,
        lambda: f64,
        data: &[DataPoint],
        range: Range<usize>,
    ) {
        let batch = &data[range];
        self.zero_grad();
        if batch.is_empty() {
            debug!("empty batch: gradients zeroed, weights left as they were");
            return;
        }
        debug!(
            "gradient descent step: batch={}, alpha={alpha}, lambda={lambda}",
            batch.len()
        );

        for point in batch {
            self.backprop(point);
        }

        let norm = 1.0 / batch.len() as f64;
        let params = self.components.iter_mut().flat_map(|c| c.params_mut().iter_mut());
        for WithGrad { value, grad } in params {
            let rows = grad.batch_capacity();
            dispatch::scale(grad, norm, rows);
            if lambda != 0.0 {
                dispatch::scaled_accumulate(grad, value, 0, 2.0 * lambda);
            }
            dispatch::scaled_accumulate(value, grad, 0, -alpha);
        }
    }
}

impl Clone for Network {
    /// Deep copy: independent weights, zeroed gradients, empty output
    /// buffers. Accumulated gradients are not carried over.
    fn clone(&self) -> Self {
        Self::new(
            self.components.iter().map(|c| c.copy()).collect(),
            self.loss.copy(),
        )
    }
}
