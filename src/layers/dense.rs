use rand::Rng;

use crate::component::{Component, Dimensions};
use crate::ops::dispatch;
use crate::tensors::{Ten64, Tensor, WithGrad};

const WEIGHTS: usize = 0;
const BIAS: usize = 1;

/// A fully connected layer: `output = W·input + b`.
///
/// `W` is `out × in` and `b` has `out` elements. Batched inputs are `S × in`.
#[derive(Debug)]
pub struct Dense {
    params: [WithGrad<Ten64>; 2],
    // S×out×in, one outer product per batch row
    scratch: Ten64,
}

impl Dense {
    /// Builds a layer from an `out × in` weight matrix and `out` biases.
    ///
    /// # Panics
    /// Panics if `weights` is not rank 2 or `bias` does not have one entry
    /// per output.
    pub fn from_parameters(weights: Ten64, bias: Ten64) -> Self {
        assert_eq!(weights.shape.len(), 2, "dense weights must be rank 2");
        assert_eq!(
            bias.len(),
            weights.shape[0],
            "dense bias must have one entry per output"
        );
        let bias = Tensor::new(vec![weights.shape[0]], bias.data);
        Self {
            params: [WithGrad::new(weights), WithGrad::new(bias)],
            scratch: Tensor::default(),
        }
    }

    /// Xavier-uniform weights in `±sqrt(6 / (in + out))`, zero biases.
    pub fn random<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + outputs).max(1) as f64).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.random_range(-limit..=limit))
            .collect();
        Self::from_parameters(
            Tensor::new(vec![outputs, inputs], weights),
            Tensor::zeros(vec![outputs]),
        )
    }

    fn inputs(&self) -> usize {
        self.params[WEIGHTS].value.shape[1]
    }

    fn outputs(&self) -> usize {
        self.params[WEIGHTS].value.shape[0]
    }
}

impl Component for Dense {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new([self.inputs()], [self.outputs()])
    }

    fn apply(&self, input: &Ten64, output: &mut Ten64) {
        let s = input.batch_capacity();
        output.ensure_shape(&[s, self.outputs()]);
        let [w, b] = &self.params;
        dispatch::affine(&w.value, input, &b.value, output, s);
    }

    fn backprop(&mut self, input: &Ten64, _output: &Ten64, output_gradient: &Ten64) -> Ten64 {
        let s = input.batch_capacity();
        let (m, n) = (self.outputs(), self.inputs());
        let [w, b] = &mut self.params;

        self.scratch.ensure_shape(&[s, m, n]);
        dispatch::assign(&mut self.scratch, 0.0);
        dispatch::outer_accumulate(output_gradient, input, &mut self.scratch, s);
        dispatch::reduce_batch(&mut self.scratch, s);
        if s > 0 {
            dispatch::scaled_accumulate(&mut w.grad, &self.scratch, 0, 1.0);
        }

        for row in 0..s {
            dispatch::scaled_accumulate(&mut b.grad, output_gradient, row, 1.0);
        }

        let mut input_gradient = Tensor::zeros(vec![s, n]);
        dispatch::transposed_matmul(output_gradient, &w.value, &mut input_gradient, s);
        input_gradient
    }

    fn params(&self) -> &[WithGrad<Ten64>] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [WithGrad<Ten64>] {
        &mut self.params
    }

    fn copy(&self) -> Box<dyn Component> {
        Box::new(Self {
            params: [self.params[WEIGHTS].detached(), self.params[BIAS].detached()],
            scratch: Tensor::default(),
        })
    }

    fn describe(&self) -> String {
        format!("Dense({} -> {})", self.inputs(), self.outputs())
    }
}
