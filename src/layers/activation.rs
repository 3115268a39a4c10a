use crate::component::{Component, Dimensions};
use crate::ops::dispatch;
use crate::tensors::{Ten64, Tensor, WithGrad};

/// Elementwise `max(0, x)` over `width` features.
#[derive(Debug, Clone)]
pub struct Relu {
    width: usize,
}

impl Relu {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Component for Relu {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new([self.width], [self.width])
    }

    fn apply(&self, input: &Ten64, output: &mut Ten64) {
        let s = input.batch_capacity();
        output.ensure_shape(&input.shape);
        dispatch::relu(input, output, s);
    }

    fn backprop(&mut self, _input: &Ten64, output: &Ten64, output_gradient: &Ten64) -> Ten64 {
        let s = output.batch_capacity();
        let mut input_gradient = Tensor::zeros(output.shape.clone());
        dispatch::relu_backward(output, output_gradient, &mut input_gradient, s);
        input_gradient
    }

    fn params(&self) -> &[WithGrad<Ten64>] {
        &[]
    }

    fn params_mut(&mut self) -> &mut [WithGrad<Ten64>] {
        &mut []
    }

    fn copy(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("Relu({})", self.width)
    }
}

/// Row-wise softmax over `width` classes.
#[derive(Debug, Clone)]
pub struct Softmax {
    width: usize,
}

impl Softmax {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Component for Softmax {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new([self.width], [self.width])
    }

    fn apply(&self, input: &Ten64, output: &mut Ten64) {
        let s = input.batch_capacity();
        output.ensure_shape(&input.shape);
        dispatch::softmax(input, output, s);
    }

    fn backprop(&mut self, _input: &Ten64, output: &Ten64, output_gradient: &Ten64) -> Ten64 {
        let s = output.batch_capacity();
        let mut input_gradient = Tensor::zeros(output.shape.clone());
        dispatch::softmax_backward(output, output_gradient, &mut input_gradient, s);
        input_gradient
    }

    fn params(&self) -> &[WithGrad<Ten64>] {
        &[]
    }

    fn params_mut(&mut self) -> &mut [WithGrad<Ten64>] {
        &mut []
    }

    fn copy(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("Softmax({})", self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor;
    use approx::assert_abs_diff_eq;

    #[test]
    fn relu_masks_gradient_by_output() {
        let mut r = Relu::new(3);
        let x = tensor!([[-2.0, 0.0, 3.0]]);
        let mut out = Tensor::default();
        r.apply(&x, &mut out);
        assert_eq!(out, tensor!([[0.0, 0.0, 3.0]]));

        let dx = r.backprop(&x, &out, &tensor!([[1.0, 1.0, 1.0]]));
        assert_eq!(dx, tensor!([[0.0, 0.0, 1.0]]));
        assert!(r.weights().is_empty());
    }

    #[test]
    fn softmax_gradient_under_uniform_upstream_vanishes() {
        let mut sm = Softmax::new(4);
        let x = tensor!([[0.1, 0.2, -0.3, 1.0]]);
        let mut p = Tensor::default();
        sm.apply(&x, &mut p);

        // rows of the Jacobian sum to zero
        let dx = sm.backprop(&x, &p, &tensor!([[1.0, 1.0, 1.0, 1.0]]));
        for v in dx.data {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
    }
}
