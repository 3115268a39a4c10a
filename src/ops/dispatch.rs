//! Operation Dispatch Layer
//!
//! This module runs each kernel on the executor of the global
//! [`Backend`](crate::backend::Backend), so components and the network
//! engine never name a concrete executor.
//!
//! # Example
//! ```rust
//! use ffnet::backend::{set_backend, Backend};
//! use ffnet::{ops::dispatch, tensor, tensors::Tensor};
//!
//! set_backend(Backend::Sequential);
//! let mut z = Tensor::zeros(vec![1, 3]);
//! dispatch::relu(&tensor!([[-1.0, 0.5, 2.0]]), &mut z, 1);
//! assert_eq!(z, tensor!([[0.0, 0.5, 2.0]]));
//! set_backend(Backend::Rayon);
//! ```

use super::kernels;
use crate::backend::executor;
use crate::tensors::Ten64;

/// Dispatches [`kernels::affine`].
pub fn affine(w: &Ten64, x: &Ten64, b: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::affine(executor(), w, x, b, z, s_max);
}

/// Dispatches [`kernels::outer_accumulate`].
pub fn outer_accumulate(x: &Ten64, y: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::outer_accumulate(executor(), x, y, z, s_max);
}

/// Dispatches [`kernels::transposed_matmul`].
pub fn transposed_matmul(x: &Ten64, w: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::transposed_matmul(executor(), x, w, z, s_max);
}

/// Dispatches [`kernels::relu`].
pub fn relu(x: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::relu(executor(), x, z, s_max);
}

/// Dispatches [`kernels::relu_backward`].
pub fn relu_backward(h: &Ten64, dldh: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::relu_backward(executor(), h, dldh, z, s_max);
}

/// Dispatches [`kernels::softmax`].
pub fn softmax(x: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::softmax(executor(), x, z, s_max);
}

/// Dispatches [`kernels::softmax_backward`].
pub fn softmax_backward(p: &Ten64, dldp: &Ten64, z: &mut Ten64, s_max: usize) {
    kernels::softmax_backward(executor(), p, dldp, z, s_max);
}

/// Dispatches [`kernels::add_assign`].
pub fn add_assign(z: &mut Ten64, x: &Ten64, s_max: usize) {
    kernels::add_assign(executor(), z, x, s_max);
}

/// Dispatches [`kernels::scale`].
pub fn scale(z: &mut Ten64, c: f64, s_max: usize) {
    kernels::scale(executor(), z, c, s_max);
}

/// Dispatches [`kernels::assign`].
pub fn assign(z: &mut Ten64, c: f64) {
    kernels::assign(executor(), z, c);
}

/// Dispatches [`kernels::scaled_accumulate`].
pub fn scaled_accumulate(z: &mut Ten64, x: &Ten64, s_idx: usize, c: f64) {
    kernels::scaled_accumulate(executor(), z, x, s_idx, c);
}

/// Dispatches [`kernels::one_hot_accumulate`].
pub fn one_hot_accumulate(z: &mut Ten64, y: usize, c: f64) {
    kernels::one_hot_accumulate(executor(), z, y, c);
}

/// Dispatches [`kernels::reduce_batch`].
pub fn reduce_batch(z: &mut Ten64, s_max: usize) {
    kernels::reduce_batch(executor(), z, s_max);
}
