//! ffnet: a feed-forward neural-network training engine.
//!
//! Built on hand-rolled batched tensor kernels that run over flat row-major
//! buffers. Every kernel writes disjoint output elements per unit of work, so
//! each one is issued through a single data-parallel loop primitive whose
//! backend (sequential, rayon) can be swapped at runtime.
//!
//! # Modules
//!
//! - [`backend`]: Execution backends and the [`backend::ParallelFor`] loop primitive.
//! - [`tensors`]: Flat tensors, weight/gradient pairs, the `tensor!` literal macro.
//! - [`ops`]: The tensor kernel library and its backend dispatch.
//! - [`component`]: Capability traits for layers and loss functions.
//! - [`network`]: The network engine: validation, evaluation, backprop, gradient descent.
//! - [`data`]: Labelled data points.
//! - [`layers`] / [`loss`]: Reference components and loss functions.
//! - [`error`]: Recoverable errors and validation issues.
//!
//! # Example
//!
//! ```rust
//! use ffnet::{data::DataPoint, layers::{Dense, Softmax}, loss::CrossEntropy, network::Network, tensor};
//!
//! let dense = Dense::from_parameters(tensor!([[1.0, 0.0], [0.0, 1.0]]), tensor!([0.0, 0.0]));
//! let mut net = Network::new(vec![Box::new(dense), Box::new(Softmax::new(2))], Box::new(CrossEntropy::new(2)));
//! assert!(net.validate().is_none());
//!
//! let point = DataPoint::sample(vec![1.0, 2.0], vec![1]);
//! let before = net.compute_loss(&point);
//! net.gradient_descent_step(0.5, 0.0, std::slice::from_ref(&point));
//! assert!(net.compute_loss(&point) < before);
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod component;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod network;
pub mod ops;
pub mod tensors;

pub use error::{Error, Result};
