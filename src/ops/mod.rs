//! # Tensor Kernel Library
//!
//! Stateless batched numeric primitives over flat row-major buffers. They
//! know nothing about layers or networks.
//!
//! ## Submodules
//!
//! - [`kernels`]: The primitives, generic over any [`ParallelFor`](crate::backend::ParallelFor) executor
//! - [`dispatch`]: The same primitives bound to the globally selected backend
//!
//! ## Conventions
//!
//! - The leading dimension of a batched tensor is its batch capacity `S`.
//! - Every batched primitive takes an explicit active batch size `s_max <= S`
//!   and touches only the first `s_max` rows, so a buffer sized for a full
//!   batch can be reused for a smaller final one. Rows past `s_max` keep
//!   whatever they held before.
//! - Each unit of work writes exactly one output element. Reductions inside a
//!   unit (dot products, sums) are left-to-right folds, so results are
//!   bitwise identical across backends and thread counts.
//! - Shape mismatches and out-of-range indices panic. They are contract
//!   violations, not recoverable errors.
//!
//! ## Example
//! ```rust
//! use ffnet::{ops::dispatch, tensor, tensors::Tensor};
//!
//! let w = tensor!([[2.0, 0.0], [0.0, 3.0]]);
//! let b = tensor!([1.0, 1.0]);
//! let x = tensor!([[1.0, 1.0]]);
//! let mut z = Tensor::zeros(vec![1, 2]);
//! dispatch::affine(&w, &x, &b, &mut z, 1);
//! assert_eq!(z, tensor!([[3.0, 4.0]]));
//! ```

pub mod dispatch;
pub mod kernels;
