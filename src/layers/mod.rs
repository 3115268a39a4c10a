//! Reference components.
//!
//! Ordinary [`Component`](crate::component::Component) implementations built
//! on the dispatched kernels. The network engine does not depend on them.

mod activation;
pub use activation::{Relu, Softmax};

mod dense;
pub use dense::Dense;
