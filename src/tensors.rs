//! Core tensor data structures.
//!
//! # Core Tensor Utilities
//!
//! A tensor is a flat, owned buffer plus the ordered dimension sizes that
//! give it structure. Kernels in [`crate::ops`] mutate tensors in place and
//! never copy implicitly.
//!
//! It supports:
//! - Construction of N-dimensional tensors with shape and row-major data layout
//! - Row-major linear indexing with bounds checks
//! - Batch-major views: the leading dimension is the batch capacity `S`
//! - Reusable buffers via [`Tensor::ensure_shape`]
//! - Weight/gradient pairing with [`WithGrad`]
//! - Compile-time tensor literals via the `tensor!` macro
//!
//! ## Limitations
//! - Row-major only
//! - No broadcasting, slicing, or shape inference
//!
//! ## Example
//!
//! ```rust
//! use ffnet::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! assert_eq!(t.at(&[1, 0]), 4.0);
//! ```

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 3]` for a 2×3 matrix.
/// - `data` holds the flattened content in row-major order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

/// The tensor type used throughout the kernels and the network engine.
pub type Ten64 = Tensor<f64>;

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// Number of elements in the allocation.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the allocation holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated batch capacity `S`: the leading dimension, or 1 for a scalar.
    pub fn batch_capacity(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Elements in one batch row.
    pub fn row_len(&self) -> usize {
        match self.batch_capacity() {
            0 => 0,
            s => self.data.len() / s,
        }
    }

    /// Row-major linear index of the coordinate `index`.
    ///
    /// # Panics
    /// Panics if the rank differs or any coordinate is out of range.
    pub fn linear_index(&self, index: &[usize]) -> usize {
        assert_eq!(
            index.len(),
            self.shape.len(),
            "index {:?} has wrong rank for shape {:?}",
            index,
            self.shape
        );
        index
            .iter()
            .zip(&self.shape)
            .fold(0, |acc, (&i, &dim)| {
                assert!(i < dim, "index {:?} out of bounds for shape {:?}", index, self.shape);
                acc * dim + i
            })
    }

}

impl<T: Copy + Default> Tensor<T> {
    /// A tensor of the given shape filled with `T::default()`.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![T::default(); len],
        }
    }

    /// A zeroed tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }

    /// Element at coordinate `index`.
    pub fn at(&self, index: &[usize]) -> T {
        self.data[self.linear_index(index)]
    }

    /// Reshapes a reusable buffer.
    ///
    /// The allocation is kept when the element count is unchanged; otherwise
    /// it is resized and new elements are zeroed. Existing contents are not
    /// meaningful afterwards.
    pub fn ensure_shape(&mut self, shape: &[usize]) {
        if self.shape != shape {
            self.shape.clear();
            self.shape.extend_from_slice(shape);
            self.data.resize(shape.iter().product(), T::default());
        }
    }
}

/// A parameter tensor paired with its gradient.
///
/// `grad` always has the same shape as `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct WithGrad<T> {
    pub value: T,
    pub grad: T,
}

impl<T: Copy + Default> WithGrad<Tensor<T>> {
    /// Wraps `value` with a zeroed gradient of the same shape.
    pub fn new(value: Tensor<T>) -> Self {
        let grad = value.zeros_like();
        Self { value, grad }
    }

    /// Copy of the weights with a fresh, zeroed gradient.
    pub fn detached(&self) -> Self {
        Self::new(self.value.clone())
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
///
/// # Example
/// ```
/// use ffnet::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape, vec![2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ([ $( [ $($row:tt)* ] ),+ $(,)? ]) => {{
        let children = vec![ $( $crate::tensor!([ $($row)* ]) ),+ ];
        let first_shape = &children[0].shape;
        assert!(children.iter().all(|c| c.shape == *first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].data.len());
        for c in children { data.extend(c.data); }
        $crate::tensors::Tensor::<f64>::new(shape, data)
    }};

    ([ $( $x:expr ),+ $(,)? ]) => {{
        let data: Vec<f64> = vec![ $( $x ),+ ];
        $crate::tensors::Tensor::<f64>::new(vec![data.len()], data)
    }};

    ($x:expr) => {
        $crate::tensors::Tensor::<f64>::new(Vec::<usize>::new(), vec![$x])
    };
}
