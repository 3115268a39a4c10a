//! Batched tensor kernels.
//!
//! Shapes follow one convention throughout: `W: M×N`, `x: S×N`, `b: M`,
//! `z: S×M` unless a function says otherwise. Every kernel hands its output
//! range to [`ParallelFor::for_each_mut`]; each unit computes one element
//! from read-only operands, folding any sum in index order.

use crate::backend::ParallelFor;
use crate::tensors::Ten64;

/// Panics unless `s_max` rows fit in `t`.
#[inline]
fn check_active(t: &Ten64, s_max: usize, what: &str) {
    assert!(
        s_max <= t.batch_capacity(),
        "{what}: active batch {s_max} exceeds capacity {} of shape {:?}",
        t.batch_capacity(),
        t.shape
    );
}

/// Splits `W` into `(M, N)`.
#[inline]
fn matrix_dims(w: &Ten64, what: &str) -> (usize, usize) {
    assert_eq!(w.shape.len(), 2, "{what}: weight matrix must be rank 2, got {:?}", w.shape);
    (w.shape[0], w.shape[1])
}

/// Affine transform `z = Wx + b`, batched over rows of `x`.
///
/// $$ z_{s,m} = b_m + \sum_n W_{m,n} x_{s,n} $$
///
/// The dot product is folded from `0.0` in increasing `n`, then added to
/// `b[m]`.
///
/// # Panics
/// Panics if `x` rows are not `N` long, `b` is not `M` long, `z` rows are not
/// `M` long, or `s_max` exceeds either batch capacity.
pub fn affine<P: ParallelFor + ?Sized>(
    par: &P,
    w: &Ten64,
    x: &Ten64,
    b: &Ten64,
    z: &mut Ten64,
    s_max: usize,
) {
    let (m, n) = matrix_dims(w, "affine");
    assert_eq!(x.row_len(), n, "affine: input rows must have {n} elements");
    assert_eq!(b.len(), m, "affine: bias must have {m} elements");
    assert_eq!(z.row_len(), m, "affine: output rows must have {m} elements");
    check_active(x, s_max, "affine");
    check_active(z, s_max, "affine");

    let (wd, xd, bd) = (&w.data, &x.data, &b.data);
    par.for_each_mut(&mut z.data[..s_max * m], &|i, out| {
        let (s, row) = (i / m, i % m);
        let mut acc = 0.0;
        for k in 0..n {
            acc += wd[row * n + k] * xd[s * n + k];
        }
        *out = bd[row] + acc;
    });
}

/// Batched outer-product accumulation `z += x yᵗ`.
///
/// `x: S×M`, `y: S×N`, `z: S×M×N`:
/// $$ z_{s,m,n} \mathrel{+}= x_{s,m} \, y_{s,n} $$
///
/// # Panics
/// Panics if `z` rows are not `M·N` long or `s_max` exceeds a capacity.
pub fn outer_accumulate<P: ParallelFor + ?Sized>(
    par: &P,
    x: &Ten64,
    y: &Ten64,
    z: &mut Ten64,
    s_max: usize,
) {
    let (m, n) = (x.row_len(), y.row_len());
    assert_eq!(
        z.row_len(),
        m * n,
        "outer_accumulate: output rows must have {m}x{n} elements, shape is {:?}",
        z.shape
    );
    check_active(x, s_max, "outer_accumulate");
    check_active(y, s_max, "outer_accumulate");
    check_active(z, s_max, "outer_accumulate");

    let plane = m * n;
    let (xd, yd) = (&x.data, &y.data);
    par.for_each_mut(&mut z.data[..s_max * plane], &|i, out| {
        let (s, r) = (i / plane, i % plane);
        *out += xd[s * m + r / n] * yd[s * n + r % n];
    });
}

/// Transposed matrix product `z = (xᵗW)ᵗ`, batched over rows of `x`.
///
/// `x: S×M`, `W: M×N`, `z: S×N`:
/// $$ z_{s,n} = \sum_m x_{s,m} W_{m,n} $$
///
/// This is the input gradient of [`affine`] when `x` is the output gradient.
///
/// # Panics
/// Panics on mismatched row lengths or if `s_max` exceeds a capacity.
pub fn transposed_matmul<P: ParallelFor + ?Sized>(
    par: &P,
    x: &Ten64,
    w: &Ten64,
    z: &mut Ten64,
    s_max: usize,
) {
    let (m, n) = matrix_dims(w, "transposed_matmul");
    assert_eq!(x.row_len(), m, "transposed_matmul: input rows must have {m} elements");
    assert_eq!(z.row_len(), n, "transposed_matmul: output rows must have {n} elements");
    check_active(x, s_max, "transposed_matmul");
    check_active(z, s_max, "transposed_matmul");

    let (xd, wd) = (&x.data, &w.data);
    par.for_each_mut(&mut z.data[..s_max * n], &|i, out| {
        let (s, col) = (i / n, i % n);
        let mut acc = 0.0;
        for k in 0..m {
            acc += xd[s * m + k] * wd[k * n + col];
        }
        *out = acc;
    });
}

/// `ReLU` forward: `z[i] = max(0, x[i])` over the active rows.
pub fn relu<P: ParallelFor + ?Sized>(par: &P, x: &Ten64, z: &mut Ten64, s_max: usize) {
    let len = x.row_len();
    assert_eq!(z.row_len(), len, "relu: input and output rows differ");
    check_active(x, s_max, "relu");
    check_active(z, s_max, "relu");

    let xd = &x.data;
    par.for_each_mut(&mut z.data[..s_max * len], &|i, out| {
        *out = if xd[i] > 0.0 { xd[i] } else { 0.0 };
    });
}

/// `ReLU` backward: `z[i] = dldh[i]` where `h[i] > 0`, else `0`.
///
/// `h` may be either the forward input or output; both give the same mask.
pub fn relu_backward<P: ParallelFor + ?Sized>(
    par: &P,
    h: &Ten64,
    dldh: &Ten64,
    z: &mut Ten64,
    s_max: usize,
) {
    let len = h.row_len();
    assert_eq!(dldh.row_len(), len, "relu_backward: gradient rows differ from activations");
    assert_eq!(z.row_len(), len, "relu_backward: output rows differ from activations");
    check_active(h, s_max, "relu_backward");
    check_active(dldh, s_max, "relu_backward");
    check_active(z, s_max, "relu_backward");

    let (hd, gd) = (&h.data, &dldh.data);
    par.for_each_mut(&mut z.data[..s_max * len], &|i, out| {
        *out = if hd[i] > 0.0 { gd[i] } else { 0.0 };
    });
}

/// Row-wise softmax: `z[s,i] = exp(x[s,i]) / Σ_j exp(x[s,j])`.
///
/// The maximum is *not* subtracted before exponentiating, so inputs above
/// roughly 709 overflow to `inf` and produce `NaN`s.
///
/// Runs two passes: one unit per row folds the denominator, then one unit
/// per element divides.
pub fn softmax<P: ParallelFor + ?Sized>(par: &P, x: &Ten64, z: &mut Ten64, s_max: usize) {
    let len = x.row_len();
    assert_eq!(z.row_len(), len, "softmax: input and output rows differ");
    check_active(x, s_max, "softmax");
    check_active(z, s_max, "softmax");

    let xd = &x.data;
    let mut sums = vec![0.0; s_max];
    par.for_each_mut(&mut sums, &|s, out| {
        let mut acc = 0.0;
        for j in 0..len {
            acc += xd[s * len + j].exp();
        }
        *out = acc;
    });

    let sums = &sums;
    par.for_each_mut(&mut z.data[..s_max * len], &|i, out| {
        *out = xd[i].exp() / sums[i / len];
    });
}

/// Softmax backward through the Jacobian of each row.
///
/// With `p` the forward output,
/// $$ z_i = \sum_j \frac{\partial L}{\partial p_j} s_{j,i}, \quad
///    s_{i,i} = p_i - p_i^2, \quad s_{j,i} = -p_j p_i \; (j \ne i) $$
pub fn softmax_backward<P: ParallelFor + ?Sized>(
    par: &P,
    p: &Ten64,
    dldp: &Ten64,
    z: &mut Ten64,
    s_max: usize,
) {
    let len = p.row_len();
    assert_eq!(dldp.row_len(), len, "softmax_backward: gradient rows differ from probabilities");
    assert_eq!(z.row_len(), len, "softmax_backward: output rows differ from probabilities");
    check_active(p, s_max, "softmax_backward");
    check_active(dldp, s_max, "softmax_backward");
    check_active(z, s_max, "softmax_backward");

    let (pd, gd) = (&p.data, &dldp.data);
    par.for_each_mut(&mut z.data[..s_max * len], &|i, out| {
        let (base, col) = (i - i % len, i % len);
        let pi = pd[i];
        let mut acc = 0.0;
        for j in 0..len {
            let pj = pd[base + j];
            let jac = if j == col { pi - pi * pi } else { -pj * pi };
            acc += gd[base + j] * jac;
        }
        *out = acc;
    });
}

/// Elementwise `z += x` over the active rows.
pub fn add_assign<P: ParallelFor + ?Sized>(par: &P, z: &mut Ten64, x: &Ten64, s_max: usize) {
    let len = z.row_len();
    assert_eq!(x.row_len(), len, "add_assign: operand rows differ");
    check_active(z, s_max, "add_assign");
    check_active(x, s_max, "add_assign");

    let xd = &x.data;
    par.for_each_mut(&mut z.data[..s_max * len], &|i, out| *out += xd[i]);
}

/// Scalar `z *= c` over the active rows.
pub fn scale<P: ParallelFor + ?Sized>(par: &P, z: &mut Ten64, c: f64, s_max: usize) {
    check_active(z, s_max, "scale");
    let len = z.row_len();
    par.for_each_mut(&mut z.data[..s_max * len], &|_, out| *out *= c);
}

/// Scalar `z = c` over the whole allocation, regardless of batch.
pub fn assign<P: ParallelFor + ?Sized>(par: &P, z: &mut Ten64, c: f64) {
    par.for_each_mut(&mut z.data, &|_, out| *out = c);
}

/// Adds one scaled slice of `x` into an unbatched accumulator: `z += x[s_idx]·c`.
///
/// `x` is viewed as consecutive rows of `z.len()` elements, so a batched
/// `S×M×N` scratch feeds an `M×N` gradient and a same-shaped tensor is a
/// single row at `s_idx = 0`.
///
/// # Panics
/// Panics if `x.len()` is not a multiple of `z.len()` or `s_idx` is past the
/// last row.
pub fn scaled_accumulate<P: ParallelFor + ?Sized>(
    par: &P,
    z: &mut Ten64,
    x: &Ten64,
    s_idx: usize,
    c: f64,
) {
    let len = z.len();
    if len == 0 {
        return;
    }
    assert_eq!(
        x.len() % len,
        0,
        "scaled_accumulate: {:?} does not split into rows of {len}",
        x.shape
    );
    assert!(
        s_idx < x.len() / len,
        "scaled_accumulate: row {s_idx} out of range for {:?}",
        x.shape
    );

    let row = &x.data[s_idx * len..(s_idx + 1) * len];
    par.for_each_mut(&mut z.data, &|i, out| *out += row[i] * c);
}

/// Single-element update `z[y] += c`, routed through the executor like
/// every other kernel.
///
/// # Panics
/// Panics if `y` is outside the allocation.
pub fn one_hot_accumulate<P: ParallelFor + ?Sized>(par: &P, z: &mut Ten64, y: usize, c: f64) {
    assert!(
        y < z.len(),
        "one_hot_accumulate: index {y} out of bounds for {} elements",
        z.len()
    );
    par.for_each_mut(&mut z.data[y..=y], &|_, out| *out += c);
}

/// Collapses the batch dimension into row 0: `z[0,j] = Σ_{s<s_max} z[s,j]`.
///
/// Each trailing index `j` folds its column in increasing `s`. Rows other
/// than 0 are left as they were. With `s_max == 0` nothing changes.
pub fn reduce_batch<P: ParallelFor + ?Sized>(par: &P, z: &mut Ten64, s_max: usize) {
    check_active(z, s_max, "reduce_batch");
    if s_max == 0 {
        return;
    }
    let len = z.row_len();
    let (head, tail) = z.data.split_at_mut(len);
    let tail = &*tail;
    par.for_each_mut(head, &|j, out| {
        let mut acc = *out;
        for s in 1..s_max {
            acc += tail[(s - 1) * len + j];
        }
        *out = acc;
    });
}
