//! Backend selection module.
//!
//! This module defines the data-parallel loop primitive every kernel is
//! written against ([`ParallelFor`]), the executors that implement it, and
//! the global switch selecting which executor the [`crate::ops::dispatch`]
//! layer uses.
//!
//! # Supported Backends
//!
//! - `Rayon`: Work-stealing parallel loop on rayon's global pool (default).
//! - `Sequential`: Plain in-order loop on the calling thread.
//!
//! The backend is stored globally using an `AtomicU8`, enabling fast
//! switching between executors at runtime. Because every kernel folds its
//! per-element reductions in a fixed order, both backends produce bitwise
//! identical results.
//!
//! A dedicated [`ThreadPoolExecutor`] can be built for callers who want to
//! drive the executor-generic kernels in [`crate::ops::kernels`] on a pool
//! of their own size.

use core::convert::TryFrom;
use core::sync::atomic::{AtomicU8, Ordering};

use log::info;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// A parallel loop over the elements of an output buffer.
///
/// `for_each_mut(out, f)` calls `f(i, &mut out[i])` exactly once for every
/// `i` in `[0, out.len())` and returns only when all calls have completed.
/// Calls may run concurrently and in any order, so `f` must only write the
/// element it is handed.
pub trait ParallelFor: Send + Sync {
    /// Runs `f` for every index of `out`.
    fn for_each_mut(&self, out: &mut [f64], f: &(dyn Fn(usize, &mut f64) + Sync));
}

/// Runs every unit of work in index order on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ParallelFor for Sequential {
    fn for_each_mut(&self, out: &mut [f64], f: &(dyn Fn(usize, &mut f64) + Sync)) {
        for (i, o) in out.iter_mut().enumerate() {
            f(i, o);
        }
    }
}

/// Splits the work across rayon's global thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rayon;

impl ParallelFor for Rayon {
    fn for_each_mut(&self, out: &mut [f64], f: &(dyn Fn(usize, &mut f64) + Sync)) {
        out.par_iter_mut().enumerate().for_each(|(i, o)| f(i, o));
    }
}

/// Splits the work across a dedicated rayon pool.
#[derive(Debug)]
pub struct ThreadPoolExecutor {
    pool: rayon::ThreadPool,
}

impl ThreadPoolExecutor {
    /// Builds a pool with `threads` workers.
    ///
    /// # Errors
    /// Fails if `threads` is zero or the pool cannot be spawned.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::ZeroThreads);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ffnet-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    /// Number of worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ParallelFor for ThreadPoolExecutor {
    fn for_each_mut(&self, out: &mut [f64], f: &(dyn Fn(usize, &mut f64) + Sync)) {
        self.pool
            .install(|| out.par_iter_mut().enumerate().for_each(|(i, o)| f(i, o)));
    }
}

/// Enumeration of supported computation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Rayon's global pool (default).
    #[default]
    Rayon = 0,
    /// In-order loop on the calling thread.
    Sequential,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Rayon),
            1 => Ok(Self::Sequential),
            _ => Err(()),
        }
    }
}

impl Backend {
    /// The executor implementing this backend.
    pub fn executor(self) -> &'static dyn ParallelFor {
        static RAYON: Rayon = Rayon;
        static SEQUENTIAL: Sequential = Sequential;
        match self {
            Self::Rayon => &RAYON,
            Self::Sequential => &SEQUENTIAL,
        }
    }
}

/// Internal global state for the active backend.
///
/// Relaxed switching is fine: the backend only changes between kernel
/// calls, never during one.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Rayon as u8);

/// Sets the active backend used by [`crate::ops::dispatch`].
///
/// # Example
///
/// ```
/// use ffnet::backend::{get_backend, set_backend, Backend};
/// set_backend(Backend::Sequential);
/// assert_eq!(get_backend(), Backend::Sequential);
/// set_backend(Backend::Rayon);
/// ```
pub fn set_backend(b: Backend) {
    info!("switching kernel backend to {b:?}");
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active computation backend.
///
/// If the stored value is invalid, defaults to [`Backend::Rayon`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}

/// The executor of the currently active backend.
pub fn executor() -> &'static dyn ParallelFor {
    get_backend().executor()
}

/// Sizes rayon's global pool, which backs [`Backend::Rayon`].
///
/// Must be called before the first parallel kernel runs; rayon builds its
/// global pool lazily and only once.
///
/// # Errors
/// Fails if `threads` is zero or the global pool was already initialized.
pub fn configure_threads(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(Error::ZeroThreads);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    info!("rayon global pool configured with {threads} threads");
    Ok(())
}
