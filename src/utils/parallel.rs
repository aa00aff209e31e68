use crate::error::{MakeValidError, Result};
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Maps `f` over `items`, keeping input order, stopping at the first error.
///
/// Runs on the current rayon pool when the `parallel` feature is enabled.
#[inline]
pub fn try_map_ordered<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        // Not worth a fork for a single unit
        if items.len() > 1 {
            return items.par_iter().enumerate().map(|(i, t)| f(i, t)).collect();
        }
    }
    items.iter().enumerate().map(|(i, t)| f(i, t)).collect()
}

/// Runs `op` on a dedicated pool of `threads` workers, or on the caller's pool for `None`.
pub fn with_pool<R, OP>(threads: Option<usize>, op: OP) -> Result<R>
where
    R: Send,
    OP: FnOnce() -> R + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if let Some(n) = threads {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| MakeValidError::ThreadPool(e.to_string()))?;
            return Ok(pool.install(op));
        }
    }
    let _ = threads;
    Ok(op())
}

/// Runs one unit of work, turning a panic into [`MakeValidError::WorkerPanic`].
pub fn guarded<R, L, F>(unit: L, f: F) -> Result<R>
where
    L: FnOnce() -> String,
    F: FnOnce() -> Result<R>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => Err(MakeValidError::WorkerPanic {
            unit: unit(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
