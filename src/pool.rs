//! # Pool Module
//!
//! Reusable request/response instances, one pool per registered message.
//!
//! ## Overview
//!
//! Every dispatch needs a fresh request and response value. Rather than building
//! them per request, each handler descriptor owns two [`Pool`]s. A dispatch
//! acquires a [`Pooled`] guard, uses the value, and the guard hands it back on
//! drop. That covers every early-exit path of the pipeline.
//!
//! ## Reset on release
//!
//! A released value is reset to its zero value *before* it goes back on the free
//! list, so a later dispatch never sees fields left over from an earlier one.
//!
//! ## Sizing
//!
//! Pools grow on demand and have no capacity ceiling. `prewarm` builds instances
//! up front; `max_idle` bounds how many idle instances are kept, and releases
//! beyond it simply drop the value.
//!
//! ```rust
//! use brrtdispatch::pool::Pool;
//!
//! let pool: Pool<Vec<u8>> = Pool::new();
//! {
//!     let mut buf = pool.acquire();
//!     buf.extend_from_slice(b"hello");
//! } // released and cleared here
//! assert!(pool.acquire().is_empty());
//! assert_eq!(pool.stats().created, 1);
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Reset<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Pool sizing knobs applied at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolOptions {
    /// Instances constructed eagerly
    pub prewarm: usize,
    /// Idle instances retained; `None` keeps all of them
    pub max_idle: Option<usize>,
}

/// Counters for one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances constructed (prewarm plus misses)
    pub created: u64,
    /// Successful acquires
    pub acquired: u64,
    /// Instances handed back, whether kept or dropped
    pub released: u64,
    /// Instances currently on the free list
    pub idle: usize,
}

impl PoolStats {
    /// Instances acquired and not yet released
    #[must_use]
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Concurrent free list of reusable `T`s.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    make: Factory<T>,
    reset: Reset<T>,
    max_idle: Option<usize>,
    created: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl<T: Default + Send + 'static> Pool<T> {
    /// Pool whose zero value is `T::default()`.
    #[must_use]
    pub fn new() -> Self {
        Pool::with_factory(T::default, |value: &mut T| *value = T::default())
    }
}

impl<T: Default + Send + 'static> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Pool<T> {
    /// Pool with an explicit constructor and in-place reset.
    ///
    /// `reset` must leave the value equal to what `make` would build.
    pub fn with_factory<M, R>(make: M, reset: R) -> Self
    where
        M: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        Pool {
            free: Mutex::new(Vec::new()),
            make: Box::new(make),
            reset: Box::new(reset),
            max_idle: None,
            created: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Apply sizing options, constructing `prewarm` instances now.
    #[must_use]
    pub fn with_options(mut self, options: PoolOptions) -> Self {
        self.max_idle = options.max_idle;
        self.prewarm(options.prewarm);
        self
    }

    /// Construct up to `count` idle instances, respecting `max_idle`.
    pub fn prewarm(&self, count: usize) {
        let target = self.max_idle.map_or(count, |max| count.min(max));
        let mut free = self.free.lock();
        while free.len() < target {
            free.push((self.make)());
            self.created.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a zero-valued instance, building one if the free list is empty.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let recycled = self.free.lock().pop();
        let value = recycled.unwrap_or_else(|| {
            self.created.fetch_add(1, Ordering::Relaxed);
            (self.make)()
        });
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Pooled {
            value: Some(value),
            pool: self,
        }
    }

    fn put(&self, mut value: T) {
        (self.reset)(&mut value);
        self.released.fetch_add(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if self.max_idle.is_none_or(|max| free.len() < max) {
            free.push(value);
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            idle: self.free.lock().len(),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.free.lock().len())
            .field("max_idle", &self.max_idle)
            .field("created", &self.created.load(Ordering::Relaxed))
            .finish()
    }
}

/// Exclusive handle on a pooled value; returns it to the pool on drop.
pub struct Pooled<'a, T: Send> {
    value: Option<T>,
    pool: &'a Pool<T>,
}

impl<T: Send> Pooled<'_, T> {
    /// Release now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: Send> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // `value` is only taken in `drop`
        match &self.value {
            Some(value) => value,
            None => unreachable_released(),
        }
    }
}

impl<T: Send> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable_released(),
        }
    }
}

impl<T: Send> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.put(value);
        }
    }
}

impl<T: Send + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.value).finish()
    }
}

#[cold]
#[allow(clippy::panic)]
fn unreachable_released() -> ! {
    panic!("pooled value accessed after release")
}
