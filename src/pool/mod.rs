//! Fixed-capacity pool of expensive, reusable instances.
//!
//! Transform engines (compiler contexts and the like) are costly to build and
//! may hold state, so they are created at most `capacity` times and shared
//! across worker threads.
//!
//! # Invariants
//! - At most `capacity` instances are checked out at once (counting semaphore).
//! - At most `capacity` instances are ever created under every loading mode.
//! - A checked-out instance goes back to the store when its [`Pooled`] guard
//!   drops; the store is updated before the permit is released.
//!
//! # Example
//!
//! ```ignore
//! let pool = PoolBuilder::new(4)
//!     .loading(LoadingMode::Lazy)
//!     .access(AccessMode::Circular)
//!     .factory(|| Ok(Engine::boot()?))
//!     .build()?;
//! let engine = pool.acquire(&cancel)?;
//! engine.compile(source);
//! ```

mod semaphore;
mod store;

use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::{Cancellation, Interrupted};
use semaphore::{AcquireError, Semaphore};
use store::{Slotted, Store};

/// When instances are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingMode {
    /// All instances are created by [`PoolBuilder::build`].
    Eager,
    /// Idle instances are reused first; new ones only when none are idle.
    #[default]
    Lazy,
    /// Each acquisition races to create a new instance while fewer than
    /// `capacity` exist; a loser falls back to an idle one.
    LazyExpanding,
}

/// Which idle instance an acquisition gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    Fifo,
    Lifo,
    /// Round-robin over fixed slots.
    Circular,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool capacity must be greater than zero")]
    ZeroCapacity,

    #[error("pool has no instance factory")]
    MissingFactory,

    #[error("failed to create pool instance")]
    Factory(#[source] anyhow::Error),

    #[error("pool has been disposed")]
    Disposed,

    #[error("no idle instance despite a free permit")]
    Exhausted,

    #[error("pool acquire stopped: {0}")]
    Interrupted(Interrupted),
}

impl PoolError {
    /// Misconfiguration or use-after-dispose, as opposed to a failing engine
    /// or an interrupted wait.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::ZeroCapacity | Self::MissingFactory | Self::Disposed | Self::Exhausted
        )
    }
}

type Factory<T> = Box<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

// =============================================================================
// Builder
// =============================================================================

/// Validating builder for [`Pool`].
pub struct PoolBuilder<T> {
    capacity: usize,
    loading: LoadingMode,
    access: AccessMode,
    factory: Option<Factory<T>>,
}

impl<T> PoolBuilder<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            loading: LoadingMode::default(),
            access: AccessMode::default(),
            factory: None,
        }
    }

    pub fn loading(mut self, loading: LoadingMode) -> Self {
        self.loading = loading;
        self
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn build(self) -> Result<Pool<T>, PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        let factory = self.factory.ok_or(PoolError::MissingFactory)?;

        let mut inner = Inner {
            store: Store::new(self.access, self.capacity),
            created: 0,
            next_slot: 0,
            free_slots: Vec::new(),
            disposed: false,
        };

        if self.loading == LoadingMode::Eager {
            for _ in 0..self.capacity {
                let value = factory().map_err(PoolError::Factory)?;
                let slot = inner.reserve();
                inner.store.put(Slotted { value, slot });
            }
        }

        Ok(Pool {
            capacity: self.capacity,
            loading: self.loading,
            factory,
            semaphore: Semaphore::new(self.capacity),
            inner: Mutex::new(inner),
        })
    }
}

// =============================================================================
// Pool
// =============================================================================

struct Inner<T> {
    store: Store<T>,
    /// Instances alive (idle + checked out + being created).
    created: usize,
    next_slot: usize,
    /// Slots freed by failed creations.
    free_slots: Vec<usize>,
    disposed: bool,
}

impl<T> Inner<T> {
    fn reserve(&mut self) -> usize {
        self.created += 1;
        self.free_slots.pop().unwrap_or_else(|| {
            let slot = self.next_slot;
            self.next_slot += 1;
            slot
        })
    }

    fn unreserve(&mut self, slot: usize) {
        self.created -= 1;
        self.free_slots.push(slot);
    }
}

/// Bounded pool; see the module docs.
pub struct Pool<T> {
    capacity: usize,
    loading: LoadingMode,
    factory: Factory<T>,
    semaphore: Semaphore,
    inner: Mutex<Inner<T>>,
}

impl<T> Pool<T> {
    /// Block until an instance is available.
    ///
    /// The wait is bounded by `cancel`; a disposed pool fails immediately.
    pub fn acquire(&self, cancel: &Cancellation) -> Result<Pooled<'_, T>, PoolError> {
        if self.inner.lock().disposed {
            return Err(PoolError::Disposed);
        }

        self.semaphore.acquire(cancel).map_err(|e| match e {
            AcquireError::Closed => PoolError::Disposed,
            AcquireError::Interrupted(reason) => PoolError::Interrupted(reason),
        })?;

        match self.checkout() {
            Ok(item) => Ok(Pooled {
                pool: self,
                item: Some(item),
            }),
            Err(e) => {
                self.semaphore.release();
                Err(e)
            }
        }
    }

    /// Caller holds a permit.
    fn checkout(&self) -> Result<Slotted<T>, PoolError> {
        let mut inner = self.inner.lock();
        if inner.disposed {
            return Err(PoolError::Disposed);
        }

        let may_create = inner.created < self.capacity;
        let create = match self.loading {
            LoadingMode::Eager => false,
            LoadingMode::Lazy => may_create && inner.store.idle() == 0,
            LoadingMode::LazyExpanding => may_create,
        };

        if create {
            let slot = inner.reserve();
            drop(inner);
            return self.create(slot);
        }

        inner.store.take().ok_or(PoolError::Exhausted)
    }

    /// Run the factory outside the lock.
    fn create(&self, slot: usize) -> Result<Slotted<T>, PoolError> {
        match (self.factory)() {
            Ok(value) => {
                crate::debug!("pool"; "created instance in slot {}", slot);
                Ok(Slotted { value, slot })
            }
            Err(e) => {
                self.inner.lock().unreserve(slot);
                Err(PoolError::Factory(e))
            }
        }
    }

    fn release(&self, item: Slotted<T>) {
        let mut inner = self.inner.lock();
        if inner.disposed {
            drop(inner);
            drop(item);
        } else {
            inner.store.put(item);
            drop(inner);
        }
        self.semaphore.release();
    }

    /// Drop every idle instance and fail all waiting and future acquisitions.
    ///
    /// Instances still checked out are dropped when their guards return them.
    /// Returns the number of idle instances disposed.
    pub fn dispose(&self) -> usize {
        let drained = {
            let mut inner = self.inner.lock();
            inner.disposed = true;
            inner.store.drain()
        };
        self.semaphore.close();

        let count = drained.len();
        drop(drained);
        crate::debug!("pool"; "disposed {} idle instance(s)", count);
        count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Instances created and not yet destroyed.
    pub fn live(&self) -> usize {
        self.inner.lock().created
    }

    pub fn idle(&self) -> usize {
        self.inner.lock().store.idle()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity)
            .field("loading", &self.loading)
            .field("live", &self.live())
            .field("idle", &self.idle())
            .finish()
    }
}

// =============================================================================
// Guard
// =============================================================================

/// A checked-out instance; returned to the pool on drop.
pub struct Pooled<'a, T> {
    pool: &'a Pool<T>,
    item: Option<Slotted<T>>,
}

impl<T> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled").field("slot", &self.slot()).finish()
    }
}

impl<T> Pooled<'_, T> {
    /// Slot the instance lives in (stable for its lifetime).
    pub fn slot(&self) -> usize {
        self.item.as_ref().map_or(0, |item| item.slot)
    }
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.item {
            Some(item) => &item.value,
            None => unreachable!("pooled item taken before drop"),
        }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => &mut item.value,
            None => unreachable!("pooled item taken before drop"),
        }
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}
