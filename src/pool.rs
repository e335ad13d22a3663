//! Fixed-capacity object pools for scratch buffers and column maps.
//!
//! Items are handed out wrapped in a [`Pooled`] guard. Dropping the guard
//! resets the item and returns it to the pool, so every exit path releases
//! it and no caller observes a previous caller's data.

use std::ops::{Deref, DerefMut};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::record::ColumnMap;

/// Restore a value to its zero-equivalent state, keeping allocations.
pub trait Reset {
    fn reset(&mut self);
}

impl Reset for String {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Reset for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// A bounded free list.
pub struct Pool<T: Reset> {
    idle: Mutex<Vec<T>>,
    capacity: usize,
    make: fn() -> T,
}

impl<T: Reset> Pool<T> {
    pub fn new(capacity: usize, make: fn() -> T) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            make,
        }
    }

    /// Take an idle item or create a fresh one.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let item = self.idle.lock().pop().unwrap_or_else(self.make);
        Pooled {
            item: Some(item),
            pool: self,
        }
    }

    fn release(&self, mut item: T) {
        item.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(item);
        }
    }

    /// Number of items waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// An item borrowed from a [`Pool`]; returned on drop.
pub struct Pooled<'p, T: Reset> {
    item: Option<T>,
    pool: &'p Pool<T>,
}

impl<T: Reset> Pooled<'_, T> {
    /// Detach the item; it will not go back to the pool.
    pub fn into_inner(mut self) -> T {
        self.item
            .take()
            .expect("pooled item should always be present")
    }
}

impl<T: Reset> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item
            .as_ref()
            .expect("pooled item should always be present")
    }
}

impl<T: Reset> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item
            .as_mut()
            .expect("pooled item should always be present")
    }
}

impl<T: Reset> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

const POOL_CAPACITY: usize = 64;

/// Scratch buffers for SQL text assembly.
pub(crate) static BUFFERS: Lazy<Pool<String>> =
    Lazy::new(|| Pool::new(POOL_CAPACITY, || String::with_capacity(512)));

/// Scratch cursors for binding and scanning.
pub(crate) static COLUMN_MAPS: Lazy<Pool<ColumnMap>> =
    Lazy::new(|| Pool::new(POOL_CAPACITY, ColumnMap::default));

pub(crate) fn buffer() -> Pooled<'static, String> {
    BUFFERS.acquire()
}

pub(crate) fn column_map() -> Pooled<'static, ColumnMap> {
    COLUMN_MAPS.acquire()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_resets() {
        let pool: Pool<String> = Pool::new(2, String::new);
        {
            let mut buf = pool.acquire();
            buf.push_str("SELECT 1");
        }
        assert_eq!(pool.idle_count(), 1);
        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 8);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let pool: Pool<Vec<u8>> = Pool::new(1, Vec::new);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_into_inner_detaches() {
        let pool: Pool<String> = Pool::new(4, String::new);
        let mut buf = pool.acquire();
        buf.push('x');
        let owned = buf.into_inner();
        assert_eq!(owned, "x");
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_release_on_error_path() {
        fn fails(pool: &Pool<String>) -> Result<(), ()> {
            let mut buf = pool.acquire();
            buf.push_str("partial");
            Err(())
        }
        let pool: Pool<String> = Pool::new(4, String::new);
        assert!(fails(&pool).is_err());
        assert_eq!(pool.idle_count(), 1);
        assert!(pool.acquire().is_empty());
    }
}
