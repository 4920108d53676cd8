// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Coarse single-writer / multi-reader graph lock.
//!
//! Only acquire and release are part of the contract. Reads are reentrant: a
//! thread that already holds a read guard (for example inside a lazy temporal
//! query) may take another one even while a writer is queued. Write access is
//! exclusive and is never taken recursively; mutation paths hand `&mut` data
//! down instead of re-locking.

use parking_lot::RwLock;

/// Shared guard returned by [`GraphLock::read`].
pub type ReadGuard<'a, T> = parking_lot::RwLockReadGuard<'a, T>;

/// Exclusive guard returned by [`GraphLock::write`].
pub type WriteGuard<'a, T> = parking_lot::RwLockWriteGuard<'a, T>;

/// Reader/writer lock owning the graph data.
#[derive(Debug, Default)]
pub struct GraphLock<T> {
    inner: RwLock<T>,
}

impl<T> GraphLock<T> {
    /// Wraps `data`.
    pub fn new(data: T) -> Self {
        Self {
            inner: RwLock::new(data),
        }
    }

    /// Acquires shared access; released when the guard drops.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.inner.read_recursive()
    }

    /// Acquires exclusive access; released when the guard drops.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.inner.write()
    }

    /// Exclusive access if no guard is outstanding.
    pub fn try_write(&self) -> Option<WriteGuard<'_, T>> {
        self.inner.try_write()
    }

    /// Consumes the lock, returning the data.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_reenter_while_held() {
        let lock = GraphLock::new(5u8);
        let outer = lock.read();
        let inner = lock.read();
        assert_eq!(*outer + *inner, 10);
        assert!(lock.try_write().is_none());
        drop(outer);
        drop(inner);
        *lock.write() += 1;
        assert_eq!(lock.into_inner(), 6);
    }
}
