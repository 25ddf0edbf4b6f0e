//! Scoped directory lock: idempotent lock/unlock plus release on drop.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::errors::{DirlockError, Result};
use crate::lock::driver::{BackoffPolicy, LockDriver};
use crate::lock::primitive::{FlockPrimitive, LockPrimitive};

/// Scoped exclusive lock on a directory.
///
/// At most one handle is ever held; [`DirLockGuard::lock`] blocks (possibly
/// forever) until the OS grants the lock, and dropping a locked guard always
/// attempts release, so a live process cannot silently leak the underlying
/// descriptor. The guard is a unique resource: it cannot be cloned, only
/// moved.
///
/// The exclusion is advisory and, with `flock`, tied to the open file
/// description — two guards over the same directory contend with each other
/// even inside a single process.
///
/// ```rust,no_run
/// use dirlock::prelude::*;
///
/// fn write_batch(dir: &std::path::Path) -> Result<()> {
///     let mut guard = DirLockGuard::new(dir, false)?;
///     if should_lock(dir) {
///         guard.lock()?; // blocks until exclusive
///     }
///     // ... write plots ...
///     Ok(())
/// } // lock released here if still held
/// ```
pub struct DirLockGuard<P: LockPrimitive = FlockPrimitive> {
    driver: LockDriver<P>,
    path: PathBuf,
    handle: Option<P::Handle>,
}

impl<P: LockPrimitive> std::fmt::Debug for DirLockGuard<P>
where
    LockDriver<P>: std::fmt::Debug,
    P::Handle: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirLockGuard")
            .field("driver", &self.driver)
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}

impl DirLockGuard<FlockPrimitive> {
    /// Guard over the platform primitive with the original 10 s / 60 s
    /// retry intervals. With `auto_lock`, acquisition runs (and may block)
    /// before the constructor returns; a fatal open failure surfaces here.
    pub fn new(path: impl Into<PathBuf>, auto_lock: bool) -> Result<Self> {
        Self::with_driver(
            path,
            LockDriver::new(FlockPrimitive, BackoffPolicy::default()),
            auto_lock,
        )
    }
}

impl<P: LockPrimitive> DirLockGuard<P> {
    /// Guard over an injected driver (custom primitive or retry intervals).
    pub fn with_driver(
        path: impl Into<PathBuf>,
        driver: LockDriver<P>,
        auto_lock: bool,
    ) -> Result<Self> {
        let mut guard = Self {
            driver,
            path: path.into(),
            handle: None,
        };
        if auto_lock {
            guard.lock()?;
        }
        Ok(guard)
    }

    /// Block until the exclusive lock is held. No-op when already locked, so
    /// repeated calls perform at most one underlying acquisition.
    pub fn lock(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        println!("Acquiring directory lock: {}", self.path.display());
        let started = Instant::now();
        let handle = self.driver.acquire(&self.path)?;
        println!(
            "Lock acquired (took {} sec)",
            started.elapsed().as_secs()
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Release the lock. With nothing held this reports
    /// [`DirlockError::NothingToRelease`] without any OS call. Otherwise the
    /// guard transitions to unlocked regardless of the release outcome (the
    /// handle counts as relinquished either way) and any release error is
    /// passed through.
    pub fn unlock(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Err(DirlockError::NothingToRelease {
                path: self.path.clone(),
            });
        };
        println!("Releasing directory lock: {}", self.path.display());
        self.driver.release(handle, &self.path)
    }

    /// Whether the guard currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.handle.is_some()
    }

    /// The directory this guard serializes access to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: LockPrimitive> Drop for DirLockGuard<P> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // Failure is already logged by the driver; nothing useful can be
            // done with it during drop.
            let _ = self.unlock();
        }
    }
}
