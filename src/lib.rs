#![forbid(unsafe_code)]

//! dirlock — cross-process directory locking for batch writers sharing a
//! storage directory.
//!
//! Cooperating long-running processes (the original consumer wrote plot
//! files into shared temp/final directories) serialize exclusive access to a
//! directory through the OS advisory-lock primitive, decide whether that
//! serialization is even worth the overhead by probing whether the backing
//! media is rotational, and release the lock on every exit path via a scoped
//! guard.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use dirlock::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let dir = std::path::Path::new("/srv/plots");
//! if should_lock(dir) {
//!     // Blocks until every other cooperating holder is done.
//!     let _guard = DirLockGuard::new(dir, true)?;
//!     // ... exclusive work ...
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The exclusion is advisory: it binds only processes that use the same
//! mechanism on the same directory. Acquisition retries forever by design;
//! the only fatal condition is failing to open the directory at all.

pub mod prelude;

pub mod core;
pub mod lock;
pub mod media;
