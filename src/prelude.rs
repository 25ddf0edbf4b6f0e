//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dirlock::prelude::*;
//! ```

// Core
pub use crate::core::config::LockConfig;
pub use crate::core::errors::{DirlockError, Result};

// Locking
pub use crate::lock::driver::{BackoffPolicy, LockDriver};
pub use crate::lock::guard::DirLockGuard;
pub use crate::lock::primitive::{Attempt, FlockPrimitive, LockPrimitive, MemoryPrimitive};

// Media detection
pub use crate::media::devtree::{DeviceTree, MockDeviceTree, SysfsDeviceTree};
pub use crate::media::policy::should_lock;
pub use crate::media::rotational::is_rotational;
