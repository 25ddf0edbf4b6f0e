//! Lock policy: whether serializing access to a path is worth the overhead.

use std::path::Path;

use crate::media::rotational::is_rotational;

/// Whether exclusive locking should be applied for `path`.
///
/// A performance hint only — locking is always safe to apply. Skipping it
/// assumes solid-state media tolerates concurrent access without the seek
/// contention penalties of spinning media, so this is simply
/// [`is_rotational`].
pub fn should_lock(path: &Path) -> bool {
    is_rotational(path)
}
