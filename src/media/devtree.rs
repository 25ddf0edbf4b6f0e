//! Device-tree abstraction: the filesystem surface rotational detection
//! walks, injectable so the walk is testable with a synthetic tree.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Read-only view of the OS block-device hierarchy.
pub trait DeviceTree {
    /// Canonical device node for a `(major, minor)` pair, if the tree can
    /// resolve it.
    fn resolve_device(&self, major: u64, minor: u64) -> Option<PathBuf>;

    /// Whether an attribute file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// First line of the attribute file at `path`, newline stripped.
    fn attr_first_line(&self, path: &Path) -> Option<String>;
}

/// Real sysfs tree: device ids resolve through the `/sys/dev/block`
/// `major:minor` symlinks maintained by the kernel.
#[derive(Debug, Clone)]
pub struct SysfsDeviceTree {
    root: PathBuf,
}

impl Default for SysfsDeviceTree {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/sys/dev/block"),
        }
    }
}

impl SysfsDeviceTree {
    /// Tree rooted somewhere other than `/sys/dev/block` (tests point this at
    /// a scratch directory).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DeviceTree for SysfsDeviceTree {
    fn resolve_device(&self, major: u64, minor: u64) -> Option<PathBuf> {
        // canonicalize follows the major:minor symlink to the device node.
        std::fs::canonicalize(self.root.join(format!("{major}:{minor}"))).ok()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn attr_first_line(&self, path: &Path) -> Option<String> {
        let file = File::open(path).ok()?;
        let mut line = String::new();
        BufReader::new(file).read_line(&mut line).ok()?;
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

/// Synthetic device tree for tests: registered devices and attribute files
/// backed by maps instead of hardware.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceTree {
    devices: HashMap<(u64, u64), PathBuf>,
    attrs: HashMap<PathBuf, String>,
}

impl MockDeviceTree {
    /// Map a `(major, minor)` pair to its canonical device node.
    pub fn register_device(&mut self, major: u64, minor: u64, node: impl Into<PathBuf>) {
        self.devices.insert((major, minor), node.into());
    }

    /// Place an attribute file with the given first line.
    pub fn register_attr(&mut self, path: impl Into<PathBuf>, first_line: impl Into<String>) {
        self.attrs.insert(path.into(), first_line.into());
    }
}

impl DeviceTree for MockDeviceTree {
    fn resolve_device(&self, major: u64, minor: u64) -> Option<PathBuf> {
        self.devices.get(&(major, minor)).cloned()
    }

    fn exists(&self, path: &Path) -> bool {
        self.attrs.contains_key(path)
    }

    fn attr_first_line(&self, path: &Path) -> Option<String> {
        self.attrs.get(path).cloned()
    }
}
