//! Rotational-media detection: maps a path to its backing block device and
//! reads the kernel's `queue/rotational` attribute.
//!
//! Detection fails open. Any failure along the probe (stat, unresolved
//! symlink, attribute never found, unreadable attribute) yields `false` with
//! a stderr diagnostic, so an unsupported or unreadable environment disables
//! the heuristic without ever blocking the caller.

use std::path::Path;

use crate::media::devtree::DeviceTree;

/// Whether `path` is backed by rotational (spinning-disk) storage.
///
/// Platforms without the sysfs block-device hierarchy always report `false`.
pub fn is_rotational(path: &Path) -> bool {
    #[cfg(target_os = "linux")]
    {
        is_rotational_in(path, &crate::media::devtree::SysfsDeviceTree::default())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = path;
        false
    }
}

/// [`is_rotational`] over an injected device tree.
#[cfg(target_os = "linux")]
pub fn is_rotational_in<T: DeviceTree>(path: &Path, tree: &T) -> bool {
    let stat = match nix::sys::stat::stat(path) {
        Ok(stat) => stat,
        Err(errno) => {
            eprintln!(
                "[dirlock] unable to find device for {}: {errno}",
                path.display()
            );
            return false;
        }
    };
    let dev = stat.st_dev;
    probe_rotational(
        tree,
        nix::sys::stat::major(dev),
        nix::sys::stat::minor(dev),
    )
}

/// Walk the device hierarchy for the `queue/rotational` attribute of the
/// device `(major, minor)`, starting at its canonical node and climbing to
/// parent nodes (a partition's attribute lives on its whole-disk parent).
///
/// Pure over the [`DeviceTree`]; returns `true` iff the attribute's first
/// line starts with `'1'`.
pub fn probe_rotational<T: DeviceTree>(tree: &T, major: u64, minor: u64) -> bool {
    let Some(mut node) = tree.resolve_device(major, minor) else {
        eprintln!("[dirlock] unable to find full device path for {major}:{minor}");
        return false;
    };

    loop {
        let attr = node.join("queue").join("rotational");
        if tree.exists(&attr) {
            return match tree.attr_first_line(&attr) {
                Some(line) => line.as_bytes().first() == Some(&b'1'),
                None => {
                    eprintln!("[dirlock] unable to read {}", attr.display());
                    false
                }
            };
        }
        match node.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => node = parent.to_path_buf(),
            _ => {
                eprintln!("[dirlock] unable to determine media type for device {major}:{minor}");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{is_rotational, probe_rotational};
    use crate::media::devtree::MockDeviceTree;

    fn tree_with_attr(node: &str, attr_node: &str, value: &str) -> MockDeviceTree {
        let mut tree = MockDeviceTree::default();
        tree.register_device(8, 1, node);
        tree.register_attr(
            PathBuf::from(attr_node).join("queue").join("rotational"),
            value,
        );
        tree
    }

    #[test]
    fn attribute_one_means_rotational() {
        let tree = tree_with_attr("/sys/devices/pci/host0/sda", "/sys/devices/pci/host0/sda", "1");
        assert!(probe_rotational(&tree, 8, 1));
    }

    #[test]
    fn attribute_zero_means_solid_state() {
        let tree = tree_with_attr("/sys/devices/pci/host0/sda", "/sys/devices/pci/host0/sda", "0");
        assert!(!probe_rotational(&tree, 8, 1));
    }

    #[test]
    fn partition_walks_up_to_the_whole_disk_parent() {
        // sda1's node has no queue/rotational; sda's does.
        let tree = tree_with_attr(
            "/sys/devices/pci/host0/sda/sda1",
            "/sys/devices/pci/host0/sda",
            "1",
        );
        assert!(probe_rotational(&tree, 8, 1));
    }

    #[test]
    fn unresolvable_device_is_not_rotational() {
        let tree = MockDeviceTree::default();
        assert!(!probe_rotational(&tree, 8, 1));
    }

    #[test]
    fn missing_attribute_terminates_at_the_root() {
        let mut tree = MockDeviceTree::default();
        tree.register_device(8, 1, "/sys/devices/pci/host0/sda/sda1");
        assert!(!probe_rotational(&tree, 8, 1));
    }

    #[test]
    fn empty_attribute_line_is_not_rotational() {
        let tree = tree_with_attr("/sys/devices/pci/host0/sda", "/sys/devices/pci/host0/sda", "");
        assert!(!probe_rotational(&tree, 8, 1));
    }

    #[test]
    fn nonexistent_path_is_never_rotational() {
        assert!(!is_rotational(Path::new("/no/such/path/anywhere")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn real_path_probes_through_an_injected_tree() {
        use super::is_rotational_in;

        // Resolve the tempdir's real device numbers, then answer for them
        // from a synthetic tree: this exercises the full stat -> probe path
        // with a simulated attribute value.
        let dir = tempfile::tempdir().expect("tempdir");
        let stat = nix::sys::stat::stat(dir.path()).expect("stat");
        let (major, minor) = (
            nix::sys::stat::major(stat.st_dev),
            nix::sys::stat::minor(stat.st_dev),
        );

        let mut tree = MockDeviceTree::default();
        tree.register_device(major, minor, "/sys/devices/fake/sdx");
        tree.register_attr("/sys/devices/fake/sdx/queue/rotational", "1");
        assert!(is_rotational_in(dir.path(), &tree));

        let mut tree = MockDeviceTree::default();
        tree.register_device(major, minor, "/sys/devices/fake/sdx");
        tree.register_attr("/sys/devices/fake/sdx/queue/rotational", "0");
        assert!(!is_rotational_in(dir.path(), &tree));
    }
}
