// Block-device topology walk and per-disk usage accumulation

use crate::error::{SourceError, SourceResult};
use crate::host::under_root;
use crate::models::UsageRecord;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Filesystem statistics for a mountpoint as the host sees it.
pub trait MountStats: Send + Sync {
    fn usage(&self, mountpoint: &str) -> Option<FsUsage>;
}

/// `statvfs` on the mountpoint resolved under the host root.
pub struct StatvfsMountStats {
    host_root: PathBuf,
}

impl StatvfsMountStats {
    pub fn new(host_root: impl Into<PathBuf>) -> Self {
        Self {
            host_root: host_root.into(),
        }
    }
}

impl MountStats for StatvfsMountStats {
    fn usage(&self, mountpoint: &str) -> Option<FsUsage> {
        let path = under_root(&self.host_root, mountpoint);
        let st = match nix::sys::statvfs::statvfs(path.as_path()) {
            Ok(st) => st,
            Err(e) => {
                debug!(mountpoint, error = %e, "statvfs failed");
                return None;
            }
        };
        let block_size = if st.fragment_size() > 0 {
            st.fragment_size() as u64
        } else {
            st.block_size() as u64
        };
        let total = (st.blocks() as u64).saturating_mul(block_size);
        let free = (st.blocks_free() as u64).saturating_mul(block_size);
        Some(FsUsage {
            total_bytes: total,
            used_bytes: total.saturating_sub(free),
        })
    }
}

/// One node of the lsblk tree. Walked, never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "size_bytes")]
    pub size: u64,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub mountpoints: Vec<Option<String>>,
    #[serde(default)]
    pub children: Vec<BlockDevice>,
}

/// lsblk prints sizes as numbers with `-b`, but older releases quote them.
fn size_bytes<'de, D>(d: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

impl BlockDevice {
    pub fn devnode(&self) -> String {
        if self.name.starts_with('/') {
            self.name.clone()
        } else {
            format!("/dev/{}", self.name)
        }
    }

    fn is_disk(&self) -> bool {
        self.kind == "disk"
    }

    /// This node or any descendant has an active mountpoint.
    fn has_mounted_node(&self) -> bool {
        self.active_mountpoint().is_some() || self.children.iter().any(Self::has_mounted_node)
    }

    /// First mounted, non-swap mountpoint.
    pub fn active_mountpoint(&self) -> Option<&str> {
        self.mountpoint
            .iter()
            .chain(self.mountpoints.iter().flatten())
            .map(|m| m.trim())
            .find(|m| !m.is_empty() && !m.eq_ignore_ascii_case("[SWAP]"))
    }
}

#[derive(Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<BlockDevice>,
}

pub fn parse_lsblk(json: &str) -> SourceResult<Vec<BlockDevice>> {
    let out: LsblkOutput =
        serde_json::from_str(json).map_err(|e| SourceError::parse("lsblk", e))?;
    Ok(out.blockdevices)
}

fn walk(
    dev: &BlockDevice,
    disk: Option<&str>,
    stats: &dyn MountStats,
    usage: &mut HashMap<String, UsageRecord>,
) {
    let devnode = dev.devnode();
    let owner = if dev.is_disk() {
        usage.entry(devnode.clone()).or_insert(UsageRecord {
            size_bytes: dev.size,
            used_bytes: 0,
        });
        // Unpartitioned disk carrying its own filesystem.
        if !dev.children.iter().any(BlockDevice::has_mounted_node) {
            add_mount_usage(dev, &devnode, stats, usage);
        }
        Some(devnode.as_str())
    } else {
        if let Some(disk) = disk {
            add_mount_usage(dev, disk, stats, usage);
        }
        disk
    };
    for child in &dev.children {
        walk(child, owner, stats, usage);
    }
}

fn add_mount_usage(
    dev: &BlockDevice,
    disk: &str,
    stats: &dyn MountStats,
    usage: &mut HashMap<String, UsageRecord>,
) {
    let Some(mp) = dev.active_mountpoint() else {
        return;
    };
    match stats.usage(mp) {
        Some(fs) => {
            if let Some(acc) = usage.get_mut(disk) {
                acc.used_bytes = acc.used_bytes.saturating_add(fs.used_bytes);
            }
        }
        None => debug!(device = %dev.devnode(), mountpoint = mp, "no filesystem stats"),
    }
}

/// Seed one accumulator per disk with its reported size; add the used bytes of every
/// mounted descendant, or of the disk's own filesystem when nothing below it is mounted.
/// Unreadable filesystems contribute nothing.
pub fn aggregate_usage(
    devices: &[BlockDevice],
    stats: &dyn MountStats,
) -> HashMap<String, UsageRecord> {
    let mut usage = HashMap::new();
    for dev in devices {
        walk(dev, None, stats, &mut usage);
    }
    usage
}
