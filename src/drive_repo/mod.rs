// Physical drive inventory (SMART) and per-disk usage (block topology + statvfs)

mod smart;
mod usage;

pub use smart::{ResolvedDrive, is_physical_disk, parse_smart_list, resolve_devnode};
pub use usage::{
    BlockDevice, FsUsage, MountStats, StatvfsMountStats, aggregate_usage, parse_lsblk,
};

use crate::host::{CommandRunner, HostCommand};
use crate::models::UsageRecord;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Query payload: every device, sorted by device file ascending.
const SMART_LIST_PARAMS: &str =
    r#"{"start":0,"limit":-1,"sortfield":"devicefile","sortdir":"ASC"}"#;

/// Resolves the SMART inventory into canonical physical disks.
pub struct DriveRepo {
    host_root: PathBuf,
    omv_rpc: String,
}

impl DriveRepo {
    pub fn new(host_root: impl Into<PathBuf>, omv_rpc: impl Into<String>) -> Self {
        Self {
            host_root: host_root.into(),
            omv_rpc: omv_rpc.into(),
        }
    }

    fn command(&self) -> HostCommand {
        HostCommand::new(&self.omv_rpc).args(["-u", "admin", "Smart", "getList", SMART_LIST_PARAMS])
    }

    /// Deduplicated by devnode, first occurrence wins. Tool failure or bad JSON yields `[]`.
    #[instrument(skip(self, runner), fields(repo = "drive", operation = "read_drives"))]
    pub async fn read_drives<R: CommandRunner>(&self, runner: &R) -> Vec<ResolvedDrive> {
        let out = runner.run(&self.command()).await;
        if out.trim().is_empty() {
            return Vec::new();
        }
        let records = match parse_smart_list(&out) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "SMART inventory degraded");
                return Vec::new();
            }
        };

        let devnodes = join_all(
            records
                .iter()
                .map(|r| resolve_devnode(&self.host_root, &r.device_file)),
        )
        .await;

        let mut seen = HashSet::new();
        let mut drives = Vec::with_capacity(records.len());
        for (record, devnode) in records.into_iter().zip(devnodes) {
            let Some(devnode) = devnode else {
                continue;
            };
            if !is_physical_disk(&devnode) {
                debug!(device = %devnode, "not a physical disk, skipped");
                continue;
            }
            if !seen.insert(devnode.clone()) {
                continue;
            }
            drives.push(ResolvedDrive {
                device_path: devnode,
                by_id_path: record.device_file,
                model: record.model,
                temperature_c: record.temperature_c,
                status: record.overall_status,
            });
        }
        drives
    }
}

/// Sums mounted-filesystem usage into the disk each filesystem lives on.
pub struct UsageRepo {
    lsblk: String,
    stats: Arc<dyn MountStats>,
}

impl UsageRepo {
    pub fn new(lsblk: impl Into<String>, stats: Arc<dyn MountStats>) -> Self {
        Self {
            lsblk: lsblk.into(),
            stats,
        }
    }

    fn command(&self) -> HostCommand {
        HostCommand::new(&self.lsblk).args(["-J", "-b", "-o", "NAME,TYPE,SIZE,MOUNTPOINT"])
    }

    /// Usage keyed by disk devnode; `{}` when the topology tool fails.
    #[instrument(skip(self, runner), fields(repo = "drive", operation = "read_usage"))]
    pub async fn read_usage<R: CommandRunner>(&self, runner: &R) -> HashMap<String, UsageRecord> {
        let out = runner.run(&self.command()).await;
        if out.trim().is_empty() {
            return HashMap::new();
        }
        let devices = match parse_lsblk(&out) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "block topology degraded");
                return HashMap::new();
            }
        };
        let stats = self.stats.clone();
        tokio::task::spawn_blocking(move || aggregate_usage(&devices, stats.as_ref()))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "usage task join");
                HashMap::new()
            })
    }
}
