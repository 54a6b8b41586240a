// Fan-out/join capture of one full host snapshot.
// Every reader degrades on its own; nothing is cached between captures.

use crate::config::{AppConfig, ContainerSource};
use crate::docker_repo::DockerRepo;
use crate::drive_repo::{DriveRepo, MountStats, ResolvedDrive, StatvfsMountStats, UsageRepo};
use crate::host::{CommandRunner, HostCommandRunner};
use crate::identity_repo::IdentityRepo;
use crate::models::{PhysicalDrive, StatsSnapshot, UsageRecord, used_percent};
use crate::package_repo::PackageRepo;
use crate::procfs_repo::ProcfsRepo;
use crate::sensors_repo::SensorsRepo;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct StatsAggregator<R = HostCommandRunner> {
    runner: R,
    procfs: ProcfsRepo,
    sensors: SensorsRepo,
    drives: DriveRepo,
    usage: UsageRepo,
    identity: IdentityRepo,
    packages: PackageRepo,
    containers: DockerRepo,
}

impl StatsAggregator<HostCommandRunner> {
    /// Production wiring: chrooted host commands and `statvfs` under the host root.
    pub fn from_config(config: &AppConfig) -> Self {
        let runner = HostCommandRunner::new(
            config.host.root.clone(),
            Duration::from_secs(config.commands.timeout_secs),
            config.commands.max_output_bytes,
        );
        let stats = Arc::new(StatvfsMountStats::new(config.host.root.clone()));
        Self::new(config, runner, stats)
    }
}

impl<R: CommandRunner> StatsAggregator<R> {
    pub fn new(config: &AppConfig, runner: R, mount_stats: Arc<dyn MountStats>) -> Self {
        let host = &config.host;
        let tools = &config.tools;
        let api_timeout = Duration::from_secs(config.commands.timeout_secs);
        let containers = match config.containers.source {
            ContainerSource::Cli => DockerRepo::cli(&tools.docker, api_timeout),
            ContainerSource::Api => DockerRepo::api(&tools.docker, api_timeout),
        };
        Self {
            runner,
            procfs: ProcfsRepo::new(host.proc_root.clone()),
            sensors: SensorsRepo::new(host.hwmon_root.clone(), host.thermal_root.clone()),
            drives: DriveRepo::new(host.root.clone(), tools.omv_rpc.clone()),
            usage: UsageRepo::new(tools.lsblk.clone(), mount_stats),
            identity: IdentityRepo::new(host, tools),
            packages: PackageRepo::new(
                host.dpkg_status.clone(),
                config.packages.platform_package.clone(),
                config.packages.plugin_prefix.clone(),
            ),
            containers,
        }
    }

    /// Capture stamped with the current time.
    pub async fn capture(&self) -> StatsSnapshot {
        self.capture_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// Capture stamped with `captured_at` (Unix epoch ms). All readers start together;
    /// returns once every branch has settled.
    #[instrument(skip(self), fields(operation = "capture"))]
    pub async fn capture_at(&self, captured_at: i64) -> StatsSnapshot {
        let runner = &self.runner;
        let (memory, (load, uptime), temperatures, drives, usage, identity, packages, containers) = tokio::join!(
            self.procfs.read_memory(),
            self.procfs.read_load_and_uptime(),
            self.sensors.read_temperatures(),
            self.drives.read_drives(runner),
            self.usage.read_usage(runner),
            self.identity.read_identity(runner),
            self.packages.read_packages(),
            self.containers.list_containers(runner),
        );
        let drives = merge_drives(drives, &usage);

        debug!(
            drives = drives.len(),
            containers = containers.len(),
            plugins = packages.plugins.len(),
            memory_modules = identity.memory_modules.len(),
            "snapshot captured"
        );

        StatsSnapshot {
            captured_at,
            memory,
            load,
            uptime,
            temperatures,
            drives,
            identity,
            packages,
            containers,
        }
    }
}

/// Join resolved drives with per-disk usage on devnode. A drive without usage keeps
/// zero sizes and an unknown percentage.
pub fn merge_drives(
    drives: Vec<ResolvedDrive>,
    usage: &HashMap<String, UsageRecord>,
) -> Vec<PhysicalDrive> {
    drives
        .into_iter()
        .map(|d| {
            let u = usage.get(&d.device_path).copied().unwrap_or_default();
            PhysicalDrive {
                device_path: d.device_path,
                by_id_path: d.by_id_path,
                model: d.model,
                temperature_c: d.temperature_c,
                status: d.status,
                size_bytes: u.size_bytes,
                used_bytes: u.used_bytes,
                used_percent: used_percent(u.used_bytes, u.size_bytes),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DriveStatus;

    fn resolved(path: &str, by_id: &str) -> ResolvedDrive {
        ResolvedDrive {
            device_path: path.into(),
            by_id_path: by_id.into(),
            model: Some("WDC WD40EFRX".into()),
            temperature_c: Some(33),
            status: DriveStatus::Good,
        }
    }

    #[test]
    fn merged_drive_gets_used_percent() {
        let usage = HashMap::from([(
            "/dev/sdb".to_string(),
            UsageRecord {
                size_bytes: 1_000_000_000_000,
                used_bytes: 250_000_000_000,
            },
        )]);
        let merged = merge_drives(
            vec![resolved("/dev/sdb", "/dev/disk/by-id/ata-DISK_B")],
            &usage,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].device_path, "/dev/sdb");
        assert_eq!(merged[0].by_id_path, "/dev/disk/by-id/ata-DISK_B");
        assert_eq!(merged[0].size_bytes, 1_000_000_000_000);
        assert_eq!(merged[0].used_percent, Some(25));
    }

    #[test]
    fn drive_without_usage_has_unknown_percent() {
        let merged = merge_drives(vec![resolved("/dev/sdc", "/dev/sdc")], &HashMap::new());
        assert_eq!(merged[0].size_bytes, 0);
        assert_eq!(merged[0].used_bytes, 0);
        assert_eq!(merged[0].used_percent, None);
    }

    #[test]
    fn used_percent_is_clamped_and_rounded() {
        assert_eq!(used_percent(0, 0), None);
        assert_eq!(used_percent(1, 3), Some(33));
        assert_eq!(used_percent(2, 3), Some(67));
        assert_eq!(used_percent(500, 100), Some(100));
    }
}
