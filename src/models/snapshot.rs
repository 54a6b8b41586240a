// Aggregate snapshot

use serde::{Deserialize, Serialize};

use super::{
    ContainerStatus, LoadSnapshot, MemorySnapshot, PackageInventory, PhysicalDrive,
    SystemIdentity, Temperatures, UptimeSnapshot,
};

/// One full capture. Rebuilt from scratch on every request; a degraded source
/// leaves its field at the default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Unix epoch milliseconds.
    pub captured_at: i64,
    pub memory: MemorySnapshot,
    pub load: LoadSnapshot,
    pub uptime: UptimeSnapshot,
    pub temperatures: Temperatures,
    pub drives: Vec<PhysicalDrive>,
    pub identity: SystemIdentity,
    pub packages: PackageInventory,
    pub containers: Vec<ContainerStatus>,
}
