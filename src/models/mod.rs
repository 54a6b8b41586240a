// Snapshot domain models

mod container;
mod packages;
mod sensors;
mod snapshot;
mod storage;
mod system;

pub use container::{ContainerState, ContainerStatus};
pub use packages::{PackageInfo, PackageInventory};
pub use sensors::{TemperatureReading, Temperatures};
pub use snapshot::StatsSnapshot;
pub use storage::{DriveStatus, PhysicalDrive, SmartDeviceRecord, UsageRecord, used_percent};
pub use system::{
    LoadSnapshot, MemoryModule, MemorySnapshot, ModuleSourceTool, SystemIdentity, UptimeSnapshot,
};
