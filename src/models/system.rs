// Memory, load, uptime and host identity models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    /// Always within 0..=100.
    pub percent_used: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshot {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeSnapshot {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl UptimeSnapshot {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            days: secs / 86_400,
            hours: (secs % 86_400) / 3_600,
            minutes: (secs % 3_600) / 60,
        }
    }
}

/// One installed RAM module. Size and speed are the tool's raw labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryModule {
    pub slot: String,
    pub size_label: String,
    pub speed_label: Option<String>,
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
    pub serial_number: Option<String>,
}

/// Which tool populated `SystemIdentity::memory_modules`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleSourceTool {
    Dmidecode,
    LshwJson,
    LshwText,
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemIdentity {
    pub hostname: String,
    pub os_name: String,
    pub kernel_version: String,
    pub cpu_model: String,
    pub gpu_model: Option<String>,
    pub memory_modules: Vec<MemoryModule>,
    pub module_source_tool: ModuleSourceTool,
}
