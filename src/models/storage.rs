// Physical drive and usage models

use serde::{Deserialize, Serialize};

/// Per-disk usage totals, keyed by top-level disk devnode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub size_bytes: u64,
    pub used_bytes: u64,
}

/// Drive health as reported by the SMART inventory tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriveStatus {
    Good,
    Warning,
    Failing,
    #[default]
    Unknown,
}

impl DriveStatus {
    /// Normalise the inventory tool's status vocabulary (case-insensitive).
    pub fn from_tool(s: &str) -> Self {
        let s = s.trim().to_ascii_uppercase();
        match s.as_str() {
            "GOOD" | "PASSED" | "OK" | "HEALTHY" => DriveStatus::Good,
            "FAILING" | "FAILED" | "BAD" | "BAD_STATUS" | "BAD_ATTRIBUTE_NOW" => {
                DriveStatus::Failing
            }
            "WARNING" | "BAD_ATTRIBUTE_IN_THE_PAST" | "BAD_SECTOR" | "BAD_SECTOR_MANY" => {
                DriveStatus::Warning
            }
            _ => DriveStatus::Unknown,
        }
    }
}

/// Inventory entry before by-id resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartDeviceRecord {
    pub device_file: String,
    pub model: Option<String>,
    pub temperature_c: Option<i64>,
    pub overall_status: DriveStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDrive {
    /// Canonical devnode, never a symlink.
    pub device_path: String,
    /// Path reported by the inventory tool (the devnode itself when it was not a link).
    pub by_id_path: String,
    pub model: Option<String>,
    pub temperature_c: Option<i64>,
    pub status: DriveStatus,
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: Option<u8>,
}

/// `round(used / size * 100)` clamped to 0..=100; `None` for an unknown (zero) size.
pub fn used_percent(used_bytes: u64, size_bytes: u64) -> Option<u8> {
    if size_bytes == 0 {
        return None;
    }
    let pct = (used_bytes as f64 / size_bytes as f64 * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}
