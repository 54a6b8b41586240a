// SMART inventory parsing and by-id symlink resolution

use crate::error::{SourceError, SourceResult};
use crate::host::under_root;
use crate::models::{DriveStatus, SmartDeviceRecord};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// SMART record after its device file was resolved to a devnode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDrive {
    pub device_path: String,
    pub by_id_path: String,
    pub model: Option<String>,
    pub temperature_c: Option<i64>,
    pub status: DriveStatus,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Deserialize)]
struct RawSmartDevice {
    #[serde(alias = "deviceFile", alias = "device_file")]
    devicefile: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<Value>,
    #[serde(default, alias = "overall_status", alias = "overallStatus")]
    overallstatus: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Accepts `38`, `38.6`, `"38"` or `"38°C"`; anything else is unknown.
fn parse_temperature(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    }
}

/// Parse the `{data: [...]}` envelope. Individual malformed records are skipped.
pub fn parse_smart_list(json: &str) -> SourceResult<Vec<SmartDeviceRecord>> {
    let envelope: Envelope =
        serde_json::from_str(json).map_err(|e| SourceError::parse("smart inventory", e))?;
    let records = envelope
        .data
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<RawSmartDevice>(v) {
            Ok(raw) => Some(raw),
            Err(e) => {
                debug!(error = %e, "skipping malformed SMART record");
                None
            }
        })
        .filter(|raw| !raw.devicefile.trim().is_empty())
        .map(|raw| SmartDeviceRecord {
            device_file: raw.devicefile.trim().to_string(),
            model: raw
                .model
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            temperature_c: raw.temperature.as_ref().and_then(parse_temperature),
            overall_status: raw
                .overallstatus
                .or(raw.status)
                .map(|s| DriveStatus::from_tool(&s))
                .unwrap_or_default(),
        })
        .collect();
    Ok(records)
}

/// Lexically resolve `target` relative to the directory `base` (no filesystem access).
fn normalize_link(base: &Path, target: &Path) -> PathBuf {
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        base.join(target)
    };
    let mut out = PathBuf::from("/");
    for c in joined.components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(n) => out.push(n),
            _ => {}
        }
    }
    out
}

/// Map a reported device file to its devnode. `/dev/disk/by-*` links are read under
/// `host_root`; an unresolvable link yields `None`.
pub async fn resolve_devnode(host_root: &Path, device_file: &str) -> Option<String> {
    if !device_file.starts_with("/dev/disk/by-") {
        return Some(device_file.to_string());
    }
    let link = under_root(host_root, device_file);
    let target = match tokio::fs::read_link(&link).await {
        Ok(t) => t,
        Err(e) => {
            warn!(device = device_file, error = %e, "cannot resolve device link");
            return None;
        }
    };
    let base = Path::new(device_file).parent().unwrap_or(Path::new("/dev"));
    Some(normalize_link(base, &target).to_string_lossy().into_owned())
}

/// `/dev/sdX` or `/dev/nvmeXnY`; partitions, loop and md devices are not physical disks.
pub fn is_physical_disk(devnode: &str) -> bool {
    let Some(name) = devnode.strip_prefix("/dev/") else {
        return false;
    };
    if let Some(letters) = name.strip_prefix("sd") {
        return !letters.is_empty() && letters.chars().all(|c| c.is_ascii_lowercase());
    }
    if let Some(rest) = name.strip_prefix("nvme")
        && let Some((ctrl, ns)) = rest.split_once('n')
    {
        let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        return digits(ctrl) && digits(ns);
    }
    false
}
