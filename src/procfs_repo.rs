// Memory, load and uptime from the kernel pseudo-filesystem

use crate::error::{SourceError, SourceResult};
use crate::models::{LoadSnapshot, MemorySnapshot, UptimeSnapshot};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{instrument, warn};

pub struct ProcfsRepo {
    proc_root: PathBuf,
}

impl ProcfsRepo {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    async fn read(&self, name: &str) -> SourceResult<String> {
        let path = self.proc_root.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SourceError::unavailable(path.display().to_string(), e))
    }

    /// Zeroed snapshot when meminfo is unreadable or malformed.
    #[instrument(skip(self), fields(repo = "procfs", operation = "read_memory"))]
    pub async fn read_memory(&self) -> MemorySnapshot {
        match self.read("meminfo").await.and_then(|s| parse_meminfo(&s)) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "memory stats degraded");
                MemorySnapshot::default()
            }
        }
    }

    /// Load averages and uptime; each half degrades to zero independently.
    #[instrument(skip(self), fields(repo = "procfs", operation = "read_load_and_uptime"))]
    pub async fn read_load_and_uptime(&self) -> (LoadSnapshot, UptimeSnapshot) {
        let (load, uptime) = tokio::join!(self.read("loadavg"), self.read("uptime"));
        let load = load.and_then(|s| parse_loadavg(&s)).unwrap_or_else(|e| {
            warn!(error = %e, "load average degraded");
            LoadSnapshot::default()
        });
        let uptime = uptime.and_then(|s| parse_uptime(&s)).unwrap_or_else(|e| {
            warn!(error = %e, "uptime degraded");
            UptimeSnapshot::default()
        });
        (load, uptime)
    }
}

/// `used = total - (MemFree + Buffers + Cached)`, all values in KiB on input.
pub fn parse_meminfo(content: &str) -> SourceResult<MemorySnapshot> {
    let fields: HashMap<&str, u64> = content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let value = value.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), value))
        })
        .collect();

    let kib = |key: &str| fields.get(key).copied().unwrap_or(0);
    let total = kib("MemTotal").saturating_mul(1024);
    if total == 0 {
        return Err(SourceError::parse("meminfo", "MemTotal missing or zero"));
    }
    let free = kib("MemFree")
        .saturating_add(kib("Buffers"))
        .saturating_add(kib("Cached"))
        .saturating_mul(1024);
    let used = total.saturating_sub(free);
    let pct = (used as f64 / total as f64 * 100.0).round().clamp(0.0, 100.0);

    Ok(MemorySnapshot {
        total_bytes: total,
        used_bytes: used,
        percent_used: pct as u8,
    })
}

pub fn parse_loadavg(content: &str) -> SourceResult<LoadSnapshot> {
    let loads = content
        .split_whitespace()
        .take(3)
        .map(|s| s.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::parse("loadavg", e))?;
    match loads.as_slice() {
        [load1, load5, load15] => Ok(LoadSnapshot {
            load1: *load1,
            load5: *load5,
            load15: *load15,
        }),
        _ => Err(SourceError::parse("loadavg", "expected three load averages")),
    }
}

pub fn parse_uptime(content: &str) -> SourceResult<UptimeSnapshot> {
    let secs = content
        .split_whitespace()
        .next()
        .ok_or_else(|| SourceError::parse("uptime", "empty"))?
        .parse::<f64>()
        .map_err(|e| SourceError::parse("uptime", e))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(SourceError::parse("uptime", format!("invalid seconds {}", secs)));
    }
    Ok(UptimeSnapshot::from_secs(secs.trunc() as u64))
}
