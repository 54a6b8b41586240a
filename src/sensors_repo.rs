// CPU and chassis temperatures from the hwmon sysfs tree

use crate::models::{TemperatureReading, Temperatures};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// hwmon chip names whose channels are CPU package/core sensors.
const CPU_CHIPS: &[&str] = &[
    "coretemp",
    "k10temp",
    "k8temp",
    "zenpower",
    "cpu_thermal",
    "cpu-thermal",
    "via_cputemp",
];

/// Board, ACPI and super-I/O chip name prefixes reported as chassis sensors.
const CHASSIS_CHIP_PREFIXES: &[&str] = &[
    "acpitz", "nct", "it8", "w83", "f71", "asus", "pch_", "dell_smm", "thinkpad", "sch5",
];

/// thermal_zone types that describe the CPU package.
const CPU_ZONE_TYPES: &[&str] = &[
    "x86_pkg_temp",
    "cpu-thermal",
    "cpu_thermal",
    "soc-thermal",
    "soc_thermal",
];

fn is_cpu_chip(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    CPU_CHIPS.iter().any(|c| name == *c)
}

fn is_chassis_chip(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    CHASSIS_CHIP_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn read_trimmed(path: &Path) -> Option<String> {
    let s = std::fs::read_to_string(path).ok()?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Millidegrees to whole degrees (integer division). `None` when unparsable.
fn read_millidegrees(path: &Path) -> Option<i64> {
    read_trimmed(path)?.parse::<i64>().ok().map(|m| m / 1000)
}

/// Name split into its stem and trailing index, so `hwmon2` sorts before `hwmon10`.
fn index_key(path: &Path) -> (String, u64) {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let index = name[stem.len()..].parse().unwrap_or(0);
    (stem.to_string(), index)
}

/// Entries of `root` in index order; empty when `root` is unreadable.
fn sorted_entries(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort_by_cached_key(|p| index_key(p));
    paths
}

/// `tempN_input` channel index, if `file_name` is one.
fn temp_channel(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("temp")?
        .strip_suffix("_input")?
        .parse()
        .ok()
}

#[derive(Debug, Default, PartialEq, Eq)]
struct HwmonScan {
    cpu: Option<i64>,
    chassis: Vec<TemperatureReading>,
}

fn scan_hwmon(root: &Path) -> HwmonScan {
    let mut scan = HwmonScan::default();
    for chip_dir in sorted_entries(root) {
        let Some(name) = read_trimmed(&chip_dir.join("name")) else {
            continue;
        };
        let cpu = is_cpu_chip(&name);
        let chassis = is_chassis_chip(&name);
        if !cpu && !chassis {
            continue;
        }
        let Ok(files) = std::fs::read_dir(&chip_dir) else {
            continue;
        };
        let mut channels: Vec<(u32, PathBuf)> = files
            .flatten()
            .filter_map(|f| {
                let idx = temp_channel(f.file_name().to_str()?)?;
                Some((idx, f.path()))
            })
            .collect();
        channels.sort();

        for (_, path) in channels {
            let Some(celsius) = read_millidegrees(&path) else {
                continue;
            };
            if cpu {
                scan.cpu = Some(celsius);
            }
            if chassis {
                scan.chassis.push(TemperatureReading {
                    label: name.clone(),
                    celsius,
                });
            }
        }
    }
    scan
}

/// One rung of the CPU temperature ladder.
trait CpuTemperatureSource {
    fn name(&self) -> &'static str;
    fn read_celsius(&self) -> Option<i64>;
}

struct HwmonCpu<'a>(&'a HwmonScan);

impl CpuTemperatureSource for HwmonCpu<'_> {
    fn name(&self) -> &'static str {
        "hwmon"
    }

    fn read_celsius(&self) -> Option<i64> {
        self.0.cpu
    }
}

struct ThermalZoneCpu<'a>(&'a Path);

impl CpuTemperatureSource for ThermalZoneCpu<'_> {
    fn name(&self) -> &'static str {
        "thermal_zone"
    }

    fn read_celsius(&self) -> Option<i64> {
        let mut found = None;
        for zone in sorted_entries(self.0) {
            let is_zone = zone
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("thermal_zone"));
            if !is_zone {
                continue;
            }
            let Some(kind) = read_trimmed(&zone.join("type")) else {
                continue;
            };
            if CPU_ZONE_TYPES.contains(&kind.to_ascii_lowercase().as_str())
                && let Some(c) = read_millidegrees(&zone.join("temp"))
            {
                found = Some(c);
            }
        }
        found
    }
}

/// First source in priority order that yields a reading.
fn first_reading(sources: &[&dyn CpuTemperatureSource]) -> Option<i64> {
    sources.iter().find_map(|s| {
        let c = s.read_celsius()?;
        debug!(source = s.name(), celsius = c, "cpu temperature");
        Some(c)
    })
}

pub(crate) fn probe(hwmon_root: &Path, thermal_root: &Path) -> Temperatures {
    let scan = scan_hwmon(hwmon_root);
    let ladder: [&dyn CpuTemperatureSource; 2] = [&HwmonCpu(&scan), &ThermalZoneCpu(thermal_root)];
    let cpu = first_reading(&ladder);
    Temperatures {
        cpu,
        chassis: scan.chassis,
    }
}

pub struct SensorsRepo {
    hwmon_root: PathBuf,
    thermal_root: PathBuf,
}

impl SensorsRepo {
    pub fn new(hwmon_root: impl Into<PathBuf>, thermal_root: impl Into<PathBuf>) -> Self {
        Self {
            hwmon_root: hwmon_root.into(),
            thermal_root: thermal_root.into(),
        }
    }

    #[instrument(skip(self), fields(repo = "sensors", operation = "read_temperatures"))]
    pub async fn read_temperatures(&self) -> Temperatures {
        let hwmon_root = self.hwmon_root.clone();
        let thermal_root = self.thermal_root.clone();
        tokio::task::spawn_blocking(move || probe(&hwmon_root, &thermal_root))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "sensors task join");
                Temperatures::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn chip(root: &Path, dir: &str, name: &str, channels: &[(&str, &str)]) {
        let d = root.join(dir);
        fs::create_dir_all(&d).unwrap();
        fs::write(d.join("name"), format!("{}\n", name)).unwrap();
        for (file, value) in channels {
            fs::write(d.join(file), format!("{}\n", value)).unwrap();
        }
    }

    #[test]
    fn coretemp_and_acpitz_are_attributed() {
        let tmp = tempfile::TempDir::new().unwrap();
        chip(tmp.path(), "hwmon0", "acpitz", &[("temp1_input", "38000")]);
        chip(tmp.path(), "hwmon1", "coretemp", &[("temp1_input", "45000")]);
        chip(tmp.path(), "hwmon2", "nvme", &[("temp1_input", "50000")]);

        let t = probe(tmp.path(), Path::new("/nonexistent"));
        assert_eq!(t.cpu, Some(45));
        assert_eq!(
            t.chassis,
            vec![TemperatureReading {
                label: "acpitz".into(),
                celsius: 38
            }]
        );
    }

    #[test]
    fn last_cpu_channel_wins_without_averaging() {
        let tmp = tempfile::TempDir::new().unwrap();
        chip(
            tmp.path(),
            "hwmon0",
            "coretemp",
            &[
                ("temp1_input", "60000"),
                ("temp2_input", "41999"),
                ("temp2_label", "Core 0"),
            ],
        );
        let t = probe(tmp.path(), Path::new("/nonexistent"));
        assert_eq!(t.cpu, Some(41));
    }

    #[test]
    fn chip_name_match_is_case_insensitive() {
        assert!(is_cpu_chip("K10Temp"));
        assert!(is_chassis_chip("NCT6798"));
        assert!(!is_cpu_chip("nvme"));
        assert!(!is_chassis_chip("amdgpu"));
    }

    #[test]
    fn unparsable_channels_and_unreadable_chips_are_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        chip(tmp.path(), "hwmon0", "coretemp", &[("temp1_input", "garbage")]);
        fs::create_dir_all(tmp.path().join("hwmon1")).unwrap(); // no name file
        let t = probe(tmp.path(), Path::new("/nonexistent"));
        assert_eq!(t.cpu, None);
        assert!(t.chassis.is_empty());
    }

    #[test]
    fn thermal_zone_is_cpu_fallback() {
        let hwmon = tempfile::TempDir::new().unwrap();
        let thermal = tempfile::TempDir::new().unwrap();
        chip(hwmon.path(), "hwmon0", "acpitz", &[("temp1_input", "30000")]);
        let zone = thermal.path().join("thermal_zone1");
        fs::create_dir_all(&zone).unwrap();
        fs::write(zone.join("type"), "x86_pkg_temp\n").unwrap();
        fs::write(zone.join("temp"), "52000\n").unwrap();

        let t = probe(hwmon.path(), thermal.path());
        assert_eq!(t.cpu, Some(52));
        assert_eq!(t.chassis.len(), 1);
    }

    #[test]
    fn chips_are_walked_in_index_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        chip(tmp.path(), "hwmon2", "coretemp", &[("temp1_input", "40000")]);
        chip(tmp.path(), "hwmon10", "coretemp", &[("temp1_input", "60000")]);
        chip(tmp.path(), "hwmon9", "drivetemp", &[("temp1_input", "35000")]);

        let t = probe(tmp.path(), Path::new("/nonexistent"));
        assert_eq!(t.cpu, Some(60));
    }

    #[test]
    fn index_key_orders_numerically() {
        let mut names = vec!["hwmon10", "hwmon2", "hwmon1", "thermal_zone11", "thermal_zone3"];
        names.sort_by_cached_key(|n| index_key(Path::new(n)));
        assert_eq!(
            names,
            ["hwmon1", "hwmon2", "hwmon10", "thermal_zone3", "thermal_zone11"]
        );
    }

    #[test]
    fn temp_channel_recognises_inputs_only() {
        assert_eq!(temp_channel("temp3_input"), Some(3));
        assert_eq!(temp_channel("temp3_label"), None);
        assert_eq!(temp_channel("tempX_input"), None);
        assert_eq!(temp_channel("fan1_input"), None);
    }
}
