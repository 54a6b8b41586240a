// Shared test helpers: canned host commands and a throwaway host filesystem

#![allow(dead_code)]

use nasboard::config::AppConfig;
use nasboard::drive_repo::{FsUsage, MountStats};
use nasboard::error::{SourceError, SourceResult};
use nasboard::host::{CommandRunner, HostCommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Answers commands by their full command line; anything else fails like a missing tool.
#[derive(Default)]
pub struct FakeRunner {
    outputs: HashMap<String, String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, command_line: &str, stdout: &str) -> Self {
        self.outputs.insert(command_line.to_string(), stdout.to_string());
        self
    }
}

impl CommandRunner for FakeRunner {
    async fn try_run(&self, cmd: &HostCommand) -> SourceResult<String> {
        self.outputs
            .get(&cmd.to_string())
            .cloned()
            .ok_or_else(|| SourceError::tool(cmd.program.clone(), "not found"))
    }
}

/// Mountpoint usage from a fixed table.
#[derive(Default)]
pub struct FixedMountStats(pub HashMap<String, FsUsage>);

impl FixedMountStats {
    pub fn with(mut self, mountpoint: &str, total_bytes: u64, used_bytes: u64) -> Self {
        self.0.insert(
            mountpoint.to_string(),
            FsUsage {
                total_bytes,
                used_bytes,
            },
        );
        self
    }
}

impl MountStats for FixedMountStats {
    fn usage(&self, mountpoint: &str) -> Option<FsUsage> {
        self.0.get(mountpoint).copied()
    }
}

/// Temp directory laid out as `root/` (host filesystem), `proc/`, `hwmon/` and `thermal/`.
pub struct HostTree {
    dir: TempDir,
}

impl HostTree {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for sub in ["root", "proc", "hwmon", "thermal"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    pub fn proc(&self) -> PathBuf {
        self.dir.path().join("proc")
    }

    pub fn hwmon(&self) -> PathBuf {
        self.dir.path().join("hwmon")
    }

    pub fn thermal(&self) -> PathBuf {
        self.dir.path().join("thermal")
    }

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Write `content` at the absolute host path `host_path`.
    pub fn host_file(&self, host_path: &str, content: &str) -> &Self {
        Self::write(&self.root().join(host_path.trim_start_matches('/')), content);
        self
    }

    pub fn proc_file(&self, name: &str, content: &str) -> &Self {
        Self::write(&self.proc().join(name), content);
        self
    }

    pub fn hwmon_chip(&self, dir: &str, name: &str, channels: &[(&str, &str)]) -> &Self {
        let chip = self.hwmon().join(dir);
        Self::write(&chip.join("name"), &format!("{}\n", name));
        for (file, value) in channels {
            Self::write(&chip.join(file), &format!("{}\n", value));
        }
        self
    }

    /// Host symlink `link` -> `target` (target written verbatim, usually relative).
    pub fn host_symlink(&self, link: &str, target: &str) -> &Self {
        let path = self.root().join(link.trim_start_matches('/'));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(target, path).unwrap();
        self
    }

    /// Default config with every host path pointed into this tree.
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.host.root = self.root();
        config.host.proc_root = self.proc();
        config.host.hwmon_root = self.hwmon();
        config.host.thermal_root = self.thermal();
        config.host.dpkg_status = self.root().join("var/lib/dpkg/status");
        config
    }
}

pub const MEMINFO: &str = "MemTotal:       16000000 kB\n\
                           MemFree:         4000000 kB\n\
                           Buffers:          500000 kB\n\
                           Cached:          3500000 kB\n";

pub const SMART_LIST_CMD: &str =
    r#"omv-rpc -u admin Smart getList {"start":0,"limit":-1,"sortfield":"devicefile","sortdir":"ASC"}"#;

pub const LSBLK_CMD: &str = "lsblk -J -b -o NAME,TYPE,SIZE,MOUNTPOINT";

pub const DOCKER_PS_CMD: &str = "docker ps --format {{json .}}";
