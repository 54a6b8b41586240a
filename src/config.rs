use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub host: HostConfig,
    pub commands: CommandsConfig,
    pub tools: ToolsConfig,
    pub packages: PackagesConfig,
    pub containers: ContainersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".into(),
        }
    }
}

/// Where host state is visible from inside the container.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Mounted host filesystem; execution root for every host tool.
    pub root: PathBuf,
    pub proc_root: PathBuf,
    pub hwmon_root: PathBuf,
    pub thermal_root: PathBuf,
    pub dpkg_status: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            proc_root: PathBuf::from("/proc"),
            hwmon_root: PathBuf::from("/sys/class/hwmon"),
            thermal_root: PathBuf::from("/sys/class/thermal"),
            dpkg_status: PathBuf::from("/var/lib/dpkg/status"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub timeout_secs: u64,
    /// Stdout beyond this many bytes is dropped before parsing.
    pub max_output_bytes: usize,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_output_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Program names resolved inside the host root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub omv_rpc: String,
    pub lsblk: String,
    pub dmidecode: String,
    pub lshw: String,
    pub lspci: String,
    pub hostname: String,
    pub uname: String,
    pub docker: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            omv_rpc: "omv-rpc".into(),
            lsblk: "lsblk".into(),
            dmidecode: "dmidecode".into(),
            lshw: "lshw".into(),
            lspci: "lspci".into(),
            hostname: "hostname".into(),
            uname: "uname".into(),
            docker: "docker".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub platform_package: String,
    pub plugin_prefix: String,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            platform_package: "openmediavault".into(),
            plugin_prefix: "openmediavault-".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerSource {
    #[default]
    Cli,
    Api,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainersConfig {
    pub source: ContainerSource,
}

impl AppConfig {
    /// Load from `CONFIG_FILE` (default `config.toml`), then apply environment overrides.
    /// A missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                String::new()
            }
            Err(e) => return Err(anyhow::anyhow!("read {}: {}", path, e)),
        };
        let mut config: AppConfig = toml::from_str(&s)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST_ROOT`, `PROC_ROOT`, `HWMON_ROOT`, `THERMAL_ROOT`, `DPKG_STATUS` and `PORT`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let paths: [(&str, &mut PathBuf); 5] = [
            ("HOST_ROOT", &mut self.host.root),
            ("PROC_ROOT", &mut self.host.proc_root),
            ("HWMON_ROOT", &mut self.host.hwmon_root),
            ("THERMAL_ROOT", &mut self.host.thermal_root),
            ("DPKG_STATUS", &mut self.host.dpkg_status),
        ];
        for (key, slot) in paths {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = PathBuf::from(v);
            }
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a port number, got {:?}: {}", port, e))?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.host.root.as_os_str().is_empty(),
            "host.root must be non-empty"
        );
        anyhow::ensure!(
            !self.host.proc_root.as_os_str().is_empty(),
            "host.proc_root must be non-empty"
        );
        anyhow::ensure!(
            self.commands.timeout_secs > 0,
            "commands.timeout_secs must be > 0, got {}",
            self.commands.timeout_secs
        );
        anyhow::ensure!(
            self.commands.max_output_bytes > 0,
            "commands.max_output_bytes must be > 0, got {}",
            self.commands.max_output_bytes
        );
        let tools = [
            ("tools.omv_rpc", &self.tools.omv_rpc),
            ("tools.lsblk", &self.tools.lsblk),
            ("tools.dmidecode", &self.tools.dmidecode),
            ("tools.lshw", &self.tools.lshw),
            ("tools.lspci", &self.tools.lspci),
            ("tools.hostname", &self.tools.hostname),
            ("tools.uname", &self.tools.uname),
            ("tools.docker", &self.tools.docker),
        ];
        for (key, value) in tools {
            anyhow::ensure!(!value.trim().is_empty(), "{} must be non-empty", key);
        }
        anyhow::ensure!(
            !self.packages.platform_package.is_empty(),
            "packages.platform_package must be non-empty"
        );
        anyhow::ensure!(
            !self.packages.plugin_prefix.is_empty(),
            "packages.plugin_prefix must be non-empty"
        );
        Ok(())
    }
}
