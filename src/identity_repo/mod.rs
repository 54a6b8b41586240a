// Host identity and RAM module inventory

mod linux;
mod modules;

pub use modules::{DmidecodeParser, LshwJsonParser, LshwTextParser, MemoryModuleParser};

use crate::config::{HostConfig, ToolsConfig};
use crate::host::{CommandRunner, HostCommand, under_root};
use crate::models::{MemoryModule, ModuleSourceTool, SystemIdentity};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// One rung of the RAM inventory ladder: a host command and the parser for its output.
pub struct ModuleProvider {
    command: HostCommand,
    parser: Box<dyn MemoryModuleParser>,
}

impl ModuleProvider {
    pub fn new(command: HostCommand, parser: impl MemoryModuleParser + 'static) -> Self {
        Self {
            command,
            parser: Box::new(parser),
        }
    }

    /// dmidecode first, then lshw structured, then lshw plain text.
    pub fn default_ladder(tools: &ToolsConfig) -> Vec<Self> {
        vec![
            Self::new(
                HostCommand::new(&tools.dmidecode).args(["-t", "17"]),
                DmidecodeParser,
            ),
            Self::new(
                HostCommand::new(&tools.lshw).args(["-json", "-class", "memory"]),
                LshwJsonParser,
            ),
            Self::new(
                HostCommand::new(&tools.lshw).args(["-class", "memory"]),
                LshwTextParser,
            ),
        ]
    }
}

/// Poll providers in order; the first non-empty module list wins.
pub async fn read_memory_modules<R: CommandRunner>(
    runner: &R,
    providers: &[ModuleProvider],
) -> (Vec<MemoryModule>, ModuleSourceTool) {
    for provider in providers {
        let out = runner.run(&provider.command).await;
        if out.trim().is_empty() {
            continue;
        }
        let modules = provider.parser.parse(&out);
        if modules.is_empty() {
            debug!(command = %provider.command, "no memory modules parsed, trying next tool");
            continue;
        }
        return (modules, provider.parser.tool());
    }
    (Vec::new(), ModuleSourceTool::None)
}

async fn read_file(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "identity source unreadable");
            None
        }
    }
}

pub struct IdentityRepo {
    host_root: PathBuf,
    proc_root: PathBuf,
    hostname: HostCommand,
    kernel: HostCommand,
    lspci: HostCommand,
    module_providers: Vec<ModuleProvider>,
}

impl IdentityRepo {
    pub fn new(host: &HostConfig, tools: &ToolsConfig) -> Self {
        Self::with_providers(host, tools, ModuleProvider::default_ladder(tools))
    }

    pub fn with_providers(
        host: &HostConfig,
        tools: &ToolsConfig,
        module_providers: Vec<ModuleProvider>,
    ) -> Self {
        Self {
            host_root: host.root.clone(),
            proc_root: host.proc_root.clone(),
            hostname: HostCommand::new(&tools.hostname),
            kernel: HostCommand::new(&tools.uname).arg("-r"),
            lspci: HostCommand::new(&tools.lspci),
            module_providers,
        }
    }

    /// Every field is independently best-effort; a failed source leaves it empty.
    #[instrument(skip(self, runner), fields(repo = "identity", operation = "read_identity"))]
    pub async fn read_identity<R: CommandRunner>(&self, runner: &R) -> SystemIdentity {
        let os_release = under_root(&self.host_root, "/etc/os-release");
        let cpuinfo = self.proc_root.join("cpuinfo");
        let (hostname, kernel, lspci, os_release, cpuinfo, (memory_modules, module_source_tool)) = tokio::join!(
            runner.run(&self.hostname),
            runner.run(&self.kernel),
            runner.run(&self.lspci),
            read_file(&os_release),
            read_file(&cpuinfo),
            read_memory_modules(runner, &self.module_providers),
        );

        SystemIdentity {
            hostname: hostname.trim().to_string(),
            os_name: os_release
                .as_deref()
                .and_then(linux::parse_os_name)
                .unwrap_or_default(),
            kernel_version: kernel.trim().to_string(),
            cpu_model: cpuinfo
                .as_deref()
                .and_then(linux::parse_cpu_model)
                .unwrap_or_default(),
            gpu_model: linux::parse_gpu(&lspci),
            memory_modules,
            module_source_tool,
        }
    }
}
