// Container runtime models

use serde::{Deserialize, Serialize};

/// Container state; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Exited,
    Paused,
    Restarting,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Parse a runtime state string (e.g. "running", "exited").
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            _ => ContainerState::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    /// Human status line, e.g. "Up 3 hours (healthy)".
    pub status_text: String,
    #[serde(default)]
    pub state: ContainerState,
}
