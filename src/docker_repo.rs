// Container listing via the runtime CLI (JSON lines) or the Docker Engine API

use crate::host::{CommandRunner, HostCommand};
use crate::models::{ContainerState, ContainerStatus};
use bollard::Docker;
use bollard::query_parameters::ListContainersOptions;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub struct DockerRepo {
    docker: Option<Docker>,
    cli: HostCommand,
    api_timeout: Duration,
}

impl DockerRepo {
    /// CLI listing only.
    pub fn cli(docker_tool: &str, api_timeout: Duration) -> Self {
        Self {
            docker: None,
            cli: HostCommand::new(docker_tool).args(["ps", "--format", "{{json .}}"]),
            api_timeout,
        }
    }

    /// Engine API first; the CLI listing is used when the API is unreachable.
    pub fn api(docker_tool: &str, api_timeout: Duration) -> Self {
        let docker = match Docker::connect_with_unix_defaults() {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(error = %e, "Docker API unavailable, using CLI listing");
                None
            }
        };
        Self {
            docker,
            ..Self::cli(docker_tool, api_timeout)
        }
    }

    #[instrument(skip(self, runner), fields(repo = "docker", operation = "list_containers"))]
    pub async fn list_containers<R: CommandRunner>(&self, runner: &R) -> Vec<ContainerStatus> {
        if let Some(docker) = &self.docker {
            match tokio::time::timeout(self.api_timeout, list_via_api(docker)).await {
                Ok(Ok(containers)) => return containers,
                Ok(Err(e)) => warn!(error = %e, "Docker list_containers failed"),
                Err(_) => warn!(timeout = ?self.api_timeout, "Docker list_containers timed out"),
            }
        }
        parse_ps_lines(&runner.run(&self.cli).await)
    }
}

async fn list_via_api(docker: &Docker) -> Result<Vec<ContainerStatus>, bollard::errors::Error> {
    let options = ListContainersOptions {
        all: false,
        ..Default::default()
    };
    let containers = docker.list_containers(Some(options)).await?;
    Ok(containers
        .into_iter()
        .map(|c| {
            let name = c
                .names
                .as_ref()
                .and_then(|n| n.first())
                .cloned()
                .or_else(|| c.id.clone())
                .unwrap_or_default();
            let state = c
                .state
                .as_ref()
                .map(|s| ContainerState::from_docker(&s.to_string()))
                .unwrap_or_default();
            ContainerStatus {
                name: name.trim_start_matches('/').to_string(),
                status_text: c.status.clone().unwrap_or_default(),
                state,
            }
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsLine {
    names: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    state: String,
}

/// One JSON object per line; malformed lines are skipped.
pub fn parse_ps_lines(output: &str) -> Vec<ContainerStatus> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| match serde_json::from_str::<PsLine>(line) {
            Ok(p) => Some(ContainerStatus {
                name: p.names,
                status_text: p.status,
                state: ContainerState::from_docker(&p.state),
            }),
            Err(e) => {
                debug!(error = %e, "skipping malformed container line");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_lines_and_skips_garbage() {
        let out = r#"{"Command":"\"/init\"","ID":"abc","Names":"plex","State":"running","Status":"Up 3 hours (healthy)"}
this is not json
{"ID":"def","Names":"nextcloud","State":"exited","Status":"Exited (0) 2 days ago"}

{"ID":"ghi"}
"#;
        let containers = parse_ps_lines(out);
        assert_eq!(
            containers,
            vec![
                ContainerStatus {
                    name: "plex".into(),
                    status_text: "Up 3 hours (healthy)".into(),
                    state: ContainerState::Running,
                },
                ContainerStatus {
                    name: "nextcloud".into(),
                    status_text: "Exited (0) 2 days ago".into(),
                    state: ContainerState::Exited,
                },
            ]
        );
    }

    #[test]
    fn empty_output_is_empty_list() {
        assert!(parse_ps_lines("").is_empty());
    }

    #[test]
    fn container_state_from_docker() {
        assert_eq!(ContainerState::from_docker("Paused"), ContainerState::Paused);
        assert_eq!(ContainerState::from_docker("dead"), ContainerState::Unknown);
    }
}
