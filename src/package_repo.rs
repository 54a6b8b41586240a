// Platform version and plugin list from the dpkg status database

use crate::models::{PackageInfo, PackageInventory};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{instrument, warn};

pub struct PackageRepo {
    status_file: PathBuf,
    platform_package: String,
    plugin_prefix: String,
}

impl PackageRepo {
    pub fn new(
        status_file: impl Into<PathBuf>,
        platform_package: impl Into<String>,
        plugin_prefix: impl Into<String>,
    ) -> Self {
        Self {
            status_file: status_file.into(),
            platform_package: platform_package.into(),
            plugin_prefix: plugin_prefix.into(),
        }
    }

    /// Empty inventory when the database is missing or unreadable.
    #[instrument(skip(self), fields(repo = "package", operation = "read_packages"))]
    pub async fn read_packages(&self) -> PackageInventory {
        match tokio::fs::read_to_string(&self.status_file).await {
            Ok(content) => self.parse(&content),
            Err(e) => {
                warn!(path = %self.status_file.display(), error = %e, "package database unreadable");
                PackageInventory::default()
            }
        }
    }

    pub fn parse(&self, content: &str) -> PackageInventory {
        let mut platform_version = None;
        let mut plugins: BTreeMap<String, String> = BTreeMap::new();

        for record in records(content) {
            let (Some(name), Some(version)) = (record.package, record.version) else {
                continue;
            };
            if record.status.is_some_and(|s| !s.ends_with(" installed")) {
                continue;
            }
            if name == self.platform_package {
                platform_version.get_or_insert_with(|| version.to_string());
            } else if let Some(plugin) = name.strip_prefix(self.plugin_prefix.as_str())
                && !plugin.is_empty()
            {
                plugins
                    .entry(plugin.to_string())
                    .or_insert_with(|| version.to_string());
            }
        }

        PackageInventory {
            platform_version,
            plugins: plugins
                .into_iter()
                .map(|(name, version)| PackageInfo { name, version })
                .collect(),
        }
    }
}

#[derive(Default)]
struct StatusRecord<'a> {
    package: Option<&'a str>,
    version: Option<&'a str>,
    status: Option<&'a str>,
}

/// Blank-line separated stanzas. Continuation lines (leading whitespace) are ignored.
fn records(content: &str) -> impl Iterator<Item = StatusRecord<'_>> {
    content.split("\n\n").map(|stanza| {
        let mut record = StatusRecord::default();
        for line in stanza.lines() {
            if line.starts_with([' ', '\t']) {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key {
                "Package" => record.package = Some(value),
                "Version" => record.version = Some(value),
                "Status" => record.status = Some(value),
                _ => {}
            }
        }
        record
    })
}
