// Host boundary: paths under the mounted host root and privileged command execution.

mod command;

pub use command::{CommandRunner, HostCommand, HostCommandRunner};

use std::path::{Path, PathBuf};

/// Map an absolute host path (e.g. a mountpoint reported by a host tool) under `root`.
pub fn under_root(root: &Path, host_path: &str) -> PathBuf {
    root.join(host_path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_root_strips_leading_slash() {
        assert_eq!(
            under_root(Path::new("/host"), "/srv/dev-disk-by-uuid-1"),
            PathBuf::from("/host/srv/dev-disk-by-uuid-1")
        );
        assert_eq!(under_root(Path::new("/"), "/"), PathBuf::from("/"));
    }
}
