use std::path::{Component, Path, PathBuf};

/// Maps paths between the host code directory and its mount point inside
/// the containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    host_root: PathBuf,
    container_root: String,
}

impl PathTranslator {
    pub fn new(host_root: impl Into<PathBuf>, container_root: impl Into<String>) -> Self {
        let container_root = container_root.into();
        let trimmed = container_root.trim_end_matches('/');
        PathTranslator {
            host_root: host_root.into(),
            container_root: if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            },
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    pub fn container_root(&self) -> &str {
        &self.container_root
    }

    /// `None` when `host` is not below the host code directory.
    pub fn host_to_container(&self, host: &Path) -> Option<String> {
        let rel = host.strip_prefix(&self.host_root).ok()?;
        let mut out = self.container_root.clone();
        for comp in rel.components() {
            if !out.ends_with('/') {
                out.push('/');
            }
            out.push_str(&comp.as_os_str().to_string_lossy());
        }
        Some(out)
    }

    /// `None` when `container` is not below the container mount root.
    pub fn container_to_host(&self, container: &str) -> Option<PathBuf> {
        let rest = if self.container_root == "/" {
            container.strip_prefix('/')?
        } else {
            let rest = container.strip_prefix(self.container_root.as_str())?;
            if rest.is_empty() {
                rest
            } else {
                rest.strip_prefix('/')?
            }
        };
        let rest = rest.trim_end_matches('/');
        if rest.is_empty() {
            return Some(self.host_root.clone());
        }
        Some(self.host_root.join(rest))
    }

    /// Working directory to use for `docker-compose exec`.
    pub fn workdir_for(&self, host: &Path) -> String {
        self.host_to_container(host)
            .unwrap_or_else(|| self.container_root.clone())
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> PathTranslator {
        PathTranslator::new("/host/code", "/var/www")
    }

    #[test]
    fn host_path_maps_into_container() {
        let t = translator();
        assert_eq!(
            t.host_to_container(Path::new("/host/code/app/src")).as_deref(),
            Some("/var/www/app/src")
        );
        assert_eq!(t.host_to_container(Path::new("/host/code")).as_deref(), Some("/var/www"));
    }

    #[test]
    fn container_path_maps_to_host() {
        let t = translator();
        assert_eq!(
            t.container_to_host("/var/www/app/src"),
            Some(PathBuf::from("/host/code/app/src"))
        );
        assert_eq!(t.container_to_host("/var/www"), Some(PathBuf::from("/host/code")));
    }

    #[test]
    fn paths_outside_the_mount_do_not_translate() {
        let t = translator();
        assert_eq!(t.host_to_container(Path::new("/etc/passwd")), None);
        assert_eq!(t.container_to_host("/etc/passwd"), None);
        assert_eq!(t.host_to_container(Path::new("/host/codex/app")), None);
        assert_eq!(t.container_to_host("/var/wwwx/app"), None);
    }

    #[test]
    fn round_trips() {
        let t = translator();
        for p in ["/host/code/a", "/host/code/a/b/c", "/host/code"] {
            let c = t.host_to_container(Path::new(p)).unwrap();
            assert_eq!(t.container_to_host(&c), Some(PathBuf::from(p)));
        }
        for c in ["/var/www/x", "/var/www/x/y", "/var/www"] {
            let h = t.container_to_host(c).unwrap();
            assert_eq!(t.host_to_container(&h).as_deref(), Some(c));
        }
    }

    #[test]
    fn workdir_falls_back_to_container_root() {
        let t = translator();
        assert_eq!(t.workdir_for(Path::new("/tmp")), "/var/www");
        assert_eq!(t.workdir_for(Path::new("/host/code/site")), "/var/www/site");
    }

    #[test]
    fn trailing_slash_on_container_root_is_ignored() {
        let t = PathTranslator::new("/host/code", "/var/www/");
        assert_eq!(t.host_to_container(Path::new("/host/code/a")).as_deref(), Some("/var/www/a"));
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize(Path::new("/srv/laradock/.laradock/../")), PathBuf::from("/srv/laradock"));
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
