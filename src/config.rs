use crate::env::{read_env_file, split_list, EnvMap, TypedEnv};
use crate::error::{LaradockError, Result};
use crate::paths::{normalize, PathTranslator};
use std::path::{Path, PathBuf};

pub const ROOT_VAR: &str = "LARADOCK_ROOT";
pub const INFRA_DIR_NAME: &str = ".laradock";
pub const PLUGIN_DIR_NAME: &str = "laradock-cli";

const DEFAULT_SERVICES: &str = "nginx,mysql,workspace";
const DEFAULT_WORKSPACE: &str = "workspace";

/// Files that mark a directory as a project root.
const PROJECT_MARKERS: &[&str] = &[".env", ".env.example"];

pub fn resolve_compose_binary() -> String {
    std::env::var("LARADOCK_COMPOSE_BIN").unwrap_or_else(|_| "docker-compose".to_string())
}

/// Where the Laradock checkout lives on the host.
#[derive(Debug, Clone)]
pub struct InfraRoot {
    pub root: PathBuf,
    pub dir: PathBuf,
}

impl InfraRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let dir = root.join(INFRA_DIR_NAME);
        InfraRoot { root, dir }
    }

    pub fn from_env() -> Result<Self> {
        let root = std::env::var_os(ROOT_VAR).ok_or(LaradockError::MissingVar(ROOT_VAR))?;
        Ok(InfraRoot::new(PathBuf::from(root)))
    }

    pub fn shared_env_path(&self) -> PathBuf {
        self.dir.join(".env")
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.join("env-example")
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.dir.join(PLUGIN_DIR_NAME)
    }
}

/// Shared environment plus everything derived from it. Built once per
/// invocation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub infra: InfraRoot,
    pub compose_bin: String,
    pub env: EnvMap,
    pub paths: PathTranslator,
    pub default_services: Vec<String>,
    pub default_workspace: String,
    pub workspace_prefix: String,
}

impl Config {
    pub fn load(infra: InfraRoot, compose_bin: String) -> Result<Self> {
        let env_path = infra.shared_env_path();
        let env = read_env_file(&env_path)?;
        Self::from_env_map(infra, compose_bin, env)
    }

    pub fn from_env_map(infra: InfraRoot, compose_bin: String, env: EnvMap) -> Result<Self> {
        let env_path = infra.shared_env_path();
        let require = |key: &str| {
            env.get(key).cloned().ok_or_else(|| LaradockError::MissingKey {
                key: key.to_string(),
                path: env_path.clone(),
            })
        };

        let host = require("APP_CODE_PATH_HOST")?;
        let container = require("APP_CODE_PATH_CONTAINER")?;
        let paths = PathTranslator::new(resolve_dir(&infra.dir.join(host)), container);

        let default_services = split_list(
            env.get("LARADOCK_CLI_DEFAULT_SERVICES")
                .map(String::as_str)
                .unwrap_or(DEFAULT_SERVICES),
        );
        let default_workspace = env
            .get("LARADOCK_CLI_DEFAULT_WORKSPACE")
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());
        let workspace_prefix = env
            .get("LARADOCK_CLI_WORKSPACE_PREFIX")
            .cloned()
            .unwrap_or_default();

        Ok(Config {
            infra,
            compose_bin,
            env,
            paths,
            default_services,
            default_workspace,
            workspace_prefix,
        })
    }

    /// Code directory on the host, the outer boundary for project lookup.
    pub fn code_root(&self) -> &Path {
        self.paths.host_root()
    }

    pub fn find_project_root(&self, start_dir: &Path) -> Option<PathBuf> {
        find_project_root(start_dir, &resolve_dir(&self.infra.dir), self.code_root())
    }

    /// Workspace service for exec-style actions: the project's declared
    /// workspace when it has one, else the shared default.
    pub fn workspace_service(&self, project_env: Option<&TypedEnv>) -> String {
        project_env
            .and_then(|env| env.get("LARADOCK_WORKSPACE"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|name| format!("{}{name}", self.workspace_prefix))
            .unwrap_or_else(|| self.default_workspace.clone())
    }

    /// Services declared by the project for up/down/reup.
    pub fn project_services(&self, project_env: Option<&TypedEnv>) -> Vec<String> {
        project_env
            .and_then(|env| env.get("LARADOCK_SERVICES"))
            .and_then(|v| v.as_str())
            .map(split_list)
            .unwrap_or_default()
    }
}

/// Canonical form of `p` when it exists, lexical normalization otherwise.
pub fn resolve_dir(p: &Path) -> PathBuf {
    p.canonicalize().unwrap_or_else(|_| normalize(p))
}

/// Walk up from `start_dir` to the nearest directory holding `.env` or
/// `.env.example`. The walk never yields the infrastructure dir, anything
/// inside it, or anything at or above `outer_root`.
pub fn find_project_root(start_dir: &Path, infra_dir: &Path, outer_root: &Path) -> Option<PathBuf> {
    let start = resolve_dir(start_dir);
    if start.starts_with(infra_dir) {
        return None;
    }

    for dir in start.ancestors() {
        if infra_dir.starts_with(dir) {
            return None;
        }
        if dir == outer_root || !dir.starts_with(outer_root) {
            return None;
        }
        if PROJECT_MARKERS.iter().any(|m| dir.join(m).is_file()) {
            return Some(dir.to_path_buf());
        }
    }
    None
}
