//! User-installed commands under `.laradock/laradock-cli/commands/`.

use crate::docker::exit_code;
use crate::env::{EnvMap, TypedEnv};
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub const COMMANDS_DIR: &str = "commands";
pub const CONTEXT_VAR: &str = "LARADOCK_CLI_CONTEXT";

/// Everything a command plugin gets to see, passed as JSON in
/// `LARADOCK_CLI_CONTEXT`.
#[derive(Debug, Serialize)]
pub struct CommandContext<'a> {
    /// Argv prefix that forwards to docker-compose in the Laradock dir.
    pub compose: Vec<String>,
    pub laradock_env: &'a EnvMap,
    pub project_dir: Option<&'a Path>,
    pub project_env: Option<&'a TypedEnv>,
    pub args: &'a [String],
}

/// Argv prefix plugins use to call back into docker-compose.
pub fn compose_invoker() -> Vec<String> {
    let exe = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "laradock".to_string());
    vec![exe, "compose".to_string()]
}

#[derive(Debug, Clone)]
pub struct CommandPlugin {
    pub name: String,
    path: PathBuf,
}

impl CommandPlugin {
    /// The plugin named exactly `action`, if one is installed.
    pub fn find(plugin_dir: &Path, action: &str) -> Option<Self> {
        if action.is_empty() || action.starts_with('.') || action.contains(['/', '\\']) {
            return None;
        }
        let path = plugin_dir.join(COMMANDS_DIR).join(action);
        path.is_file().then(|| CommandPlugin {
            name: action.to_string(),
            path,
        })
    }

    /// Run the plugin with inherited stdio; its exit code is returned as is
    /// unless Ctrl-C killed it.
    pub async fn invoke(&self, ctx: &CommandContext<'_>) -> Result<i32> {
        let context = serde_json::to_string(ctx).map_err(std::io::Error::other)?;
        tracing::debug!(plugin = %self.path.display(), args = ?ctx.args, "running command plugin");

        let status = Command::new(&self.path)
            .args(ctx.args)
            .env(CONTEXT_VAR, context)
            .status()
            .await?;
        exit_code(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_only_exact_names() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(COMMANDS_DIR)).unwrap();
        fs::write(tmp.path().join(COMMANDS_DIR).join("artisan"), "#!/bin/sh\n").unwrap();

        assert_eq!(CommandPlugin::find(tmp.path(), "artisan").unwrap().name, "artisan");
        assert!(CommandPlugin::find(tmp.path(), "artisa").is_none());
        assert!(CommandPlugin::find(tmp.path(), "../commands/artisan").is_none());
        assert!(CommandPlugin::find(tmp.path(), "").is_none());
    }

    #[test]
    fn context_serializes_all_bindings() {
        let mut shared = EnvMap::new();
        shared.insert("MYSQL_ROOT_PASSWORD".into(), "root".into());
        let args = vec!["migrate".to_string()];
        let ctx = CommandContext {
            compose: vec!["laradock".into(), "compose".into()],
            laradock_env: &shared,
            project_dir: None,
            project_env: None,
            args: &args,
        };

        let v: serde_json::Value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["compose"][1], "compose");
        assert_eq!(v["laradock_env"]["MYSQL_ROOT_PASSWORD"], "root");
        assert!(v["project_dir"].is_null());
        assert!(v["project_env"].is_null());
        assert_eq!(v["args"][0], "migrate");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn plugin_exit_code_is_returned() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(COMMANDS_DIR);
        fs::create_dir_all(&dir).unwrap();
        let script = dir.join("greet");
        fs::write(
            &script,
            "#!/bin/sh\ncase \"$LARADOCK_CLI_CONTEXT\" in *'\"args\":[\"x\"]'*) exit \"$#\";; esac\nexit 9\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let shared = EnvMap::new();
        let args = vec!["x".to_string()];
        let ctx = CommandContext {
            compose: compose_invoker(),
            laradock_env: &shared,
            project_dir: None,
            project_env: None,
            args: &args,
        };
        let plugin = CommandPlugin::find(tmp.path(), "greet").unwrap();
        assert_eq!(plugin.invoke(&ctx).await.unwrap(), 1);
    }
}
