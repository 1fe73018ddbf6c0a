//! Desired values for a project's env file, derived from the shared
//! environment and what the project already declares.

use crate::env::{EnvMap, EnvValue, TypedEnv};
use crate::error::{LaradockError, Result};
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const HOOK_FILE_NAME: &str = "env-hook";

/// Bindings handed to an overlay hook.
#[derive(Debug, Serialize)]
pub struct HookContext<'a> {
    pub laradock_env: &'a EnvMap,
    pub project_dir: &'a Path,
    pub project_env: &'a TypedEnv,
}

/// User logic that runs after the built-in rules and may add or override
/// any overlay key.
pub trait OverlayHook {
    fn apply(&self, ctx: &HookContext<'_>, result_env: &mut TypedEnv) -> Result<()>;
}

/// Hook used when no script is installed.
pub struct NoHook;

impl OverlayHook for NoHook {
    fn apply(&self, _ctx: &HookContext<'_>, _result_env: &mut TypedEnv) -> Result<()> {
        Ok(())
    }
}

/// Executable hook: reads the bindings as JSON on stdin and prints the new
/// `result_env` as a JSON object.
pub struct ScriptHook {
    path: PathBuf,
}

#[derive(Serialize)]
struct ScriptInput<'a> {
    #[serde(flatten)]
    ctx: &'a HookContext<'a>,
    result_env: &'a TypedEnv,
}

impl ScriptHook {
    /// The hook installed under `plugin_dir`, if any.
    pub fn discover(plugin_dir: &Path) -> Option<Self> {
        let path = plugin_dir.join(HOOK_FILE_NAME);
        path.is_file().then_some(ScriptHook { path })
    }

    fn fail(&self, reason: impl Into<String>) -> LaradockError {
        LaradockError::Hook {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl OverlayHook for ScriptHook {
    fn apply(&self, ctx: &HookContext<'_>, result_env: &mut TypedEnv) -> Result<()> {
        let input = serde_json::to_vec(&ScriptInput { ctx, result_env })
            .map_err(|e| self.fail(e.to_string()))?;

        tracing::debug!(hook = %self.path.display(), "running env hook");
        let mut child = Command::new(&self.path)
            .current_dir(ctx.project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.fail(e.to_string()))?;

        // A hook is free to ignore its input and exit early.
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&input) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(self.fail(e.to_string())),
                _ => {}
            }
        }
        let out = child.wait_with_output()?;
        if !out.status.success() {
            return Err(self.fail(format!("exited with {}", out.status)));
        }

        let parsed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&out.stdout).map_err(|e| self.fail(format!("bad output: {e}")))?;

        let mut next = TypedEnv::new();
        for (key, value) in &parsed {
            let v = EnvValue::from_json(value)
                .ok_or_else(|| self.fail(format!("{key} is an object")))?;
            next.insert(key.clone(), v);
        }
        *result_env = next;
        Ok(())
    }
}

/// Compute the overlay for `project_dir`. Presence checks look at whether a
/// key exists in `project_env`, never at its value.
pub fn build_overlay(
    laradock_env: &EnvMap,
    project_dir: &Path,
    project_env: &TypedEnv,
    hook: &dyn OverlayHook,
) -> Result<TypedEnv> {
    let name = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut result = TypedEnv::new();
    let mut set = |k: &str, v: EnvValue| {
        result.insert(k.to_string(), v);
    };

    if project_env.contains_key("APP_URL") {
        set("APP_URL", EnvValue::Str(format!("http://{name}.test")));
    }

    if project_env.get("DB_CONNECTION").and_then(EnvValue::as_str) == Some("mysql") {
        let password = laradock_env
            .get("MYSQL_ROOT_PASSWORD")
            .ok_or(LaradockError::MissingSharedKey("MYSQL_ROOT_PASSWORD"))?;
        set("DB_HOST", "mysql".into());
        set("DB_PORT", EnvValue::Int(3306));
        set("DB_DATABASE", EnvValue::Str(name.clone()));
        set("DB_USERNAME", "root".into());
        set("DB_PASSWORD", EnvValue::Str(password.clone()));
    }

    if project_env.contains_key("REDIS_HOST") {
        set("REDIS_HOST", "redis".into());
        set("REDIS_PASSWORD", EnvValue::Null);
        set("REDIS_PORT", EnvValue::Int(6379));
    }

    if project_env.contains_key("MAIL_DRIVER") {
        set("MAIL_HOST", "mailhog".into());
        set("MAIL_PORT", EnvValue::Int(1025));
        set("MAIL_USERNAME", EnvValue::Null);
        set("MAIL_PASSWORD", EnvValue::Null);
        set("MAIL_ENCRYPTION", EnvValue::Null);
    }

    let ctx = HookContext {
        laradock_env,
        project_dir,
        project_env,
    };
    hook.apply(&ctx, &mut result)?;

    tracing::debug!(keys = ?result.keys().collect::<Vec<_>>(), "overlay computed");
    Ok(result)
}
