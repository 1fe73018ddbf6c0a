//! Rewrites a project's `.env` so it points at the Laradock services.
//!
//! Only lines of the form `KEY=...` whose key is in the overlay are
//! replaced. Everything else is copied through. The new content is written
//! to a temp file next to the original and renamed over it once complete.

use crate::config::Config;
use crate::env::{load_project_env, stringify, TypedEnv};
use crate::error::{LaradockError, Result};
use crate::overlay::{build_overlay, OverlayHook};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=").unwrap());

/// Example files a missing `.env` is bootstrapped from, in order.
const TEMPLATES: &[&str] = &[".env.example", "env.example"];

/// Make sure `project_dir/.env` exists, copying it from an example file if
/// needed. Nothing is created when no example exists.
pub fn ensure_env_file(project_dir: &Path) -> Result<PathBuf> {
    let env_path = project_dir.join(".env");
    if env_path.is_file() {
        return Ok(env_path);
    }

    let template = TEMPLATES
        .iter()
        .map(|t| project_dir.join(t))
        .find(|p| p.is_file())
        .ok_or_else(|| LaradockError::TemplateMissing(project_dir.to_path_buf()))?;

    tracing::info!(from = %template.display(), "bootstrapping .env");
    fs::copy(&template, &env_path)?;
    Ok(env_path)
}

/// Apply `overlay` to env file `content`. Every output line ends with a
/// newline; a missing final newline is added.
pub fn rewrite_lines(content: &str, overlay: &TypedEnv) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = match &line[body.len()..] {
            "" => "\n",
            e => e,
        };

        let replacement = ASSIGNMENT
            .captures(body)
            .and_then(|c| c.get(1))
            .and_then(|key| overlay.get(key.as_str()).map(|v| (key.as_str(), v)));

        match replacement {
            Some((key, value)) => {
                let rendered = stringify(value, true)?;
                tracing::debug!(key, value = %rendered, "rewriting");
                out.push_str(key);
                out.push('=');
                out.push_str(&rendered);
            }
            None => out.push_str(body),
        }
        out.push_str(ending);
    }
    Ok(out)
}

/// A fully written replacement waiting to be renamed over its target.
/// Dropping it without [`StagedEnvFile::commit`] leaves the target as is.
pub struct StagedEnvFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedEnvFile {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn commit(self) -> Result<PathBuf> {
        self.temp
            .persist(&self.target)
            .map_err(|e| LaradockError::Io(e.error))?;
        tracing::debug!(path = %self.target.display(), "env file replaced");
        Ok(self.target)
    }
}

/// Write the rewritten content of `env_path` to a temp file in the same
/// directory, keeping the original's permissions.
pub fn stage_rewrite(env_path: &Path, overlay: &TypedEnv) -> Result<StagedEnvFile> {
    let original = fs::read_to_string(env_path)?;
    let rewritten = rewrite_lines(&original, overlay)?;

    let dir = env_path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(rewritten.as_bytes())?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), fs::metadata(env_path)?.permissions())?;

    Ok(StagedEnvFile {
        temp,
        target: env_path.to_path_buf(),
    })
}

/// Bring `project_dir/.env` in line with the shared Laradock environment.
pub fn synthesize(config: &Config, project_dir: &Path, hook: &dyn OverlayHook) -> Result<PathBuf> {
    let env_path = ensure_env_file(project_dir)?;
    let project_env = load_project_env(&env_path)?;
    let overlay = build_overlay(&config.env, project_dir, &project_env, hook)?;
    stage_rewrite(&env_path, &overlay)?.commit()
}
