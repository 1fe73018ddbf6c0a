use crate::config::InfraRoot;
use crate::error::{LaradockError, Result};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

static CODE_PATH_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^APP_CODE_PATH_CONTAINER=[^\r\n]*").unwrap());
static DOCKER_GID_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^WORKSPACE_DOCKER_GID=[^\r\n]*").unwrap());

/// Fill the placeholders of laradock's env-example.
pub fn render_template(template: &str, code_path: &str, docker_gid: Option<u32>) -> String {
    let line = format!("APP_CODE_PATH_CONTAINER={code_path}");
    let mut out = CODE_PATH_LINE.replace_all(template, NoExpand(&line)).into_owned();
    if let Some(gid) = docker_gid {
        let line = format!("WORKSPACE_DOCKER_GID={gid}");
        out = DOCKER_GID_LINE.replace_all(&out, NoExpand(&line)).into_owned();
    }
    out
}

#[cfg(unix)]
pub fn docker_group_id() -> Option<u32> {
    nix::unistd::Group::from_name("docker")
        .ok()
        .flatten()
        .map(|g| g.gid.as_raw())
}

#[cfg(not(unix))]
pub fn docker_group_id() -> Option<u32> {
    None
}

/// Mode for the shared env: whatever it already has, else a plain 0644.
#[cfg(unix)]
fn target_permissions(target: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(target)
        .map(|m| m.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644))
}

/// Write `.laradock/.env` from `.laradock/env-example`.
pub fn init(infra: &InfraRoot) -> Result<PathBuf> {
    let template_path = infra.template_path();
    if !template_path.is_file() {
        return Err(LaradockError::TemplateMissing(infra.dir.clone()));
    }
    let template = fs::read_to_string(&template_path)?;
    let gid = docker_group_id();
    if gid.is_none() {
        tracing::warn!("no docker group found, leaving WORKSPACE_DOCKER_GID as is");
    }
    let rendered = render_template(&template, &infra.root.display().to_string(), gid);

    let target = infra.shared_env_path();
    let mut temp = NamedTempFile::new_in(&infra.dir)?;
    temp.write_all(rendered.as_bytes())?;
    #[cfg(unix)]
    fs::set_permissions(temp.path(), target_permissions(&target))?;
    temp.persist(&target).map_err(|e| LaradockError::Io(e.error))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "\
APP_CODE_PATH_HOST=../
APP_CODE_PATH_CONTAINER=/var/www
# APP_CODE_PATH_CONTAINER=/unused
WORKSPACE_DOCKER_GID=999
MYSQL_ROOT_PASSWORD=root
";

    #[test]
    fn substitutes_placeholder_lines() {
        let out = render_template(TEMPLATE, "/home/me/code", Some(998));
        assert!(out.contains("\nAPP_CODE_PATH_CONTAINER=/home/me/code\n"));
        assert!(out.contains("# APP_CODE_PATH_CONTAINER=/unused\n"));
        assert!(out.contains("\nWORKSPACE_DOCKER_GID=998\n"));
        assert!(out.contains("MYSQL_ROOT_PASSWORD=root\n"));
    }

    #[test]
    fn replacement_text_is_literal() {
        let out = render_template(TEMPLATE, "/srv/$1/APP_CODE_PATH_CONTAINER=x", None);
        assert!(out.contains("\nAPP_CODE_PATH_CONTAINER=/srv/$1/APP_CODE_PATH_CONTAINER=x\n"));
        assert!(out.contains("\nWORKSPACE_DOCKER_GID=999\n"));
    }

    #[test]
    fn writes_shared_env() {
        let tmp = TempDir::new().unwrap();
        let infra = InfraRoot::new(tmp.path());
        fs::create_dir_all(&infra.dir).unwrap();
        fs::write(infra.template_path(), TEMPLATE).unwrap();

        let path = init(&infra).unwrap();
        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains(&format!("APP_CODE_PATH_CONTAINER={}\n", tmp.path().display())));
    }

    #[cfg(unix)]
    #[test]
    fn shared_env_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let infra = InfraRoot::new(tmp.path());
        fs::create_dir_all(&infra.dir).unwrap();
        fs::write(infra.template_path(), TEMPLATE).unwrap();

        let path = init(&infra).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        init(&infra).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }

    #[test]
    fn missing_template_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let infra = InfraRoot::new(tmp.path());
        fs::create_dir_all(&infra.dir).unwrap();

        let err = init(&infra).unwrap_err();
        assert!(matches!(err, LaradockError::TemplateMissing(_)));
        assert!(!infra.shared_env_path().exists());
    }
}
