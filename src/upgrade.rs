//! Self-upgrade from the latest published release.

use crate::error::LaradockError;
use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_UPGRADE_URL: &str = "https://github.com/Tarik02/laradock-cli/releases/latest/download";

pub fn resolve_upgrade_url() -> String {
    std::env::var("LARADOCK_UPGRADE_URL").unwrap_or_else(|_| DEFAULT_UPGRADE_URL.to_string())
}

/// Release asset built for this platform.
pub fn asset_name() -> String {
    format!("laradock-{}-{}", std::env::consts::ARCH, std::env::consts::OS)
}

/// First token of a `sha256sum`-style line, if it looks like a digest.
pub fn parse_checksum(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?;
    (token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit())).then(|| token.to_ascii_lowercase())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn verify(asset: &str, bytes: &[u8], expected: &str) -> Result<(), LaradockError> {
    let actual = sha256_hex(bytes);
    if actual != expected {
        return Err(LaradockError::ChecksumMismatch {
            asset: asset.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Atomically put `bytes` in place of the executable at `exe`.
pub fn install(bytes: &[u8], exe: &Path) -> Result<()> {
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", exe.display()))?;
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot write next to {}", exe.display()))?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o755))?;
    }

    temp.persist(exe).map_err(|e| e.error)?;
    Ok(())
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    tracing::debug!(url, "downloading");
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Download, verify and install the latest release over the running binary.
pub async fn upgrade(base_url: &str) -> Result<PathBuf> {
    let exe = std::env::current_exe()?.canonicalize()?;
    let asset = asset_name();
    let base = base_url.trim_end_matches('/');
    let client = reqwest::Client::builder()
        .user_agent(concat!("laradock-cli/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let sums = fetch(&client, &format!("{base}/{asset}.sha256")).await?;
    let expected = parse_checksum(&String::from_utf8_lossy(&sums))
        .ok_or_else(|| anyhow!("malformed checksum file for {asset}"))?;
    let binary = fetch(&client, &format!("{base}/{asset}")).await?;

    verify(&asset, &binary, &expected)?;
    install(&binary, &exe)?;
    tracing::info!(path = %exe.display(), "installed new release");
    Ok(exe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn parses_sha256sum_output() {
        let line = format!("{}  laradock-x86_64-linux\n", HELLO_SHA256.to_uppercase());
        assert_eq!(parse_checksum(&line).as_deref(), Some(HELLO_SHA256));
        assert_eq!(parse_checksum("not-a-digest file"), None);
        assert_eq!(parse_checksum(""), None);
    }

    #[test]
    fn verifies_digest() {
        assert_eq!(sha256_hex(b"hello"), HELLO_SHA256);
        verify("a", b"hello", HELLO_SHA256).unwrap();
        let err = verify("a", b"hell0", HELLO_SHA256).unwrap_err();
        assert!(matches!(err, LaradockError::ChecksumMismatch { .. }));
    }

    #[test]
    fn install_replaces_file() {
        let tmp = TempDir::new().unwrap();
        let exe = tmp.path().join("laradock");
        fs::write(&exe, b"old").unwrap();

        install(b"new", &exe).unwrap();
        assert_eq!(fs::read(&exe).unwrap(), b"new");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&exe).unwrap().permissions().mode() & 0o777, 0o755);
        }
    }

    #[test]
    fn asset_name_names_platform() {
        let name = asset_name();
        assert!(name.starts_with("laradock-"));
        assert!(name.contains(std::env::consts::OS));
    }
}
