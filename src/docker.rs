use crate::config::Config;
use crate::error::{LaradockError, Result};
use std::path::PathBuf;
use std::process::ExitStatus;
use tokio::process::Command;

/// Runs docker-compose from inside the Laradock directory with inherited
/// stdio.
#[derive(Debug, Clone)]
pub struct Compose {
    bin: String,
    cwd: PathBuf,
}

impl Compose {
    pub fn new(config: &Config) -> Self {
        Compose {
            bin: config.compose_bin.clone(),
            cwd: config.infra.dir.clone(),
        }
    }

    /// Run and hand back the exit code, whatever it is.
    pub async fn status<S: AsRef<str>>(&self, args: &[S]) -> Result<i32> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        tracing::debug!(bin = %self.bin, ?args, cwd = %self.cwd.display(), "docker-compose");

        let status = Command::new(&self.bin)
            .current_dir(&self.cwd)
            .args(&args)
            .status()
            .await?;
        exit_code(status)
    }

    /// Run and fail with the tool's exit code when it is nonzero.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        match self.status(args).await? {
            0 => Ok(()),
            code => Err(LaradockError::Compose(code)),
        }
    }

    pub async fn start_services(&self, services: &[String]) -> Result<()> {
        let mut args = vec!["up".to_string(), "-d".to_string()];
        args.extend_from_slice(services);
        self.run(args.as_slice()).await
    }
}

/// Exit code of a finished child. A child killed by SIGINT means the user
/// pressed Ctrl-C, which is not a failure of the tool.
pub(crate) fn exit_code(status: ExitStatus) -> Result<i32> {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        use std::os::unix::process::ExitStatusExt;

        if status.signal() == Some(Signal::SIGINT as i32) {
            return Err(LaradockError::Interrupted);
        }
    }
    Ok(status.code().unwrap_or(if status.success() { 0 } else { 1 }))
}

/// Single-quote `s` for `sh`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
