//! Built-in actions and dispatch of everything else.

use crate::cli::{Action, USAGE};
use crate::config::{resolve_compose_binary, Config, InfraRoot};
use crate::docker::{shell_quote, Compose};
use crate::env::{load_project_env, TypedEnv};
use crate::error::LaradockError;
use crate::extensions::{compose_invoker, CommandContext, CommandPlugin};
use crate::overlay::{NoHook, OverlayHook, ScriptHook};
use crate::{init, synth, upgrade};
use anyhow::Result;
use std::path::PathBuf;

const WORKSPACE_USER: &str = "laradock";
const PROXY_SERVICE: &str = "nginx";
const SHELL_COMMAND: &str = "clear && bash -c $SHELL";

/// Per-invocation state for actions that talk to docker-compose.
pub struct Session {
    pub config: Config,
    pub compose: Compose,
    pub cwd: PathBuf,
    pub project_dir: Option<PathBuf>,
    pub project_env: Option<TypedEnv>,
}

impl Session {
    pub fn new(config: Config, cwd: PathBuf) -> Result<Self> {
        let project_dir = config.find_project_root(&cwd);
        let project_env = match &project_dir {
            Some(dir) if dir.join(".env").is_file() => Some(load_project_env(&dir.join(".env"))?),
            _ => None,
        };
        tracing::debug!(project = ?project_dir, "session ready");

        Ok(Session {
            compose: Compose::new(&config),
            config,
            cwd,
            project_dir,
            project_env,
        })
    }

    fn workspace(&self) -> String {
        self.config.workspace_service(self.project_env.as_ref())
    }

    /// Services named on the command line, else the project's own list.
    fn services(&self, args: &[String]) -> Vec<String> {
        if args.is_empty() {
            self.config.project_services(self.project_env.as_ref())
        } else {
            args.to_vec()
        }
    }

    /// `docker-compose exec` argv running `command` in `service`, with the
    /// working directory mapped into the container.
    pub fn exec_args(&self, user: Option<&str>, service: &str, command: &[&str]) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if let Some(user) = user {
            args.push(format!("--user={user}"));
        }
        args.push("--env".to_string());
        args.push(format!("LARADOCK_ROOT={}", self.config.paths.container_root()));
        args.push("--workdir".to_string());
        args.push(self.config.paths.workdir_for(&self.cwd));
        args.push(service.to_string());
        args.extend(command.iter().map(|s| s.to_string()));
        args
    }

    fn hook(&self) -> Box<dyn OverlayHook> {
        match ScriptHook::discover(&self.config.infra.plugin_dir()) {
            Some(hook) => Box::new(hook),
            None => Box::new(NoHook),
        }
    }

    pub async fn run(&self, action: Action, args: Vec<String>) -> Result<i32> {
        match action {
            Action::Env => {
                let dir = self
                    .project_dir
                    .as_deref()
                    .ok_or_else(|| LaradockError::ProjectNotFound(self.cwd.clone()))?;
                let path = synth::synthesize(&self.config, dir, &*self.hook())?;
                println!("Updated {}", path.display());
            }
            Action::Start => self.compose.start_services(&self.config.default_services).await?,
            Action::Stop => self.compose.run(&["down"]).await?,
            Action::Restart => {
                self.compose.run(&["down"]).await?;
                self.compose.start_services(&self.config.default_services).await?;
            }
            Action::Enter => self.shell(Some(WORKSPACE_USER), &args).await?,
            Action::Sudo => self.shell(None, &args).await?,
            Action::Up => self.compose.start_services(&self.services(&args)).await?,
            Action::Down => {
                let mut argv = vec!["stop".to_string()];
                argv.extend(self.services(&args));
                self.compose.run(argv.as_slice()).await?;
            }
            Action::Reup => {
                let services = self.services(&args);
                let mut argv = vec!["stop".to_string()];
                argv.extend(services.iter().cloned());
                self.compose.run(argv.as_slice()).await?;
                self.compose.start_services(&services).await?;
            }
            Action::Reload => {
                self.compose
                    .run(&["exec", PROXY_SERVICE, "nginx", "-s", "reload"])
                    .await?
            }
            Action::Run => {
                let command = format!("bash -c {}", shell_quote(&args.join(" ")));
                let argv = self.exec_args(Some(WORKSPACE_USER), &self.workspace(), &["sh", "-c", &command]);
                self.compose.run(argv.as_slice()).await?;
            }
            Action::Compose => return Ok(self.compose.status(args.as_slice()).await?),
            Action::Other(name) => return self.extension_or_passthrough(&name, args).await,
            other => anyhow::bail!("{other:?} does not run inside a project session"),
        }
        Ok(0)
    }

    /// Interactive shell in `args[0]`, or the workspace when no service is given.
    async fn shell(&self, user: Option<&str>, args: &[String]) -> Result<()> {
        let service = args.first().cloned().unwrap_or_else(|| self.workspace());
        let argv = self.exec_args(user, &service, &["sh", "-c", SHELL_COMMAND]);
        self.compose.run(argv.as_slice()).await?;
        Ok(())
    }

    async fn extension_or_passthrough(&self, name: &str, args: Vec<String>) -> Result<i32> {
        if let Some(plugin) = CommandPlugin::find(&self.config.infra.plugin_dir(), name) {
            let ctx = CommandContext {
                compose: compose_invoker(),
                laradock_env: &self.config.env,
                project_dir: self.project_dir.as_deref(),
                project_env: self.project_env.as_ref(),
                args: &args,
            };
            return Ok(plugin.invoke(&ctx).await?);
        }

        let mut argv = vec![name.to_string()];
        argv.extend(args);
        Ok(self.compose.status(argv.as_slice()).await?)
    }
}

/// Top-level dispatch. Returns the process exit code.
pub async fn dispatch(action: Option<String>, args: Vec<String>) -> Result<i32> {
    let action = match action.as_deref().map(Action::parse) {
        None | Some(Action::Help) => {
            print!("{USAGE}");
            return Ok(1);
        }
        Some(a) => a,
    };

    let infra = InfraRoot::from_env()?;
    match action {
        Action::Init => {
            let path = init::init(&infra)?;
            println!("Wrote {}", path.display());
            Ok(0)
        }
        Action::Upgrade => {
            upgrade::upgrade(&upgrade::resolve_upgrade_url()).await?;
            println!("Upgrade successful.");
            Ok(0)
        }
        action => {
            let config = Config::load(infra, resolve_compose_binary())?;
            let session = Session::new(config, std::env::current_dir()?)?;
            session.run(action, args).await
        }
    }
}
