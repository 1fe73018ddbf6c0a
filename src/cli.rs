use clap::Parser;

pub const USAGE: &str = "\
Usage: laradock <command> <...args>

laradock init
    Create laradock's .env from its env-example.

laradock upgrade
    Replace the current cli with the latest release.

laradock env
    Point the current project's .env at the laradock services.

laradock start
    Start the default services.

laradock stop
    Stop all services.

laradock restart
    Stop all services, start the default services.

laradock enter [service]
    Open a shell in the running workspace container.

laradock sudo [service]
    Same as enter, as root.

laradock up [services...]
    Start the specified services (or the project's services).

laradock down [services...]
    Stop the specified services (or the project's services).

laradock reup [services...]
    Stop and then start the specified services.

laradock reload
    Reload nginx configuration.

laradock run <command>
    Execute the specified command inside the workspace.

laradock <...command>
    Run a command from .laradock/laradock-cli/commands, or pass it to
    docker-compose inside laradock's folder.
";

/// Parsed command line. Only an exact leading `--debug` (and `--version`)
/// belong to laradock; the next token is the action whatever it looks like,
/// so `laradock -f x.yml ps` reaches docker-compose untouched.
#[derive(Parser, Debug)]
#[command(name = "laradock")]
#[command(version)]
#[command(about = "Project-aware docker-compose wrapper for Laradock", long_about = None)]
#[command(disable_help_flag = true, disable_help_subcommand = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Action to run
    pub action: Option<String>,

    /// Arguments for the action
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    pub fn try_parse_args<I, T>(argv: I) -> Result<Cli, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::<String>::into);
        let bin = argv.next().unwrap_or_else(|| "laradock".to_string());
        let mut rest: Vec<String> = argv.collect();

        let debug = rest.first().is_some_and(|a| a == "--debug");
        if debug {
            rest.remove(0);
        }
        if let Some(flag @ ("--version" | "-V")) = rest.first().map(String::as_str) {
            return Cli::try_parse_from([bin.as_str(), flag]);
        }

        let mut rest = rest.into_iter();
        Ok(Cli {
            debug,
            action: rest.next(),
            args: rest.collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Init,
    Upgrade,
    Env,
    Start,
    Stop,
    Restart,
    Enter,
    Sudo,
    Up,
    Down,
    Reup,
    Reload,
    Run,
    Compose,
    Other(String),
}

impl Action {
    pub fn parse(name: &str) -> Action {
        match name {
            "help" => Action::Help,
            "init" => Action::Init,
            "upgrade" => Action::Upgrade,
            "env" => Action::Env,
            "start" => Action::Start,
            "stop" => Action::Stop,
            "restart" => Action::Restart,
            "enter" => Action::Enter,
            "sudo" => Action::Sudo,
            "up" => Action::Up,
            "down" => Action::Down,
            "reup" => Action::Reup,
            "reload" => Action::Reload,
            "run" => Action::Run,
            "compose" => Action::Compose,
            other => Action::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_flags_through_to_action() {
        let cli = Cli::try_parse_args(["laradock", "exec", "-T", "workspace", "php", "-v"]).unwrap();
        assert_eq!(cli.action.as_deref(), Some("exec"));
        assert_eq!(cli.args, vec!["-T", "workspace", "php", "-v"]);
        assert!(!cli.debug);
    }

    #[test]
    fn debug_flag_before_action() {
        let cli = Cli::try_parse_args(["laradock", "--debug", "env"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.action.as_deref(), Some("env"));
        assert!(cli.args.is_empty());
    }

    #[test]
    fn no_action() {
        let cli = Cli::try_parse_args(["laradock"]).unwrap();
        assert_eq!(cli.action, None);
        let cli = Cli::try_parse_args(["laradock", "--debug"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.action, None);
    }

    #[test]
    fn leading_hyphen_token_is_the_action() {
        let cli = Cli::try_parse_args(["laradock", "-f", "x.yml", "ps"]).unwrap();
        assert!(!cli.debug);
        assert_eq!(cli.action.as_deref(), Some("-f"));
        assert_eq!(cli.args, vec!["x.yml", "ps"]);

        let cli = Cli::try_parse_args(["laradock", "--debug", "--project-name", "app", "ps"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.action.as_deref(), Some("--project-name"));
        assert_eq!(cli.args, vec!["app", "ps"]);
    }

    #[test]
    fn debug_after_action_is_forwarded() {
        let cli = Cli::try_parse_args(["laradock", "logs", "--debug"]).unwrap();
        assert!(!cli.debug);
        assert_eq!(cli.action.as_deref(), Some("logs"));
        assert_eq!(cli.args, vec!["--debug"]);
    }

    #[test]
    fn version_flag_is_handled_by_clap() {
        let err = Cli::try_parse_args(["laradock", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn maps_builtin_names() {
        assert_eq!(Action::parse("reup"), Action::Reup);
        assert_eq!(Action::parse("sudo"), Action::Sudo);
        assert_eq!(Action::parse("logs"), Action::Other("logs".into()));
    }
}
