use clap::error::ErrorKind;
use laradock_cli::actions;
use laradock_cli::cli::{Cli, USAGE};
use laradock_cli::error::{exit_code_for, LaradockError};
use tracing_subscriber::EnvFilter;

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_env("LARADOCK_LOG").unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let argv = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
    let cli = match Cli::try_parse_args(argv) {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::DisplayVersion => e.exit(),
        Err(_) => {
            print!("{USAGE}");
            std::process::exit(1);
        }
    };
    init_logging(cli.debug);

    // Ctrl-C reaches the children too, so both branches can be ready at once.
    let code = tokio::select! {
        biased;
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted.");
            0
        }
        res = actions::dispatch(cli.action, cli.args) => match res {
            Ok(code) => code,
            Err(e) if matches!(e.downcast_ref::<LaradockError>(), Some(LaradockError::Interrupted)) => {
                eprintln!("{e}");
                0
            }
            Err(e) => {
                eprintln!("laradock: {e:#}");
                exit_code_for(&e)
            }
        },
    };

    std::process::exit(code);
}
