mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use oidscope_core::{CoreError, Explorer};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Name translation only needs the schema
        Command::Resolve { names } => {
            let schema = commands::util::load_schema(&cli.global)?;
            commands::resolve::handle(&schema, &names, &cli.global)
        }

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "oidscope", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to an agent
        cmd => {
            let cfg = config::load_config_or_default();
            let (profile, engine) = config::build_session(&cli.global, &cfg)?;
            let schema = Arc::new(commands::util::load_schema(&cli.global)?);

            let (mut explorer, mut outcomes): (Explorer, _) =
                Explorer::new(schema, engine.history_capacity);
            explorer
                .connect(&profile, engine)
                .await
                .map_err(|err| match err {
                    CoreError::Transport(oidscope_api::Error::Io(_)) => CliError::ConnectionFailed {
                        target: profile.target.clone(),
                        source: err,
                    },
                    other => CliError::from(other),
                })?;

            tracing::debug!(command = ?cmd, target = %profile.target, "dispatching command");
            let result = commands::dispatch(cmd, &mut explorer, &mut outcomes, &cli.global).await;
            explorer.disconnect();
            result
        }
    }
}
