//! `qanda` - CLI for the question/answer list
//!
//! This binary provides the interactive page and one-shot commands for
//! managing the records held in the configured store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use qanda::cli::{handlers, Cli, Command};
use qanda::{init_logging, open_store, shell, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone()).context("loading configuration")?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Command::Config(config_cmd) => {
            handlers::config(&config, config_cmd, &mut std::io::stdout())?;
            Ok(())
        }
        command => {
            config.validate()?;
            // Views and the shell loop are single-threaded
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            runtime.block_on(run(&config, command))
        }
    }
}

async fn run(config: &Config, command: Command) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let mut stdout = std::io::stdout();

    match command {
        Command::Run => shell::run(store).await?,
        Command::List(cmd) => handlers::list(store.as_ref(), &cmd, &mut stdout).await?,
        Command::Add(cmd) => handlers::add(store.as_ref(), &cmd, &mut stdout).await?,
        Command::Edit(cmd) => handlers::edit(store.as_ref(), &cmd, &mut stdout).await?,
        Command::Delete(cmd) => handlers::delete(store.as_ref(), &cmd, &mut stdout).await?,
        Command::Config(cmd) => handlers::config(config, cmd, &mut stdout)?,
    }
    Ok(())
}
