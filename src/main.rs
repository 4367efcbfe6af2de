//! switchpush - concurrent configuration push to network switches
//!
//! This is the main entry point for the switchpush CLI.

mod cli;

use anyhow::Result;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use switchpush::config::Config;
use switchpush::logging::LoggingBuilder;
use switchpush::Error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| Error::config(format!("{:#}", e)))?;
    cli.apply_to(&mut config);

    LoggingBuilder::from_config(config.logging.clone()).init()?;

    let ctx = CommandContext::new(config, cli.verbosity());

    match &cli.command {
        Commands::Run(args) => args.execute(&ctx).await,
        Commands::Inventory(args) => args.execute(&ctx).await,
        Commands::CheckConfig(args) => args.execute(&ctx).await,
    }
}

/// Map an error to the process exit code
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1)
}
