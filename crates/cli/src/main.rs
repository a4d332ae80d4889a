mod cmd;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use argp::FromArgs;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Import job listings and employers into a board.
struct TopLevel {
    #[argp(option, short = 'c', default = "PathBuf::from(\"config.yml\")")]
    /// path to the config file
    config: PathBuf,
    #[argp(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Token(cmd::token::Args),
    Fetch(cmd::fetch::Args),
    Import(cmd::import::Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    match args.command {
        SubCommand::Token(c_args) => cmd::token::run(&args.config, c_args),
        SubCommand::Fetch(c_args) => cmd::fetch::run(&args.config, c_args).await,
        SubCommand::Import(c_args) => cmd::import::run(&args.config, c_args).await,
    }
}
