use std::path::Path;

use anyhow::Result;
use argp::FromArgs;

use crate::util::{credential, load_config};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Save the API bearer token.
#[argp(subcommand, name = "token")]
pub struct Args {
    #[argp(positional)]
    /// bearer token for the job-listing API
    token: String,
}

pub fn run(config_path: &Path, args: Args) -> Result<()> {
    let config = load_config(config_path)?;
    credential(&config).save(&args.token)?;
    println!("Token saved to {}", config.credential.path.display());
    Ok(())
}
