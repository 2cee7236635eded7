use std::path::PathBuf;

use testrun_core::{action, print_success};

use super::{GlobalArgs, SubcmdResult};

/// Write an example testrun.toml
#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(default_value = "./")]
    dir: PathBuf,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let path = action::init_config(&args.dir)?;
    print_success!("Successfully created {}", path.to_string_lossy());
    Ok(0)
}
