mod command;
mod config;
mod error;
mod exec;
mod logging;
mod watch;

use config::{ArgsOpt, Config};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let args_opt = ArgsOpt::from_env();
    if let Err(err) = logging::init(args_opt.verbosity()) {
        eprintln!("rebuild: could not set up logging: {err}");
    }

    match Config::new(args_opt).and_then(|config| watch::watch(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
