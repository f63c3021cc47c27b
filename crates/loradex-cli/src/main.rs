use clap::Parser;
use loradex_cli::{CliArgs, LoradexCli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let result = LoradexCli::from_args(&args).and_then(|cli| cli.run(args));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
