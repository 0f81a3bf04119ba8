// Entrypoint for the CLI application.
// - Keeps `main` small: all the work happens in `cg_global_prefix::run`.
// - Fatal errors and an operator quit exit non-zero.

use std::process::ExitCode;

use cg_global_prefix::RunOutcome;

fn main() -> ExitCode {
    match cg_global_prefix::run() {
        Ok(RunOutcome::Quit) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
