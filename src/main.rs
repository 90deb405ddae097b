use std::process::ExitCode;

use atomic_tmp::{cli, output as out};

mod app;
mod logging;

fn main() -> ExitCode {
    let args = cli::parse();
    match app::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            ExitCode::from(app::exit_code(&e))
        }
    }
}
