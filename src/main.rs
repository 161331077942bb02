mod app;
mod cli;
mod config;
mod library;
mod order;
mod runner;
mod trace;
mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Application failed to start: {err:#}");
            ExitCode::FAILURE
        }
    }
}
