use crate::{app::App, ui};
use anyhow::{bail, Result};

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui { debug: bool },
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        CliAction::Ui { debug } => {
            let mut app = App::initialize(debug)?;
            ui::run(&mut app)
        }
        CliAction::Help => {
            print_help();
            Ok(())
        }
        CliAction::Version => {
            println!("scriptdeck {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    let mut debug = false;
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliAction::Help),
            "--version" | "-V" => return Ok(CliAction::Version),
            "--debug" | "-d" => debug = true,
            other => bail!("unknown argument: {other} (see --help)"),
        }
    }
    Ok(CliAction::Ui { debug })
}

fn print_help() {
    println!("ScriptDeck v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  scriptdeck                      Launch TUI");
    println!();
    println!("Options:");
    println!("  -d, --debug                     Trace operations into the log panel");
    println!("  -h, --help                      Show help");
    println!("  -V, --version                   Show version");
}
