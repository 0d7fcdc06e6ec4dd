use clap::Parser;
use smctrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
