use clap::Parser;
use vwaptrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
