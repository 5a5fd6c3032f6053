use clap::Parser;
use voltrader::cli::{run, Cli};
use voltrader::logging::init_tracing;

fn main() -> std::process::ExitCode {
    init_tracing();
    run(Cli::parse())
}
