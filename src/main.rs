use clap::Parser;
use tradeagent::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
