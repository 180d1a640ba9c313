use clap::Parser;
use rebalsim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
