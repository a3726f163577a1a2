//! webtest - run browser-style test suites one after the other
//!
//! Each suite is a YAML scenario executed against an automation driver.
//! The run prints a colored summary and can store an xUnit report.

use clap::Parser;
use commands::Commands;
use webtest::common::logging;
use webtest::{cli, commands};

#[derive(Parser)]
#[command(name = "webtest", about = "Sequential suite runner and assertion engine")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    match cli::dispatch(cli.command).await {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
