//! CLI command definitions
//!
//! Defines the clap commands for the webtest CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every suite found under the given paths, one at a time
    Test {
        /// Suite files or directories to search for suites
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write an xUnit report to this file
        #[arg(long)]
        xunit: Option<PathBuf>,

        /// Site description served by the fixture driver
        #[arg(long)]
        site: Option<PathBuf>,

        /// Configuration file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Label for passing assertions
        #[arg(long)]
        pass_text: Option<String>,

        /// Label for failing assertions
        #[arg(long)]
        fail_text: Option<String>,

        /// Disable colored output
        #[arg(long)]
        no_colors: bool,
    },

    /// List the suite files that `test` would run, in order
    List {
        /// Suite files or directories to search for suites
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}
