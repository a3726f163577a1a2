//! CLI command handling
//!
//! Builds the driver, tester and scheduler for a run and maps the outcome
//! to a process exit status.

use std::path::PathBuf;
use std::rc::Rc;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::{Config, TesterOptions};
use crate::common::{Error, Result};
use crate::driver::{FixtureDriver, Site};
use crate::testing::{self, LocalFs, Scheduler, Tester};

/// Dispatch a CLI command, returning the exit status
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Test {
            paths,
            xunit,
            site,
            config,
            pass_text,
            fail_text,
            no_colors,
        } => {
            if no_colors {
                colored::control::set_override(false);
            }

            let config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::load()?,
            };
            let options = merge_options(config.tester, xunit, pass_text, fail_text);
            let site = match site {
                Some(path) => Site::load(&path)?,
                None => Site::default(),
            };

            run(&paths, site, options).await
        }

        Commands::List { paths } => {
            let files = testing::resolve(&LocalFs, &paths, |missing| {
                eprintln!("{} {}", "Path does not exist:".yellow(), missing.display());
            })?;
            for file in &files {
                println!("{}", file.display());
            }
            Ok(0)
        }
    }
}

/// Run the suites under `paths` against a fixture driver serving `site`
pub async fn run(paths: &[PathBuf], site: Site, options: TesterOptions) -> Result<i32> {
    let driver = Rc::new(FixtureDriver::new(site));
    let tester = Rc::new(Tester::new(driver.clone(), options));
    let scheduler = Scheduler::new(tester, driver.clone());

    match scheduler.run_suites(paths).await {
        Ok(summary) => Ok(driver.exit_status().unwrap_or(summary.status)),
        // The banner was already printed by the scheduler
        Err(Error::NoTestsFound { .. }) => Ok(driver.exit_status().unwrap_or(1)),
        Err(e) => Err(e),
    }
}

/// Apply command line overrides on top of the configured options
fn merge_options(
    mut options: TesterOptions,
    xunit: Option<PathBuf>,
    pass_text: Option<String>,
    fail_text: Option<String>,
) -> TesterOptions {
    if let Some(path) = xunit {
        options.save = Some(path);
    }
    if let Some(text) = pass_text {
        options.pass_text = text;
    }
    if let Some(text) = fail_text {
        options.fail_text = text;
    }
    options
}
