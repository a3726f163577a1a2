//! Error types for webtest
//!
//! Assertion failures are never errors: they are recorded by the tester.
//! Everything in here either aborts a run before scheduling starts, or is
//! contained at the suite boundary and turned into a single failed assertion.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for webtest
#[derive(Error, Debug)]
pub enum Error {
    // === Run Setup Errors ===
    #[error("run_suites() needs at least one path argument")]
    NoSuitesProvided,

    #[error("No test file found in {paths}, aborting")]
    NoTestsFound { paths: String },

    // === Suite Errors ===
    #[error("Can only exec() files with .yaml or .yml extensions: {}", .0.display())]
    UnsupportedFileKind(PathBuf),

    #[error("Suite panicked: {0}")]
    SuitePanicked(String),

    #[error("Invalid suite: {0}")]
    ScenarioParse(#[from] serde_yaml::Error),

    // === Driver Errors ===
    #[error("Unable to open {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Evaluation of '{expression}' failed: {reason}")]
    Evaluation { expression: String, reason: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    // === Report Errors ===
    #[error("Unable to write results to {}: {error}", .path.display())]
    ReportWrite { path: PathBuf, error: String },

    #[error("Unable to serialize report: {0}")]
    ReportSerialize(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },
}

impl Error {
    /// Create a navigation error
    pub fn navigation(url: &str, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(expression: &str, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a no tests found error listing the searched paths
    pub fn no_tests_found<P: AsRef<std::path::Path>>(paths: &[P]) -> Self {
        let listed: Vec<String> = paths
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect();
        Self::NoTestsFound {
            paths: format!("[{}]", listed.join(", ")),
        }
    }

    /// Source chain below this error, one cause per line
    ///
    /// Returns `None` when the error has no underlying cause.
    pub fn trace(&self) -> Option<String> {
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        if causes.is_empty() {
            None
        } else {
            Some(format!("{}\n{}", self, causes.join("\n")))
        }
    }
}
