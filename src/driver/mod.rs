//! Automation driver interface
//!
//! The tester and the suites only ever talk to a page through this trait.
//! Everything runs on one thread, so the trait is `?Send` and shared
//! through `Rc`.

mod fixture;

pub use fixture::{FixtureDriver, Page, Site};

use async_trait::async_trait;
use colored::{ColoredString, Colorize};

use crate::common::{Error, Result};
use crate::testing::Value;

/// Output style tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Error,
    Info,
    Parameter,
    Comment,
    GreenBar,
    RedBar,
    InfoBar,
}

/// Callback invoked when an asynchronous step fails
pub type StepErrorListener = Box<dyn Fn(&Error)>;

/// Navigation, inspection and console primitives consumed by the tester
#[async_trait(?Send)]
pub trait Driver {
    /// Navigate to a URL
    async fn open(&self, url: &str) -> Result<()>;

    /// Whether an element matching `selector` exists on the current page
    fn exists(&self, selector: &str) -> bool;

    /// Evaluate an expression in the page
    fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Current page title
    fn title(&self) -> String;

    /// Current page URL
    fn current_url(&self) -> String;

    /// Text content of the current page
    fn page_content(&self) -> String;

    /// Whether a resource whose URL contains `pattern` was loaded
    fn resource_exists(&self, pattern: &str) -> bool;

    /// Print a line, optionally styled
    fn echo(&self, text: &str, style: Option<Style>);

    /// Apply a style to a piece of text
    fn colorize(&self, text: &str, style: Style) -> String;

    /// Request process termination with `status`
    fn exit(&self, status: i32);

    /// Subscribe to out-of-band step failures
    fn on_step_error(&self, listener: StepErrorListener);

    /// Report a failed step to the subscribers
    fn step_failed(&self, error: Error);
}

/// ANSI rendering of a style tag
pub fn paint(text: &str, style: Style) -> ColoredString {
    match style {
        Style::Error => text.white().on_red().bold(),
        Style::Info => text.green().bold(),
        Style::Parameter => text.cyan(),
        Style::Comment => text.yellow(),
        Style::GreenBar => text.white().on_green(),
        Style::RedBar => text.white().on_red().bold(),
        Style::InfoBar => text.cyan().bold(),
    }
}
