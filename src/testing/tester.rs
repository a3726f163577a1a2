//! Assertion engine
//!
//! The tester owns the results of a run. Every assertion bumps exactly one
//! counter, notifies listeners, forwards the outcome to the exporter and
//! prints one status line through the driver.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::Notify;

use super::discovery::{FileSystem, LocalFs};
use super::equality::equals;
use super::events::{Emitter, TestEvent};
use super::exporter::{Exporter, XunitExporter};
use super::value::Value;
use crate::common::config::TesterOptions;
use crate::common::{Error, Result};
use crate::driver::{Driver, Style};

/// Width banners are padded to
const BAR_WIDTH: usize = 80;

/// Message attached to an assertion
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A human readable description
    Text(String),
    /// An error caught at a suite boundary
    Error {
        message: String,
        trace: Option<String>,
    },
}

impl Message {
    pub fn from_error(error: &Error) -> Self {
        Message::Error {
            message: error.to_string(),
            trace: error.trace(),
        }
    }

    /// Text shown in failure details: the trace when there is one
    pub fn detail(&self) -> &str {
        match self {
            Message::Text(text) => text,
            Message::Error {
                trace: Some(trace), ..
            } => trace,
            Message::Error { message, .. } => message,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) => f.write_str(text),
            Message::Error { message, .. } => f.write_str(message),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&String> for Message {
    fn from(text: &String) -> Self {
        Message::Text(text.clone())
    }
}

/// A recorded failure
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub message: Message,
    /// Suite the failure happened in, if any was running
    pub file: Option<PathBuf>,
}

/// Totals for a run
#[derive(Debug, Clone, Default)]
pub struct TestResults {
    pub passed: usize,
    pub failed: usize,
    pub failures: Vec<FailureRecord>,
}

impl TestResults {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

/// Assertion engine shared by the scheduler and the running suite
pub struct Tester {
    options: TesterOptions,
    driver: Rc<dyn Driver>,
    fs: Rc<dyn FileSystem>,
    results: RefCell<TestResults>,
    exporter: RefCell<Box<dyn Exporter>>,
    events: Emitter<TestEvent>,
    running: Cell<bool>,
    current_file: RefCell<Option<PathBuf>>,
    completion: Notify,
}

impl Tester {
    /// Create a tester printing through `driver`
    ///
    /// Reports are serialized as xUnit and saved on the local filesystem
    /// unless replaced with [`Tester::with_exporter`] / [`Tester::with_filesystem`].
    pub fn new(driver: Rc<dyn Driver>, options: TesterOptions) -> Self {
        Self {
            options,
            driver,
            fs: Rc::new(LocalFs),
            results: RefCell::new(TestResults::default()),
            exporter: RefCell::new(Box::new(XunitExporter::new())),
            events: Emitter::new(),
            running: Cell::new(false),
            current_file: RefCell::new(None),
            completion: Notify::new(),
        }
    }

    pub fn with_exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporter = RefCell::new(exporter);
        self
    }

    pub fn with_filesystem(mut self, fs: Rc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn options(&self) -> &TesterOptions {
        &self.options
    }

    /// Snapshot of the results so far
    pub fn results(&self) -> TestResults {
        self.results.borrow().clone()
    }

    /// Register a listener for tester events
    pub fn on(&self, listener: impl Fn(&TestEvent) + 'static) {
        self.events.on(listener);
    }

    pub(crate) fn emit(&self, event: TestEvent) {
        self.events.emit(&event);
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub(crate) fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub(crate) fn exporter(&self) -> Ref<'_, Box<dyn Exporter>> {
        self.exporter.borrow()
    }

    // === Suite lifecycle ===

    /// Mark `file` as the running suite
    pub(crate) fn start(&self, file: &Path) {
        self.running.set(true);
        *self.current_file.borrow_mut() = Some(file.to_path_buf());
        self.emit(TestEvent::SuiteStarted {
            file: file.to_path_buf(),
        });
    }

    /// Signal that the running suite is complete
    ///
    /// This is the only way the scheduler moves on to the next suite. Does
    /// nothing when no suite is running.
    pub fn done(&self) {
        if !self.running.get() {
            tracing::debug!("Ignoring done() with no running suite");
            return;
        }
        self.running.set(false);
        self.completion.notify_one();
        tracing::debug!(file = ?self.current_file.borrow(), "Suite done");
        self.emit(TestEvent::SuiteDone {
            file: self.current_file(),
        });
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.current_file.borrow().clone()
    }

    /// Resolves after the next call to [`Tester::done`]
    pub(crate) async fn completed(&self) {
        self.completion.notified().await;
    }

    /// Record an error that escaped a suite as one failed assertion
    pub fn uncaught_error(&self, error: &Error, file: Option<&Path>) -> bool {
        tracing::warn!(error = %error, ?file, "Uncaught error in suite");
        self.record(
            false,
            Message::from_error(error),
            "uncaughtError",
            file.map(Path::to_path_buf),
        )
    }

    // === Primitive assertions ===

    /// Assert that `condition` holds
    pub fn assert(&self, condition: bool, message: impl Into<Message>) -> bool {
        self.record(condition, message.into(), "assert", self.current_file())
    }

    /// Assert that `condition` does not hold
    pub fn assert_not(&self, condition: bool, message: impl Into<Message>) -> bool {
        self.record(!condition, message.into(), "assertNot", self.current_file())
    }

    /// Assert structural equality of two values
    pub fn assert_equals(
        &self,
        actual: &Value,
        expected: &Value,
        message: impl Into<Message>,
    ) -> bool {
        let ok = self.record(
            equals(actual, expected),
            message.into(),
            "assertEquals",
            self.current_file(),
        );
        if !ok {
            self.comment(&format!("   got:      {}", actual.serialize_to_string()));
            self.comment(&format!("   expected: {}", expected.serialize_to_string()));
        }
        ok
    }

    /// Assert that `subject` matches `pattern`
    pub fn assert_match(&self, subject: &str, pattern: &Regex, message: impl Into<Message>) -> bool {
        let ok = self.record(
            pattern.is_match(subject),
            message.into(),
            "assertMatch",
            self.current_file(),
        );
        if !ok {
            self.comment(&format!("   subject: {}", subject));
            self.comment(&format!("   pattern: {}", pattern.as_str()));
        }
        ok
    }

    /// Assert that calling `callable` with `args` raises
    ///
    /// Returning an `Err` or panicking both count as raising; what was
    /// raised is not inspected.
    pub fn assert_raises<A, T, E>(
        &self,
        callable: impl FnOnce(A) -> std::result::Result<T, E>,
        args: A,
        message: impl Into<Message>,
    ) -> bool {
        let raised = !matches!(
            panic::catch_unwind(AssertUnwindSafe(|| callable(args))),
            Ok(Ok(_))
        );
        self.record(raised, message.into(), "assertRaises", self.current_file())
    }

    pub fn pass(&self, message: impl Into<Message>) -> bool {
        self.assert(true, message)
    }

    pub fn fail(&self, message: impl Into<Message>) -> bool {
        self.assert(false, message)
    }

    // === Driver-backed assertions ===

    pub fn assert_exists(&self, selector: &str, message: impl Into<Message>) -> bool {
        self.assert(self.driver.exists(selector), message)
    }

    pub fn assert_title(&self, expected: &str, message: impl Into<Message>) -> bool {
        self.assert_equals(
            &Value::from(self.driver.title()),
            &Value::from(expected),
            message,
        )
    }

    pub fn assert_url_match(&self, pattern: &Regex, message: impl Into<Message>) -> bool {
        self.assert_match(&self.driver.current_url(), pattern, message)
    }

    pub fn assert_text_exists(&self, text: &str, message: impl Into<Message>) -> bool {
        self.assert(self.driver.page_content().contains(text), message)
    }

    pub fn assert_resource_exists(&self, pattern: &str, message: impl Into<Message>) -> bool {
        self.assert(self.driver.resource_exists(pattern), message)
    }

    /// Assert that `expression` evaluates to `true`
    pub fn assert_eval(&self, expression: &str, message: impl Into<Message>) -> Result<bool> {
        let value = self.driver.evaluate(expression)?;
        Ok(self.assert(value.is_true(), message))
    }

    pub fn assert_eval_equals(
        &self,
        expression: &str,
        expected: &Value,
        message: impl Into<Message>,
    ) -> Result<bool> {
        let value = self.driver.evaluate(expression)?;
        Ok(self.assert_equals(&value, expected, message))
    }

    /// Assert the refined type of `value`
    pub fn assert_type(&self, value: &Value, type_name: &str, message: impl Into<Message>) -> bool {
        self.assert_equals(&Value::from(value.type_name()), &Value::from(type_name), message)
    }

    // === Output ===

    pub fn comment(&self, text: &str) {
        self.driver.echo(&format!("# {}", text), Some(Style::Comment));
    }

    pub fn info(&self, text: &str) {
        self.driver.echo(text, Some(Style::Parameter));
    }

    pub fn error(&self, text: &str) {
        self.driver.echo(text, Some(Style::Error));
    }

    /// Print a full-width banner
    pub fn bar(&self, text: &str, style: Style) {
        self.driver.echo(&fill_blanks(text), Some(style));
    }

    pub fn colorize(&self, text: &str, style: Style) -> String {
        self.driver.colorize(text, style)
    }

    /// Highlight a leading `name(args)` call in an assertion message
    pub fn format_message(&self, message: &str) -> String {
        static CALL: OnceLock<Regex> = OnceLock::new();
        let call = CALL.get_or_init(|| {
            Regex::new(r"(?i)^([a-z0-9_.]+\(.*?\))(.*)$").expect("call pattern is valid")
        });
        match call.captures(message) {
            Some(parts) => format!("{}{}", self.colorize(&parts[1], Style::Parameter), &parts[2]),
            None => message.to_string(),
        }
    }

    fn record(
        &self,
        condition: bool,
        message: Message,
        kind: &str,
        file: Option<PathBuf>,
    ) -> bool {
        let suite = file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let text = message.to_string();

        let (status, style) = if condition {
            self.results.borrow_mut().passed += 1;
            self.exporter.borrow_mut().add_success(&suite, &text);
            (&self.options.pass_text, Style::Info)
        } else {
            {
                let mut results = self.results.borrow_mut();
                results.failed += 1;
                results.failures.push(FailureRecord {
                    message: message.clone(),
                    file: file.clone(),
                });
            }
            self.exporter
                .borrow_mut()
                .add_failure(&suite, &text, message.detail(), kind);
            (&self.options.fail_text, Style::RedBar)
        };

        tracing::debug!(passed = condition, kind, suite = %suite, "{}", text);

        let event = if condition {
            TestEvent::Success { message, file }
        } else {
            TestEvent::Fail { message, file }
        };
        self.emit(event);

        self.driver.echo(
            &format!("{} {}", self.colorize(status, style), self.format_message(&text)),
            None,
        );
        condition
    }
}

/// Pad `text` with spaces up to the banner width
pub fn fill_blanks(text: &str) -> String {
    format!("{:<width$}", text, width = BAR_WIDTH)
}
