//! Suite execution host
//!
//! A host receives the contents of one suite file and a [`SuiteHandle`],
//! which is all the suite gets to see of the engine: the driver and the
//! assertion API. `execute` returns as soon as the suite is under way; the
//! suite later calls [`Tester::done`] on its own.

use std::any::Any;
use std::rc::Rc;
use std::time::Duration;

use regex::Regex;

use super::config::{Suite, SuiteStep};
use super::tester::Tester;
use super::value::Value;
use crate::common::{Error, Result};
use crate::driver::Driver;

/// The single capability injected into a running suite
#[derive(Clone)]
pub struct SuiteHandle {
    driver: Rc<dyn Driver>,
    tester: Rc<Tester>,
}

impl SuiteHandle {
    pub(crate) fn new(driver: Rc<dyn Driver>, tester: Rc<Tester>) -> Self {
        Self { driver, tester }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Assertion API
    pub fn test(&self) -> &Tester {
        &self.tester
    }
}

/// Executes the contents of a suite file
pub trait SuiteHost {
    /// Start executing `source`
    ///
    /// An `Err` is contained by the scheduler: it is recorded as one failed
    /// assertion and the suite is considered done.
    fn execute(&self, source: &str, handle: SuiteHandle) -> Result<()>;
}

/// Host for YAML suites
///
/// Steps run in order on a local task. A failing or panicking step is
/// reported through the driver's step-error channel and the remaining steps
/// are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScenarioHost;

impl SuiteHost for ScenarioHost {
    fn execute(&self, source: &str, handle: SuiteHandle) -> Result<()> {
        let suite: Suite = serde_yaml::from_str(source)?;

        handle.test().info(&format!("# {}", suite.name));
        if let Some(desc) = &suite.description {
            handle.test().comment(desc);
        }
        tracing::debug!(suite = %suite.name, steps = suite.steps.len(), "Executing suite");

        let driver = handle.driver.clone();
        let steps = tokio::task::spawn_local(run_steps(suite.steps, handle));
        tokio::task::spawn_local(async move {
            if let Err(e) = steps.await {
                if e.is_panic() {
                    let reason = panic_message(e.into_panic().as_ref());
                    tracing::debug!(reason = %reason, "Suite step panicked");
                    driver.step_failed(Error::SuitePanicked(reason));
                }
            }
        });
        Ok(())
    }
}

/// Text carried by a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn run_steps(steps: Vec<SuiteStep>, handle: SuiteHandle) {
    for (i, step) in steps.iter().enumerate() {
        match execute_step(&handle, step).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Done) => {
                handle.test().done();
                return;
            }
            Err(e) => {
                tracing::debug!(step = i + 1, error = %e, "Step failed");
                handle.driver().step_failed(e);
                return;
            }
        }
    }
}

enum Flow {
    Continue,
    Done,
}

/// Execute a single step
async fn execute_step(handle: &SuiteHandle, step: &SuiteStep) -> Result<Flow> {
    let test = handle.test();
    let driver = handle.driver();

    match step {
        SuiteStep::Open { url } => driver.open(url).await?,
        SuiteStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        SuiteStep::Echo { text } => driver.echo(text, None),
        SuiteStep::Comment { text } => test.comment(text),
        SuiteStep::AssertExists { selector, message } => {
            test.assert_exists(
                selector,
                message_or(message, || format!("Find an element matching: {}", selector)),
            );
        }
        SuiteStep::AssertTitle { expected, message } => {
            test.assert_title(
                expected,
                message_or(message, || format!("Page title is: \"{}\"", expected)),
            );
        }
        SuiteStep::AssertUrlMatch { pattern, message } => {
            let regex = Regex::new(pattern)?;
            test.assert_url_match(
                &regex,
                message_or(message, || format!("Current url matches: {}", pattern)),
            );
        }
        SuiteStep::AssertTextExists { text, message } => {
            test.assert_text_exists(
                text,
                message_or(message, || format!("Find \"{}\" within the page", text)),
            );
        }
        SuiteStep::AssertResourceExists { pattern, message } => {
            test.assert_resource_exists(
                pattern,
                message_or(message, || format!("Resource was loaded: {}", pattern)),
            );
        }
        SuiteStep::AssertEval {
            expression,
            message,
        } => {
            test.assert_eval(
                expression,
                message_or(message, || format!("{} is true", expression)),
            )?;
        }
        SuiteStep::AssertNot {
            expression,
            message,
        } => {
            let value = driver.evaluate(expression)?;
            test.assert_not(
                value.is_true(),
                message_or(message, || format!("{} is not true", expression)),
            );
        }
        SuiteStep::AssertEvalEquals {
            expression,
            expected,
            message,
        } => {
            test.assert_eval_equals(
                expression,
                expected,
                message_or(message, || {
                    format!("{} equals {}", expression, expected.serialize_to_string())
                }),
            )?;
        }
        SuiteStep::AssertEquals {
            actual,
            expected,
            message,
        } => {
            test.assert_equals(
                actual,
                expected,
                message_or(message, || {
                    format!(
                        "{} equals {}",
                        actual.serialize_to_string(),
                        expected.serialize_to_string()
                    )
                }),
            );
        }
        SuiteStep::AssertMatch {
            subject,
            pattern,
            message,
        } => {
            let regex = Regex::new(pattern)?;
            test.assert_match(
                subject,
                &regex,
                message_or(message, || format!("\"{}\" matches {}", subject, pattern)),
            );
        }
        SuiteStep::AssertType {
            expression,
            type_name,
            message,
        } => {
            let value = driver.evaluate(expression)?;
            test.assert_type(
                &value,
                type_name,
                message_or(message, || format!("{} is of type {}", expression, type_name)),
            );
        }
        SuiteStep::AssertRaises {
            expression,
            message,
        } => {
            test.assert_raises(
                |expr: &str| -> Result<Value> { driver.evaluate(expr) },
                expression.as_str(),
                message_or(message, || format!("Evaluating {} raises", expression)),
            );
        }
        SuiteStep::Pass { message } => {
            test.pass(message);
        }
        SuiteStep::Fail { message } => {
            test.fail(message);
        }
        SuiteStep::Done => return Ok(Flow::Done),
    }

    Ok(Flow::Continue)
}

fn message_or(message: &Option<String>, default: impl FnOnce() -> String) -> String {
    message.clone().unwrap_or_else(default)
}
