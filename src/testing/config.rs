//! Suite file format
//!
//! Defines the data structures for deserializing YAML suites.

use serde::Deserialize;

use super::value::Value;

/// A suite loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct Suite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    pub description: Option<String>,
    /// The sequence of steps to execute
    pub steps: Vec<SuiteStep>,
}

/// A single step of a suite
///
/// Every assertion step takes an optional `message`; a default one is
/// derived from the step's arguments when it is missing.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SuiteStep {
    /// Navigate to a URL
    Open { url: String },
    /// Sleep for a while
    Wait { ms: u64 },
    /// Print a line
    Echo { text: String },
    /// Print a comment line
    Comment { text: String },
    /// An element matching the selector exists
    AssertExists {
        selector: String,
        message: Option<String>,
    },
    /// The page title equals `expected`
    AssertTitle {
        expected: String,
        message: Option<String>,
    },
    /// The current URL matches a regular expression
    AssertUrlMatch {
        pattern: String,
        message: Option<String>,
    },
    /// The page text contains `text`
    AssertTextExists {
        text: String,
        message: Option<String>,
    },
    /// A loaded resource URL contains `pattern`
    AssertResourceExists {
        pattern: String,
        message: Option<String>,
    },
    /// The expression evaluates to `true`
    AssertEval {
        expression: String,
        message: Option<String>,
    },
    /// The expression does not evaluate to `true`
    AssertNot {
        expression: String,
        message: Option<String>,
    },
    /// The expression evaluates to a value equal to `expected`
    AssertEvalEquals {
        expression: String,
        expected: Value,
        message: Option<String>,
    },
    /// Two literal values are equal
    AssertEquals {
        actual: Value,
        expected: Value,
        message: Option<String>,
    },
    /// A literal subject matches a regular expression
    AssertMatch {
        subject: String,
        pattern: String,
        message: Option<String>,
    },
    /// The expression evaluates to a value of the given type
    AssertType {
        expression: String,
        #[serde(rename = "type")]
        type_name: String,
        message: Option<String>,
    },
    /// Evaluating the expression fails
    AssertRaises {
        expression: String,
        message: Option<String>,
    },
    /// Record a passing assertion
    Pass { message: String },
    /// Record a failing assertion
    Fail { message: String },
    /// Signal that the suite is complete
    Done,
}
