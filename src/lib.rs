//! webtest - sequential suite runner and assertion engine
//!
//! This library discovers suite files, runs them one after the other
//! against an automation driver, records every assertion and renders a
//! console summary plus an optional xUnit report.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{equals, Scheduler, Tester, Value};
