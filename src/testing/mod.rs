//! Suite runner and assertion engine
//!
//! Suites are discovered on disk, executed one at a time by the
//! [`Scheduler`], and make their assertions through the [`Tester`]. Each
//! suite decides on its own when it is finished by calling
//! [`Tester::done`]; only then does the next one start.

mod config;
mod discovery;
mod equality;
mod events;
mod exporter;
mod host;
#[cfg(test)]
mod memory_fs;
mod reporter;
mod scheduler;
mod tester;
mod value;

pub use config::{Suite, SuiteStep};
pub use discovery::{is_suite_file, resolve, FileSystem, LocalFs, SUITE_EXTENSIONS};
pub use equality::equals;
pub use events::{Emitter, Listener, TestEvent};
pub use exporter::{Exporter, XunitExporter};
pub use host::{ScenarioHost, SuiteHandle, SuiteHost};
pub use reporter::{render_results, RunSummary};
pub use scheduler::{Phase, Scheduler};
pub use tester::{fill_blanks, FailureRecord, Message, TestResults, Tester};
pub use value::Value;
