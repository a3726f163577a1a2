//! Offline driver backed by a declarative site description
//!
//! Pages are described in YAML, keyed by URL:
//!
//! ```yaml
//! pages:
//!   "http://localhost/":
//!     title: Home
//!     selectors: ["#main", "h1"]
//!     content: "Welcome home"
//!     resources: ["http://localhost/app.js"]
//!     eval:
//!       "document.title": Home
//!     delay_ms: 20
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{paint, Driver, StepErrorListener, Style};
use crate::common::{Error, Result};
use crate::testing::{Emitter, Value};

/// A set of pages the driver can navigate to
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Site {
    #[serde(default)]
    pub pages: BTreeMap<String, Page>,
}

/// One page of a site
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Page {
    #[serde(default)]
    pub title: String,
    /// Selectors that match at least one element
    #[serde(default)]
    pub selectors: Vec<String>,
    /// Text content of the page
    #[serde(default)]
    pub content: String,
    /// URLs of the resources loaded by the page
    #[serde(default)]
    pub resources: Vec<String>,
    /// Results of the expressions the page can evaluate
    #[serde(default)]
    pub eval: BTreeMap<String, Value>,
    /// Simulated load time
    #[serde(default)]
    pub delay_ms: u64,
}

impl Site {
    /// Load a site description from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid site file '{}': {}", path.display(), e))
        })
    }
}

enum Output {
    Stdout,
    Capture(RefCell<Vec<String>>),
}

/// Driver that serves pages from a [`Site`]
pub struct FixtureDriver {
    site: Site,
    current: RefCell<Option<(String, Page)>>,
    output: Output,
    exit_status: Cell<Option<i32>>,
    step_errors: Emitter<Error>,
}

impl FixtureDriver {
    /// Driver printing colorized output to stdout
    pub fn new(site: Site) -> Self {
        Self::with_output(site, Output::Stdout)
    }

    /// Driver recording plain output lines instead of printing them
    pub fn capturing(site: Site) -> Self {
        Self::with_output(site, Output::Capture(RefCell::new(Vec::new())))
    }

    fn with_output(site: Site, output: Output) -> Self {
        Self {
            site,
            current: RefCell::new(None),
            output,
            exit_status: Cell::new(None),
            step_errors: Emitter::new(),
        }
    }

    /// Lines echoed so far (capturing drivers only)
    pub fn captured(&self) -> Vec<String> {
        match &self.output {
            Output::Capture(lines) => lines.borrow().clone(),
            Output::Stdout => Vec::new(),
        }
    }

    /// Status passed to the last `exit` request
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status.get()
    }

    fn with_page<T>(&self, f: impl FnOnce(&Page) -> T) -> Option<T> {
        self.current.borrow().as_ref().map(|(_, page)| f(page))
    }
}

#[async_trait(?Send)]
impl Driver for FixtureDriver {
    async fn open(&self, url: &str) -> Result<()> {
        let page = self
            .site
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::navigation(url, "no such page"))?;

        if page.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(page.delay_ms)).await;
        }

        tracing::debug!(url, title = %page.title, "Page loaded");
        *self.current.borrow_mut() = Some((url.to_string(), page));
        Ok(())
    }

    fn exists(&self, selector: &str) -> bool {
        self.with_page(|page| page.selectors.iter().any(|s| s == selector))
            .unwrap_or(false)
    }

    fn evaluate(&self, expression: &str) -> Result<Value> {
        match self.with_page(|page| page.eval.get(expression).cloned()) {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(Error::evaluation(
                expression,
                "no result defined for this page",
            )),
            None => Err(Error::evaluation(expression, "no page loaded")),
        }
    }

    fn title(&self) -> String {
        self.with_page(|page| page.title.clone()).unwrap_or_default()
    }

    fn current_url(&self) -> String {
        self.current
            .borrow()
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_default()
    }

    fn page_content(&self) -> String {
        self.with_page(|page| page.content.clone())
            .unwrap_or_default()
    }

    fn resource_exists(&self, pattern: &str) -> bool {
        self.with_page(|page| page.resources.iter().any(|r| r.contains(pattern)))
            .unwrap_or(false)
    }

    fn echo(&self, text: &str, style: Option<Style>) {
        match &self.output {
            Output::Stdout => match style {
                Some(style) => println!("{}", paint(text, style)),
                None => println!("{}", text),
            },
            Output::Capture(lines) => lines.borrow_mut().push(text.to_string()),
        }
    }

    fn colorize(&self, text: &str, style: Style) -> String {
        match &self.output {
            Output::Stdout => paint(text, style).to_string(),
            Output::Capture(_) => text.to_string(),
        }
    }

    fn exit(&self, status: i32) {
        tracing::debug!(status, "Exit requested");
        self.exit_status.set(Some(status));
    }

    fn on_step_error(&self, listener: StepErrorListener) {
        self.step_errors.on(listener);
    }

    fn step_failed(&self, error: Error) {
        tracing::debug!(error = %error, "Step failed");
        self.step_errors.emit(&error);
    }
}
