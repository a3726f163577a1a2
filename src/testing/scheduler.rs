//! Sequential suite scheduler
//!
//! Suites do their work out of band, on local tasks the scheduler never
//! sees. The scheduler only learns that a suite finished when it calls
//! `done()`. Until then it keeps checking, on a fixed interval and whenever
//! a completion is signalled, and never starts the next suite.
//!
//! There is no timeout: a suite that never signals completion stalls the run.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tokio::task::LocalSet;
use tokio::time::MissedTickBehavior;

use super::discovery::{self, is_suite_file};
use super::events::TestEvent;
use super::host::{panic_message, ScenarioHost, SuiteHandle, SuiteHost};
use super::reporter::RunSummary;
use super::tester::Tester;
use crate::common::{Error, Result};
use crate::driver::{Driver, Style};

/// Where the scheduler is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No suite is executing
    Idle,
    /// A suite is executing and has not signalled completion
    Running,
    /// The queue is exhausted and the report was rendered
    Finished,
}

/// Queue of resolved suite files and the position in it
#[derive(Debug, Default)]
struct SchedulerState {
    queue: Vec<PathBuf>,
    cursor: usize,
    finished: bool,
}

/// Runs suites one at a time, in discovery order
pub struct Scheduler {
    tester: Rc<Tester>,
    driver: Rc<dyn Driver>,
    host: Rc<dyn SuiteHost>,
    state: RefCell<SchedulerState>,
}

impl Scheduler {
    /// Create a scheduler running YAML suites
    ///
    /// Suites are discovered and read through the tester's filesystem, the
    /// one its report is saved to.
    ///
    /// Step failures reported by `driver` are recorded against the running
    /// suite, which is then considered done.
    pub fn new(tester: Rc<Tester>, driver: Rc<dyn Driver>) -> Self {
        let weak = Rc::downgrade(&tester);
        driver.on_step_error(Box::new(move |error: &Error| {
            if let Some(tester) = weak.upgrade() {
                let file = tester.current_file();
                tester.uncaught_error(error, file.as_deref());
                tester.done();
            }
        }));

        Self {
            tester,
            driver,
            host: Rc::new(ScenarioHost),
            state: RefCell::new(SchedulerState::default()),
        }
    }

    pub fn with_host(mut self, host: Rc<dyn SuiteHost>) -> Self {
        self.host = host;
        self
    }

    pub fn tester(&self) -> &Rc<Tester> {
        &self.tester
    }

    pub fn phase(&self) -> Phase {
        if self.state.borrow().finished {
            Phase::Finished
        } else if self.tester.is_running() {
            Phase::Running
        } else {
            Phase::Idle
        }
    }

    /// Discover and run every suite under `paths`, then render the results
    ///
    /// Fails before scheduling anything when no path is given or when
    /// discovery finds no suite file. In the latter case a banner is printed
    /// and the driver is asked to exit with status 1.
    pub async fn run_suites<P: AsRef<Path>>(&self, paths: &[P]) -> Result<RunSummary> {
        if paths.is_empty() {
            return Err(Error::NoSuitesProvided);
        }

        let resolved = discovery::resolve(self.tester.fs(), paths, |missing| {
            self.tester.bar(
                &format!("Path {} doesn't exist", missing.display()),
                Style::RedBar,
            );
        });
        let files = match resolved {
            Ok(files) => files,
            Err(e @ Error::NoTestsFound { .. }) => {
                self.tester.bar(&format!("{}.", e), Style::RedBar);
                self.driver.exit(1);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(suites = files.len(), "Starting run");
        *self.state.borrow_mut() = SchedulerState {
            queue: files,
            cursor: 0,
            finished: false,
        };

        LocalSet::new().run_until(self.drive()).await
    }

    async fn drive(&self) -> Result<RunSummary> {
        let mut ticker = tokio::time::interval(self.tester.options().poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.tester.completed() => {}
            }
            if let Some(summary) = self.check() {
                return Ok(summary);
            }
        }
    }

    /// One scheduler check
    ///
    /// Starts the next suite when idle, finishes the run when the queue is
    /// exhausted, and does nothing while a suite is running.
    fn check(&self) -> Option<RunSummary> {
        if self.tester.is_running() {
            return None;
        }

        let next = {
            let mut state = self.state.borrow_mut();
            if state.cursor == state.queue.len() {
                state.finished = true;
                None
            } else {
                let file = state.queue[state.cursor].clone();
                state.cursor += 1;
                Some(file)
            }
        };

        match next {
            Some(file) => {
                self.run_test(&file);
                None
            }
            None => {
                self.tester.emit(TestEvent::Complete);
                let status = if self.tester.results().failed > 0 { 1 } else { 0 };
                Some(self.tester.render_results(true, status, None))
            }
        }
    }

    /// Announce and execute one suite
    ///
    /// Whatever escapes the suite becomes a single failed assertion, after
    /// which the suite counts as done.
    fn run_test(&self, file: &Path) {
        self.tester
            .bar(&format!("Test file: {}", file.display()), Style::InfoBar);
        tracing::info!(file = %file.display(), "Running suite");
        self.tester.start(file);

        if let Err(e) = self.exec(file) {
            self.tester.uncaught_error(&e, Some(file));
            self.tester.done();
        }
    }

    fn exec(&self, file: &Path) -> Result<()> {
        let fs = self.tester.fs();
        if !fs.is_file(file) || !is_suite_file(file) {
            return Err(Error::UnsupportedFileKind(file.to_path_buf()));
        }
        let source = fs.read(file)?;
        let handle = SuiteHandle::new(self.driver.clone(), self.tester.clone());

        panic::catch_unwind(AssertUnwindSafe(|| self.host.execute(&source, handle)))
            .unwrap_or_else(|payload| Err(Error::SuitePanicked(panic_message(payload.as_ref()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::TesterOptions;
    use crate::driver::{FixtureDriver, Site, StepErrorListener};
    use crate::testing::memory_fs::MemoryFs;
    use crate::testing::Value;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Host whose suite source is a delay in milliseconds, or a failure mode
    struct RecordingHost {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl SuiteHost for RecordingHost {
        fn execute(&self, source: &str, handle: SuiteHandle) -> Result<()> {
            let name = handle
                .test()
                .current_file()
                .and_then(|f| f.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_default();
            match source.trim() {
                "crash" => return Err(Error::evaluation("suite()", "exploded")),
                "panic" => panic!("suite panicked hard"),
                "hang" => {
                    self.log.borrow_mut().push(format!("start {name}"));
                    return Ok(());
                }
                _ => {}
            }

            let delay: u64 = source.trim().parse().unwrap_or(0);
            let log = self.log.clone();
            log.borrow_mut().push(format!("start {name}"));
            tokio::task::spawn_local(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                handle.test().pass(format!("{name} ran"));
                log.borrow_mut().push(format!("end {name}"));
                handle.test().done();
            });
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        driver: Rc<FixtureDriver>,
        scheduler: Scheduler,
        log: Rc<RefCell<Vec<String>>>,
    }

    fn fixture(suites: &[(&str, &str)]) -> Fixture {
        fixture_with_site(suites, Site::default(), false)
    }

    fn fixture_with_site(suites: &[(&str, &str)], site: Site, scenarios: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        for (name, source) in suites {
            std::fs::write(root.join(name), source).unwrap();
        }

        let driver = Rc::new(FixtureDriver::capturing(site));
        let options = TesterOptions {
            poll_interval_ms: 5,
            ..TesterOptions::default()
        };
        let tester = Rc::new(Tester::new(driver.clone(), options));
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::new(tester, driver.clone());
        if !scenarios {
            scheduler = scheduler.with_host(Rc::new(RecordingHost { log: log.clone() }));
        }

        Fixture {
            _dir: dir,
            root,
            driver,
            scheduler,
            log,
        }
    }

    fn trimmed(lines: Vec<String>) -> Vec<String> {
        lines.into_iter().map(|l| l.trim_end().to_string()).collect()
    }

    #[tokio::test]
    async fn test_suites_run_sequentially_in_order() {
        let fx = fixture(&[("a.yaml", "30"), ("b.yaml", "0"), ("c.yaml", "10")]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        fx.scheduler.tester().on(move |event| match event {
            TestEvent::SuiteStarted { .. } => sink.borrow_mut().push("started"),
            TestEvent::SuiteDone { .. } => sink.borrow_mut().push("done"),
            TestEvent::Complete => sink.borrow_mut().push("complete"),
            _ => {}
        });

        let summary = fx.scheduler.run_suites(&[&fx.root]).await.unwrap();

        assert_eq!(
            *fx.log.borrow(),
            vec!["start a", "end a", "start b", "end b", "start c", "end c"]
        );
        assert_eq!(
            *events.borrow(),
            vec!["started", "done", "started", "done", "started", "done", "complete"]
        );
        assert_eq!(
            summary,
            RunSummary {
                passed: 3,
                failed: 0,
                status: 0
            }
        );
        assert_eq!(fx.scheduler.phase(), Phase::Finished);
        assert_eq!(fx.driver.exit_status(), Some(0));

        let lines = trimmed(fx.driver.captured());
        assert!(lines[0].starts_with("Test file: "));
        assert!(lines[0].ends_with("a.yaml"));
        assert_eq!(
            lines.last().unwrap(),
            "PASS 3 tests executed, 3 passed, 0 failed."
        );
    }

    #[tokio::test]
    async fn test_crashing_suites_do_not_stop_the_run() {
        let fx = fixture(&[
            ("a.yaml", "5"),
            ("b.yaml", "crash"),
            ("c.yaml", "panic"),
            ("d.yaml", "5"),
        ]);

        let summary = fx.scheduler.run_suites(&[&fx.root]).await.unwrap();

        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.status, 1);
        assert_eq!(*fx.log.borrow(), vec!["start a", "end a", "start d", "end d"]);

        let results = fx.scheduler.tester().results();
        assert_eq!(results.failures.len(), 2);
        assert!(results.failures[0].file.as_ref().unwrap().ends_with("b.yaml"));
        assert_eq!(
            results.failures[0].message.to_string(),
            "Evaluation of 'suite()' failed: exploded"
        );
        assert!(results.failures[1].file.as_ref().unwrap().ends_with("c.yaml"));
        assert_eq!(
            results.failures[1].message.to_string(),
            "Suite panicked: suite panicked hard"
        );
        assert_eq!(fx.driver.exit_status(), Some(1));
    }

    #[tokio::test]
    async fn test_unsupported_file_counts_as_one_failure() {
        let fx = fixture(&[("a.yaml", "0"), ("notes.txt", "0")]);
        let notes = fx.root.join("notes.txt");
        let suite = fx.root.join("a.yaml");

        let summary = fx.scheduler.run_suites(&[&notes, &suite]).await.unwrap();

        assert_eq!((summary.passed, summary.failed), (1, 1));
        let failure = &fx.scheduler.tester().results().failures[0];
        assert_eq!(failure.file.as_deref(), Some(notes.as_path()));
        assert!(failure.message.to_string().starts_with("Can only exec()"));
    }

    #[tokio::test]
    async fn test_step_errors_fail_the_running_suite_only() {
        let site: Site = serde_yaml::from_str(
            r#"
            pages:
              "http://localhost/":
                title: Home
                delay_ms: 5
            "#,
        )
        .unwrap();
        let fx = fixture_with_site(
            &[
                (
                    "a.yaml",
                    r#"
                    name: broken navigation
                    steps:
                      - action: open
                        url: http://localhost/404
                      - action: done
                    "#,
                ),
                (
                    "b.yaml",
                    r#"
                    name: home
                    steps:
                      - action: open
                        url: http://localhost/
                      - action: assert_title
                        expected: Home
                      - action: done
                    "#,
                ),
            ],
            site,
            true,
        );

        let summary = fx.scheduler.run_suites(&[&fx.root]).await.unwrap();

        assert_eq!((summary.passed, summary.failed), (1, 1));
        let results = fx.scheduler.tester().results();
        assert!(results.failures[0].file.as_ref().unwrap().ends_with("a.yaml"));
        assert_eq!(
            results.failures[0].message.to_string(),
            "Unable to open http://localhost/404: no such page"
        );

        let lines = trimmed(fx.driver.captured());
        assert!(lines.iter().any(|l| l.ends_with("a.yaml:")));
        assert_eq!(lines.last().unwrap(), "    Unable to open http://localhost/404: no such page");
    }

    #[tokio::test]
    async fn test_no_paths_is_rejected_before_scheduling() {
        let fx = fixture(&[]);
        let err = fx.scheduler.run_suites::<&str>(&[]).await.unwrap_err();
        assert!(matches!(err, Error::NoSuitesProvided));
        assert!(fx.driver.captured().is_empty());
        assert_eq!(fx.driver.exit_status(), None);
    }

    #[tokio::test]
    async fn test_no_tests_found_banner_and_exit() {
        let fx = fixture(&[("readme.md", "")]);
        let missing = fx.root.join("gone");

        let err = fx
            .scheduler
            .run_suites(&[&fx.root, &missing])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoTestsFound { .. }));
        let lines = trimmed(fx.driver.captured());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("Path {} doesn't exist", missing.display()));
        assert!(lines[1].starts_with("No test file found in ["));
        assert!(lines[1].ends_with("aborting."));
        assert_eq!(fx.driver.exit_status(), Some(1));
        assert!(fx.log.borrow().is_empty());
        assert_eq!(fx.scheduler.tester().results().total(), 0);
    }

    #[tokio::test]
    async fn test_suite_that_never_completes_blocks_the_run() {
        let fx = fixture(&[("a.yaml", "hang"), ("b.yaml", "0")]);

        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            fx.scheduler.run_suites(&[&fx.root]),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(*fx.log.borrow(), vec!["start a"]);
        assert_eq!(fx.scheduler.phase(), Phase::Running);
        assert_eq!(fx.driver.exit_status(), None);
    }

    /// Fixture driver whose element lookups blow up
    struct PanickingLookups(FixtureDriver);

    #[async_trait(?Send)]
    impl Driver for PanickingLookups {
        async fn open(&self, url: &str) -> Result<()> {
            self.0.open(url).await
        }
        fn exists(&self, selector: &str) -> bool {
            panic!("lookup of {selector} crashed")
        }
        fn evaluate(&self, expression: &str) -> Result<Value> {
            self.0.evaluate(expression)
        }
        fn title(&self) -> String {
            self.0.title()
        }
        fn current_url(&self) -> String {
            self.0.current_url()
        }
        fn page_content(&self) -> String {
            self.0.page_content()
        }
        fn resource_exists(&self, pattern: &str) -> bool {
            self.0.resource_exists(pattern)
        }
        fn echo(&self, text: &str, style: Option<Style>) {
            self.0.echo(text, style)
        }
        fn colorize(&self, text: &str, style: Style) -> String {
            self.0.colorize(text, style)
        }
        fn exit(&self, status: i32) {
            self.0.exit(status)
        }
        fn on_step_error(&self, listener: StepErrorListener) {
            self.0.on_step_error(listener)
        }
        fn step_failed(&self, error: Error) {
            self.0.step_failed(error)
        }
    }

    #[tokio::test]
    async fn test_panicking_step_fails_its_suite_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "name: a\nsteps:\n  - action: assert_exists\n    selector: \"#cart\"\n  - action: done\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\nsteps:\n  - action: pass\n    message: b ran\n  - action: done\n",
        )
        .unwrap();

        let driver = Rc::new(PanickingLookups(FixtureDriver::capturing(Site::default())));
        let options = TesterOptions {
            poll_interval_ms: 5,
            ..TesterOptions::default()
        };
        let tester = Rc::new(Tester::new(driver.clone(), options));
        let scheduler = Scheduler::new(tester, driver.clone());

        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.run_suites(&[dir.path()]),
        )
        .await
        .expect("run finished")
        .unwrap();

        assert_eq!((summary.passed, summary.failed), (1, 1));
        let results = scheduler.tester().results();
        assert!(results.failures[0].file.as_ref().unwrap().ends_with("a.yaml"));
        assert_eq!(
            results.failures[0].message.to_string(),
            "Suite panicked: lookup of #cart crashed"
        );
        assert_eq!(scheduler.phase(), Phase::Finished);
        assert_eq!(driver.0.exit_status(), Some(1));
    }

    #[tokio::test]
    async fn test_discovery_and_report_share_the_tester_filesystem() {
        let fs = Rc::new(
            MemoryFs::default()
                .dir("/suites", &["one.yaml", "two.yaml"])
                .file_with("/suites/one.yaml", "0")
                .file_with("/suites/two.yaml", "0"),
        );
        let driver = Rc::new(FixtureDriver::capturing(Site::default()));
        let options = TesterOptions {
            poll_interval_ms: 5,
            save: Some(PathBuf::from("/reports/run.xml")),
            ..TesterOptions::default()
        };
        let tester =
            Rc::new(Tester::new(driver.clone(), options).with_filesystem(fs.clone()));
        let log = Rc::new(RefCell::new(Vec::new()));
        let scheduler = Scheduler::new(tester, driver.clone())
            .with_host(Rc::new(RecordingHost { log: log.clone() }));

        let summary = scheduler.run_suites(&["/suites"]).await.unwrap();

        assert_eq!((summary.passed, summary.failed), (2, 0));
        assert_eq!(*log.borrow(), vec!["start one", "end one", "start two", "end two"]);
        let report = fs.written("/reports/run.xml").expect("report stored in memory");
        assert!(report.contains(r#"tests="2" failures="0""#));
        assert_eq!(
            driver.captured().last().unwrap(),
            "Result log stored in /reports/run.xml"
        );
    }
}
