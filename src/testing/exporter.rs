//! Machine-readable reports
//!
//! The tester forwards every assertion outcome to an [`Exporter`]; the
//! reporter asks it for the serialized text when a save path is set.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::common::{Error, Result};

/// Accumulates per-assertion records
pub trait Exporter {
    fn add_success(&mut self, suite: &str, message: &str);
    fn add_failure(&mut self, suite: &str, message: &str, detail: &str, kind: &str);
    /// Serialized report text
    fn serialize(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
struct TestCase {
    suite: String,
    name: String,
    failure: Option<Failure>,
}

#[derive(Debug, Clone)]
struct Failure {
    detail: String,
    kind: String,
}

/// xUnit XML exporter
#[derive(Debug, Default, Clone)]
pub struct XunitExporter {
    cases: Vec<TestCase>,
}

impl XunitExporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Exporter for XunitExporter {
    fn add_success(&mut self, suite: &str, message: &str) {
        self.cases.push(TestCase {
            suite: suite.to_string(),
            name: message.to_string(),
            failure: None,
        });
    }

    fn add_failure(&mut self, suite: &str, message: &str, detail: &str, kind: &str) {
        self.cases.push(TestCase {
            suite: suite.to_string(),
            name: message.to_string(),
            failure: Some(Failure {
                detail: detail.to_string(),
                kind: kind.to_string(),
            }),
        });
    }

    fn serialize(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        let failures = self.cases.iter().filter(|c| c.failure.is_some()).count();
        let tests = self.cases.len().to_string();
        let failures = failures.to_string();

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(
            &mut writer,
            Event::Start(BytesStart::new("testsuite").with_attributes([
                ("name", "webtest"),
                ("tests", tests.as_str()),
                ("failures", failures.as_str()),
            ])),
        )?;

        for case in &self.cases {
            let start = BytesStart::new("testcase").with_attributes([
                ("classname", case.suite.as_str()),
                ("name", case.name.as_str()),
            ]);
            match &case.failure {
                None => write(&mut writer, Event::Empty(start))?,
                Some(failure) => {
                    write(&mut writer, Event::Start(start))?;
                    write(
                        &mut writer,
                        Event::Start(
                            BytesStart::new("failure").with_attributes([("type", failure.kind.as_str())]),
                        ),
                    )?;
                    write(&mut writer, Event::Text(BytesText::new(&failure.detail)))?;
                    write(&mut writer, Event::End(BytesEnd::new("failure")))?;
                    write(&mut writer, Event::End(BytesEnd::new("testcase")))?;
                }
            }
        }

        write(&mut writer, Event::End(BytesEnd::new("testsuite")))?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| Error::ReportSerialize(e.to_string()))
    }
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::ReportSerialize(e.to_string()))
}
