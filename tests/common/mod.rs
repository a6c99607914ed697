//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use suitekit::reporter::Event;
use suitekit::styles::FunSpec;
use suitekit::{tag_set, DynaTags, Filter, Suite};

/// Compact, duration-free rendering of an event stream.
pub fn shape(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            Event::RunStarting { expected_test_count } => format!("run {}", expected_test_count),
            Event::RunCompleted { summary } => format!("done {}/{}", summary.succeeded, summary.failed),
            Event::SuiteStarting { suite_name, .. } => format!("suite {}", suite_name),
            Event::SuiteCompleted { suite_name, .. } => format!("end {}", suite_name),
            Event::SuiteAborted { suite_name, .. } => format!("aborted {}", suite_name),
            Event::ScopeOpened { text, .. } => format!("+ {}", text),
            Event::ScopeClosed { text, .. } => format!("- {}", text),
            Event::InfoProvided { text, .. } => format!("info {}", text),
            Event::TestStarting { test_name, .. } => format!("start {}", test_name),
            Event::TestSucceeded { test_name, .. } => format!("ok {}", test_name),
            Event::TestFailed { test_name, .. } => format!("failed {}", test_name),
            Event::TestIgnored { test_name, .. } => format!("ignored {}", test_name),
            Event::TestPending { test_name, .. } => format!("pending {}", test_name),
            Event::TestCanceled { test_name, .. } => format!("canceled {}", test_name),
        })
        .collect()
}

pub fn filter(include: Option<&[&str]>, exclude: &[&str]) -> Filter {
    Filter::new(
        include.map(|tags| tag_set(tags.iter().copied())),
        tag_set(exclude.iter().copied()),
        true,
        DynaTags::empty(),
    )
    .expect("valid filter")
}

/// `A Stack` suite with fast, slow, ignored and pending tests.
pub fn stack_spec(name: &str) -> Arc<dyn Suite> {
    let spec = FunSpec::build(name, |s| {
        s.describe("A Stack", |s| {
            s.it("pops", &["Fast"], |_| Ok(()))?;
            s.describe("when full", |s| s.it("rejects pushes", &["Slow"], |_| Ok(())))?;
            s.ignore("peeks", &[], |_| Ok(()))?;
            s.pending("shrinks", &[])
        })
    })
    .expect("stack spec registers");
    Arc::new(spec)
}
