//! The suite abstraction consumed by the filter and the runner.

use crate::engine::{Engine, FreeNesting};
use crate::errors::{Location, SuiteError};
use crate::reporter::{Event, Reporter};
use crate::tags::{TagSet, TestTags};
use std::sync::Arc;

pub type TestResult = std::result::Result<(), TestFailure>;

/// A registered test body. Runs on whatever worker thread the runner picks.
pub type TestBody = Arc<dyn Fn(&TestContext<'_>) -> TestResult + Send + Sync>;

/// Why a test did not succeed.
#[derive(Debug)]
pub enum TestFailure {
    Failed {
        message: String,
        location: Option<Location>,
    },
    Pending,
    Canceled {
        message: String,
    },
    /// The body tried to register a test or scope after the run started (or otherwise
    /// broke a registration rule). Reported as a failure of the running test.
    Registration(SuiteError),
}

impl TestFailure {
    #[track_caller]
    pub fn failed(message: impl Into<String>) -> Self {
        TestFailure::Failed {
            message: message.into(),
            location: Some(Location::caller()),
        }
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        TestFailure::Canceled {
            message: message.into(),
        }
    }
}

impl From<SuiteError> for TestFailure {
    fn from(err: SuiteError) -> Self {
        TestFailure::Registration(err)
    }
}

/// Fails the current test unless `cond` holds.
#[track_caller]
pub fn ensure(cond: bool, message: impl Into<String>) -> TestResult {
    if cond {
        Ok(())
    } else {
        Err(TestFailure::failed(message))
    }
}

/// What a running test body can see.
pub struct TestContext<'a> {
    pub(crate) suite_id: &'a str,
    pub(crate) test_name: &'a str,
    pub(crate) engine: &'a Engine,
    pub(crate) reporter: &'a dyn Reporter,
}

impl<'a> TestContext<'a> {
    pub fn test_name(&self) -> &str {
        self.test_name
    }

    pub fn suite_id(&self) -> &str {
        self.suite_id
    }

    /// The engine of the suite being run. Registration through it fails: the suite is
    /// already in its run phase.
    pub fn engine(&self) -> &Engine {
        self.engine
    }

    /// Sends an informational message to the reporter, attributed to this test.
    pub fn info(&self, message: impl Into<String>) {
        self.reporter.apply(&Event::InfoProvided {
            suite_id: self.suite_id.to_string(),
            test_name: Some(self.test_name.to_string()),
            text: message.into(),
        });
    }
}

/// A collection of tests backed by a registration [`Engine`], optionally with nested suites.
pub trait Suite: Send + Sync {
    fn engine(&self) -> &Engine;

    fn suite_id(&self) -> &str {
        self.engine().suite_id()
    }

    fn suite_name(&self) -> &str {
        self.suite_id()
    }

    /// Tags that apply to the suite as a whole.
    fn suite_tags(&self) -> TagSet {
        TagSet::new()
    }

    fn nested_suites(&self) -> Vec<Arc<dyn Suite>> {
        Vec::new()
    }

    /// Registered test names, in registration order.
    fn test_names(&self) -> Vec<String> {
        self.engine().test_names().into_iter().collect()
    }

    fn test_tags(&self) -> TestTags {
        self.engine().test_tags()
    }
}

/// A suite that only groups other suites.
pub struct SuiteGroup {
    engine: Engine,
    name: String,
    suites: Vec<Arc<dyn Suite>>,
}

impl SuiteGroup {
    pub fn new(name: impl Into<String>, suites: Vec<Arc<dyn Suite>>) -> Self {
        let name = name.into();
        Self {
            engine: Engine::new(name.clone(), Arc::new(FreeNesting)),
            name,
            suites,
        }
    }
}

impl Suite for SuiteGroup {
    fn engine(&self) -> &Engine {
        &self.engine
    }

    fn suite_name(&self) -> &str {
        &self.name
    }

    fn nested_suites(&self) -> Vec<Arc<dyn Suite>> {
        self.suites.clone()
    }
}
