//! Executes suites: filters their tests, walks their scope trees and reports outcomes.
//!
//! # Phases per suite
//! 1. **Close registration**: `transition_to_run` on the suite's engine.
//! 2. **Filter**: suite-level tags are folded into each test, then `Filter::apply` decides
//!    which tests are kept and which of those are ignored.
//! 3. **Walk**: branches containing at least one kept test are bracketed with
//!    `ScopeOpened`/`ScopeClosed`; kept tests are reported in registration order.
//! 4. **Nested suites**: run after the suite's own tests when the filter includes them.
//!
//! In parallel mode each top-level suite runs on its own scoped thread against a buffering
//! reporter; the buffers are replayed in input order, so the event stream is the same as
//! in sequential mode.

use crate::errors::{Result, SuiteError};
use crate::filter::Filter;
use crate::reporter::{Event, RecordingReporter, Reporter, Summary};
use crate::scope::{TestEntry, Visit};
use crate::suite::{Suite, TestContext, TestFailure};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// Options of a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub parallel: bool,
}

/// Forwards events while counting them.
struct Tally<'a> {
    inner: &'a dyn Reporter,
    summary: Mutex<Summary>,
}

impl Reporter for Tally<'_> {
    fn apply(&self, event: &Event) {
        if let Ok(mut summary) = self.summary.lock() {
            summary.record(event);
        }
        self.inner.apply(event);
    }
}

/// A suite as handed to the runner: constructed, or failed during construction.
pub enum SuiteSlot {
    Ready(Arc<dyn Suite>),
    Aborted { name: String, error: SuiteError },
}

impl SuiteSlot {
    /// Wraps the outcome of a suite constructor.
    pub fn from_result(name: impl Into<String>, result: Result<Arc<dyn Suite>>) -> Self {
        match result {
            Ok(suite) => SuiteSlot::Ready(suite),
            Err(error) => SuiteSlot::Aborted {
                name: name.into(),
                error,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SuiteSlot::Ready(suite) => suite.suite_name(),
            SuiteSlot::Aborted { name, .. } => name,
        }
    }
}

/// Runs `suites` and everything nested in them, bracketed by `RunStarting`/`RunCompleted`.
pub fn run_suites(suites: &[Arc<dyn Suite>], filter: &Filter, reporter: &dyn Reporter, options: RunOptions) -> Summary {
    let slots: Vec<SuiteSlot> = suites.iter().cloned().map(SuiteSlot::Ready).collect();
    run_slots(&slots, filter, reporter, options)
}

/// Like [`run_suites`], reporting suites whose construction failed as aborted in their place.
pub fn run_slots(slots: &[SuiteSlot], filter: &Filter, reporter: &dyn Reporter, options: RunOptions) -> Summary {
    let expected_test_count = slots
        .iter()
        .map(|slot| match slot {
            SuiteSlot::Ready(suite) => expected_test_count(suite.as_ref(), filter),
            SuiteSlot::Aborted { .. } => 0,
        })
        .sum();
    let tally = Tally {
        inner: reporter,
        summary: Mutex::new(Summary::default()),
    };
    tally.apply(&Event::RunStarting { expected_test_count });

    if options.parallel && slots.len() > 1 {
        let buffers: Vec<RecordingReporter> = std::thread::scope(|scope| {
            let handles: Vec<_> = slots
                .iter()
                .map(|slot| {
                    scope.spawn(move || {
                        let buffer = RecordingReporter::new();
                        run_slot(slot, filter, &buffer);
                        buffer
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_default())
                .collect()
        });
        for buffer in buffers {
            for event in buffer.take() {
                tally.apply(&event);
            }
        }
    } else {
        for slot in slots {
            run_slot(slot, filter, &tally);
        }
    }

    let summary = tally.summary.lock().map(|s| *s).unwrap_or_default();
    tally.apply(&Event::RunCompleted { summary });
    summary
}

fn run_slot(slot: &SuiteSlot, filter: &Filter, reporter: &dyn Reporter) {
    match slot {
        SuiteSlot::Ready(suite) => run_suite(suite.as_ref(), filter, reporter),
        SuiteSlot::Aborted { name, error } => report_abort(reporter, name, name, error),
    }
}

/// Runs one suite and, when the filter asks for it, its nested suites.
pub fn run_suite(suite: &dyn Suite, filter: &Filter, reporter: &dyn Reporter) {
    let suite_id = suite.suite_id().to_string();
    let suite_name = suite.suite_name().to_string();
    let engine = suite.engine();
    engine.transition_to_run();

    let tags = filter.merge_test_dynamic_tags(&suite.test_tags(), suite);
    let kept: HashMap<String, bool> = match filter.apply(suite.test_names(), &tags, &suite_id) {
        Ok(kept) => kept.into_iter().collect(),
        Err(err) => {
            report_abort(reporter, &suite_id, &suite_name, &err);
            return;
        }
    };
    debug!(suite = %suite_id, kept = kept.len(), "suite starting");

    reporter.apply(&Event::SuiteStarting {
        suite_id: suite_id.clone(),
        suite_name: suite_name.clone(),
    });

    let tree = engine.scope_tree();
    let mut open: Vec<bool> = Vec::new();
    for visit in tree.walk() {
        let visible = open.last().copied().unwrap_or(true);
        match visit {
            Visit::Open(id, branch) => {
                let shown = visible && tree.any_test_below(id, &|e| kept.contains_key(&e.name));
                if shown {
                    reporter.apply(&Event::ScopeOpened {
                        suite_id: suite_id.clone(),
                        text: branch.description.clone(),
                    });
                }
                open.push(shown);
            }
            Visit::Close(_, branch) => {
                if open.pop().unwrap_or(false) {
                    reporter.apply(&Event::ScopeClosed {
                        suite_id: suite_id.clone(),
                        text: branch.description.clone(),
                    });
                }
            }
            Visit::Info(info) => {
                if visible {
                    reporter.apply(&Event::InfoProvided {
                        suite_id: suite_id.clone(),
                        test_name: None,
                        text: info.text.clone(),
                    });
                }
            }
            Visit::Test(entry) => match kept.get(&entry.name).copied() {
                Some(true) => reporter.apply(&Event::TestIgnored {
                    suite_id: suite_id.clone(),
                    test_name: entry.name.clone(),
                    test_text: entry.text.clone(),
                }),
                Some(false) => run_test(suite, entry, reporter),
                None => {}
            },
        }
    }

    reporter.apply(&Event::SuiteCompleted {
        suite_id: suite_id.clone(),
        suite_name,
    });

    if filter.include_nested_suites() {
        for nested in suite.nested_suites() {
            run_suite(nested.as_ref(), filter, reporter);
        }
    }
}

/// Number of tests a run of `suite` (nested suites included) will execute.
pub fn expected_test_count(suite: &dyn Suite, filter: &Filter) -> usize {
    let tags = filter.merge_test_dynamic_tags(&suite.test_tags(), suite);
    let own = filter
        .runnable_test_count(suite.test_names(), &tags, suite.suite_id())
        .unwrap_or(0);
    let nested: usize = if filter.include_nested_suites() {
        suite
            .nested_suites()
            .iter()
            .map(|s| expected_test_count(s.as_ref(), filter))
            .sum()
    } else {
        0
    };
    own + nested
}

/// Reports a suite that could not be constructed or run.
pub fn report_abort(reporter: &dyn Reporter, suite_id: &str, suite_name: &str, err: &SuiteError) {
    warn!(suite = suite_id, error = %err, "suite aborted");
    reporter.apply(&Event::SuiteAborted {
        suite_id: suite_id.to_string(),
        suite_name: suite_name.to_string(),
        message: err.to_string(),
        location: err.location(),
    });
}

fn run_test(suite: &dyn Suite, entry: &TestEntry, reporter: &dyn Reporter) {
    let suite_id = suite.suite_id();
    reporter.apply(&Event::TestStarting {
        suite_id: suite_id.to_string(),
        test_name: entry.name.clone(),
        test_text: entry.text.clone(),
    });

    let ctx = TestContext {
        suite_id,
        test_name: &entry.name,
        engine: suite.engine(),
        reporter,
    };
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| (entry.body)(&ctx)));
    let duration_ms = start.elapsed().as_millis() as u64;

    let failed = |message: String, location| Event::TestFailed {
        suite_id: suite_id.to_string(),
        test_name: entry.name.clone(),
        test_text: entry.text.clone(),
        message,
        location,
        duration_ms,
    };
    let event = match result {
        Ok(Ok(())) => Event::TestSucceeded {
            suite_id: suite_id.to_string(),
            test_name: entry.name.clone(),
            test_text: entry.text.clone(),
            duration_ms,
        },
        Ok(Err(TestFailure::Failed { message, location })) => failed(message, location.or(Some(entry.location))),
        Ok(Err(TestFailure::Registration(err))) => {
            let location = err.location();
            failed(err.to_string(), location)
        }
        Ok(Err(TestFailure::Pending)) => Event::TestPending {
            suite_id: suite_id.to_string(),
            test_name: entry.name.clone(),
            test_text: entry.text.clone(),
        },
        Ok(Err(TestFailure::Canceled { message })) => Event::TestCanceled {
            suite_id: suite_id.to_string(),
            test_name: entry.name.clone(),
            test_text: entry.text.clone(),
            message,
        },
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "test panicked".to_string()
            };
            failed(message, Some(entry.location))
        }
    };
    reporter.apply(&event);
}
