//! Run events and the reporters that consume them.
//!
//! The runner describes everything that happens during a run as a stream of [`Event`]s.
//! Excluded tests never produce events; ignored tests produce exactly one `TestIgnored`.

use crate::errors::Location;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    RunStarting {
        expected_test_count: usize,
    },
    RunCompleted {
        summary: Summary,
    },
    SuiteStarting {
        suite_id: String,
        suite_name: String,
    },
    SuiteCompleted {
        suite_id: String,
        suite_name: String,
    },
    SuiteAborted {
        suite_id: String,
        suite_name: String,
        message: String,
        location: Option<Location>,
    },
    ScopeOpened {
        suite_id: String,
        text: String,
    },
    ScopeClosed {
        suite_id: String,
        text: String,
    },
    InfoProvided {
        suite_id: String,
        test_name: Option<String>,
        text: String,
    },
    TestStarting {
        suite_id: String,
        test_name: String,
        test_text: String,
    },
    TestSucceeded {
        suite_id: String,
        test_name: String,
        test_text: String,
        duration_ms: u64,
    },
    TestFailed {
        suite_id: String,
        test_name: String,
        test_text: String,
        message: String,
        location: Option<Location>,
        duration_ms: u64,
    },
    TestIgnored {
        suite_id: String,
        test_name: String,
        test_text: String,
    },
    TestPending {
        suite_id: String,
        test_name: String,
        test_text: String,
    },
    TestCanceled {
        suite_id: String,
        test_name: String,
        test_text: String,
        message: String,
    },
}

/// Receives run events. Called from the runner's threads, hence `Sync`.
pub trait Reporter: Send + Sync {
    fn apply(&self, event: &Event);
}

/// Per-category counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub ignored: usize,
    pub pending: usize,
    pub canceled: usize,
    pub suites_completed: usize,
    pub suites_aborted: usize,
}

impl Summary {
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::TestSucceeded { .. } => self.succeeded += 1,
            Event::TestFailed { .. } => self.failed += 1,
            Event::TestIgnored { .. } => self.ignored += 1,
            Event::TestPending { .. } => self.pending += 1,
            Event::TestCanceled { .. } => self.canceled += 1,
            Event::SuiteCompleted { .. } => self.suites_completed += 1,
            Event::SuiteAborted { .. } => self.suites_aborted += 1,
            _ => {}
        }
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut summary = Summary::default();
        for event in events {
            summary.record(event);
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.suites_aborted > 0
    }

    pub fn total_tests(&self) -> usize {
        self.succeeded + self.failed + self.ignored + self.pending + self.canceled
    }
}

// ============================================================================
// RecordingReporter: keeps every event, for tests and buffered replay
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn summary(&self) -> Summary {
        Summary::from_events(&self.events())
    }
}

impl Reporter for RecordingReporter {
    fn apply(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// JsonReporter: one JSON object per line
// ============================================================================

pub struct JsonReporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonReporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl Reporter for JsonReporter {
    fn apply(&self, event: &Event) {
        let Ok(line) = serde_json::to_string(event) else { return };
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", line);
        }
    }
}

// ============================================================================
// ConsoleReporter: indented, colored human output
// ============================================================================

const INDENT: &str = "  ";

pub struct ConsoleReporter {
    state: Mutex<ConsoleState>,
}

struct ConsoleState {
    out: StandardStream,
    depth: usize,
}

impl ConsoleReporter {
    /// `use_colors` is final; callers decide terminal detection themselves.
    pub fn new(use_colors: bool) -> Self {
        let choice = if use_colors {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            state: Mutex::new(ConsoleState {
                out: StandardStream::stdout(choice),
                depth: 0,
            }),
        }
    }
}

impl ConsoleState {
    fn line(&mut self, color: Option<Color>, text: &str) {
        let pad = INDENT.repeat(self.depth);
        if let Some(color) = color {
            let _ = self.out.set_color(ColorSpec::new().set_fg(Some(color)));
        }
        let _ = writeln!(self.out, "{}{}", pad, text);
        let _ = self.out.reset();
    }
}

impl Reporter for ConsoleReporter {
    fn apply(&self, event: &Event) {
        let Ok(mut st) = self.state.lock() else { return };
        match event {
            Event::RunStarting { expected_test_count } => {
                st.line(None, &format!("Run starting. Expected test count is: {}", expected_test_count));
            }
            Event::SuiteStarting { suite_name, .. } => {
                st.depth = 0;
                st.line(Some(Color::Green), &format!("{}:", suite_name));
            }
            Event::SuiteAborted {
                suite_name,
                message,
                location,
                ..
            } => {
                st.depth = 0;
                st.line(Some(Color::Red), &format!("*** ABORTED *** {}: {}", suite_name, message));
                if let Some(location) = location {
                    st.line(Some(Color::Red), &format!("  ({})", location));
                }
            }
            Event::ScopeOpened { text, .. } => {
                st.line(Some(Color::Green), text);
                st.depth += 1;
            }
            Event::ScopeClosed { .. } => {
                st.depth = st.depth.saturating_sub(1);
            }
            Event::InfoProvided { text, .. } => {
                st.line(Some(Color::Green), &format!("+ {}", text));
            }
            Event::TestSucceeded { test_text, .. } => {
                st.line(Some(Color::Green), &format!("- {}", test_text));
            }
            Event::TestFailed {
                test_text,
                message,
                location,
                ..
            } => {
                st.line(Some(Color::Red), &format!("- {} *** FAILED ***", test_text));
                st.line(Some(Color::Red), &format!("  {}", message));
                if let Some(location) = location {
                    st.line(Some(Color::Red), &format!("  ({})", location));
                }
            }
            Event::TestIgnored { test_text, .. } => {
                st.line(Some(Color::Yellow), &format!("- {} !!! IGNORED !!!", test_text));
            }
            Event::TestPending { test_text, .. } => {
                st.line(Some(Color::Yellow), &format!("- {} (pending)", test_text));
            }
            Event::TestCanceled {
                test_text, message, ..
            } => {
                st.line(Some(Color::Yellow), &format!("- {} !!! CANCELED !!!", test_text));
                st.line(Some(Color::Yellow), &format!("  {}", message));
            }
            Event::RunCompleted { summary } => {
                st.depth = 0;
                let color = if summary.has_failures() {
                    Color::Red
                } else {
                    Color::Cyan
                };
                st.line(
                    Some(color),
                    &format!(
                        "Suites: completed {}, aborted {}",
                        summary.suites_completed, summary.suites_aborted
                    ),
                );
                st.line(
                    Some(color),
                    &format!(
                        "Tests: succeeded {}, failed {}, canceled {}, ignored {}, pending {}",
                        summary.succeeded, summary.failed, summary.canceled, summary.ignored, summary.pending
                    ),
                );
                let verdict = if summary.has_failures() {
                    "*** SOME TESTS FAILED ***"
                } else {
                    "All tests passed."
                };
                st.line(Some(color), verdict);
            }
            Event::TestStarting { .. } | Event::SuiteCompleted { .. } => {}
        }
    }
}
