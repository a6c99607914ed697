//! Entry point for binaries that bundle suites.
//!
//! A binary builds its suites, wraps each in a [`SuiteSlot`] and hands them to [`run`], which
//! parses the command line, resolves the [`RunConfig`] and either runs or lists the suites.

use crate::config::{OutputFormat, RunConfig};
use crate::errors::{Result, SuiteError};
use crate::filter::{Decision, Filter};
use crate::logging;
use crate::reporter::{ConsoleReporter, JsonReporter, Reporter};
use crate::runner::{run_slots, RunOptions, SuiteSlot};
use crate::suite::Suite;
use crate::tags::TagSet;
use clap::Parser;
use serde::Serialize;
use std::io::{self, Write};

pub mod args;

use args::{Command, SuiteArgs};

/// Exit status for a run in which every selected test passed.
pub const EXIT_OK: i32 = 0;
/// Some test failed or some suite aborted.
pub const EXIT_FAILED: i32 = 1;
/// The configuration could not be turned into a filter.
pub const EXIT_USAGE: i32 = 2;

/// Parses `std::env::args` and runs or lists `slots`. Returns the process exit status.
pub fn run(slots: Vec<SuiteSlot>) -> i32 {
    run_with(SuiteArgs::parse(), slots)
}

pub fn run_with(args: SuiteArgs, slots: Vec<SuiteSlot>) -> i32 {
    logging::init(args.verbose);

    let prepared = RunConfig::resolve(&args).and_then(|config| {
        let filter = config.to_filter()?;
        Ok((config, filter))
    });
    let (config, filter) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            print_error(err);
            return EXIT_USAGE;
        }
    };

    match args.command.unwrap_or(Command::Run) {
        Command::List => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            match write_listing(&mut out, &slots, &filter, config.format) {
                Ok(()) => EXIT_OK,
                Err(err) => {
                    print_error(err);
                    EXIT_FAILED
                }
            }
        }
        Command::Run => {
            let reporter: Box<dyn Reporter> = match config.format {
                OutputFormat::Console => Box::new(ConsoleReporter::new(config.color.use_colors())),
                OutputFormat::Json => Box::new(JsonReporter::stdout()),
            };
            let options = RunOptions {
                parallel: config.parallel,
            };
            let summary = run_slots(&slots, &filter, reporter.as_ref(), options);
            if summary.has_failures() {
                EXIT_FAILED
            } else {
                EXIT_OK
            }
        }
    }
}

fn print_error(err: impl Into<SuiteError>) {
    eprintln!("{:?}", miette::Report::new(err.into()));
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SuiteListing {
    pub suite_id: String,
    pub suite_name: String,
    /// `run` when any test runs, else `ignored` when any test is reported as ignored, else
    /// `excluded`. A suite without tests of its own takes `suite_tags_verdict`.
    pub verdict: &'static str,
    /// Verdict on suite-level tags alone (static suite tags plus the overlay).
    pub suite_tags_verdict: &'static str,
    pub tests: Vec<TestListing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestListing {
    pub name: String,
    pub tags: TagSet,
    pub verdict: &'static str,
}

fn verdict(decision: Decision) -> &'static str {
    if decision.excluded {
        "excluded"
    } else if decision.ignored {
        "ignored"
    } else {
        "run"
    }
}

fn suite_verdict(tests: &[TestListing], suite_tags_verdict: &'static str) -> &'static str {
    if tests.is_empty() {
        suite_tags_verdict
    } else if tests.iter().any(|t| t.verdict == "run") {
        "run"
    } else if tests.iter().any(|t| t.verdict == "ignored") {
        "ignored"
    } else {
        "excluded"
    }
}

/// What the filter does with every registered test, nested suites included.
pub fn listing(slots: &[SuiteSlot], filter: &Filter) -> Result<Vec<SuiteListing>> {
    let mut out = Vec::new();
    for slot in slots {
        match slot {
            SuiteSlot::Ready(suite) => list_suite(suite.as_ref(), filter, &mut out)?,
            SuiteSlot::Aborted { name, error } => out.push(SuiteListing {
                suite_id: name.clone(),
                suite_name: name.clone(),
                verdict: "excluded",
                suite_tags_verdict: "excluded",
                tests: Vec::new(),
                aborted: Some(error.to_string()),
            }),
        }
    }
    Ok(out)
}

fn list_suite(suite: &dyn Suite, filter: &Filter, out: &mut Vec<SuiteListing>) -> Result<()> {
    let tags = filter.merge_test_dynamic_tags(&suite.test_tags(), suite);
    let mut tests = Vec::new();
    for name in suite.test_names() {
        let decision = filter.decide(&name, &tags, suite.suite_id())?;
        let test_tags = tags.merged_for(&name, filter.dyna_tags().tags_for_test(suite.suite_id(), &name));
        tests.push(TestListing {
            name,
            tags: test_tags,
            verdict: verdict(decision),
        });
    }
    let suite_tags_verdict = verdict(filter.apply_suite(suite));
    out.push(SuiteListing {
        suite_id: suite.suite_id().to_string(),
        suite_name: suite.suite_name().to_string(),
        verdict: suite_verdict(&tests, suite_tags_verdict),
        suite_tags_verdict,
        tests,
        aborted: None,
    });
    if filter.include_nested_suites() {
        for nested in suite.nested_suites() {
            list_suite(nested.as_ref(), filter, out)?;
        }
    }
    Ok(())
}

pub fn write_listing(out: &mut dyn Write, slots: &[SuiteSlot], filter: &Filter, format: OutputFormat) -> Result<()> {
    let suites = listing(slots, filter)?;
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&suites).map_err(|e| SuiteError::Config {
                message: e.to_string(),
            })?;
            writeln!(out, "{}", text)?;
        }
        OutputFormat::Console => {
            for suite in &suites {
                match &suite.aborted {
                    Some(message) => writeln!(out, "{} [aborted: {}]", suite.suite_name, message)?,
                    None if suite.verdict == suite.suite_tags_verdict => {
                        writeln!(out, "{} [{}]", suite.suite_name, suite.verdict)?
                    }
                    None => writeln!(
                        out,
                        "{} [{}; suite tags alone: {}]",
                        suite.suite_name, suite.verdict, suite.suite_tags_verdict
                    )?,
                }
                for test in &suite.tests {
                    let tags: Vec<&str> = test.tags.iter().map(String::as_str).collect();
                    if tags.is_empty() {
                        writeln!(out, "  {:<8} {}", test.verdict, test.name)?;
                    } else {
                        writeln!(out, "  {:<8} {} {{{}}}", test.verdict, test.name, tags.join(", "))?;
                    }
                }
            }
        }
    }
    Ok(())
}
