//! suitekit: test registration, scope naming and tag-based test selection.
//!
//! Suites are written in one of the [`styles`]; each style drives a registration
//! [`Engine`](engine::Engine) that records tests, their tags and the scopes they were declared
//! in. Once a run starts, registration is closed and a [`Filter`] decides which tests are run,
//! reported as ignored or left out.

pub mod cli;
pub mod config;
pub mod dyna_tags;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod logging;
pub mod reporter;
pub mod runner;
pub mod scope;
pub mod styles;
pub mod suite;
pub mod tags;

pub use crate::dyna_tags::DynaTags;
pub use crate::engine::{Engine, FreeNesting, NestingRule, Phase};
pub use crate::errors::{Location, Result, SuiteError};
pub use crate::filter::{Decision, Filter};
pub use crate::reporter::{Event, Reporter, Summary};
pub use crate::runner::{run_suite, run_suites, RunOptions, SuiteSlot};
pub use crate::suite::{ensure, Suite, TestContext, TestFailure, TestResult};
pub use crate::tags::{tag_set, TagIndex, TagSet, TestTags, IGNORE_TAG};
