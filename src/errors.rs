//! Suitekit error handling.
//!
//! Every failure the engine can produce is a [`SuiteError`]. The variants map onto the
//! error taxonomy of the registration and filtering core:
//!
//! | Variant                | Raised by                          | When                                       |
//! |------------------------|------------------------------------|--------------------------------------------|
//! | `NullArgument`         | `Filter::new`, registration calls  | a required tag name is blank               |
//! | `IllegalArgument`      | `Filter::new`, `Filter::decide`    | malformed configuration or tag map         |
//! | `DuplicateTestName`    | `Engine::register_*`               | full test name already registered          |
//! | `NotAllowed`           | `Engine::register_nested_scope`    | the style forbids this nesting             |
//! | `RegistrationClosed`   | any `Engine::register_*`           | the suite already started running          |
//! | `Config` / `Io`        | `config`, `cli`                    | run configuration could not be loaded      |
//!
//! Errors are constructed through the helper macros `null_arg!` and `illegal_arg!` or the
//! variant literal when a [`Location`] is involved.

use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Source position of a registration call, captured with `#[track_caller]`.
///
/// Only used for diagnostics; it never influences filtering or naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub file: &'static str,
    /// 1-based line number.
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Returns the location of the caller of the innermost `#[track_caller]` frame.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }

    /// File name without its directory components.
    pub fn file_name(&self) -> &'static str {
        self.file
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(self.file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name(), self.line)
    }
}

/// Unified error type for the registration engine, the filter and the run configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum SuiteError {
    #[error("{name} was null")]
    #[diagnostic(
        code(suitekit::null_argument),
        help("tag names must be non-empty strings")
    )]
    NullArgument { name: String },

    #[error("{message}")]
    #[diagnostic(code(suitekit::illegal_argument))]
    IllegalArgument { message: String },

    #[error("Duplicate test name: {name} (at {location})")]
    #[diagnostic(
        code(suitekit::duplicate_test_name),
        help("full test names are the enclosing scope texts joined with the test text and must be unique within a suite")
    )]
    DuplicateTestName { name: String, location: Location },

    #[error("{message} (at {location})")]
    #[diagnostic(code(suitekit::not_allowed))]
    NotAllowed {
        message: String,
        /// Where the enclosing scope was opened, or `call` when the violation happened at the
        /// top level of the suite.
        location: Location,
        /// The registration call that broke the rule.
        call: Location,
    },

    #[error("{message} (at {location})")]
    #[diagnostic(
        code(suitekit::registration_closed),
        help("tests and scopes can only be registered while the suite is being constructed")
    )]
    RegistrationClosed { message: String, location: Location },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(suitekit::config))]
    Config { message: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(suitekit::io))]
    Io(#[from] std::io::Error),
}

impl SuiteError {
    /// Source location carried by registration errors.
    pub fn location(&self) -> Option<Location> {
        match self {
            SuiteError::DuplicateTestName { location, .. }
            | SuiteError::NotAllowed { location, .. }
            | SuiteError::RegistrationClosed { location, .. } => Some(*location),
            _ => None,
        }
    }

    pub fn is_registration_closed(&self) -> bool {
        matches!(self, SuiteError::RegistrationClosed { .. })
    }
}

pub type Result<T> = std::result::Result<T, SuiteError>;

/// Builds a [`SuiteError::NullArgument`] naming the offending argument.
#[macro_export]
macro_rules! null_arg {
    ($name:expr) => {
        $crate::errors::SuiteError::NullArgument {
            name: $name.to_string(),
        }
    };
}

/// Builds a [`SuiteError::IllegalArgument`] from a format string.
#[macro_export]
macro_rules! illegal_arg {
    ($msg:expr) => {
        $crate::errors::SuiteError::IllegalArgument {
            message: $msg.to_string(),
        }
    };
    ($fmt:expr, $($arg:expr),+ $(,)?) => {
        $crate::errors::SuiteError::IllegalArgument {
            message: format!($fmt, $($arg),+),
        }
    };
}
