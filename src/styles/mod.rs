//! Registration front-ends.
//!
//! Each style wraps an [`Engine`](crate::engine::Engine), supplies its own
//! [`NestingRule`](crate::engine::NestingRule) and translates its vocabulary into
//! `register_*` calls. All registration methods are `#[track_caller]`, so diagnostics point
//! at the user's call site rather than at the style.

pub mod feature_spec;
pub mod fun_spec;
pub mod word_spec;

pub use feature_spec::FeatureSpec;
pub use fun_spec::FunSpec;
pub use word_spec::WordSpec;

use crate::suite::{TestBody, TestContext, TestResult};
use std::sync::Arc;

pub(crate) fn boxed<F>(body: F) -> TestBody
where
    F: Fn(&TestContext<'_>) -> TestResult + Send + Sync + 'static,
{
    Arc::new(body)
}
