//! `describe`/`it` style. Scopes nest freely.

use crate::engine::{Engine, FreeNesting};
use crate::errors::Result;
use crate::scope::ScopeKind;
use crate::styles::boxed;
use crate::suite::{Suite, TestContext, TestResult};
use crate::tags::{check_tag_names, tag_set, TagSet};
use std::sync::Arc;

pub const DESCRIBE: ScopeKind = ScopeKind("describe");

pub struct FunSpec {
    engine: Engine,
    suite_tags: TagSet,
    nested: Vec<Arc<dyn Suite>>,
}

impl FunSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            engine: Engine::new(name, Arc::new(FreeNesting)),
            suite_tags: TagSet::new(),
            nested: Vec::new(),
        }
    }

    /// Creates the suite and runs its registration block.
    pub fn build<F>(name: impl Into<String>, register: F) -> Result<Self>
    where
        F: FnOnce(&FunSpec) -> Result<()>,
    {
        let spec = Self::new(name);
        register(&spec)?;
        Ok(spec)
    }

    pub fn with_suite_tags(mut self, tags: &[&str]) -> Result<Self> {
        let tags = tag_set(tags.iter().copied());
        check_tag_names("suite tags", &tags)?;
        self.suite_tags.extend(tags);
        Ok(self)
    }

    pub fn with_nested(mut self, suite: Arc<dyn Suite>) -> Self {
        self.nested.push(suite);
        self
    }

    #[track_caller]
    pub fn describe<F>(&self, description: &str, body: F) -> Result<()>
    where
        F: FnOnce(&FunSpec) -> Result<()>,
    {
        self.engine
            .register_nested_scope(DESCRIBE, description, None, |_| body(self))
    }

    #[track_caller]
    pub fn it<F>(&self, text: &str, tags: &[&str], body: F) -> Result<()>
    where
        F: Fn(&TestContext<'_>) -> TestResult + Send + Sync + 'static,
    {
        self.engine.register_test(text, tags, boxed(body))
    }

    #[track_caller]
    pub fn ignore<F>(&self, text: &str, tags: &[&str], body: F) -> Result<()>
    where
        F: Fn(&TestContext<'_>) -> TestResult + Send + Sync + 'static,
    {
        self.engine.register_ignored_test(text, tags, boxed(body))
    }

    #[track_caller]
    pub fn pending(&self, text: &str, tags: &[&str]) -> Result<()> {
        self.engine.register_pending(text, tags)
    }

    #[track_caller]
    pub fn info(&self, text: &str) -> Result<()> {
        self.engine.register_info(text)
    }
}

impl Suite for FunSpec {
    fn engine(&self) -> &Engine {
        &self.engine
    }

    fn suite_tags(&self) -> TagSet {
        self.suite_tags.clone()
    }

    fn nested_suites(&self) -> Vec<Arc<dyn Suite>> {
        self.nested.clone()
    }
}
