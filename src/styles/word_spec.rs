//! Subject/verb style: `"A Stack" when { "empty" should { "be empty" in ... } }`.
//!
//! A verb clause names its subject and contributes `"<subject> <verb>"` to the names of the
//! tests inside it, so the test `"be empty"` above is named `A Stack when empty should be
//! empty`. A `when` clause may not appear inside a verb clause.

use crate::engine::{Engine, NestingRule};
use crate::errors::Result;
use crate::scope::ScopeKind;
use crate::styles::boxed;
use crate::suite::{Suite, TestContext, TestResult};
use crate::tags::{check_tag_names, tag_set, TagSet};
use std::sync::Arc;

pub const WHEN: ScopeKind = ScopeKind("when");
pub const SHOULD: ScopeKind = ScopeKind("should");
pub const MUST: ScopeKind = ScopeKind("must");
pub const CAN: ScopeKind = ScopeKind("can");

const VERBS: [ScopeKind; 3] = [SHOULD, MUST, CAN];

struct WordRule;

impl NestingRule for WordRule {
    fn check_scope(&self, kind: ScopeKind, enclosing: &[ScopeKind]) -> std::result::Result<(), String> {
        if kind == WHEN && enclosing.iter().any(|k| VERBS.contains(k)) {
            return Err("A when clause may not appear inside a should, must or can clause".to_string());
        }
        Ok(())
    }
}

pub struct WordSpec {
    engine: Engine,
    suite_tags: TagSet,
}

impl WordSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            engine: Engine::new(name, Arc::new(WordRule)),
            suite_tags: TagSet::new(),
        }
    }

    pub fn build<F>(name: impl Into<String>, register: F) -> Result<Self>
    where
        F: FnOnce(&WordSpec) -> Result<()>,
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

    #[track_caller]
    pub fn when<F>(&self, subject: &str, body: F) -> Result<()>
    where
        F: FnOnce(&WordSpec) -> Result<()>,
    {
        self.clause(WHEN, subject, body)
    }

    #[track_caller]
    pub fn should<F>(&self, subject: &str, body: F) -> Result<()>
    where
        F: FnOnce(&WordSpec) -> Result<()>,
    {
        self.clause(SHOULD, subject, body)
    }

    #[track_caller]
    pub fn must<F>(&self, subject: &str, body: F) -> Result<()>
    where
        F: FnOnce(&WordSpec) -> Result<()>,
    {
        self.clause(MUST, subject, body)
    }

    #[track_caller]
    pub fn can<F>(&self, subject: &str, body: F) -> Result<()>
    where
        F: FnOnce(&WordSpec) -> Result<()>,
    {
        self.clause(CAN, subject, body)
    }

    /// Registers a test inside the current clause.
    #[track_caller]
    pub fn test<F>(&self, text: &str, tags: &[&str], body: F) -> Result<()>
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
    fn clause<F>(&self, kind: ScopeKind, subject: &str, body: F) -> Result<()>
    where
        F: FnOnce(&WordSpec) -> Result<()>,
    {
        let prefix = format!("{} {}", subject, kind);
        self.engine
            .register_nested_scope(kind, subject, Some(&prefix), |_| body(self))
    }
}

impl Suite for WordSpec {
    fn engine(&self) -> &Engine {
        &self.engine
    }

    fn suite_tags(&self) -> TagSet {
        self.suite_tags.clone()
    }
}
