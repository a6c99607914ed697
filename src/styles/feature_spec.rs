//! `feature`/`scenario` style. Features may only appear at the top level of a suite.

use crate::engine::{Engine, NestingRule};
use crate::errors::Result;
use crate::scope::ScopeKind;
use crate::styles::boxed;
use crate::suite::{Suite, TestContext, TestResult};
use crate::tags::{check_tag_names, tag_set, TagSet};
use std::sync::Arc;

pub const FEATURE: ScopeKind = ScopeKind("feature");

struct FeatureRule;

impl NestingRule for FeatureRule {
    fn check_scope(&self, kind: ScopeKind, enclosing: &[ScopeKind]) -> std::result::Result<(), String> {
        if kind == FEATURE && !enclosing.is_empty() {
            return Err("Feature clauses cannot be nested".to_string());
        }
        Ok(())
    }
}

pub struct FeatureSpec {
    engine: Engine,
    suite_tags: TagSet,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            engine: Engine::new(name, Arc::new(FeatureRule)),
            suite_tags: TagSet::new(),
        }
    }

    pub fn build<F>(name: impl Into<String>, register: F) -> Result<Self>
    where
        F: FnOnce(&FeatureSpec) -> Result<()>,
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
    pub fn feature<F>(&self, description: &str, body: F) -> Result<()>
    where
        F: FnOnce(&FeatureSpec) -> Result<()>,
    {
        let text = format!("Feature: {}", description);
        self.engine
            .register_nested_scope(FEATURE, &text, None, |_| body(self))
    }

    #[track_caller]
    pub fn scenario<F>(&self, text: &str, tags: &[&str], body: F) -> Result<()>
    where
        F: Fn(&TestContext<'_>) -> TestResult + Send + Sync + 'static,
    {
        self.engine
            .register_test(&format!("Scenario: {}", text), tags, boxed(body))
    }

    #[track_caller]
    pub fn ignore_scenario<F>(&self, text: &str, tags: &[&str], body: F) -> Result<()>
    where
        F: Fn(&TestContext<'_>) -> TestResult + Send + Sync + 'static,
    {
        self.engine
            .register_ignored_test(&format!("Scenario: {}", text), tags, boxed(body))
    }

    #[track_caller]
    pub fn info(&self, text: &str) -> Result<()> {
        self.engine.register_info(text)
    }
}

impl Suite for FeatureSpec {
    fn engine(&self) -> &Engine {
        &self.engine
    }

    fn suite_tags(&self) -> TagSet {
        self.suite_tags.clone()
    }
}
