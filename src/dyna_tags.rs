//! Runtime-supplied tag overlay.
//!
//! `DynaTags` carries tags that were not declared in the suites themselves (for example from
//! a run configuration file). They are merged with, never substituted for, the static tags
//! each time the filter evaluates a suite or a test.

use crate::errors::Result;
use crate::illegal_arg;
use crate::tags::{check_tag_names, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type SuiteId = String;
pub type TestName = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynaTags {
    #[serde(default)]
    suite_tags: BTreeMap<SuiteId, TagSet>,
    #[serde(default)]
    test_tags: BTreeMap<SuiteId, BTreeMap<TestName, TagSet>>,
}

impl DynaTags {
    /// Builds an overlay, rejecting empty tag sets and blank tag names.
    pub fn new(
        suite_tags: BTreeMap<SuiteId, TagSet>,
        test_tags: BTreeMap<SuiteId, BTreeMap<TestName, TagSet>>,
    ) -> Result<Self> {
        let dyna = Self {
            suite_tags,
            test_tags,
        };
        dyna.validate()?;
        Ok(dyna)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks an overlay obtained through deserialization.
    pub fn validate(&self) -> Result<()> {
        for (suite_id, tags) in &self.suite_tags {
            if tags.is_empty() {
                return Err(illegal_arg!(
                    "suite {} was associated with an empty set in suite_tags",
                    suite_id
                ));
            }
            check_tag_names("suite_tags", tags)?;
        }
        for (suite_id, tests) in &self.test_tags {
            for (test, tags) in tests {
                if tags.is_empty() {
                    return Err(illegal_arg!(
                        "{} in suite {} was associated with an empty set in test_tags",
                        test,
                        suite_id
                    ));
                }
                check_tag_names("test_tags", tags)?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.suite_tags.is_empty() && self.test_tags.is_empty()
    }

    pub fn suite_tags_for(&self, suite_id: &str) -> Option<&TagSet> {
        self.suite_tags.get(suite_id)
    }

    pub fn test_tags_for(&self, suite_id: &str) -> Option<&BTreeMap<TestName, TagSet>> {
        self.test_tags.get(suite_id)
    }

    pub fn tags_for_test(&self, suite_id: &str, test: &str) -> Option<&TagSet> {
        self.test_tags.get(suite_id).and_then(|tests| tests.get(test))
    }
}
