//! Tag-based selection of suites and tests.
//!
//! A [`Filter`] answers, for every test, whether it is excluded (never reported), ignored
//! (reported as ignored, body not run) or runnable. The answer depends on the test's static
//! tags merged with the [`DynaTags`] overlay, the optional include set and the exclude set.
//!
//! Precedence, with `T` the merged tags of a test:
//!
//! 1. An include set that `T` does not intersect excludes the test. The ignore tag does not
//!    rescue it.
//! 2. A test carrying [`IGNORE_TAG`] whose other tags avoid the exclude set is ignored, even
//!    when the ignore tag itself is listed in the exclude set.
//! 3. Any other intersection with the exclude set excludes the test. In particular an
//!    excluded tag overpowers the ignore tag: such a test is not even reported as ignored.
//! 4. Everything else runs.
//!
//! All queries take `&self`, keep no state between calls and may be used from many threads.

use crate::dyna_tags::DynaTags;
use crate::errors::Result;
use crate::suite::Suite;
use crate::tags::{check_tag_names, tag_set, TagSet, TestTags, IGNORE_TAG};
use crate::illegal_arg;
use std::sync::Arc;
use tracing::trace;

/// Outcome of filtering one test or suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decision {
    pub excluded: bool,
    pub ignored: bool,
}

impl Decision {
    pub const RUN: Decision = Decision {
        excluded: false,
        ignored: false,
    };
    pub const IGNORED: Decision = Decision {
        excluded: false,
        ignored: true,
    };
    pub const EXCLUDED: Decision = Decision {
        excluded: true,
        ignored: false,
    };

    pub fn as_pair(self) -> (bool, bool) {
        (self.excluded, self.ignored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    tags_to_include: Option<TagSet>,
    tags_to_exclude: TagSet,
    include_nested_suites: bool,
    dyna_tags: Arc<DynaTags>,
}

impl Filter {
    /// Builds a filter.
    ///
    /// # Errors
    /// * `IllegalArgument` when `tags_to_include` is `Some` of an empty set. "Include
    ///   nothing" is never what a caller means; `None` includes everything not excluded.
    /// * `NullArgument` naming the field when either set holds a blank tag name.
    pub fn new(
        tags_to_include: Option<TagSet>,
        tags_to_exclude: TagSet,
        include_nested_suites: bool,
        dyna_tags: DynaTags,
    ) -> Result<Self> {
        if let Some(include) = &tags_to_include {
            if include.is_empty() {
                return Err(illegal_arg!("tags_to_include was empty"));
            }
            check_tag_names("tags_to_include", include)?;
        }
        check_tag_names("tags_to_exclude", &tags_to_exclude)?;
        Ok(Self {
            tags_to_include,
            tags_to_exclude,
            include_nested_suites,
            dyna_tags: Arc::new(dyna_tags),
        })
    }

    pub fn tags_to_include(&self) -> Option<&TagSet> {
        self.tags_to_include.as_ref()
    }

    pub fn tags_to_exclude(&self) -> &TagSet {
        &self.tags_to_exclude
    }

    pub fn include_nested_suites(&self) -> bool {
        self.include_nested_suites
    }

    pub fn dyna_tags(&self) -> &DynaTags {
        &self.dyna_tags
    }

    /// Decides the fate of a single test.
    ///
    /// `static_tags` must not associate any test with an empty set.
    pub fn decide(&self, test_name: &str, static_tags: &TestTags, suite_id: &str) -> Result<Decision> {
        static_tags.validate()?;
        Ok(self.decide_validated(test_name, static_tags, suite_id))
    }

    /// Filters `test_names`, keeping their order and pairing each kept name with its
    /// ignored flag.
    pub fn apply<I, S>(&self, test_names: I, static_tags: &TestTags, suite_id: &str) -> Result<Vec<(String, bool)>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        static_tags.validate()?;
        Ok(test_names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let decision = self.decide_validated(name, static_tags, suite_id);
                (!decision.excluded).then(|| (name.to_string(), decision.ignored))
            })
            .collect())
    }

    /// Number of tests that `apply` keeps and does not mark ignored.
    pub fn runnable_test_count<I, S>(&self, test_names: I, static_tags: &TestTags, suite_id: &str) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self
            .apply(test_names, static_tags, suite_id)?
            .iter()
            .filter(|(_, ignored)| !ignored)
            .count())
    }

    /// Suite-level analogue of [`Filter::decide`], judged on the suite's own tags merged
    /// with the suite-level overlay.
    pub fn apply_suite(&self, suite: &dyn Suite) -> Decision {
        let mut tags = suite.suite_tags();
        if let Some(extra) = self.dyna_tags.suite_tags_for(suite.suite_id()) {
            tags.extend(extra.iter().cloned());
        }
        let decision = self.classify(&tags);
        trace!(suite = suite.suite_id(), ?decision, "suite filtered");
        decision
    }

    /// Keeps the suites that are not excluded, in order, with their ignored flag.
    pub fn apply_suites(&self, suites: &[Arc<dyn Suite>]) -> Vec<(Arc<dyn Suite>, bool)> {
        suites
            .iter()
            .filter_map(|suite| {
                let decision = self.apply_suite(suite.as_ref());
                (!decision.excluded).then(|| (Arc::clone(suite), decision.ignored))
            })
            .collect()
    }

    /// Folds suite-level tags into every test of `suite`.
    ///
    /// The result is the union, per test, of `static_tags`, the overlay's tags for that test,
    /// and the suite-level tags (the suite's own plus the overlay's). A suite-level tag thus
    /// behaves as if each of the suite's tests carried it.
    pub fn merge_test_dynamic_tags(&self, static_tags: &TestTags, suite: &dyn Suite) -> TestTags {
        let suite_id = suite.suite_id();
        let mut merged = static_tags.clone();
        if let Some(tests) = self.dyna_tags.test_tags_for(suite_id) {
            for (test, tags) in tests {
                merged.insert(test.clone(), tags.clone());
            }
        }
        let mut suite_tags = suite.suite_tags();
        if let Some(extra) = self.dyna_tags.suite_tags_for(suite_id) {
            suite_tags.extend(extra.iter().cloned());
        }
        if !suite_tags.is_empty() {
            for test in suite.test_names() {
                merged.insert(test, suite_tags.clone());
            }
        }
        merged
    }

    fn decide_validated(&self, test_name: &str, static_tags: &TestTags, suite_id: &str) -> Decision {
        let tags = static_tags.merged_for(test_name, self.dyna_tags.tags_for_test(suite_id, test_name));
        let decision = self.classify(&tags);
        trace!(test = test_name, suite = suite_id, ?decision, "test filtered");
        decision
    }

    fn classify(&self, tags: &TagSet) -> Decision {
        let included = match &self.tags_to_include {
            None => true,
            Some(include) => !tags.is_disjoint(include),
        };
        if !included {
            return Decision::EXCLUDED;
        }
        let ignored = tags.contains(IGNORE_TAG);
        let excluded_by_other_tag = tags
            .iter()
            .any(|tag| tag != IGNORE_TAG && self.tags_to_exclude.contains(tag));
        if ignored && !excluded_by_other_tag {
            return Decision::IGNORED;
        }
        if !tags.is_disjoint(&self.tags_to_exclude) {
            return Decision::EXCLUDED;
        }
        Decision::RUN
    }
}

impl Default for Filter {
    /// Includes everything and excludes only the ignore tag.
    fn default() -> Self {
        Self {
            tags_to_include: None,
            tags_to_exclude: tag_set([IGNORE_TAG]),
            include_nested_suites: true,
            dyna_tags: Arc::new(DynaTags::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn filter(include: Option<&[&str]>, exclude: &[&str]) -> Filter {
        Filter::new(
            include.map(|tags| tag_set(tags.iter().copied())),
            tag_set(exclude.iter().copied()),
            true,
            DynaTags::empty(),
        )
        .unwrap()
    }

    fn tagged(test: &str, tags: &[&str]) -> TestTags {
        let mut map = TestTags::new();
        map.insert(test, tag_set(tags.iter().copied()));
        map
    }

    #[test]
    fn empty_include_set_fails_at_construction() {
        let err = Filter::new(Some(TagSet::new()), TagSet::new(), true, DynaTags::empty()).unwrap_err();
        assert_eq!(err.to_string(), "tags_to_include was empty");
    }

    #[test]
    fn untagged_test_runs_without_include_set() {
        let f = filter(None, &["Slow", IGNORE_TAG]);
        assert_eq!(f.decide("t", &TestTags::new(), "s").unwrap(), Decision::RUN);
    }

    #[test]
    fn untagged_test_is_excluded_by_include_set() {
        let f = filter(Some(&["Slow"]), &[]);
        assert_eq!(f.decide("t", &TestTags::new(), "s").unwrap(), Decision::EXCLUDED);
    }

    #[test]
    fn same_tag_in_include_and_exclude_excludes() {
        let f = filter(Some(&["Slow"]), &["Slow"]);
        let tags = tagged("t", &["Slow"]);
        assert!(f.apply(["t"], &tags, "s").unwrap().is_empty());
    }

    #[test]
    fn included_tag_runs() {
        let f = filter(Some(&["Slow"]), &[]);
        let tags = tagged("t", &["Slow"]);
        assert_eq!(f.apply(["t"], &tags, "s").unwrap(), vec![("t".to_string(), false)]);
    }

    #[test]
    fn ignore_tag_alone_is_ignored_even_when_excluded() {
        let f = filter(None, &[IGNORE_TAG]);
        let tags = tagged("t", &[IGNORE_TAG]);
        assert_eq!(f.decide("t", &tags, "s").unwrap(), Decision::IGNORED);
    }

    #[test]
    fn excluded_tag_overpowers_ignore() {
        let f = filter(None, &["Slow", IGNORE_TAG]);
        let tags = tagged("t", &["Slow", IGNORE_TAG]);
        assert_eq!(f.decide("t", &tags, "s").unwrap(), Decision::EXCLUDED);
    }

    #[test]
    fn ignore_does_not_rescue_failed_inclusion() {
        let f = filter(Some(&["Fast"]), &[]);
        let tags = tagged("t", &[IGNORE_TAG]);
        assert_eq!(f.decide("t", &tags, "s").unwrap(), Decision::EXCLUDED);
    }

    #[test]
    fn dyna_tags_merge_with_static_tags() {
        let mut tests = BTreeMap::new();
        tests.insert("myTestName".to_string(), tag_set(["FastAsLight"]));
        let mut test_tags = BTreeMap::new();
        test_tags.insert("suite-1".to_string(), tests);
        let dyna = DynaTags::new(BTreeMap::new(), test_tags).unwrap();
        let f = Filter::new(Some(tag_set(["FastAsLight"])), tag_set([IGNORE_TAG]), true, dyna).unwrap();
        assert_eq!(f.decide("myTestName", &TestTags::new(), "suite-1").unwrap().as_pair(), (false, false));
        assert_eq!(f.decide("myTestName", &TestTags::new(), "other").unwrap().as_pair(), (true, false));
    }

    #[test]
    fn empty_set_in_tag_map_is_rejected() {
        let mut raw = BTreeMap::new();
        raw.insert("t".to_string(), TagSet::new());
        let f = Filter::default();
        let err = f.apply(["t"], &TestTags::from_map(raw), "s").unwrap_err();
        assert!(err.to_string().contains("t was associated with an empty set"));
    }

    #[test]
    fn default_filter_runs_untagged_and_ignores_ignored() {
        let f = Filter::default();
        let tags = tagged("b", &[IGNORE_TAG]);
        let kept = f.apply(["a", "b"], &tags, "s").unwrap();
        assert_eq!(kept, vec![("a".to_string(), false), ("b".to_string(), true)]);
        assert_eq!(f.runnable_test_count(["a", "b"], &tags, "s").unwrap(), 1);
    }
}
