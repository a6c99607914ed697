//! Tag model: test-name → tag-set maps and their inverse view.
//!
//! A test that carries no tags is simply absent from a [`TestTags`] map. An empty set is
//! never a legitimate value, so the map refuses to store one and [`TestTags::validate`]
//! reports maps built elsewhere that contain one.

use crate::errors::Result;
use crate::{illegal_arg, null_arg};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The reserved tag marking a test as registered-but-ignored. Compared by name only.
pub const IGNORE_TAG: &str = "suitekit.Ignore";

pub type TagSet = BTreeSet<String>;

/// Builds a [`TagSet`] from string slices.
pub fn tag_set<I, S>(tags: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter().map(Into::into).collect()
}

/// Rejects blank tag names, reporting `field` as the offending argument.
pub fn check_tag_names<'a, I>(field: &str, tags: I) -> Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    if tags.into_iter().any(|t| t.trim().is_empty()) {
        return Err(null_arg!(format!("a tag in {}", field)));
    }
    Ok(())
}

/// Static tags keyed by full test name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestTags(BTreeMap<String, TagSet>);

impl TestTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a raw map without validation. Use [`TestTags::validate`] before filtering.
    pub fn from_map(map: BTreeMap<String, TagSet>) -> Self {
        Self(map)
    }

    /// Adds `tags` to `test`. Adding nothing leaves the map unchanged.
    pub fn insert(&mut self, test: impl Into<String>, tags: TagSet) {
        if tags.is_empty() {
            return;
        }
        self.0.entry(test.into()).or_default().extend(tags);
    }

    pub fn get(&self, test: &str) -> Option<&TagSet> {
        self.0.get(test)
    }

    pub fn contains(&self, test: &str) -> bool {
        self.0.contains_key(test)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagSet)> {
        self.0.iter()
    }

    /// Fails on the first test associated with an empty tag set.
    pub fn validate(&self) -> Result<()> {
        match self.0.iter().find(|(_, tags)| tags.is_empty()) {
            Some((name, _)) => Err(illegal_arg!(
                "{} was associated with an empty set in the map passed as tags",
                name
            )),
            None => Ok(()),
        }
    }

    /// Union of the tags of `test` in `self` and `overlay`.
    pub fn merged_for(&self, test: &str, overlay: Option<&TagSet>) -> TagSet {
        let mut merged = self.get(test).cloned().unwrap_or_default();
        if let Some(extra) = overlay {
            merged.extend(extra.iter().cloned());
        }
        merged
    }

    /// Inverse view: tag name → test names.
    pub fn index(&self) -> TagIndex {
        let mut index: IndexMap<String, Vec<String>> = IndexMap::new();
        for (test, tags) in &self.0 {
            for tag in tags {
                index.entry(tag.clone()).or_default().push(test.clone());
            }
        }
        index.sort_keys();
        TagIndex(index)
    }
}

impl FromIterator<(String, TagSet)> for TestTags {
    fn from_iter<T: IntoIterator<Item = (String, TagSet)>>(iter: T) -> Self {
        let mut tags = TestTags::new();
        for (name, set) in iter {
            tags.insert(name, set);
        }
        tags
    }
}

/// Tag name → names of the tests carrying it. Never holds an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagIndex(IndexMap<String, Vec<String>>);

impl TagIndex {
    pub fn tests_tagged(&self, tag: &str) -> &[String] {
        self.0.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}
