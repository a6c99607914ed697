//! Registration engine: the two-phase lifecycle of a suite.
//!
//! # Lifecycle
//!
//! ```text
//! Engine::new ──► Registering ──transition_to_run()──► RunStarted
//!                   │  register_test / register_ignored_test / register_pending
//!                   │  register_nested_scope / register_info
//!                   ▼
//!                 new snapshot published by compare-and-swap
//! ```
//!
//! # State
//!
//! All registration state lives in one immutable [`Snapshot`] behind an `ArcSwap`. A
//! registration call loads the current snapshot, derives the next one (the `im` collections
//! make that clone cheap) and publishes it with `compare_and_swap`. If another thread won
//! the race, the call starts over from the winner. Because the phase flag lives in the same
//! snapshot, a registration that loses against `transition_to_run` observes `RunStarted` on
//! its retry and fails with `RegistrationClosed`; it can never slip into a running suite.
//!
//! Readers (`test_names`, `tags`, `scope_tree`, ...) load the snapshot and never block.
//!
//! # Nesting rules
//!
//! What may be nested inside what belongs to the style, not to the engine. Each engine is
//! created with a [`NestingRule`] that is consulted before a scope or a test is added.

use crate::errors::{Location, Result, SuiteError};
use crate::null_arg;
use crate::scope::{Branch, InfoLeaf, Node, NodeId, ScopeKind, ScopeTree, TestEntry};
use crate::suite::{TestBody, TestContext, TestFailure, TestResult};
use crate::tags::{TagIndex, TagSet, TestTags, IGNORE_TAG};
use arc_swap::{ArcSwap, Guard};
use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Style-supplied capability check for nesting.
pub trait NestingRule: Send + Sync {
    /// May a scope of `kind` be opened inside `enclosing` (outermost first)?
    fn check_scope(&self, kind: ScopeKind, enclosing: &[ScopeKind]) -> std::result::Result<(), String>;

    /// May a test be registered inside `enclosing`?
    fn check_test(&self, _enclosing: &[ScopeKind]) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Allows any nesting.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeNesting;

impl NestingRule for FreeNesting {
    fn check_scope(&self, _kind: ScopeKind, _enclosing: &[ScopeKind]) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Registering,
    RunStarted,
}

/// Immutable registration state published by the engine.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub phase: Phase,
    pub tree: ScopeTree,
    /// Full test name → node, for duplicate detection and lookup.
    pub names: im::HashMap<String, NodeId>,
    /// Test nodes in registration order.
    pub order: im::Vector<NodeId>,
    /// Branch new registrations are added to.
    pub cursor: NodeId,
}

impl Snapshot {
    fn new() -> Self {
        Self {
            phase: Phase::Registering,
            tree: ScopeTree::new(),
            names: im::HashMap::new(),
            order: im::Vector::new(),
            cursor: ScopeTree::TRUNK,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &TestEntry> {
        self.order.iter().filter_map(|id| self.tree.test(*id))
    }
}

pub struct Engine {
    suite_id: String,
    rule: Arc<dyn NestingRule>,
    state: ArcSwap<Snapshot>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("suite_id", &self.suite_id)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(suite_id: impl Into<String>, rule: Arc<dyn NestingRule>) -> Self {
        Self {
            suite_id: suite_id.into(),
            rule,
            state: ArcSwap::from_pointee(Snapshot::new()),
        }
    }

    pub fn suite_id(&self) -> &str {
        &self.suite_id
    }

    pub fn phase(&self) -> Phase {
        self.state.load().phase
    }

    /// The current snapshot. Stays valid (and unchanged) however the engine moves on.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.state.load_full()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    #[track_caller]
    pub fn register_test(&self, text: &str, tags: &[&str], body: TestBody) -> Result<()> {
        let location = Location::caller();
        let tags = collect_tags(tags)?;
        self.add_test(text, tags, body, location)
    }

    /// Registers a test carrying the ignore tag in addition to `tags`.
    #[track_caller]
    pub fn register_ignored_test(&self, text: &str, tags: &[&str], body: TestBody) -> Result<()> {
        let location = Location::caller();
        let mut tags = collect_tags(tags)?;
        tags.insert(IGNORE_TAG.to_string());
        self.add_test(text, tags, body, location)
    }

    /// Registers a test whose body reports pending.
    #[track_caller]
    pub fn register_pending(&self, text: &str, tags: &[&str]) -> Result<()> {
        let location = Location::caller();
        let tags = collect_tags(tags)?;
        let body: TestBody = Arc::new(|_: &TestContext<'_>| -> TestResult { Err(TestFailure::Pending) });
        self.add_test(text, tags, body, location)
    }

    /// Registers an informational message at the current position of the tree.
    #[track_caller]
    pub fn register_info(&self, text: &str) -> Result<()> {
        let location = Location::caller();
        self.publish(location, "An info message", |snap| {
            let mut next = snap.clone();
            next.tree.push(
                snap.cursor,
                Node::Info(InfoLeaf {
                    text: text.to_string(),
                    location,
                }),
            );
            Ok((next, ()))
        })
    }

    /// Opens a scope, runs `body` inside it and closes it again.
    ///
    /// The nesting rule is checked before the scope is opened. A violation is reported at the
    /// call that opened the enclosing scope; the offending call is kept as `call`. The scope
    /// is closed even when `body` fails; the error is then returned unchanged.
    #[track_caller]
    pub fn register_nested_scope<F>(
        &self,
        kind: ScopeKind,
        description: &str,
        child_prefix: Option<&str>,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&Engine) -> Result<()>,
    {
        let location = Location::caller();
        let (opened, previous) = self.publish(location, "A scope", |snap| {
            let enclosing = snap.tree.enclosing_kinds(snap.cursor);
            if let Err(message) = self.rule.check_scope(kind, &enclosing) {
                return Err(not_allowed(snap, message, location));
            }
            let mut next = snap.clone();
            let id = next.tree.push(
                snap.cursor,
                Node::Branch(Branch {
                    kind,
                    description: description.to_string(),
                    child_prefix: child_prefix.map(str::to_string),
                    children: im::Vector::new(),
                    parent: Some(snap.cursor),
                    location: Some(location),
                }),
            );
            next.cursor = id;
            Ok((next, (id, snap.cursor)))
        })?;
        trace!(suite = %self.suite_id, kind = %kind, description, "scope opened");

        let result = body(self);
        self.restore_cursor(opened, previous);
        result
    }

    /// Ends the registration phase. Returns `true` for the call that flipped the phase.
    pub fn transition_to_run(&self) -> bool {
        let mut current = self.state.load_full();
        loop {
            if current.phase == Phase::RunStarted {
                return false;
            }
            let mut next = (*current).clone();
            next.phase = Phase::RunStarted;
            let prev = self.state.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&prev, &current) {
                debug!(suite = %self.suite_id, tests = current.order.len(), "registration closed");
                return true;
            }
            current = Guard::into_inner(prev);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Full test names in registration order.
    pub fn test_names(&self) -> IndexSet<String> {
        self.state.load().entries().map(|e| e.name.clone()).collect()
    }

    pub fn test_tags(&self) -> TestTags {
        self.state
            .load()
            .entries()
            .map(|e| (e.name.clone(), e.tags.clone()))
            .collect()
    }

    /// Tag name → test names.
    pub fn tags(&self) -> TagIndex {
        self.test_tags().index()
    }

    pub fn test_entry(&self, name: &str) -> Option<TestEntry> {
        let snap = self.state.load();
        snap.names.get(name).and_then(|id| snap.tree.test(*id)).cloned()
    }

    pub fn test_count(&self) -> usize {
        self.state.load().order.len()
    }

    pub fn scope_tree(&self) -> ScopeTree {
        self.state.load().tree.clone()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn add_test(&self, text: &str, tags: TagSet, body: TestBody, location: Location) -> Result<()> {
        let name = self.publish(location, "A test", |snap| {
            let enclosing = snap.tree.enclosing_kinds(snap.cursor);
            if let Err(message) = self.rule.check_test(&enclosing) {
                return Err(not_allowed(snap, message, location));
            }
            let name = snap.tree.full_name(snap.cursor, text);
            if snap.names.contains_key(&name) {
                return Err(SuiteError::DuplicateTestName { name, location });
            }
            let mut next = snap.clone();
            let id = next.tree.push(
                snap.cursor,
                Node::Test(TestEntry {
                    name: name.clone(),
                    text: text.to_string(),
                    ordinal: snap.order.len(),
                    tags: tags.clone(),
                    location,
                    body: Arc::clone(&body),
                }),
            );
            next.names.insert(name.clone(), id);
            next.order.push_back(id);
            Ok((next, name))
        })?;
        trace!(suite = %self.suite_id, test = %name, "test registered");
        Ok(())
    }

    /// Derives a snapshot from the current one and publishes it, retrying on contention.
    fn publish<T, F>(&self, location: Location, what: &str, derive: F) -> Result<T>
    where
        F: Fn(&Snapshot) -> Result<(Snapshot, T)>,
    {
        let mut current = self.state.load_full();
        loop {
            if current.phase == Phase::RunStarted {
                return Err(SuiteError::RegistrationClosed {
                    message: format!(
                        "{} may not be registered after suite {} has started running",
                        what, self.suite_id
                    ),
                    location,
                });
            }
            let (next, out) = derive(&current)?;
            let prev = self.state.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&prev, &current) {
                return Ok(out);
            }
            current = Guard::into_inner(prev);
        }
    }

    fn restore_cursor(&self, opened: NodeId, previous: NodeId) {
        let mut current = self.state.load_full();
        loop {
            if current.phase == Phase::RunStarted || current.cursor != opened {
                return;
            }
            let mut next = (*current).clone();
            next.cursor = previous;
            let prev = self.state.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&prev, &current) {
                return;
            }
            current = Guard::into_inner(prev);
        }
    }
}

fn not_allowed(snap: &Snapshot, message: String, call: Location) -> SuiteError {
    let opened_at = snap.tree.branch(snap.cursor).and_then(|b| b.location);
    SuiteError::NotAllowed {
        message,
        location: opened_at.unwrap_or(call),
        call,
    }
}

fn collect_tags(tags: &[&str]) -> Result<TagSet> {
    let mut set = TagSet::new();
    for (i, tag) in tags.iter().enumerate() {
        if tag.trim().is_empty() {
            return Err(if i == 0 {
                null_arg!("first test tag")
            } else {
                null_arg!("a test tag")
            });
        }
        set.insert(tag.to_string());
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_body() -> TestBody {
        Arc::new(|_: &TestContext<'_>| -> TestResult { Ok(()) })
    }

    struct NoNestedFeatures;

    impl NestingRule for NoNestedFeatures {
        fn check_scope(&self, kind: ScopeKind, enclosing: &[ScopeKind]) -> std::result::Result<(), String> {
            if kind == ScopeKind("feature") && !enclosing.is_empty() {
                return Err("Feature clauses cannot be nested".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn names_keep_registration_order() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        for name in ["zeta", "alpha", "mid"] {
            engine.register_test(name, &[], ok_body()).unwrap();
        }
        let names: Vec<_> = engine.test_names().into_iter().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(engine.test_entry("alpha").unwrap().ordinal, 1);
    }

    #[test]
    fn duplicate_names_fail_whichever_call_came_first() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        engine.register_ignored_test("t", &[], ok_body()).unwrap();
        let err = engine.register_test("t", &[], ok_body()).unwrap_err();
        assert!(matches!(err, SuiteError::DuplicateTestName { ref name, .. } if name == "t"));
        let err = engine.register_ignored_test("t", &[], ok_body()).unwrap_err();
        assert!(matches!(err, SuiteError::DuplicateTestName { .. }));
        assert_eq!(engine.test_count(), 1);
    }

    #[test]
    fn scoped_names_are_prefixed_and_cursor_is_restored() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        engine
            .register_nested_scope(ScopeKind("describe"), "A Stack", None, |e| {
                e.register_test("pops", &[], ok_body())
            })
            .unwrap();
        engine.register_test("after", &[], ok_body()).unwrap();
        let names: Vec<_> = engine.test_names().into_iter().collect();
        assert_eq!(names, ["A Stack pops", "after"]);
    }

    #[test]
    fn cursor_is_restored_when_the_body_fails() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        let result = engine.register_nested_scope(ScopeKind("describe"), "outer", None, |e| {
            e.register_test("x", &[], ok_body())?;
            e.register_test("x", &[], ok_body())
        });
        assert!(result.is_err());
        engine.register_test("top", &[], ok_body()).unwrap();
        assert!(engine.test_names().contains("top"));
    }

    #[test]
    fn blank_tags_are_null_tags() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        let first = engine.register_test("a", &[""], ok_body()).unwrap_err();
        assert_eq!(first.to_string(), "first test tag was null");
        let later = engine.register_test("b", &["Slow", " "], ok_body()).unwrap_err();
        assert_eq!(later.to_string(), "a test tag was null");
    }

    #[test]
    fn registration_after_run_start_is_closed() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        engine.register_test("a", &[], ok_body()).unwrap();
        assert!(engine.transition_to_run());
        assert!(!engine.transition_to_run());
        let err = engine.register_test("b", &[], ok_body()).unwrap_err();
        assert!(err.is_registration_closed());
        let err = engine
            .register_nested_scope(ScopeKind("describe"), "d", None, |_| Ok(()))
            .unwrap_err();
        assert!(err.is_registration_closed());
        assert_eq!(engine.test_count(), 1);
    }

    #[test]
    fn nested_feature_is_reported_at_the_enclosing_call() {
        let engine = Engine::new("s", Arc::new(NoNestedFeatures));
        let outer_line;
        let mut inner_line = 0;
        let err = {
            outer_line = line!() + 1;
            engine.register_nested_scope(ScopeKind("feature"), "outer", None, |e| {
                inner_line = line!() + 1;
                e.register_nested_scope(ScopeKind("feature"), "inner", None, |_| Ok(()))
            })
        }
        .unwrap_err();
        match err {
            SuiteError::NotAllowed { message, location, call } => {
                assert_eq!(message, "Feature clauses cannot be nested");
                assert_eq!(location.line, outer_line);
                assert_eq!(call.line, inner_line);
                assert_eq!(location.file_name(), "engine.rs");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn tags_view_is_the_inverse_of_entry_tags() {
        let engine = Engine::new("s", Arc::new(FreeNesting));
        engine.register_test("a", &["Slow"], ok_body()).unwrap();
        engine.register_ignored_test("b", &["Slow"], ok_body()).unwrap();
        engine.register_test("c", &[], ok_body()).unwrap();
        let index = engine.tags();
        assert_eq!(index.tests_tagged("Slow"), ["a".to_string(), "b".to_string()]);
        assert_eq!(index.tests_tagged(IGNORE_TAG), ["b".to_string()]);
        assert!(!engine.test_tags().contains("c"));
    }

    #[test]
    fn concurrent_readers_see_a_consistent_snapshot() {
        let engine = Arc::new(Engine::new("s", Arc::new(FreeNesting)));
        for i in 0..50 {
            engine.register_test(&format!("t{}", i), &[], ok_body()).unwrap();
        }
        engine.transition_to_run();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let snap = engine.snapshot();
                    assert_eq!(snap.entries().count(), snap.names.len());
                    engine.test_names().len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 50);
        }
    }

    #[test]
    fn racing_registrations_never_land_after_the_transition() {
        let engine = Arc::new(Engine::new("s", Arc::new(FreeNesting)));
        let writer = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let mut accepted = 0;
                for i in 0..200 {
                    if engine.register_test(&format!("t{}", i), &[], ok_body()).is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            })
        };
        engine.transition_to_run();
        let frozen = engine.test_count();
        let accepted = writer.join().unwrap();
        assert_eq!(frozen, accepted);
        assert_eq!(engine.test_count(), frozen);
    }
}
