use std::sync::Arc;
use suitekit::styles::{FeatureSpec, FunSpec, WordSpec};
use suitekit::reporter::{Event, RecordingReporter};
use suitekit::runner::run_slots;
use suitekit::{
    Filter, Phase, RunOptions, Suite, SuiteError, SuiteSlot, TestContext, TestResult, IGNORE_TAG,
};

#[test]
fn nested_feature_points_at_the_outer_feature_call() {
    let outer_line = line!() + 3;
    let inner_line = line!() + 3;
    let err = FeatureSpec::build("Checkout", |s| {
        s.feature("Payment", |s| {
            s.feature("Refunds", |_| Ok(()))
        })
    })
    .err()
    .expect("nested feature must fail");

    match err {
        SuiteError::NotAllowed { message, location, call } => {
            assert_eq!(message, "Feature clauses cannot be nested");
            assert_eq!(location.line, outer_line);
            assert_eq!(call.line, inner_line);
            assert_eq!(location.file_name(), "registration_tests.rs");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn aborted_nested_feature_suite_is_reported_at_the_outer_call() {
    let outer_line = line!() + 2;
    let built = FeatureSpec::build("Checkout", |s| {
        s.feature("Payment", |s| {
            s.feature("Refunds", |_| Ok(()))
        })
    });
    let err = built.as_ref().err().expect("nested feature must fail");
    assert_eq!(
        err.to_string(),
        format!("Feature clauses cannot be nested (at registration_tests.rs:{})", outer_line)
    );

    let slot = SuiteSlot::from_result("Checkout", built.map(|s| Arc::new(s) as Arc<dyn Suite>));
    let reporter = RecordingReporter::new();
    run_slots(&[slot], &Filter::default(), &reporter, RunOptions::default());
    let aborted_line = reporter.events().into_iter().find_map(|e| match e {
        Event::SuiteAborted { location, .. } => location.map(|l| l.line),
        _ => None,
    });
    assert_eq!(aborted_line, Some(outer_line));
}

#[test]
fn duplicate_full_names_fail_across_scopes_and_kinds() {
    let err = FunSpec::build("Dup", |s| {
        s.describe("A Stack", |s| s.it("pops", &[], |_| Ok(())))?;
        s.ignore("A Stack pops", &[], |_| Ok(()))
    })
    .err()
    .unwrap();
    assert!(matches!(err, SuiteError::DuplicateTestName { ref name, .. } if name == "A Stack pops"));
}

#[test]
fn names_tags_and_order_reflect_registration() {
    let spec = WordSpec::build("Words", |s| {
        s.when("A Queue", |s| {
            s.should("empty", |s| {
                s.test("have size zero", &["Fast"], |_| Ok(()))?;
                s.ignore("refuse a poll", &["Fast"], |_| Ok(()))
            })
        })?;
        s.can("A Deque", |s| s.pending("rotate", &[]))
    })
    .unwrap();

    assert_eq!(
        spec.test_names(),
        [
            "A Queue when empty should have size zero",
            "A Queue when empty should refuse a poll",
            "A Deque can rotate",
        ]
    );
    let index = spec.engine().tags();
    assert_eq!(index.tests_tagged("Fast").len(), 2);
    assert_eq!(index.tests_tagged(IGNORE_TAG), ["A Queue when empty should refuse a poll".to_string()]);
    assert!(index.tests_tagged("Slow").is_empty());
}

#[test]
fn registration_is_closed_once_the_run_starts() {
    let spec = FunSpec::build("Closed", |s| s.it("a", &[], |_| Ok(()))).unwrap();
    assert_eq!(spec.engine().phase(), Phase::Registering);
    assert!(spec.engine().transition_to_run());
    assert_eq!(spec.engine().phase(), Phase::RunStarted);

    let err = spec.it("b", &[], |_| Ok(())).unwrap_err();
    assert!(err.is_registration_closed());
    assert!(spec.describe("later", |_| Ok(())).unwrap_err().is_registration_closed());
    assert!(spec.info("late note").unwrap_err().is_registration_closed());
    assert_eq!(spec.test_names(), ["a"]);
}

#[test]
fn snapshots_taken_before_a_registration_do_not_change() {
    let spec = FunSpec::new("Snap");
    spec.it("first", &[], |_| Ok(())).unwrap();
    let before = spec.engine().snapshot();
    spec.it("second", &[], |_| Ok(())).unwrap();
    assert_eq!(before.entries().count(), 1);
    assert_eq!(spec.engine().snapshot().entries().count(), 2);
}

#[test]
fn concurrent_transitions_flip_exactly_once() {
    let spec = Arc::new(FunSpec::build("Race", |s| s.it("a", &[], |_| Ok(()))).unwrap());
    let flips: usize = (0..8)
        .map(|_| {
            let spec = Arc::clone(&spec);
            std::thread::spawn(move || spec.engine().transition_to_run())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();
    assert_eq!(flips, 1);
}

#[test]
fn engine_accepts_prebuilt_bodies() {
    let spec = FunSpec::new("Raw");
    let body = Arc::new(|_: &TestContext<'_>| -> TestResult { Ok(()) });
    spec.engine().register_test("x", &["Db"], body.clone()).unwrap();
    assert_eq!(Arc::strong_count(&body), 2);
    let entry = spec.engine().test_entry("x").unwrap();
    assert_eq!(entry.ordinal, 0);
    assert!(entry.tags.contains("Db"));
}
