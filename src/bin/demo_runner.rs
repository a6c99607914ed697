// Demo suites run through the suitekit command line.
// Usage: cargo run --bin suitekit-demo -- [list|run] [--include TAG]... [--exclude TAG]...
//
// The `Broken` tag marks tests that fail on purpose; exclude it for a green run.

use std::sync::Arc;
use suitekit::errors::Result;
use suitekit::runner::SuiteSlot;
use suitekit::styles::{FeatureSpec, FunSpec, WordSpec};
use suitekit::suite::{ensure, Suite, TestContext, TestFailure, TestResult};

fn stack_spec() -> Result<FunSpec> {
    FunSpec::build("StackSpec", |s| {
        s.describe("A Stack", |s| {
            s.it("pops values in last-in-first-out order", &["Fast"], |_| {
                let mut stack = vec![1, 2];
                ensure(stack.pop() == Some(2), "expected 2 on top")?;
                ensure(stack.pop() == Some(1), "expected 1 below")
            })?;
            s.describe("when empty", |s| {
                s.it("has no top", &["Fast"], |_| ensure(Vec::<i32>::new().last().is_none(), "empty stack had a top"))?;
                s.ignore("grows on demand", &[], |_| Ok(()))
            })?;
            s.it("survives a million pushes", &["Slow"], |ctx| {
                let stack: Vec<u32> = (0..1_000_000).collect();
                ctx.info(format!("pushed {}", stack.len()));
                ensure(stack.len() == 1_000_000, "lost a push")
            })?;
            s.pending("supports peek", &[])
        })
    })
}

fn login_feature() -> Result<FeatureSpec> {
    FeatureSpec::build("LoginFeature", |s| {
        s.feature("Sign in", |s| {
            s.info("accounts are created fresh for each scenario")?;
            s.scenario("with a valid password", &["Fast"], |_| Ok(()))?;
            s.scenario("with an expired account", &["Db"], |_| {
                Err(TestFailure::canceled("no database available"))
            })?;
            s.ignore_scenario("with two-factor auth", &["Db"], |_| Ok(()))
        })
    })
}

fn queue_spec() -> Result<WordSpec> {
    WordSpec::build("QueueSpec", |s| {
        s.when("A Queue", |s| {
            s.should("empty", |s| s.test("have size zero", &["Fast"], |_| Ok(())))?;
            s.must("full", |s| {
                s.test("reject an offer", &["Broken"], |_| {
                    Err(TestFailure::failed("offer was accepted"))
                })
            })
        })
    })
}

fn late_registration() -> Result<FunSpec> {
    FunSpec::build("LateRegistration", |s| {
        s.it("registers from inside a body", &["Broken"], |ctx| {
            ctx.engine()
                .register_test("too late", &[], Arc::new(|_: &TestContext<'_>| -> TestResult { Ok(()) }))?;
            Ok(())
        })
    })
}

fn ready<S: Suite + 'static>(name: &str, suite: Result<S>) -> SuiteSlot {
    SuiteSlot::from_result(name, suite.map(|s| Arc::new(s) as Arc<dyn Suite>))
}

fn main() {
    let slots = vec![
        ready("StackSpec", stack_spec()),
        ready("LoginFeature", login_feature()),
        ready("QueueSpec", queue_spec()),
        ready("LateRegistration", late_registration()),
    ];
    std::process::exit(suitekit::cli::run(slots));
}
