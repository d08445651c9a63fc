//! BDD step definitions for sweeper behaviour.

use std::sync::Arc;

use rstest_bdd_macros::{given, then, when};
use slipway::janitor::{Janitor, JanitorError};
use slipway::platform::PlatformError;
use slipway::test_support::PlatformOp;
use tokio::runtime::Runtime;

use super::test_helpers::{SweeperContext, build_config, name_list};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a janitor for apps prefixed \"{prefix}\" kept for {hours:u64} hours")]
fn configured_janitor(sweeper_context: &SweeperContext, prefix: String, hours: u64) {
    sweeper_context.state().config = Some(build_config(&prefix, hours));
}

#[given("an app \"{name}\" created {hours:i64} hours ago")]
fn seeded_app(sweeper_context: &SweeperContext, name: String, hours: i64) {
    sweeper_context
        .platform
        .seed_app_aged(name.trim(), sweeper_context.now, hours);
}

#[given("the platform already removed \"{name}\"")]
fn removed_concurrently(sweeper_context: &SweeperContext, name: String) {
    sweeper_context.platform.fail_next(
        PlatformOp::Delete,
        PlatformError::NotFound {
            name: name.trim().to_owned(),
        },
    );
}

#[given("the platform refuses to list apps")]
fn listing_refused(sweeper_context: &SweeperContext) {
    sweeper_context.platform.fail_next(
        PlatformOp::List,
        PlatformError::Api {
            action: String::from("list apps"),
            status: 503,
            body: String::from("service unavailable"),
        },
    );
}

#[when("the janitor sweeps")]
fn run_sweep(sweeper_context: &SweeperContext) -> Result<(), StepError> {
    let config = sweeper_context
        .state()
        .config
        .clone()
        .ok_or_else(|| StepError::Assertion(String::from("janitor is not configured")))?;
    let janitor = Janitor::new(Arc::new(sweeper_context.platform.clone()), config);
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let outcome = runtime.block_on(janitor.sweep_at(sweeper_context.now));
    sweeper_context.state().outcomes.push(outcome);
    Ok(())
}

#[then("the sweep deletes {count:usize} app")]
fn reports_deletions(sweeper_context: &SweeperContext, count: usize) -> Result<(), StepError> {
    match sweeper_context.last_outcome() {
        Some(Ok(summary)) if summary.deleted == count => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {count} deletions, got {other:?}"
        ))),
    }
}

#[then("the sweep counts {count:usize} app as already gone")]
fn reports_already_gone(sweeper_context: &SweeperContext, count: usize) -> Result<(), StepError> {
    match sweeper_context.last_outcome() {
        Some(Ok(summary)) if summary.already_gone == count && summary.failed == 0 => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {count} already-gone apps, got {other:?}"
        ))),
    }
}

#[then("the sweep fails with a listing error")]
fn reports_listing_failure(sweeper_context: &SweeperContext) -> Result<(), StepError> {
    match sweeper_context.last_outcome() {
        Some(Err(JanitorError::List(_))) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a listing failure, got {other:?}"
        ))),
    }
}

#[then("the remaining apps are \"{names}\"")]
fn remaining_apps(sweeper_context: &SweeperContext, names: String) -> Result<(), StepError> {
    let expected = name_list(&names);
    let actual = sweeper_context.platform.app_names();
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected remaining apps {expected:?}, got {actual:?}"
        )))
    }
}
