//! BDD scenarios for the reclamation sweep.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SweeperContext, sweeper_context};

#[scenario(
    path = "tests/features/sweeper.feature",
    name = "Expired owned apps are deleted and the rest are kept"
)]
fn scenario_expired_owned_apps_are_deleted(sweeper_context: SweeperContext) {
    let _ = sweeper_context;
}

#[scenario(
    path = "tests/features/sweeper.feature",
    name = "A repeated sweep finds nothing left to delete"
)]
fn scenario_repeated_sweep_is_idempotent(sweeper_context: SweeperContext) {
    let _ = sweeper_context;
}

#[scenario(
    path = "tests/features/sweeper.feature",
    name = "An app removed by someone else is tolerated"
)]
fn scenario_concurrent_removal_is_tolerated(sweeper_context: SweeperContext) {
    let _ = sweeper_context;
}

#[scenario(
    path = "tests/features/sweeper.feature",
    name = "A listing failure fails the pass"
)]
fn scenario_listing_failure_fails_the_pass(sweeper_context: SweeperContext) {
    let _ = sweeper_context;
}
