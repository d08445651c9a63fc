//! Step definitions, fixtures and scenario bindings for the sweeper.

mod bdd_steps;
mod scenarios;
mod test_helpers;
