//! Shared fixtures and helpers for sweeper BDD scenarios.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use rstest::fixture;
use slipway::janitor::{JanitorConfig, JanitorError, SweepSummary};
use slipway::test_support::ScriptedPlatform;

#[derive(Debug, Default)]
pub struct ScenarioState {
    pub config: Option<JanitorConfig>,
    pub outcomes: Vec<Result<SweepSummary, JanitorError>>,
}

/// Scenario context. Clones share the platform and the scenario state.
#[derive(Clone, Debug)]
pub struct SweeperContext {
    pub platform: ScriptedPlatform,
    pub now: DateTime<Utc>,
    state: Arc<Mutex<ScenarioState>>,
}

impl SweeperContext {
    pub fn state(&self) -> MutexGuard<'_, ScenarioState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_outcome(&self) -> Option<Result<SweepSummary, JanitorError>> {
        self.state().outcomes.last().cloned()
    }
}

#[fixture]
pub fn sweeper_context() -> SweeperContext {
    let now = Utc
        .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("fixed scenario clock should be valid"));
    SweeperContext {
        platform: ScriptedPlatform::new(),
        now,
        state: Arc::new(Mutex::new(ScenarioState::default())),
    }
}

pub fn build_config(prefix: &str, hours: u64) -> JanitorConfig {
    JanitorConfig::new(prefix, hours)
        .unwrap_or_else(|err| panic!("janitor config should be valid: {err}"))
}

/// Splits a comma-separated step argument into trimmed names.
pub fn name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}
