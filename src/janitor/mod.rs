//! Reclamation of expired apps.
//!
//! The janitor lists every app visible on the platform, keeps the ones whose
//! name carries the ownership prefix, and deletes those whose
//! platform-reported creation time is at least the retention period old.
//! The prefix is the only ownership signal; apps without it are never
//! touched. No state is kept between sweeps: each pass is a full re-scan.
//!
//! Deletions are independent. A failed deletion is logged and counted, and
//! the pass carries on with the remaining apps. An app that disappears
//! between listing and deletion (another process swept it first) is counted
//! as already gone rather than failed.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::platform::{AppRecord, Platform, PlatformError};

mod schedule;

pub use schedule::{DEFAULT_SWEEP_INTERVAL, SweeperHandle, spawn_sweeper};

/// Default retention period in hours.
pub const DEFAULT_RETENTION_HOURS: u64 = 24;

/// Configuration for a janitor sweep.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JanitorConfig {
    name_prefix: String,
    retention: TimeDelta,
}

impl JanitorConfig {
    /// Constructs a config, trimming the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::InvalidConfig`] when the prefix is blank or the
    /// retention is zero or too large to represent.
    pub fn new(name_prefix: impl Into<String>, retention_hours: u64) -> Result<Self, JanitorError> {
        let trimmed_prefix = name_prefix.into().trim().to_owned();
        if trimmed_prefix.is_empty() {
            return Err(JanitorError::InvalidConfig {
                field: String::from("name_prefix"),
            });
        }
        let retention = i64::try_from(retention_hours)
            .ok()
            .filter(|hours| *hours > 0)
            .and_then(TimeDelta::try_hours)
            .ok_or_else(|| JanitorError::InvalidConfig {
                field: String::from("retention_hours"),
            })?;
        Ok(Self {
            name_prefix: trimmed_prefix,
            retention,
        })
    }

    /// Ownership prefix.
    #[must_use]
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Minimum age at which an owned app is deleted.
    #[must_use]
    pub const fn retention(&self) -> TimeDelta {
        self.retention
    }

    /// Returns `true` when `name` carries the ownership prefix.
    #[must_use]
    pub fn owns(&self, name: &str) -> bool {
        name.starts_with(self.name_prefix.as_str())
    }

    /// Returns `true` when an app created at `created_at` has reached the
    /// retention age at `now`. Creation times in the future never expire.
    #[must_use]
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at) >= self.retention
    }
}

/// Summary of janitor work.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepSummary {
    /// Apps returned by the listing.
    pub examined: usize,
    /// Apps carrying the ownership prefix.
    pub owned: usize,
    /// Owned apps past the retention age.
    pub expired: usize,
    /// Expired apps deleted during this pass.
    pub deleted: usize,
    /// Expired apps that were already gone when deletion was attempted.
    pub already_gone: usize,
    /// Expired apps whose deletion failed.
    pub failed: usize,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examined={}, expired={}, deleted={}, already_gone={}, failed={}",
            self.examined, self.expired, self.deleted, self.already_gone, self.failed
        )
    }
}

/// Errors returned by the janitor.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum JanitorError {
    /// Raised when configuration is missing required values.
    #[error("invalid {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when the app listing cannot be obtained; nothing is deleted.
    #[error("failed to list apps: {0}")]
    List(#[source] PlatformError),
}

/// Deletes expired, owned apps.
#[derive(Clone)]
pub struct Janitor {
    platform: Arc<dyn Platform>,
    config: JanitorConfig,
}

impl fmt::Debug for Janitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Janitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Janitor {
    /// Creates a new janitor using the provided platform and configuration.
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, config: JanitorConfig) -> Self {
        Self { platform, config }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Performs a sweep against the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::List`] when the listing fails.
    pub async fn sweep(&self) -> Result<SweepSummary, JanitorError> {
        self.sweep_at(Utc::now()).await
    }

    /// Performs a sweep, measuring ages against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::List`] when the listing fails. Individual
    /// deletion failures are reported through [`SweepSummary::failed`].
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepSummary, JanitorError> {
        tracing::info!(prefix = %self.config.name_prefix, "sweep started");
        let apps = self.platform.list_apps().await.map_err(JanitorError::List)?;

        let mut summary = SweepSummary {
            examined: apps.len(),
            ..SweepSummary::default()
        };

        let owned: Vec<&AppRecord> = apps
            .iter()
            .filter(|app| self.config.owns(app.name.as_str()))
            .collect();
        summary.owned = owned.len();

        for app in owned
            .into_iter()
            .filter(|app| self.config.is_expired(app.created_at, now))
        {
            summary.expired += 1;
            match self.platform.delete_app(&app.name).await {
                Ok(()) => {
                    tracing::info!(app = %app.name, created_at = %app.created_at, "deleted expired app");
                    summary.deleted += 1;
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(app = %app.name, "app already deleted");
                    summary.already_gone += 1;
                }
                Err(err) => {
                    tracing::warn!(app = %app.name, error = %err, "failed to delete expired app");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
