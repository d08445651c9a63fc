//! Core library for the Slipway deploy service.
//!
//! Slipway turns a validated bot session credential into a freshly built
//! Heroku app and reclaims those apps once they are a day old. The pieces
//! are usable on their own: credential checks, the fork gate, the
//! provisioning sequence, the janitor and the HTTP router all talk to remote
//! services through the [`Platform`] and [`RepositoryHost`] traits.

pub mod config;
pub mod credential;
pub mod fork;
pub mod gateway;
pub mod janitor;
pub mod platform;
pub mod provision;
pub mod telemetry;
pub mod test_support;

pub use config::{ConfigError, DeploySettings, SlipwayConfig};
pub use credential::{CredentialValidator, SessionCredential};
pub use fork::{ForkVerifier, GithubClient, ReferenceRepository, RepositoryHost};
pub use gateway::{DeployOutcome, DeployRequest, DeployService, build_router};
pub use janitor::{
    Janitor, JanitorConfig, JanitorError, SweepSummary, SweeperHandle, spawn_sweeper,
};
pub use platform::{AppName, HerokuPlatform, HerokuSettings, Platform, PlatformError};
pub use provision::{Deployment, ProvisionError, ProvisionStage, Provisioner};
pub use telemetry::init_tracing;
