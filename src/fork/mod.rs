//! Fork-membership verification against a code-hosting API.
//!
//! A deploy may be gated on the requesting account owning a fork of a fixed
//! reference repository. The verifier performs exactly one lookup of
//! `<account>/<repository name>` and accepts only records that report
//! `fork == true` with a parent whose full name equals the reference. Every
//! failure (transport, status, decoding, missing fields) reads as "not
//! verified"; nothing is raised to the caller.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;

/// Default GitHub REST endpoint.
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Longest account name the code host allows.
const MAX_ACCOUNT_LEN: usize = 39;

/// Future returned by repository lookups.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'a>>;

/// Errors raised by repository lookups.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FetchError {
    /// The host answered with a status other than `200`.
    #[error("repository lookup returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// The request never produced a response.
    #[error("repository lookup failed: {message}")]
    Transport {
        /// Transport error message.
        message: String,
    },
    /// The response body was not a repository record.
    #[error("failed to decode repository record: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },
}

/// Subset of a repository record relevant to fork checks.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct RepositoryRecord {
    /// Whether the repository is a fork.
    #[serde(default)]
    pub fork: bool,
    /// Immediate parent when the repository is a fork.
    #[serde(default)]
    pub parent: Option<ParentRepository>,
}

/// Parent repository summary.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ParentRepository {
    /// `owner/name` of the parent.
    #[serde(default)]
    pub full_name: Option<String>,
}

impl RepositoryRecord {
    /// Returns `true` when this record is a direct fork of `reference`.
    #[must_use]
    pub fn is_fork_of(&self, reference: &ReferenceRepository) -> bool {
        self.fork
            && self
                .parent
                .as_ref()
                .and_then(|parent| parent.full_name.as_deref())
                .is_some_and(|full_name| full_name == reference.full_name())
    }
}

/// The repository every verified account must have forked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceRepository {
    owner: String,
    name: String,
}

impl ReferenceRepository {
    /// Parses an `owner/name` pair. Returns `None` unless both halves are
    /// non-empty and no further `/` appears.
    #[must_use]
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Repository name without the owner.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Page where a user creates their fork.
    #[must_use]
    pub fn fork_url(&self) -> String {
        format!("https://github.com/{}/{}/fork", self.owner, self.name)
    }
}

impl fmt::Display for ReferenceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Read access to repository metadata on a code host.
pub trait RepositoryHost: Send + Sync {
    /// Fetches the record for `owner/name`.
    fn fetch_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> HostFuture<'a, RepositoryRecord>;
}

/// Decides whether an account has forked the reference repository.
#[derive(Clone)]
pub struct ForkVerifier {
    host: Arc<dyn RepositoryHost>,
    reference: ReferenceRepository,
}

impl fmt::Debug for ForkVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkVerifier")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

impl ForkVerifier {
    /// Creates a verifier querying `host` for forks of `reference`.
    #[must_use]
    pub fn new(host: Arc<dyn RepositoryHost>, reference: ReferenceRepository) -> Self {
        Self { host, reference }
    }

    /// Returns `true` only when `account` owns a direct fork of the
    /// reference repository. Single attempt, no retry.
    pub async fn verify(&self, account: &str) -> bool {
        let account_name = account.trim();
        if !is_plausible_account(account_name) {
            tracing::debug!("fork check skipped for malformed account name");
            return false;
        }

        match self
            .host
            .fetch_repository(account_name, self.reference.name())
            .await
        {
            Ok(record) => record.is_fork_of(&self.reference),
            Err(err) => {
                tracing::debug!(account = account_name, error = %err, "fork lookup failed");
                false
            }
        }
    }
}

/// Account names are ASCII alphanumerics and hyphens, at most 39 long.
/// Anything else never reaches the URL path.
fn is_plausible_account(account: &str) -> bool {
    !account.is_empty()
        && account.len() <= MAX_ACCOUNT_LEN
        && account
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

/// [`RepositoryHost`] backed by the GitHub REST API.
#[derive(Clone, Debug)]
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
}

impl GithubClient {
    /// Builds a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the HTTP client cannot be built.
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Transport {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    async fn fetch(&self, owner: &str, name: &str) -> Result<RepositoryRecord, FetchError> {
        let url = format!(
            "{}/repos/{owner}/{name}",
            self.api_base.trim_end_matches('/')
        );
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("slipway/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<RepositoryRecord>()
            .await
            .map_err(|err| FetchError::Decode {
                message: err.to_string(),
            })
    }
}

impl RepositoryHost for GithubClient {
    fn fetch_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> HostFuture<'a, RepositoryRecord> {
        Box::pin(self.fetch(owner, name))
    }
}
