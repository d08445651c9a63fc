//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard as StdMutexGuard, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::config::{DEFAULT_APP_NAME_PREFIX, DEFAULT_REFERENCE_REPOSITORY, DeploySettings};
use crate::credential::CredentialValidator;
use crate::fork::{
    FetchError, HostFuture, ParentRepository, ReferenceRepository, RepositoryHost,
    RepositoryRecord,
};
use crate::platform::{
    AppName, AppRecord, AppRequest, BuildSource, ConfigVars, Platform, PlatformError,
    PlatformFuture,
};
use crate::provision::ProvisionSettings;

/// Source archive used by [`deploy_settings`].
pub const SAMPLE_SOURCE_ARCHIVE: &str = "https://github.com/Arslan-MD/Arslan-Botz/tarball/main";

/// Deploy settings mirroring the production defaults.
///
/// # Panics
///
/// Panics if the default reference repository stops parsing, which would be
/// a defect in the defaults themselves.
#[must_use]
pub fn deploy_settings(require_fork_check: bool) -> DeploySettings {
    let reference = ReferenceRepository::parse(DEFAULT_REFERENCE_REPOSITORY)
        .unwrap_or_else(|| panic!("default reference repository should parse"));
    DeploySettings {
        validator: CredentialValidator::default(),
        reference,
        require_fork_check,
        provision: ProvisionSettings {
            name_prefix: DEFAULT_APP_NAME_PREFIX.to_owned(),
            region: String::from("eu"),
            source_archive_url: SAMPLE_SOURCE_ARCHIVE.to_owned(),
            platform_domain: String::from("herokuapp.com"),
            include_account: true,
        },
    }
}

/// Platform operation selector used for failure injection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PlatformOp {
    /// `create_app`.
    Create,
    /// `set_config`.
    Configure,
    /// `trigger_build`.
    Build,
    /// `list_apps`.
    List,
    /// `delete_app`.
    Delete,
}

/// Records a single call made through [`ScriptedPlatform`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlatformCall {
    /// An app creation request.
    Create {
        /// Requested name.
        name: AppName,
        /// Requested region.
        region: String,
    },
    /// A configuration update.
    Configure {
        /// Target app.
        name: AppName,
        /// Variables sent.
        vars: ConfigVars,
    },
    /// A build trigger.
    Build {
        /// Target app.
        name: AppName,
        /// Source archive URL.
        source_url: String,
    },
    /// An app listing.
    List,
    /// An app deletion.
    Delete {
        /// Target app.
        name: AppName,
    },
}

impl PlatformCall {
    /// Operation this call corresponds to.
    #[must_use]
    pub const fn op(&self) -> PlatformOp {
        match self {
            Self::Create { .. } => PlatformOp::Create,
            Self::Configure { .. } => PlatformOp::Configure,
            Self::Build { .. } => PlatformOp::Build,
            Self::List => PlatformOp::List,
            Self::Delete { .. } => PlatformOp::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct PlatformState {
    apps: BTreeMap<AppName, AppRecord>,
    failures: HashMap<PlatformOp, VecDeque<PlatformError>>,
    calls: Vec<PlatformCall>,
}

/// In-memory platform that keeps an app inventory, records every call and
/// fails operations on demand.
///
/// Created apps receive the current time as `created_at`; [`Self::seed_app`]
/// inserts apps with arbitrary timestamps.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl ScriptedPlatform {
    /// Creates an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StdMutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an existing app created at `created_at`.
    pub fn seed_app(&self, name: &str, created_at: DateTime<Utc>) {
        let record = app_record(name, created_at);
        self.lock().apps.insert(record.name.clone(), record);
    }

    /// Adds an existing app created `hours` before `now`.
    pub fn seed_app_aged(&self, name: &str, now: DateTime<Utc>, hours: i64) {
        self.seed_app(name, now - ChronoDuration::hours(hours));
    }

    /// Makes the next call of `op` fail with `error`. Repeated calls queue
    /// further failures in FIFO order.
    pub fn fail_next(&self, op: PlatformOp, error: PlatformError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Returns a snapshot of all calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Returns recorded calls of a single operation.
    #[must_use]
    pub fn calls_of(&self, op: PlatformOp) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.op() == op)
            .collect()
    }

    /// Names of the apps currently present, sorted.
    #[must_use]
    pub fn app_names(&self) -> Vec<String> {
        self.lock()
            .apps
            .keys()
            .map(|name| name.as_str().to_owned())
            .collect()
    }

    /// Configuration last applied to `name`, if any.
    #[must_use]
    pub fn config_of(&self, name: &str) -> Option<ConfigVars> {
        self.calls().into_iter().rev().find_map(|call| match call {
            PlatformCall::Configure { name: target, vars } if target.as_str() == name => Some(vars),
            _ => None,
        })
    }

    fn record(&self, call: PlatformCall) -> Result<(), PlatformError> {
        let mut state = self.lock();
        let op = call.op();
        state.calls.push(call);
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn require_app(&self, name: &AppName) -> Result<(), PlatformError> {
        if self.lock().apps.contains_key(name) {
            Ok(())
        } else {
            Err(PlatformError::NotFound {
                name: name.as_str().to_owned(),
            })
        }
    }
}

impl Platform for ScriptedPlatform {
    fn create_app<'a>(&'a self, request: &'a AppRequest) -> PlatformFuture<'a, AppRecord> {
        let result = self
            .record(PlatformCall::Create {
                name: request.name.clone(),
                region: request.region.clone(),
            })
            .and_then(|()| {
                let mut state = self.lock();
                if state.apps.contains_key(&request.name) {
                    return Err(PlatformError::Api {
                        action: String::from("create app"),
                        status: 422,
                        body: String::from(r#"{"id":"invalid_params","message":"Name is already taken"}"#),
                    });
                }
                let record = app_record(request.name.as_str(), Utc::now());
                state.apps.insert(record.name.clone(), record.clone());
                Ok(record)
            });
        Box::pin(std::future::ready(result))
    }

    fn set_config<'a>(&'a self, name: &'a AppName, vars: &'a ConfigVars) -> PlatformFuture<'a, ()> {
        let result = self
            .record(PlatformCall::Configure {
                name: name.clone(),
                vars: vars.clone(),
            })
            .and_then(|()| self.require_app(name));
        Box::pin(std::future::ready(result))
    }

    fn trigger_build<'a>(
        &'a self,
        name: &'a AppName,
        source: &'a BuildSource,
    ) -> PlatformFuture<'a, ()> {
        let result = self
            .record(PlatformCall::Build {
                name: name.clone(),
                source_url: source.url.clone(),
            })
            .and_then(|()| self.require_app(name));
        Box::pin(std::future::ready(result))
    }

    fn list_apps(&self) -> PlatformFuture<'_, Vec<AppRecord>> {
        let result = self
            .record(PlatformCall::List)
            .map(|()| self.lock().apps.values().cloned().collect());
        Box::pin(std::future::ready(result))
    }

    fn delete_app<'a>(&'a self, name: &'a AppName) -> PlatformFuture<'a, ()> {
        let result = self
            .record(PlatformCall::Delete { name: name.clone() })
            .and_then(|()| match self.lock().apps.remove(name) {
                Some(_) => Ok(()),
                None => Err(PlatformError::NotFound {
                    name: name.as_str().to_owned(),
                }),
            });
        Box::pin(std::future::ready(result))
    }
}

/// Builds an [`AppRecord`] with a derived web URL.
#[must_use]
pub fn app_record(name: &str, created_at: DateTime<Utc>) -> AppRecord {
    AppRecord {
        name: AppName::from(name),
        created_at,
        web_url: Some(format!("https://{name}.herokuapp.com/")),
    }
}

/// Builds a repository record describing a fork of `parent_full_name`.
#[must_use]
pub fn fork_of(parent_full_name: &str) -> RepositoryRecord {
    RepositoryRecord {
        fork: true,
        parent: Some(ParentRepository {
            full_name: Some(parent_full_name.to_owned()),
        }),
    }
}

#[derive(Debug, Default)]
struct HostState {
    responses: VecDeque<Result<RepositoryRecord, FetchError>>,
    lookups: Vec<(String, String)>,
}

/// Repository host returning pre-seeded lookups in FIFO order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRepositoryHost {
    state: Arc<Mutex<HostState>>,
}

impl ScriptedRepositoryHost {
    /// Creates a host with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StdMutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a successful lookup.
    pub fn push_record(&self, record: RepositoryRecord) {
        self.lock().responses.push_back(Ok(record));
    }

    /// Queues a failed lookup.
    pub fn push_error(&self, error: FetchError) {
        self.lock().responses.push_back(Err(error));
    }

    /// Returns `(owner, name)` pairs looked up so far.
    #[must_use]
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lock().lookups.clone()
    }
}

impl RepositoryHost for ScriptedRepositoryHost {
    fn fetch_repository<'a>(
        &'a self,
        owner: &'a str,
        name: &'a str,
    ) -> HostFuture<'a, RepositoryRecord> {
        let mut state = self.lock();
        state.lookups.push((owner.to_owned(), name.to_owned()));
        let result = state.responses.pop_front().unwrap_or_else(|| {
            Err(FetchError::Transport {
                message: String::from("no scripted response available"),
            })
        });
        Box::pin(std::future::ready(result))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
