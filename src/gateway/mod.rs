//! HTTP entry point for deploy requests.
//!
//! `POST /deploy` validates the session credential, optionally checks that
//! the caller has forked the reference repository, provisions an app, and
//! answers with exactly one JSON document. Client mistakes map to `400`,
//! provisioning failures to `500` with the platform's diagnostic attached.

use std::fmt;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::config::DeploySettings;
use crate::credential::CredentialValidator;
use crate::fork::{ForkVerifier, ReferenceRepository, RepositoryHost};
use crate::platform::Platform;
use crate::provision::{Deployment, ProvisionStage, Provisioner};

/// Body of `POST /deploy`. Missing fields read as empty strings and are
/// rejected by validation rather than by the JSON extractor.
#[derive(Clone, Default, Deserialize, Eq, PartialEq)]
pub struct DeployRequest {
    /// Code-hosting account of the requester.
    #[serde(rename = "github_username", default)]
    pub account: String,
    /// Session credential to hand to the new app.
    #[serde(rename = "session_id", default)]
    pub session_credential: String,
}

impl fmt::Debug for DeployRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployRequest")
            .field("account", &self.account)
            .field("session_credential", &"<redacted>")
            .finish()
    }
}

/// Result of handling one deploy request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeployOutcome {
    /// The app was provisioned.
    Deployed(Deployment),
    /// The request body was not a JSON object of the expected shape.
    MalformedRequest {
        /// Extractor message.
        reason: String,
    },
    /// The credential is missing or malformed.
    InvalidCredential {
        /// Expected credential shape.
        format_hint: String,
    },
    /// The fork check is enabled and no account was supplied.
    MissingAccount {
        /// Where the user can create the fork.
        fork_url: String,
    },
    /// The account has not forked the reference repository.
    ForkRequired {
        /// `owner/name` of the reference repository.
        reference: String,
        /// Where the user can create the fork.
        fork_url: String,
    },
    /// A provisioning step failed.
    ProvisionFailed {
        /// Step that failed.
        stage: ProvisionStage,
        /// Platform diagnostic.
        detail: String,
    },
}

#[derive(Serialize)]
struct DeployedBody<'a> {
    success: bool,
    url: &'a str,
    #[serde(rename = "appName")]
    app_name: &'a str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fork_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorBody {
    const fn new(error: String) -> Self {
        Self {
            error,
            fork_url: None,
            details: None,
        }
    }
}

impl IntoResponse for DeployOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Deployed(deployment) => (
                StatusCode::OK,
                Json(DeployedBody {
                    success: true,
                    url: &deployment.url,
                    app_name: deployment.name.as_str(),
                }),
            )
                .into_response(),
            Self::MalformedRequest { reason } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    details: Some(reason),
                    ..ErrorBody::new(String::from("Invalid request body"))
                }),
            )
                .into_response(),
            Self::InvalidCredential { format_hint } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(format!(
                    "Invalid SESSION_ID! Format: {format_hint}"
                ))),
            )
                .into_response(),
            Self::MissingAccount { fork_url } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    fork_url: Some(fork_url),
                    ..ErrorBody::new(String::from("github_username is required"))
                }),
            )
                .into_response(),
            Self::ForkRequired {
                reference,
                fork_url,
            } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    fork_url: Some(fork_url),
                    ..ErrorBody::new(format!(
                        "Fork {reference} to your GitHub account first"
                    ))
                }),
            )
                .into_response(),
            Self::ProvisionFailed { stage, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    details: Some(detail),
                    ..ErrorBody::new(format!("Deployment failed at {stage}"))
                }),
            )
                .into_response(),
        }
    }
}

/// Sequences validation, fork verification and provisioning.
#[derive(Debug)]
pub struct DeployService {
    validator: CredentialValidator,
    reference: ReferenceRepository,
    verifier: Option<ForkVerifier>,
    provisioner: Provisioner,
}

impl DeployService {
    /// Wires the service. The repository host is only consulted when the
    /// fork check is enabled.
    #[must_use]
    pub fn new(
        settings: DeploySettings,
        platform: Arc<dyn Platform>,
        host: Arc<dyn RepositoryHost>,
    ) -> Self {
        let DeploySettings {
            validator,
            reference,
            require_fork_check,
            provision,
        } = settings;
        let verifier =
            require_fork_check.then(|| ForkVerifier::new(host, reference.clone()));
        Self {
            validator,
            reference,
            verifier,
            provisioner: Provisioner::new(platform, provision),
        }
    }

    /// Handles one deploy request.
    pub async fn deploy(&self, request: &DeployRequest) -> DeployOutcome {
        let Some(credential) = self.validator.parse(&request.session_credential) else {
            tracing::info!("deploy rejected: malformed session credential");
            return DeployOutcome::InvalidCredential {
                format_hint: self.validator.format_hint(),
            };
        };

        let account = request.account.trim();
        if let Some(verifier) = &self.verifier {
            if account.is_empty() {
                tracing::info!("deploy rejected: no account supplied");
                return DeployOutcome::MissingAccount {
                    fork_url: self.reference.fork_url(),
                };
            }
            if !verifier.verify(account).await {
                tracing::info!(account, "deploy rejected: fork not found");
                return DeployOutcome::ForkRequired {
                    reference: self.reference.full_name(),
                    fork_url: self.reference.fork_url(),
                };
            }
        }

        let account_field = (!account.is_empty()).then_some(account);
        match self.provisioner.provision(&credential, account_field).await {
            Ok(deployment) => {
                tracing::info!(app = %deployment.name, url = %deployment.url, "deployed app");
                DeployOutcome::Deployed(deployment)
            }
            Err(err) => {
                tracing::warn!(
                    stage = %err.stage(),
                    app = %err.app_name(),
                    detail = %err.detail(),
                    "deployment failed"
                );
                DeployOutcome::ProvisionFailed {
                    stage: err.stage(),
                    detail: err.detail(),
                }
            }
        }
    }
}

/// Builds the HTTP router.
#[must_use]
pub fn build_router(service: Arc<DeployService>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/deploy", post(deploy))
        .with_state(service)
}

async fn health_check() -> &'static str {
    "ok"
}

async fn deploy(
    State(service): State<Arc<DeployService>>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> DeployOutcome {
    match payload {
        Ok(Json(request)) => service.deploy(&request).await,
        Err(rejection) => {
            tracing::info!(reason = %rejection.body_text(), "deploy rejected: malformed body");
            DeployOutcome::MalformedRequest {
                reason: rejection.body_text(),
            }
        }
    }
}
