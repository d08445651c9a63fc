//! Heroku Platform API client.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue, RANGE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    AppName, AppRecord, AppRequest, BuildSource, ConfigVars, Platform, PlatformError,
    PlatformFuture,
};

const API_VERSION_ACCEPT: &str = "application/vnd.heroku+json; version=3";
const NEXT_RANGE: &str = "Next-Range";
const MAX_LIST_PAGES: usize = 100;

/// Connection settings for [`HerokuPlatform`].
#[derive(Clone, Eq, PartialEq)]
pub struct HerokuSettings {
    /// API base URL without a trailing slash, e.g. `https://api.heroku.com`.
    pub api_base: String,
    /// Bearer token sent on every request.
    pub api_key: String,
    /// Upper bound for each request, connect to last byte.
    pub timeout: Duration,
}

impl fmt::Debug for HerokuSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HerokuSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// [`Platform`] implementation backed by the Heroku Platform API v3.
#[derive(Clone, Debug)]
pub struct HerokuPlatform {
    client: reqwest::Client,
    settings: HerokuSettings,
}

#[derive(Serialize)]
struct BuildRequest<'a> {
    source_blob: &'a BuildSource,
}

impl HerokuPlatform {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Transport`] when the HTTP client cannot be
    /// constructed (for example when the TLS backend fails to initialise).
    pub fn new(settings: HerokuSettings) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| PlatformError::Transport {
                action: String::from("build http client"),
                message: err.to_string(),
            })?;
        Ok(Self { client, settings })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.settings.api_base.trim_end_matches('/'));
        self.client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static(API_VERSION_ACCEPT))
            .bearer_auth(&self.settings.api_key)
    }

    async fn create(&self, request: &AppRequest) -> Result<AppRecord, PlatformError> {
        let action = "create app";
        let response = send(self.request(Method::POST, "/apps").json(request), action).await?;
        let body = expect_success(response, action, None).await?;
        decode(&body, action)
    }

    async fn configure(&self, name: &AppName, vars: &ConfigVars) -> Result<(), PlatformError> {
        let action = "set config vars";
        let path = format!("/apps/{name}/config-vars");
        let response = send(self.request(Method::PATCH, &path).json(vars), action).await?;
        expect_success(response, action, Some(name)).await.map(drop)
    }

    async fn build(&self, name: &AppName, source: &BuildSource) -> Result<(), PlatformError> {
        let action = "create build";
        let path = format!("/apps/{name}/builds");
        let payload = BuildRequest {
            source_blob: source,
        };
        let response = send(self.request(Method::POST, &path).json(&payload), action).await?;
        expect_success(response, action, Some(name)).await.map(drop)
    }

    async fn list(&self) -> Result<Vec<AppRecord>, PlatformError> {
        let action = "list apps";
        let mut apps = Vec::new();
        let mut range: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut builder = self.request(Method::GET, "/apps");
            if let Some(value) = range.as_deref() {
                builder = builder.header(RANGE, value);
            }
            let response = send(builder, action).await?;
            let partial = response.status() == StatusCode::PARTIAL_CONTENT;
            let next_range = response
                .headers()
                .get(NEXT_RANGE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = expect_success(response, action, None).await?;
            let page: Vec<AppRecord> = decode(&body, action)?;
            apps.extend(page);

            match next_range {
                Some(next) if partial => range = Some(next),
                _ => return Ok(apps),
            }
        }

        tracing::warn!(pages = MAX_LIST_PAGES, "app listing truncated at page limit");
        Ok(apps)
    }

    async fn delete(&self, name: &AppName) -> Result<(), PlatformError> {
        let action = "delete app";
        let path = format!("/apps/{name}");
        let response = send(self.request(Method::DELETE, &path), action).await?;
        expect_success(response, action, Some(name)).await.map(drop)
    }
}

impl Platform for HerokuPlatform {
    fn create_app<'a>(&'a self, request: &'a AppRequest) -> PlatformFuture<'a, AppRecord> {
        Box::pin(self.create(request))
    }

    fn set_config<'a>(&'a self, name: &'a AppName, vars: &'a ConfigVars) -> PlatformFuture<'a, ()> {
        Box::pin(self.configure(name, vars))
    }

    fn trigger_build<'a>(
        &'a self,
        name: &'a AppName,
        source: &'a BuildSource,
    ) -> PlatformFuture<'a, ()> {
        Box::pin(self.build(name, source))
    }

    fn list_apps(&self) -> PlatformFuture<'_, Vec<AppRecord>> {
        Box::pin(self.list())
    }

    fn delete_app<'a>(&'a self, name: &'a AppName) -> PlatformFuture<'a, ()> {
        Box::pin(self.delete(name))
    }
}

async fn send(builder: RequestBuilder, action: &str) -> Result<Response, PlatformError> {
    builder
        .send()
        .await
        .map_err(|err| PlatformError::Transport {
            action: action.to_owned(),
            message: err.to_string(),
        })
}

/// Reads the body and converts non-success statuses into errors. A `404`
/// becomes [`PlatformError::NotFound`] when the call addressed a named app.
async fn expect_success(
    response: Response,
    action: &str,
    addressed: Option<&AppName>,
) -> Result<Vec<u8>, PlatformError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| PlatformError::Transport {
            action: action.to_owned(),
            message: err.to_string(),
        })?;

    if status.is_success() {
        return Ok(body.to_vec());
    }
    if let Some(name) = addressed
        && status == StatusCode::NOT_FOUND
    {
        return Err(PlatformError::NotFound {
            name: name.as_str().to_owned(),
        });
    }
    Err(PlatformError::Api {
        action: action.to_owned(),
        status: status.as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn decode<T: DeserializeOwned>(body: &[u8], action: &str) -> Result<T, PlatformError> {
    serde_json::from_slice(body).map_err(|err| PlatformError::Decode {
        action: action.to_owned(),
        message: err.to_string(),
    })
}
