// API client module: a small blocking HTTP client that talks to the SDWAN
// controller REST API. Only the endpoints this tool needs are wrapped:
// profile lookup, login, tenant info, the enterprise prefix set and logout.

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Public controller endpoint used when no `--controller` is given.
pub const DEFAULT_CONTROLLER: &str = "https://api.elcapitan.cloudgenix.com";

const API_VERSION: &str = "v2.0";
const TOKEN_HEADER: &str = "x-auth-token";

/// Failures reported by the controller client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("no active session, authenticate first")]
    NotAuthenticated,
    #[error("profile response did not include a tenant id")]
    MissingTenant,
    #[error("auth token contains characters that cannot be sent in a header")]
    InvalidToken,
}

/// Login request payload.
#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Login response. Some controllers hand back a token, others only set
/// session cookies, so the token is optional.
#[derive(Deserialize, Debug, Default)]
pub struct LoginResponse {
    #[serde(default)]
    pub x_auth_token: Option<String>,
}

/// The part of the operator profile we care about.
#[derive(Deserialize, Debug, Default)]
pub struct Profile {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Tenant {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of the enterprise prefix set PUT. The controller replaces the whole
/// list with whatever is sent here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PrefixSetPayload {
    pub ipv4_enterprise_prefixes: Vec<String>,
}

/// Authenticated session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub tenant_id: String,
    pub email: Option<String>,
}

/// The controller operations the prefix workflow depends on. `ApiClient`
/// is the real implementation; tests drive the workflow with a fake.
pub trait Controller {
    /// Name of the tenant bound to the current session.
    fn tenant_name(&self) -> Result<Option<String>, ApiError>;

    /// Replace the enterprise prefix set with `payload`.
    fn put_enterprise_prefix_set(&self, payload: &PrefixSetPayload) -> Result<(), ApiError>;

    /// Terminate the session.
    fn logout(&mut self) -> Result<(), ApiError>;
}

/// Blocking controller client holding the HTTP client, the base URL and
/// the session once authentication succeeded.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    session: Option<Session>,
}

impl ApiClient {
    /// Create a client for `base_url` with a cookie store, which carries the
    /// session after an interactive login.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wrap an already configured `reqwest` client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            session: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session established by `use_token` or `login`, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Authenticate with a static auth token and resolve the tenant it
    /// belongs to.
    pub fn use_token(&mut self, token: &str) -> Result<Session, ApiError> {
        self.token = Some(token.trim().to_string());
        self.establish_session()
    }

    /// Authenticate with operator credentials.
    pub fn login(&mut self, email: &str, password: &str) -> Result<Session, ApiError> {
        let url = self.url("login");
        debug!("POST {url}");
        let res = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&LoginRequest { email, password })
            .send()
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        let resp: LoginResponse = read_json(&url, res)?;
        // Without a token in the body the cookie store carries the session.
        if let Some(token) = resp.x_auth_token.filter(|t| !t.is_empty()) {
            debug!("Login returned an auth token, using it for later requests");
            self.token = Some(token);
        }
        self.establish_session()
    }

    fn establish_session(&mut self) -> Result<Session, ApiError> {
        // The profile tells us which tenant the credentials belong to. Drop
        // the token on any failure so it is never reused.
        let profile: Profile = match self.get("profile") {
            Ok(profile) => profile,
            Err(err) => {
                self.token = None;
                return Err(err);
            }
        };
        let Some(tenant_id) = profile.tenant_id.filter(|id| !id.is_empty()) else {
            self.token = None;
            return Err(ApiError::MissingTenant);
        };
        info!("Session established for tenant {tenant_id}");
        let session = Session {
            tenant_id,
            email: profile.email,
        };
        self.session = Some(session.clone());
        Ok(session)
    }

    fn tenant_id(&self) -> Result<&str, ApiError> {
        self.session
            .as_ref()
            .map(|s| s.tenant_id.as_str())
            .ok_or(ApiError::NotAuthenticated)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/api/{}", self.base_url, API_VERSION, path)
    }

    /// Default headers plus the auth token when one is set.
    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(t) = &self.token {
            let val = HeaderValue::from_str(t).map_err(|_| ApiError::InvalidToken)?;
            headers.insert(HeaderName::from_static(TOKEN_HEADER), val);
        }
        Ok(headers)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!("GET {url}");
        let res = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        read_json(&url, res)
    }
}

impl Controller for ApiClient {
    fn tenant_name(&self) -> Result<Option<String>, ApiError> {
        let tenant: Tenant = self.get(&format!("tenants/{}", self.tenant_id()?))?;
        Ok(tenant.name)
    }

    fn put_enterprise_prefix_set(&self, payload: &PrefixSetPayload) -> Result<(), ApiError> {
        let url = self.url(&format!("tenants/{}/enterpriseprefixset", self.tenant_id()?));
        debug!(
            "PUT {url} with {} prefix(es)",
            payload.ipv4_enterprise_prefixes.len()
        );
        let res = self
            .client
            .put(&url)
            .headers(self.headers()?)
            .json(payload)
            .send()
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        check_status(&url, res).map(|_| ())
    }

    fn logout(&mut self) -> Result<(), ApiError> {
        let url = self.url("logout");
        debug!("GET {url}");
        let result = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })
            .and_then(|res| check_status(&url, res));
        // Local state is cleared even if the controller call failed.
        self.token = None;
        self.session = None;
        result.map(|_| ())
    }
}

fn check_status(url: &str, res: Response) -> Result<Response, ApiError> {
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().unwrap_or_default();
        return Err(ApiError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }
    Ok(res)
}

fn read_json<T: DeserializeOwned>(url: &str, res: Response) -> Result<T, ApiError> {
    check_status(url, res)?
        .json()
        .map_err(|source| ApiError::Http {
            url: url.to_string(),
            source,
        })
}
