//! Protocol decisions shared by the blocking and async API clients.
//!
//! [`ApiCore`] never performs I/O. It builds [`HttpRequest`]s, interprets
//! [`HttpResponse`]s and applies state transitions to a [`SessionState`]; the
//! clients only move requests over their transport and guard the state.
//! Token placement, login field names and version gating therefore behave the
//! same in both flavours.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::api::envelope::RpcRequest;
use crate::api::envelope::RpcResponse;
use crate::api::http::{HttpRequest, HttpResponse};
use crate::api::version::APIVersion;
use crate::config::ApiConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::redact::{shorten, Redactor};
use crate::utils::secret::SecretString;

pub const VERSION_METHOD: &str = "apiinfo.version";
pub const LOGIN_METHOD: &str = "user.login";
pub const LOGOUT_METHOD: &str = "user.logout";
pub const CHECK_AUTH_METHOD: &str = "user.checkAuthentication";

/// Methods that are sent without a token.
pub const UNAUTH_METHODS: [&str; 3] = [VERSION_METHOD, LOGIN_METHOD, CHECK_AUTH_METHOD];

/// Methods whose results are file contents; only a prefix is logged.
pub const FILES_METHODS: [&str; 1] = ["configuration.export"];

/// Oldest supported API release.
pub const MIN_SUPPORTED_VERSION: APIVersion = APIVersion::new(5, 0, 0);
/// Newest supported API release; any revision of this `major.minor` is accepted.
pub const MAX_SUPPORTED_VERSION: APIVersion = APIVersion::new(7, 0, 0);

/// API tokens were introduced in 5.4.
const TOKEN_MIN_VERSION: APIVersion = APIVersion::new(5, 4, 0);
/// From 6.4 the token travels in the `Authorization` header and `user.login`
/// takes `username` instead of `user`.
const HEADER_AUTH_VERSION: APIVersion = APIVersion::new(6, 4, 0);

const RESULT_LOG_LEN: usize = 100;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[inline]
pub fn requires_auth(method: &str) -> bool {
    !UNAUTH_METHODS.contains(&method)
}

/// Where the current token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Session id returned by `user.login`; invalidated remotely on logout.
    Login,
    /// API token supplied by the caller; logout only forgets it.
    Static,
}

#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated {
        token: SecretString,
        source: TokenSource,
    },
}

/// Mutable part of a client: detected version and authentication.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub version: Option<APIVersion>,
    pub auth: AuthState,
}

impl SessionState {
    pub fn token(&self) -> Option<&SecretString> {
        match &self.auth {
            AuthState::Authenticated { token, .. } => Some(token),
            AuthState::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    fn is_static(&self) -> bool {
        matches!(
            self.auth,
            AuthState::Authenticated {
                source: TokenSource::Static,
                ..
            }
        )
    }
}

/// What a logout has to do for the current state.
#[derive(Debug)]
pub enum LogoutStep {
    /// Nothing to do.
    NotLoggedIn,
    /// Forget the static token without contacting the server.
    Local,
    /// Send `user.logout`, then forget the session.
    Remote(HttpRequest),
}

/// Request construction and response interpretation for one API endpoint.
#[derive(Debug)]
pub struct ApiCore {
    endpoint: String,
    timeout: Duration,
    basic_auth: Option<String>,
    credentials: Option<(String, SecretString)>,
    static_token: Option<SecretString>,
    assumed_version: Option<APIVersion>,
    skip_version_check: bool,
    redactor: Redactor,
    next_id: AtomicU64,
}

impl ApiCore {
    /// Validate `config` and prepare the endpoint.
    ///
    /// # Errors
    /// `ConfigError` if the configuration is inconsistent, `InvalidVersion` if
    /// the assumed version cannot be parsed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config.validate_strict()?;

        let assumed_version = config
            .version
            .as_deref()
            .map(str::parse::<APIVersion>)
            .transpose()?;

        let basic_auth = match (&config.http_user, &config.http_password) {
            (Some(user), Some(password)) => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{user}:{}", password.expose()))
            )),
            _ => None,
        };

        let credentials = match (&config.user, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            endpoint: config.endpoint(),
            timeout: config.timeout,
            basic_auth,
            credentials,
            static_token: config.token.clone(),
            assumed_version,
            skip_version_check: config.skip_version_check,
            redactor: Redactor::default(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Replace the redactor applied to logged request and response bodies.
    pub fn set_redactor(&mut self, redactor: Redactor) {
        self.redactor = redactor;
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn assumed_version(&self) -> Option<&APIVersion> {
        self.assumed_version.as_ref()
    }

    /// Starting state: authenticated right away when a static token is configured.
    pub fn initial_state(&self) -> SessionState {
        let auth = match &self.static_token {
            Some(token) => AuthState::Authenticated {
                token: token.clone(),
                source: TokenSource::Static,
            },
            None => AuthState::Unauthenticated,
        };
        SessionState {
            version: None,
            auth,
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn token_in_header(&self, version: Option<&APIVersion>) -> bool {
        self.basic_auth.is_none() && version.is_some_and(|v| *v >= HEADER_AUTH_VERSION)
    }

    /// Build the HTTP request for `method`.
    ///
    /// `null` params are sent as `{}`. Methods outside [`UNAUTH_METHODS`] need
    /// `token`; it goes into the `Authorization` header for 6.4+ without Basic
    /// auth and into the body `auth` field otherwise.
    ///
    /// # Errors
    /// `Auth` if the method needs a token and none is given.
    pub fn build_request(
        &self,
        method: &str,
        params: Value,
        version: Option<&APIVersion>,
        token: Option<&SecretString>,
    ) -> Result<HttpRequest> {
        let params = if params.is_null() { json!({}) } else { params };
        let mut request = RpcRequest::new(method, params, self.next_request_id());

        let mut headers = vec![
            (
                "Content-Type".to_string(),
                "application/json-rpc".to_string(),
            ),
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];
        if let Some(basic) = &self.basic_auth {
            headers.push(("Authorization".to_string(), basic.clone()));
        }

        if requires_auth(method) {
            let token = token
                .ok_or_else(|| ProtocolError::Auth(constants::ERR_NOT_LOGGED_IN.to_string()))?;
            if self.token_in_header(version) {
                headers.push((
                    "Authorization".to_string(),
                    format!("Bearer {}", token.expose()),
                ));
            } else {
                request.auth = Some(token.expose());
            }
        }

        let body = serde_json::to_string(&request)?;
        debug!(
            "Sending request to {} with body: {}",
            self.endpoint,
            self.redactor.redact(&body)
        );

        Ok(HttpRequest {
            url: self.endpoint.clone(),
            headers,
            body,
            timeout: self.timeout,
        })
    }

    /// Interpret the HTTP response to `method`.
    ///
    /// # Errors
    /// - `ApiRequest` with the HTTP status as code for non-2xx responses
    /// - `Json` if the body is not a JSON-RPC response
    /// - `ApiRequest` carrying the server's code, message and data verbatim
    pub fn parse_response(&self, method: &str, response: HttpResponse) -> Result<Value> {
        if !response.is_success() {
            debug!(
                status = response.status,
                "Received unsuccessful HTTP response"
            );
            return Err(ProtocolError::ApiRequest {
                code: i64::from(response.status),
                message: format!("HTTP {}", response.status),
                data: response.body,
            });
        }

        let envelope: RpcResponse = serde_json::from_str(&response.body)?;
        self.log_response(method, &response.body, &envelope);
        envelope.into_result()
    }

    fn log_response(&self, method: &str, body: &str, envelope: &RpcResponse) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }
        let text = match &envelope.result {
            Some(Value::String(result)) if FILES_METHODS.contains(&method) => json!({
                "jsonrpc": envelope.jsonrpc,
                "result": shorten(result, RESULT_LOG_LEN),
                "id": envelope.id,
            })
            .to_string(),
            _ => body.to_string(),
        };
        debug!("Received response body: {}", self.redactor.redact(&text));
    }

    pub fn version_request(&self) -> Result<HttpRequest> {
        self.build_request(VERSION_METHOD, json!({}), None, None)
    }

    /// Parse the result of `apiinfo.version`.
    pub fn parse_version(result: &Value) -> Result<APIVersion> {
        result
            .as_str()
            .ok_or_else(|| {
                ProtocolError::UnexpectedResponse(format!("{VERSION_METHOD} returned {result}"))
            })?
            .parse()
    }

    /// Check `version` and record it in `state`.
    ///
    /// # Errors
    /// `UnsupportedVersion` if the version is outside the supported range
    /// (unless checks are skipped) or a static token is in use below 5.4.
    pub fn adopt_version(&self, state: &mut SessionState, version: APIVersion) -> Result<APIVersion> {
        self.check_version(&version)?;
        if state.is_static() && version < TOKEN_MIN_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                feature: "Token usage".to_string(),
                version: version.to_string(),
            });
        }
        state.version = Some(version.clone());
        Ok(version)
    }

    fn check_version(&self, version: &APIVersion) -> Result<()> {
        let supported = version.major_minor() >= MIN_SUPPORTED_VERSION.major_minor()
            && version.major_minor() <= MAX_SUPPORTED_VERSION.major_minor();
        if supported {
            return Ok(());
        }
        if self.skip_version_check {
            warn!(
                "Version of Zabbix API [{version}] is not supported by the library. \
                 The library supports versions {}.{} to {}.{}",
                MIN_SUPPORTED_VERSION.major,
                MIN_SUPPORTED_VERSION.minor,
                MAX_SUPPORTED_VERSION.major,
                MAX_SUPPORTED_VERSION.minor
            );
            return Ok(());
        }
        Err(ProtocolError::UnsupportedVersion {
            feature: env!("CARGO_PKG_NAME").to_string(),
            version: version.to_string(),
        })
    }

    /// `user.login` request for the given credentials.
    pub fn login_request(
        &self,
        version: &APIVersion,
        user: &str,
        password: &SecretString,
    ) -> Result<HttpRequest> {
        let user_field = if *version >= HEADER_AUTH_VERSION {
            "username"
        } else {
            "user"
        };
        let mut params = Map::new();
        params.insert(user_field.to_string(), Value::from(user));
        params.insert("password".to_string(), Value::from(password.expose()));
        self.build_request(LOGIN_METHOD, Value::Object(params), Some(version), None)
    }

    /// Credentials from explicit `user.login` params: `username` (or `user`) and `password`.
    ///
    /// # Errors
    /// `Auth` if either is missing.
    pub fn login_params(params: &Value) -> Result<(String, SecretString)> {
        let user = params
            .get("username")
            .or_else(|| params.get("user"))
            .and_then(Value::as_str);
        let password = params.get("password").and_then(Value::as_str);
        match (user, password) {
            (Some(user), Some(password)) => Ok((user.to_string(), SecretString::new(password))),
            _ => Err(ProtocolError::Auth(constants::ERR_NO_CREDENTIALS.to_string())),
        }
    }

    /// Login needed before an authenticated call, if any.
    ///
    /// # Errors
    /// `Auth` if the state is unauthenticated and no credentials are configured.
    pub fn pending_login(
        &self,
        state: &SessionState,
        version: &APIVersion,
    ) -> Result<Option<HttpRequest>> {
        if state.is_authenticated() {
            return Ok(None);
        }
        match &self.credentials {
            Some((user, password)) => self.login_request(version, user, password).map(Some),
            None => Err(ProtocolError::Auth(constants::ERR_NOT_LOGGED_IN.to_string())),
        }
    }

    /// Store the session id returned by `user.login`.
    pub fn accept_login(&self, state: &mut SessionState, result: Value) -> Result<()> {
        let token = result.as_str().ok_or_else(|| {
            ProtocolError::UnexpectedResponse(format!("{LOGIN_METHOD} did not return a session id"))
        })?;
        state.auth = AuthState::Authenticated {
            token: SecretString::new(token),
            source: TokenSource::Login,
        };
        debug!("Logged in to Zabbix API at {}", self.endpoint);
        Ok(())
    }

    /// Switch to a caller-supplied API token.
    ///
    /// # Errors
    /// `UnsupportedVersion` if the known version is older than 5.4.
    pub fn accept_token(&self, state: &mut SessionState, token: SecretString) -> Result<()> {
        if let Some(version) = state.version.as_ref().filter(|v| **v < TOKEN_MIN_VERSION) {
            return Err(ProtocolError::UnsupportedVersion {
                feature: "Token usage".to_string(),
                version: version.to_string(),
            });
        }
        state.auth = AuthState::Authenticated {
            token,
            source: TokenSource::Static,
        };
        Ok(())
    }

    pub fn logout_step(&self, state: &SessionState) -> Result<LogoutStep> {
        match &state.auth {
            AuthState::Unauthenticated => Ok(LogoutStep::NotLoggedIn),
            AuthState::Authenticated {
                source: TokenSource::Static,
                ..
            } => Ok(LogoutStep::Local),
            AuthState::Authenticated {
                token,
                source: TokenSource::Login,
            } => self
                .build_request(LOGOUT_METHOD, json!([]), state.version.as_ref(), Some(token))
                .map(LogoutStep::Remote),
        }
    }

    pub fn finish_logout(&self, state: &mut SessionState) {
        state.auth = AuthState::Unauthenticated;
        debug!("Logged out from Zabbix API at {}", self.endpoint);
    }

    /// `user.checkAuthentication` request for the current token, if any.
    pub fn check_auth_request(&self, state: &SessionState) -> Result<Option<HttpRequest>> {
        let params = match &state.auth {
            AuthState::Unauthenticated => return Ok(None),
            AuthState::Authenticated {
                token,
                source: TokenSource::Login,
            } => json!({ "sessionid": token.expose() }),
            AuthState::Authenticated {
                token,
                source: TokenSource::Static,
            } => json!({ "token": token.expose() }),
        };
        self.build_request(CHECK_AUTH_METHOD, params, state.version.as_ref(), None)
            .map(Some)
    }

    /// Whether a `user.checkAuthentication` result describes a live session.
    pub fn parse_check_auth(result: &Value) -> bool {
        result.get("userid").is_some()
    }
}

/// Handle to `<entity>.<action>` methods, e.g. `client.entity("host").call("get", ..)`.
#[derive(Debug)]
pub struct ApiObject<'a, C: ?Sized> {
    pub(crate) client: &'a C,
    pub(crate) name: String,
}

impl<'a, C: ?Sized> ApiObject<'a, C> {
    pub(crate) fn new(client: &'a C, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// Full method name for `action`.
    pub fn method(&self, action: &str) -> String {
        format!("{}.{}", self.name, action)
    }
}
