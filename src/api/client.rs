//! Blocking JSON-RPC API client.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;

use crate::api::http::{BlockingReqwestTransport, HttpRequest, HttpTransport};
use crate::api::session::{
    requires_auth, ApiCore, ApiObject, LogoutStep, SessionState, CHECK_AUTH_METHOD, LOGIN_METHOD,
    LOGOUT_METHOD, VERSION_METHOD,
};
use crate::api::version::APIVersion;
use crate::config::ApiConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::redact::Redactor;
use crate::utils::secret::SecretString;

/// Blocking client for the Zabbix JSON-RPC API.
///
/// The client is `Sync`; calls from several threads share one session. Version
/// detection and login run at most once: the session guard is held while they
/// are in flight, so concurrent callers wait for the first one to finish.
///
/// ```no_run
/// use serde_json::json;
/// use zabbix_protocol::api::ApiClient;
/// use zabbix_protocol::config::ApiConfig;
///
/// let api = ApiClient::new(ApiConfig::new("127.0.0.1").with_credentials("Admin", "zabbix"))?;
/// let hosts = api.entity("host").call("get", json!({"output": ["hostid", "name"]}))?;
/// println!("{hosts}");
/// api.logout()?;
/// # Ok::<(), zabbix_protocol::error::ProtocolError>(())
/// ```
#[derive(Debug)]
pub struct ApiClient<T: HttpTransport = BlockingReqwestTransport> {
    core: ApiCore,
    transport: T,
    state: Mutex<SessionState>,
}

impl ApiClient<BlockingReqwestTransport> {
    /// Client using `reqwest`'s blocking transport.
    ///
    /// Must not be called from within an async runtime; use
    /// [`AsyncApiClient`](crate::api::AsyncApiClient) there.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let transport = BlockingReqwestTransport::new(config.validate_certs)?;
        Self::with_transport(config, transport)
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn with_transport(config: ApiConfig, transport: T) -> Result<Self> {
        let core = ApiCore::new(&config)?;
        let state = Mutex::new(core.initial_state());
        Ok(Self {
            core,
            transport,
            state,
        })
    }

    /// Replace the redactor applied to debug logs.
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.core.set_redactor(redactor);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state
            .lock()
            .map_err(|_| ProtocolError::Auth(constants::ERR_LOCK_POISONED.to_string()))
    }

    fn send(&self, method: &str, request: &HttpRequest) -> Result<Value> {
        let response = self.transport.post(request)?;
        self.core.parse_response(method, response)
    }

    fn ensure_version(&self, state: &mut SessionState) -> Result<APIVersion> {
        if let Some(version) = &state.version {
            return Ok(version.clone());
        }
        let version = match self.core.assumed_version() {
            Some(version) => version.clone(),
            None => {
                let result = self.send(VERSION_METHOD, &self.core.version_request()?)?;
                ApiCore::parse_version(&result)?
            }
        };
        self.core.adopt_version(state, version)
    }

    fn ensure_login(&self, state: &mut SessionState, version: &APIVersion) -> Result<()> {
        if let Some(request) = self.core.pending_login(state, version)? {
            let result = self.send(LOGIN_METHOD, &request)?;
            self.core.accept_login(state, result)?;
        }
        Ok(())
    }

    /// Call `method` with `params`; `Value::Null` is sent as `{}`.
    ///
    /// Detects the API version on first use and logs in with the configured
    /// credentials before the first authenticated call.
    /// `user.login` and `user.logout` are routed through [`login`](Self::login)
    /// and [`logout`](Self::logout), so the session follows them; `user.login`
    /// returns the new session id.
    ///
    /// # Errors
    /// - `Auth` if the method needs authentication and no token or credentials are available
    /// - `ApiRequest` for JSON-RPC errors and non-2xx HTTP responses
    /// - `Timeout` / `Http` for transport failures
    pub fn call(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            LOGIN_METHOD => {
                let (user, password) = ApiCore::login_params(&params)?;
                return self.start_session(&user, &password);
            }
            LOGOUT_METHOD => return self.logout().map(|()| Value::Bool(true)),
            _ => {}
        }
        let request = {
            let mut state = self.lock()?;
            let version = if method == VERSION_METHOD {
                state.version.clone()
            } else {
                Some(self.ensure_version(&mut state)?)
            };
            if let Some(version) = &version {
                if requires_auth(method) {
                    self.ensure_login(&mut state, version)?;
                }
            }
            self.core
                .build_request(method, params, version.as_ref(), state.token())?
        };
        self.send(method, &request)
    }

    /// Handle for calls on `name`, e.g. `entity("host").call("get", ..)`.
    pub fn entity(&self, name: impl Into<String>) -> ApiObject<'_, Self> {
        ApiObject::new(self, name)
    }

    /// Version of the connected API, detected on first use.
    pub fn version(&self) -> Result<APIVersion> {
        let mut state = self.lock()?;
        self.ensure_version(&mut state)
    }

    /// Query `apiinfo.version` again, ignoring any cached or assumed version.
    pub fn refresh_version(&self) -> Result<APIVersion> {
        let mut state = self.lock()?;
        let result = self.send(VERSION_METHOD, &self.core.version_request()?)?;
        let version = ApiCore::parse_version(&result)?;
        self.core.adopt_version(&mut state, version)
    }

    /// Log in with explicit credentials, replacing any current session.
    pub fn login(&self, user: &str, password: impl Into<SecretString>) -> Result<()> {
        self.start_session(user, &password.into()).map(drop)
    }

    /// Run `user.login` and return the session id it produced.
    fn start_session(&self, user: &str, password: &SecretString) -> Result<Value> {
        let mut state = self.lock()?;
        let version = self.ensure_version(&mut state)?;
        let request = self.core.login_request(&version, user, password)?;
        let result = self.send(LOGIN_METHOD, &request)?;
        self.core.accept_login(&mut state, result.clone())?;
        Ok(result)
    }

    /// Log in with configured credentials if not already authenticated.
    pub fn ensure_authenticated(&self) -> Result<()> {
        let mut state = self.lock()?;
        let version = self.ensure_version(&mut state)?;
        self.ensure_login(&mut state, &version)
    }

    /// Use a static API token from now on.
    pub fn login_with_token(&self, token: impl Into<SecretString>) -> Result<()> {
        let mut state = self.lock()?;
        self.ensure_version(&mut state)?;
        self.core.accept_token(&mut state, token.into())
    }

    /// End the session. Login sessions are closed with `user.logout`; a static
    /// token is only forgotten locally.
    pub fn logout(&self) -> Result<()> {
        let mut state = self.lock()?;
        match self.core.logout_step(&state)? {
            LogoutStep::NotLoggedIn => {
                debug!("You're not logged in Zabbix API");
                return Ok(());
            }
            LogoutStep::Local => {}
            LogoutStep::Remote(request) => {
                self.send(LOGOUT_METHOD, &request)?;
            }
        }
        self.core.finish_logout(&mut state);
        Ok(())
    }

    /// Ask the server whether the current session or token is still valid.
    pub fn check_auth(&self) -> Result<bool> {
        let request = {
            let state = self.lock()?;
            self.core.check_auth_request(&state)?
        };
        match request {
            Some(request) => {
                let result = self.send(CHECK_AUTH_METHOD, &request)?;
                Ok(ApiCore::parse_check_auth(&result))
            }
            None => {
                debug!("You're not logged in Zabbix API");
                Ok(false)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_ok_and(|state| state.is_authenticated())
    }
}

impl<T: HttpTransport> ApiObject<'_, ApiClient<T>> {
    /// Call `<entity>.<action>`.
    pub fn call(&self, action: &str, params: Value) -> Result<Value> {
        self.client.call(&self.method(action), params)
    }
}
