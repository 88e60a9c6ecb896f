//! Async JSON-RPC API client.

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::http::{AsyncHttpTransport, HttpRequest, ReqwestTransport};
use crate::api::session::{
    requires_auth, ApiCore, ApiObject, LogoutStep, SessionState, CHECK_AUTH_METHOD, LOGIN_METHOD,
    LOGOUT_METHOD, VERSION_METHOD,
};
use crate::api::version::APIVersion;
use crate::config::ApiConfig;
use crate::error::Result;
use crate::utils::redact::Redactor;
use crate::utils::secret::SecretString;

/// Async client for the Zabbix JSON-RPC API.
///
/// Behaves like [`ApiClient`](crate::api::ApiClient). The session guard is an
/// async mutex held across version detection and login, so concurrent tasks
/// trigger at most one of each. State is only written after a step succeeds;
/// dropping a call mid-flight leaves the previous state intact.
///
/// ```no_run
/// use serde_json::json;
/// use zabbix_protocol::api::AsyncApiClient;
/// use zabbix_protocol::config::ApiConfig;
///
/// # async fn run() -> zabbix_protocol::error::Result<()> {
/// let api = AsyncApiClient::new(ApiConfig::new("127.0.0.1").with_token("0424bd59b807674191e7d77572075f33"))?;
/// let version = api.version().await?;
/// let items = api.entity("item").call("get", json!({"limit": 10})).await?;
/// println!("{version}: {items}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncApiClient<T: AsyncHttpTransport = ReqwestTransport> {
    core: ApiCore,
    transport: T,
    state: Mutex<SessionState>,
}

impl AsyncApiClient<ReqwestTransport> {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.validate_certs)?;
        Self::with_transport(config, transport)
    }
}

impl<T: AsyncHttpTransport> AsyncApiClient<T> {
    pub fn with_transport(config: ApiConfig, transport: T) -> Result<Self> {
        let core = ApiCore::new(&config)?;
        let state = Mutex::new(core.initial_state());
        Ok(Self {
            core,
            transport,
            state,
        })
    }

    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.core.set_redactor(redactor);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&self, method: &str, request: &HttpRequest) -> Result<Value> {
        let response = self.transport.post(request).await?;
        self.core.parse_response(method, response)
    }

    async fn ensure_version(&self, state: &mut SessionState) -> Result<APIVersion> {
        if let Some(version) = &state.version {
            return Ok(version.clone());
        }
        let version = match self.core.assumed_version() {
            Some(version) => version.clone(),
            None => {
                let request = self.core.version_request()?;
                let result = self.send(VERSION_METHOD, &request).await?;
                ApiCore::parse_version(&result)?
            }
        };
        self.core.adopt_version(state, version)
    }

    async fn ensure_login(&self, state: &mut SessionState, version: &APIVersion) -> Result<()> {
        if let Some(request) = self.core.pending_login(state, version)? {
            let result = self.send(LOGIN_METHOD, &request).await?;
            self.core.accept_login(state, result)?;
        }
        Ok(())
    }

    /// Call `method` with `params`; `Value::Null` is sent as `{}`.
    ///
    /// `user.login` and `user.logout` update the session like [`login`](Self::login)
    /// and [`logout`](Self::logout).
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            LOGIN_METHOD => {
                let (user, password) = ApiCore::login_params(&params)?;
                return self.start_session(&user, &password).await;
            }
            LOGOUT_METHOD => return self.logout().await.map(|()| Value::Bool(true)),
            _ => {}
        }
        let request = {
            let mut state = self.state.lock().await;
            let version = if method == VERSION_METHOD {
                state.version.clone()
            } else {
                Some(self.ensure_version(&mut state).await?)
            };
            if let Some(version) = &version {
                if requires_auth(method) {
                    self.ensure_login(&mut state, version).await?;
                }
            }
            self.core
                .build_request(method, params, version.as_ref(), state.token())?
        };
        self.send(method, &request).await
    }

    pub fn entity(&self, name: impl Into<String>) -> ApiObject<'_, Self> {
        ApiObject::new(self, name)
    }

    pub async fn version(&self) -> Result<APIVersion> {
        let mut state = self.state.lock().await;
        self.ensure_version(&mut state).await
    }

    pub async fn refresh_version(&self) -> Result<APIVersion> {
        let mut state = self.state.lock().await;
        let request = self.core.version_request()?;
        let result = self.send(VERSION_METHOD, &request).await?;
        let version = ApiCore::parse_version(&result)?;
        self.core.adopt_version(&mut state, version)
    }

    pub async fn login(&self, user: &str, password: impl Into<SecretString>) -> Result<()> {
        self.start_session(user, &password.into()).await.map(drop)
    }

    /// Run `user.login` and return the session id it produced.
    async fn start_session(&self, user: &str, password: &SecretString) -> Result<Value> {
        let mut state = self.state.lock().await;
        let version = self.ensure_version(&mut state).await?;
        let request = self.core.login_request(&version, user, password)?;
        let result = self.send(LOGIN_METHOD, &request).await?;
        self.core.accept_login(&mut state, result.clone())?;
        Ok(result)
    }

    pub async fn ensure_authenticated(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let version = self.ensure_version(&mut state).await?;
        self.ensure_login(&mut state, &version).await
    }

    pub async fn login_with_token(&self, token: impl Into<SecretString>) -> Result<()> {
        let token = token.into();
        let mut state = self.state.lock().await;
        self.ensure_version(&mut state).await?;
        self.core.accept_token(&mut state, token)
    }

    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match self.core.logout_step(&state)? {
            LogoutStep::NotLoggedIn => {
                debug!("You're not logged in Zabbix API");
                return Ok(());
            }
            LogoutStep::Local => {}
            LogoutStep::Remote(request) => {
                self.send(LOGOUT_METHOD, &request).await?;
            }
        }
        self.core.finish_logout(&mut state);
        Ok(())
    }

    pub async fn check_auth(&self) -> Result<bool> {
        let request = {
            let state = self.state.lock().await;
            self.core.check_auth_request(&state)?
        };
        match request {
            Some(request) => {
                let result = self.send(CHECK_AUTH_METHOD, &request).await?;
                Ok(ApiCore::parse_check_auth(&result))
            }
            None => {
                debug!("You're not logged in Zabbix API");
                Ok(false)
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.is_authenticated()
    }
}

impl<T: AsyncHttpTransport> ApiObject<'_, AsyncApiClient<T>> {
    /// Call `<entity>.<action>`.
    pub async fn call(&self, action: &str, params: Value) -> Result<Value> {
        self.client.call(&self.method(action), params).await
    }
}
