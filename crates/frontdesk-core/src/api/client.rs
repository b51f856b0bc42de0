//! API client for communicating with the clinic REST backend.
//!
//! This module provides the `ApiClient` struct. Every credentialed call goes
//! through `get`/`post`, which attach the bearer credential and, on a 401 or
//! an unreachable server, report a `Rejection` to whoever owns the session.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::monitor::LogoutNotifier;

use super::models::{Ack, ChangePasswordRequest, Identity, LoginRequest, LoginResponse, LoginSuccess};
use super::{ApiError, LoginError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Also bounds how long the start-up identity check can hold the loading screen.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Minimum length the backend accepts for a new password.
const MIN_PASSWORD_LENGTH: usize = 5;

/// Shared slot holding the current bearer credential.
pub type CredentialSlot = Arc<RwLock<Option<String>>>;

/// Why a credentialed call lost trust in the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCause {
    /// The server answered 401.
    Unauthorized,
    /// The server could not be reached at all.
    Unreachable,
}

/// Signal sent to the session monitor when a credentialed call fails closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub cause: RejectionCause,
    pub path: String,
    /// The credential the failed call was sent with
    pub credential: String,
}

/// API client for the clinic backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the credential slot and rejection sink.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credential: CredentialSlot,
    rejections: Option<mpsc::UnboundedSender<Rejection>>,
}

impl ApiClient {
    /// Create a new API client for `base_url` (including the `/api` prefix)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential: Arc::new(RwLock::new(None)),
            rejections: None,
        })
    }

    /// Route rejections from credentialed calls into `sink`.
    pub fn with_rejection_sink(mut self, sink: mpsc::UnboundedSender<Rejection>) -> Self {
        self.rejections = Some(sink);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The slot shared by every clone of this client.
    pub fn credential_slot(&self) -> CredentialSlot {
        Arc::clone(&self.credential)
    }

    pub fn credential(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_credential(&self, credential: Option<String>) {
        *self.credential.write().unwrap_or_else(|e| e.into_inner()) = credential;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(request: RequestBuilder, credential: Option<&str>) -> RequestBuilder {
        match credential {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Report a fail-closed error from a call sent with `credential`.
    fn report(&self, path: &str, credential: Option<&str>, error: &ApiError) {
        let cause = if error.is_rejection() {
            RejectionCause::Unauthorized
        } else if error.is_network() {
            RejectionCause::Unreachable
        } else {
            return;
        };
        let Some(credential) = credential else {
            return;
        };
        warn!(path = path, ?cause, "Credentialed call failed closed");
        if let Some(ref sink) = self.rejections {
            let _ = sink.send(Rejection {
                cause,
                path: path.to_string(),
                credential: credential.to_string(),
            });
        }
    }

    /// Send a request built by `build` with `credential` attached, retrying on 429.
    async fn send_credentialed<F>(
        &self,
        path: &str,
        credential: Option<&str>,
        build: F,
    ) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let result = match Self::authorize(build(), credential).send().await {
                Ok(response) => Self::check_response_for_retry(response).await,
                Err(e) => Err(ApiError::from(e)),
            };

            match result {
                Ok(Some(response)) => return Ok(response),
                Ok(None) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path = path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                Err(e) => {
                    self.report(path, credential, &e);
                    return Err(e);
                }
            }
        }
    }

    /// Read a JSON body. A transport failure while the body is still arriving
    /// fails closed like one before the headers.
    async fn read_json<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Option<&str>,
        response: Response,
    ) -> Result<T, ApiError> {
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = ApiError::from(e);
                self.report(path, credential, &error);
                return Err(error);
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// Credentialed GET returning JSON.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let credential = self.credential();
        let response = self
            .send_credentialed(path, credential.as_deref(), || self.client.get(&url))
            .await?;
        self.read_json(path, credential.as_deref(), response).await
    }

    /// Credentialed POST with a JSON body, returning JSON.
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.url(path);
        let credential = self.credential();
        let response = self
            .send_credentialed(path, credential.as_deref(), || self.client.post(&url).json(body))
            .await?;
        self.read_json(path, credential.as_deref(), response).await
    }

    // ===== Authentication =====

    /// Exchange a username and password for a credential.
    ///
    /// Not credentialed and never reports a rejection: a 401 here means bad
    /// credentials, not a dead session.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, LoginError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| LoginError::Network(e.into()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoginError::Rejected(ApiError::detail(&body)));
        }
        let response = Self::check_response(response)
            .await
            .map_err(LoginError::Network)?;

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| LoginError::Network(ApiError::InvalidResponse(e.to_string())))?;

        match body {
            LoginResponse {
                success: true,
                token: Some(token),
                username: Some(username),
                role: Some(role),
                ..
            } => {
                info!(username = %username, role = %role, "Login accepted");
                Ok(LoginSuccess {
                    token,
                    identity: Identity { username, role },
                })
            }
            LoginResponse {
                success: true, ..
            } => Err(LoginError::Network(ApiError::InvalidResponse(
                "Login response missing token or identity".to_string(),
            ))),
            LoginResponse { error, .. } => Err(LoginError::Rejected(
                error.unwrap_or_else(|| "Login failed".to_string()),
            )),
        }
    }

    /// Verify an explicit credential without touching the shared slot or
    /// reporting rejections. Used once at start-up.
    pub async fn identity_check(&self, credential: &str) -> Result<Identity, ApiError> {
        let response = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(credential)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("/auth/me: {}", e)))
    }

    /// Tell the backend a credential is done with. Errors are returned but
    /// callers treat them as informational.
    pub async fn logout(&self, credential: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(credential)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Change the password of the logged-in user.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError> {
        if new.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::InvalidInput("Password too short".to_string()));
        }
        if new == current {
            return Err(ApiError::InvalidInput(
                "New password must differ from the current one".to_string(),
            ));
        }

        let ack: Ack = self
            .post(
                "/auth/change-password",
                &ChangePasswordRequest {
                    current_password: current,
                    new_password: new,
                },
            )
            .await?;
        if ack.success {
            info!("Password changed");
            Ok(())
        } else {
            Err(ApiError::InvalidResponse("Password change not acknowledged".to_string()))
        }
    }
}

impl LogoutNotifier for ApiClient {
    /// Fire-and-forget `POST /auth/logout`. Never awaited, never retried.
    fn notify_logout(&self, credential: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime; skipping logout notification");
            return;
        };
        let client = self.clone();
        runtime.spawn(async move {
            match client.logout(&credential).await {
                Ok(()) => debug!("Logout notification delivered"),
                Err(e) => debug!(error = %e, "Logout notification failed (ignored)"),
            }
        });
    }
}
