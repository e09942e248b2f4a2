//! Remote Data Gateway
//!
//! Request/response access to the user-data resource. Exactly two operations
//! exist: fetch the whole snapshot and replace the whole snapshot.

use crate::error::GatewayError;
use crate::state::{PartialSnapshot, Snapshot};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by [`RemoteGateway`] methods
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, GatewayError>> + Send + 'a>>;

/// Remote source of truth for the persisted subset
///
/// Methods return boxed futures so the gateway can live behind
/// `Arc<dyn RemoteGateway>` in the environment.
pub trait RemoteGateway: Send + Sync {
    /// Fetch the stored snapshot
    ///
    /// `Ok(None)` means the remote answered but holds no data. Implementations
    /// may also return a snapshot without collections; callers treat both alike.
    /// Records inside a collection that do not decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport failure, timeout, a non-success
    /// status, or a response that is not a user-data envelope.
    fn fetch_snapshot(&self) -> GatewayFuture<'_, Option<PartialSnapshot>>;

    /// Replace the stored snapshot with `snapshot`
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport failure, timeout or a
    /// non-success status.
    fn replace_snapshot<'a>(&'a self, snapshot: &'a Snapshot) -> GatewayFuture<'a, ()>;
}

/// Supplies the bearer token attached to gateway requests
///
/// Authentication itself happens elsewhere; the gateway only forwards
/// whatever token is current at request time.
pub trait TokenProvider: Send + Sync {
    /// Current token, if the user is signed in
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token (or none)
#[derive(Clone, Debug, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    /// Always send `token`
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Never send a token
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticToken {
    fn from(token: Option<String>) -> Self {
        Self(token)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Response body of the user-data resource: `{ "data": { ...collections } }`
#[derive(Debug, Deserialize)]
struct UserDataEnvelope {
    #[serde(default)]
    data: Option<PartialSnapshot>,
}

/// [`RemoteGateway`] over HTTP
///
/// `GET {url}` fetches and `POST {url}` replaces. Every request is bounded by
/// the client timeout.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpGateway {
    /// Create a gateway for the user-data resource at `url`
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            tokens,
        })
    }

    /// Resource URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn error_for(response: reqwest::Response) -> GatewayError {
        match response.status() {
            StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
            status => {
                let body = response.text().await.unwrap_or_default();
                GatewayError::Status {
                    status: status.as_u16(),
                    message: body,
                }
            },
        }
    }

    async fn fetch(&self) -> Result<Option<PartialSnapshot>, GatewayError> {
        let response = self.authorize(self.client.get(&self.url)).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let envelope: UserDataEnvelope = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        Ok(envelope.data.filter(|data| !data.is_empty()))
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<(), GatewayError> {
        let response = self
            .authorize(self.client.post(&self.url))
            .json(snapshot)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl RemoteGateway for HttpGateway {
    fn fetch_snapshot(&self) -> GatewayFuture<'_, Option<PartialSnapshot>> {
        Box::pin(self.fetch())
    }

    fn replace_snapshot<'a>(&'a self, snapshot: &'a Snapshot) -> GatewayFuture<'a, ()> {
        Box::pin(self.replace(snapshot))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn envelope_without_data_is_none() {
        let envelope: UserDataEnvelope = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(envelope.data.is_none());

        let envelope: UserDataEnvelope = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(envelope.data.is_none());
    }

    #[test]
    fn envelope_with_empty_object_has_no_collections() {
        let envelope: UserDataEnvelope = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(envelope.data.unwrap().is_empty());
    }

    #[test]
    fn static_token() {
        assert_eq!(StaticToken::new("abc").bearer_token().as_deref(), Some("abc"));
        assert_eq!(StaticToken::none().bearer_token(), None);
    }
}
