//! Authenticated JSON transport for the control-plane REST API.
//!
//! [`ApiClient`] performs exactly one HTTP exchange per call and classifies
//! the outcome: a decoded body, an [`ApiError`] built from a non-2xx response,
//! or a transport failure when no response arrived. It knows nothing about
//! resource semantics and never retries.

mod error;
mod pagination;

use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, ControlPlaneConfig};

pub use error::{ApiError, ClientError};
pub use pagination::{Page, Pagination, collect_pages};

/// Maximum number of characters of an error body written to the log.
const MAX_LOG_BODY_LENGTH: usize = 200;

fn truncate_for_log(body: &str) -> String {
    let mut printable = body.chars().filter(|c| c.is_ascii_graphic() || *c == ' ');
    let mut shown: String = printable.by_ref().take(MAX_LOG_BODY_LENGTH).collect();
    if printable.next().is_some() {
        shown.push_str("... [truncated]");
    }
    shown
}

/// HTTP client bound to one control-plane endpoint and token.
///
/// Cloning is cheap and clones share the underlying connection pool, so one
/// client can serve any number of concurrent operations.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl ApiClient {
    /// Constructs a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration fails validation or the
    /// HTTP stack cannot be initialised.
    pub fn new(config: &ControlPlaneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ConfigError::Invalid(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_owned(),
            api_token: config.api_token.trim().to_owned(),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Performs one exchange and returns the raw 2xx body.
    async fn exchange<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!(%method, %url, "sending control-plane request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.api_token)
            .header(ACCEPT, "application/json");
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let in_flight = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, ClientError>((status, text))
        };

        let (status, text) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Cancelled),
            outcome = in_flight => outcome?,
        };

        if status.is_success() {
            return Ok(text);
        }

        let error = ApiError::from_response(status.as_u16(), &text);
        if error.is_not_found() {
            tracing::debug!(%method, %url, "control-plane resource not found");
        } else {
            tracing::warn!(
                %method,
                %url,
                status = status.as_u16(),
                body = %truncate_for_log(&text),
                "control-plane request rejected"
            );
        }
        Err(error.into())
    }

    /// Sends a request and decodes the 2xx body into `T`.
    ///
    /// Returns `Ok(None)` when the response body is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for non-2xx responses,
    /// [`ClientError::Decode`] when the body does not match `T`, and
    /// [`ClientError::Transport`] / [`ClientError::Cancelled`] when no
    /// response was received.
    pub async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.exchange(method, path, body, cancel).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|err| ClientError::Decode {
                path: path.to_owned(),
                message: err.to_string(),
            })
    }

    async fn call_expecting<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(method, path, body, cancel)
            .await?
            .ok_or_else(|| ClientError::Decode {
                path: path.to_owned(),
                message: String::from("empty response body"),
            })
    }

    /// `GET path`, decoding the body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`]; an empty body is a [`ClientError::Decode`].
    pub async fn get<T>(&self, path: &str, cancel: &CancellationToken) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.call_expecting::<(), T>(Method::GET, path, None, cancel)
            .await
    }

    /// `POST path` with a JSON body, decoding the response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`]; an empty body is a [`ClientError::Decode`].
    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_expecting(Method::POST, path, Some(body), cancel)
            .await
    }

    /// `PUT path` with a JSON body, decoding the response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`]; an empty body is a [`ClientError::Decode`].
    pub async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_expecting(Method::PUT, path, Some(body), cancel)
            .await
    }

    /// Sends a request whose response body is irrelevant (actions, deletes).
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.exchange(method, path, body, cancel).await.map(drop)
    }

    /// Materialises every page of a listing endpoint.
    ///
    /// # Errors
    ///
    /// Returns the error of the first page that fails; partial results are
    /// discarded.
    pub async fn list_all<T>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        collect_pages(|page| {
            let page_path = format!("{path}?page={page}");
            async move { self.get::<Page<T>>(&page_path, cancel).await }
        })
        .await
    }
}
