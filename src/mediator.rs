//! Request mediation: every call to the risk service goes through
//! [`RequestMediator`], which attaches the session credential and handles
//! rejections in one place.
//!
//! | status       | notification                       | session  | caller gets                 |
//! |--------------|------------------------------------|----------|-----------------------------|
//! | 401, bearer  | "Session expired...", once         | cleared  | [`Error::SessionExpired`]   |
//! | 401, none    | server message or generic          | -        | [`Error::Unauthorized`]     |
//! | 403          | "You do not have permission..."    | -        | [`Error::Forbidden`]        |
//! | 5xx          | "Server error..."                  | -        | [`Error::Server`]           |
//! | other 4xx    | server message or generic          | -        | [`Error::Rejected`]         |
//!
//! A 401 only clears the session if it still holds the credential the
//! request went out with; a rejection of a superseded credential is stale.
//! Nothing is retried and nothing is queued.

use std::future::Future;
use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;
use crate::notify::{self, Notification, Notifier};
use crate::session::SessionManager;
use crate::types::Credential;

/// A call to the risk service, relative to the configured base URL.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub bearer: Option<Credential>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `body` cannot be serialized.
    pub fn with_json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_query<K: Into<String>, V: Into<String>>(
        mut self,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Raw response: any status the server produced.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn json(status: u16, body: &JsonValue) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `message` field of a JSON error body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        serde_json::from_slice::<JsonValue>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_owned)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if self.body.trim_ascii().is_empty() {
            return serde_json::from_value(JsonValue::Null).map_err(Into::into);
        }
        serde_json::from_slice(&self.body).map_err(Into::into)
    }
}

/// The wire. Returns `Ok` for every HTTP status; `Err` only when no response arrived.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, Error>> + Send;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL, keeping the base's own path prefix.
    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
            .parse()
            .map_err(|e| Error::Config(format!("invalid endpoint {path}: {e}")))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self.http.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(credential) = &request.bearer {
            builder = builder.bearer_auth(credential.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

/// Wraps a [`Transport`] with credential injection and the shared failure policy.
pub struct RequestMediator<T> {
    transport: T,
    session: Arc<SessionManager>,
    notifier: Arc<dyn Notifier>,
}

impl<T: Transport> RequestMediator<T> {
    #[must_use]
    pub fn new(transport: T, session: Arc<SessionManager>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            transport,
            session,
            notifier,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatch `request`, returning the response only for 2xx statuses.
    ///
    /// # Errors
    ///
    /// Network failures are returned as-is without a notification. Non-2xx
    /// statuses are mapped per the module table.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, Error> {
        request.bearer = self.session.current_credential();
        let method = request.method.clone();
        let path = request.path.clone();
        let bearer = request.bearer.clone();

        let response = self.transport.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        tracing::debug!(%method, %path, status = response.status, "Request rejected");
        Err(self.reject(&response, bearer.as_ref()))
    }

    /// `bearer` is the credential the request was dispatched with.
    fn reject(&self, response: &ApiResponse, bearer: Option<&Credential>) -> Error {
        let status = response.status;
        match status {
            401 => match bearer {
                Some(credential) => {
                    if self.session.expire(credential) {
                        self.notifier.notify(Notification::error(notify::SESSION_EXPIRED));
                    }
                    Error::SessionExpired
                }
                None => {
                    let message = self.fallback_message(response);
                    Error::Unauthorized { message }
                }
            },
            403 => {
                self.notifier.notify(Notification::error(notify::PERMISSION_DENIED));
                Error::Forbidden
            }
            500.. => {
                self.notifier.notify(Notification::error(notify::SERVER_ERROR));
                Error::Server { status }
            }
            400..=499 => {
                let message = self.fallback_message(response);
                Error::Rejected { status, message }
            }
            _ => Error::Rejected {
                status,
                message: response.server_message().unwrap_or_default(),
            },
        }
    }

    fn fallback_message(&self, response: &ApiResponse) -> String {
        let message = response
            .server_message()
            .unwrap_or_else(|| notify::GENERIC_ERROR.to_owned());
        self.notifier.notify(Notification::error(message.clone()));
        message
    }

    /// `GET` with query parameters and decode the JSON body.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send); also [`Error::Json`] on a body mismatch.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, Error> {
        let request = ApiRequest::get(path).with_query(query.iter().copied());
        self.send(request).await?.decode()
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send); also [`Error::Json`] on a body mismatch.
    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Error> {
        let request = ApiRequest::post(path).with_json(body)?;
        self.send(request).await?.decode()
    }

    /// `DELETE`; the body is ignored.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }
}
