//! HTTP binding for the Gemini file search REST API.
//!
//! A [`GeminiClient`] owns one `reqwest` connection pool with the API key
//! baked into its default headers. [`ClientHandle`] is the cheaply clonable
//! form the session caches; [`ensure_client`] only builds a new one when the
//! credential changes.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::api::{BoxFuture, FileSearchApi};
use crate::error::GeminiError;
use crate::types::{
    FileSearchStore, GenerateContentRequest, GenerateContentResponse, Operation, UploadConfig,
};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_UPLOAD_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/upload/v1beta";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Endpoint and transport settings for a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub api_base_url: String,
    pub upload_base_url: String,
    /// Ceiling for a single HTTP request, including file upload bodies.
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
}

impl GeminiClient {
    /// Build a client bound to `api_key`.
    ///
    /// No request is made here. Fails with [`GeminiError::Auth`] when the key
    /// is empty or cannot be sent as a header, or the HTTP client cannot be
    /// built.
    pub fn new(api_key: &str, options: &ClientOptions) -> Result<Self, GeminiError> {
        if api_key.trim().is_empty() {
            return Err(GeminiError::Auth("API key is empty".to_string()));
        }

        let mut key_value = HeaderValue::from_str(api_key)
            .map_err(|e| GeminiError::Auth(format!("API key is not a valid header value: {e}")))?;
        key_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| GeminiError::Auth(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            http,
            api_base_url: options.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: options.upload_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// True if this client was built for `api_key`.
    pub fn is_bound_to(&self, api_key: &str) -> bool {
        self.api_key == api_key
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GeminiError> {
        let text = self.send(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "failed to parse Gemini response");
            GeminiError::ResponseParse(format!("{e}. Response: {text}"))
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, GeminiError> {
        let response = request
            .send()
            .await
            .map_err(|e| GeminiError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GeminiError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(map_api_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("upload_base_url", &self.upload_base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

/// Reason code the service attaches to a 400 for an unknown API key.
const API_KEY_INVALID: &str = "API_KEY_INVALID";

/// Map a non-2xx response to a [`GeminiError`], preferring the message from
/// the JSON error envelope over the raw body.
///
/// 401, 403 and a 400 carrying `API_KEY_INVALID` mean the key was refused
/// and become [`GeminiError::Auth`]. Everything else is
/// [`GeminiError::Api`].
fn map_api_error(status: u16, body: &str) -> GeminiError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let key_invalid = envelope.as_ref().is_some_and(|envelope| {
        envelope
            .error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some(API_KEY_INVALID))
    });

    let message = envelope
        .map(|envelope| envelope.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        401 | 403 => GeminiError::Auth(format!("API key rejected ({status}): {message}")),
        400 if key_invalid => GeminiError::Auth(format!("API key rejected ({status}): {message}")),
        429 => GeminiError::Api {
            status,
            message: format!("quota exceeded, try again shortly: {message}"),
        },
        _ => GeminiError::Api { status, message },
    }
}

/// MIME type sent for the document part of an upload.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Assemble a `multipart/related` body: JSON metadata, then the file bytes.
fn multipart_related_body(
    boundary: &str,
    metadata: &[u8],
    mime_type: &str,
    file_bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + file_bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

impl FileSearchApi for GeminiClient {
    fn create_store<'a>(
        &'a self,
        display_name: &'a str,
    ) -> BoxFuture<'a, Result<FileSearchStore, GeminiError>> {
        Box::pin(async move {
            debug!(display_name, "creating file search store");
            let request = self
                .http
                .post(self.api_url("fileSearchStores"))
                .json(&serde_json::json!({ "displayName": display_name }));
            self.send_json(request).await
        })
    }

    fn delete_store<'a>(
        &'a self,
        store_name: &'a str,
        force: bool,
    ) -> BoxFuture<'a, Result<(), GeminiError>> {
        Box::pin(async move {
            debug!(store_name, force, "deleting file search store");
            let request = self
                .http
                .request(Method::DELETE, self.api_url(store_name))
                .query(&[("force", force)]);
            self.send(request).await.map(|_| ())
        })
    }

    fn upload_to_store<'a>(
        &'a self,
        store_name: &'a str,
        file_path: &'a Path,
        config: &'a UploadConfig,
    ) -> BoxFuture<'a, Result<Operation, GeminiError>> {
        Box::pin(async move {
            let file_bytes = tokio::fs::read(file_path).await?;
            let metadata = serde_json::to_vec(config)?;
            let mime_type = mime_type_for_path(file_path);
            let boundary = format!("docquery-{}", Uuid::new_v4().simple());
            let body = multipart_related_body(&boundary, &metadata, mime_type, &file_bytes);

            debug!(
                store_name,
                path = %file_path.display(),
                bytes = file_bytes.len(),
                mime_type,
                "uploading document"
            );

            let url = format!(
                "{}/{}:uploadToFileSearchStore",
                self.upload_base_url,
                store_name.trim_start_matches('/')
            );
            let request = self
                .http
                .post(url)
                .query(&[("uploadType", "multipart")])
                .header("X-Goog-Upload-Protocol", "multipart")
                .header(
                    CONTENT_TYPE,
                    format!("multipart/related; boundary={boundary}"),
                )
                .body(body);
            self.send_json(request).await
        })
    }

    fn get_operation<'a>(
        &'a self,
        operation_name: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GeminiError>> {
        Box::pin(async move {
            let request = self.http.get(self.api_url(operation_name));
            self.send_json(request).await
        })
    }

    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a GenerateContentRequest,
    ) -> BoxFuture<'a, Result<GenerateContentResponse, GeminiError>> {
        Box::pin(async move {
            let model = model.strip_prefix("models/").unwrap_or(model);
            debug!(model, turns = request.contents.len(), "sending generateContent request");
            let http_request = self
                .http
                .post(self.api_url(&format!("models/{model}:generateContent")))
                .json(request);
            self.send_json(http_request).await
        })
    }
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// A shared, credential-bound client. Clones share one connection pool.
#[derive(Clone)]
pub struct ClientHandle {
    client: Arc<GeminiClient>,
}

impl ClientHandle {
    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    /// True if both handles share one underlying client.
    pub fn same_client(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.client, &other.client)
    }
}

impl Deref for ClientHandle {
    type Target = GeminiClient;

    fn deref(&self) -> &GeminiClient {
        &self.client
    }
}

impl Debug for ClientHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_tuple("ClientHandle").field(&self.client).finish()
    }
}

/// Reuse `existing` when it was built for `credential`, otherwise build a new
/// client against the public Gemini endpoints.
pub fn ensure_client(
    credential: &str,
    existing: Option<&ClientHandle>,
) -> Result<ClientHandle, GeminiError> {
    ensure_client_with(credential, existing, &ClientOptions::default())
}

/// [`ensure_client`] with explicit endpoint settings.
///
/// A reused handle keeps the options it was built with.
pub fn ensure_client_with(
    credential: &str,
    existing: Option<&ClientHandle>,
    options: &ClientOptions,
) -> Result<ClientHandle, GeminiError> {
    if let Some(handle) = existing
        && handle.is_bound_to(credential)
    {
        return Ok(handle.clone());
    }

    debug!("building new Gemini client");
    let client = GeminiClient::new(credential, options)?;
    Ok(ClientHandle {
        client: Arc::new(client),
    })
}
