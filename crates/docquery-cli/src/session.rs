//! The chat session and its document lifecycle.
//!
//! [`ChatSession`] is owned by the front end and passed into every flow; the
//! Gemini crate itself keeps no state between calls. Document replacement
//! runs as a small state machine:
//!
//! ```text
//! Empty ──upload──▶ (create store) ──▶ (upload + poll) ──▶ Ready
//!                         │                  │
//!                         └──── failure ─────┴──▶ delete store, delete temp file ──▶ Empty
//! Ready ──upload──▶ delete old store (best effort) ──▶ create new store …
//! Ready ──clear───▶ delete store (reported) ──▶ Empty
//! ```
//!
//! A store reference is only recorded once its upload has completed, so a
//! failed upload never leaves the session pointing at a deleted store.

use std::path::PathBuf;

use docquery_core::models::answer::Answer;
use docquery_core::models::chat::ChatTurn;
use docquery_gemini::client::{ensure_client_with, ClientHandle};
use docquery_gemini::{
    build_conversation, build_store_name, create_store, delete_store, parse_response,
    query_file_search, upload_file, FileSearchApi, GeminiError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::local_files::{cleanup_local_file, save_uploaded_file, suffix_for};

/// Shown (and recorded) when the model returns no text or the query fails.
pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't generate a response. Please try again.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(GeminiError),

    #[error("failed to save uploaded file: {0}")]
    LocalFile(#[from] std::io::Error),

    #[error(transparent)]
    StoreCreate(GeminiError),

    #[error(transparent)]
    Upload(GeminiError),

    #[error(transparent)]
    Query(GeminiError),

    #[error("no document has been uploaded")]
    NoDocument,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("model {0} is not one of the configured models")]
    UnsupportedModel(String),
}

impl SessionError {
    /// True when an upload gave up waiting for indexing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Upload(GeminiError::OperationTimeout { .. }))
    }
}

/// A store deletion that failed. Reported to the user, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupNotice {
    pub store_name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveDocument {
    pub store_name: String,
    pub display_name: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DocumentState {
    #[default]
    Empty,
    Ready(ActiveDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub store_name: String,
    pub display_name: String,
    pub document_name: Option<String>,
    /// Failures deleting the replaced store.
    pub notices: Vec<CleanupNotice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearOutcome {
    pub notices: Vec<CleanupNotice>,
}

pub struct ChatSession {
    settings: Settings,
    model: String,
    client: Option<ClientHandle>,
    document: DocumentState,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(settings: Settings) -> Self {
        let model = settings.default_model.clone();
        Self {
            settings,
            model,
            client: None,
            document: DocumentState::Empty,
            history: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn select_model(&mut self, model: &str) -> Result<(), SessionError> {
        if !self.settings.supports_model(model) {
            return Err(SessionError::UnsupportedModel(model.to_string()));
        }
        self.model = model.to_string();
        Ok(())
    }

    /// The cached client for `credential`, rebuilt only when the credential
    /// changes.
    pub fn client(&mut self, credential: &str) -> Result<ClientHandle, SessionError> {
        let handle = ensure_client_with(
            credential,
            self.client.as_ref(),
            &self.settings.client_options(),
        )
        .map_err(SessionError::Auth)?;
        self.client = Some(handle.clone());
        Ok(handle)
    }

    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    pub fn active_store(&self) -> Option<&str> {
        match &self.document {
            DocumentState::Ready(doc) => Some(&doc.store_name),
            DocumentState::Empty => None,
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Index a new document in a fresh store, replacing any current one.
    ///
    /// On failure the new store and temp file are removed and the session
    /// is left `Empty`.
    pub async fn upload_document(
        &mut self,
        api: &dyn FileSearchApi,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<UploadOutcome, SessionError> {
        let mut notices = Vec::new();

        if let DocumentState::Ready(previous) = std::mem::take(&mut self.document) {
            info!(store_name = %previous.store_name, "replacing current document");
            notices.extend(release_store(api, &previous.store_name).await);
            cleanup_local_file(Some(&previous.local_path));
        }
        self.history.clear();

        let local_path = save_uploaded_file(bytes, &suffix_for(file_name))?;

        let display_name = build_store_name(&self.settings.store_name_prefix);
        let store = match create_store(api, &display_name).await {
            Ok(store) => store,
            Err(e) => {
                cleanup_local_file(Some(&local_path));
                return Err(remote_failure(e, SessionError::StoreCreate));
            }
        };

        let poll = self.settings.poll_settings();
        let uploaded = match upload_file(api, &store.name, &local_path, file_name, &poll).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                warn!(store_name = %store.name, error = %e, "upload failed, rolling back");
                cleanup_local_file(Some(&local_path));
                release_store(api, &store.name).await;
                return Err(remote_failure(e, SessionError::Upload));
            }
        };

        info!(store_name = %store.name, file_name, "document ready");

        self.document = DocumentState::Ready(ActiveDocument {
            store_name: store.name.clone(),
            display_name: file_name.to_string(),
            local_path,
        });

        Ok(UploadOutcome {
            store_name: store.name,
            display_name: file_name.to_string(),
            document_name: uploaded.document_name().map(str::to_string),
            notices,
        })
    }

    /// Drop the current document. Always resets local state; a failed
    /// remote delete is returned as a notice.
    pub async fn clear_document(&mut self, api: &dyn FileSearchApi) -> ClearOutcome {
        let mut outcome = ClearOutcome::default();

        if let DocumentState::Ready(doc) = std::mem::take(&mut self.document) {
            outcome
                .notices
                .extend(release_store(api, &doc.store_name).await);
            cleanup_local_file(Some(&doc.local_path));
            info!(store_name = %doc.store_name, "document cleared");
        }
        self.history.clear();

        outcome
    }

    /// Ask a question about the current document.
    ///
    /// The whole history, including this prompt, is sent on every call. On
    /// failure the store and history stay usable and a fallback reply is
    /// recorded so the transcript shows the failed turn.
    pub async fn ask(
        &mut self,
        api: &dyn FileSearchApi,
        prompt: &str,
    ) -> Result<Answer, SessionError> {
        let store_name = self
            .active_store()
            .ok_or(SessionError::NoDocument)?
            .to_string();

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        self.history.push(ChatTurn::user(prompt));
        let conversation = build_conversation(&self.history);

        let response = match query_file_search(api, conversation, &store_name, &self.model).await {
            Ok(response) => response,
            Err(e) => {
                self.history.push(ChatTurn::assistant(FALLBACK_ANSWER, Vec::new()));
                return Err(remote_failure(e, SessionError::Query));
            }
        };

        let mut answer = parse_response(&response);
        if answer.text.is_empty() {
            answer.text = FALLBACK_ANSWER.to_string();
        }

        self.history
            .push(ChatTurn::assistant(answer.text.clone(), answer.sources.clone()));
        Ok(answer)
    }
}

/// A refused credential is reported as such, whichever step hit it.
fn remote_failure(e: GeminiError, kind: fn(GeminiError) -> SessionError) -> SessionError {
    if e.is_auth() {
        SessionError::Auth(e)
    } else {
        kind(e)
    }
}

/// Best-effort store deletion. Failures are logged and handed back as a
/// notice; they never abort the surrounding flow.
async fn release_store(api: &dyn FileSearchApi, store_name: &str) -> Option<CleanupNotice> {
    match delete_store(api, store_name).await {
        Ok(()) => None,
        Err(e) => {
            warn!(store_name, error = %e, "store cleanup failed");
            Some(CleanupNotice {
                store_name: store_name.to_string(),
                message: e.to_string(),
            })
        }
    }
}
