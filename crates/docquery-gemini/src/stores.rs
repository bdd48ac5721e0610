//! Store lifecycle: create, upload into, delete.
//!
//! Each call is independent and attempted once. These functions never roll
//! back on their own; when an upload fails after its store was created, the
//! caller deletes the store (see `docquery-cli`'s session).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use docquery_core::store_names::build_store_name;

use crate::api::FileSearchApi;
use crate::error::GeminiError;
use crate::operations::{wait_for_operation, PollSettings};
use crate::types::{CustomMetadata, FileSearchStore, UploadConfig};

/// Value of the `source` metadata tag on every upload.
pub const UPLOAD_SOURCE_TAG: &str = "docquery_upload";

/// The completed indexing operation for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub operation_name: String,
    /// The operation's result payload, if the service returned one.
    pub response: Option<serde_json::Value>,
}

impl UploadResult {
    /// Resource name of the indexed document, when reported.
    pub fn document_name(&self) -> Option<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.get("documentName"))
            .and_then(|v| v.as_str())
    }
}

pub async fn create_store(
    api: &dyn FileSearchApi,
    display_name: &str,
) -> Result<FileSearchStore, GeminiError> {
    let store = api
        .create_store(display_name)
        .await
        .map_err(|e| e.wrap(GeminiError::StoreCreate))?;

    info!(store_name = %store.name, display_name, "created file search store");
    Ok(store)
}

/// Upload metadata: the display name plus the fixed source tag and the
/// current unix time.
pub fn upload_config(display_name: &str) -> UploadConfig {
    UploadConfig {
        display_name: display_name.to_string(),
        custom_metadata: vec![
            CustomMetadata::string("source", UPLOAD_SOURCE_TAG),
            CustomMetadata::numeric("timestamp", jiff::Timestamp::now().as_second() as f64),
        ],
    }
}

/// Upload `file_path` into `store_name` and wait for indexing to finish.
///
/// A rejected submission is wrapped as [`GeminiError::Upload`]. Poller
/// failures ([`GeminiError::OperationTimeout`],
/// [`GeminiError::OperationFailed`]) and refresh errors pass through.
pub async fn upload_file(
    api: &dyn FileSearchApi,
    store_name: &str,
    file_path: &Path,
    display_name: &str,
    poll: &PollSettings,
) -> Result<UploadResult, GeminiError> {
    let config = upload_config(display_name);

    info!(store_name, display_name, path = %file_path.display(), "starting document upload");

    let operation = api
        .upload_to_store(store_name, file_path, &config)
        .await
        .map_err(|e| e.wrap(GeminiError::Upload))?;

    let completed = wait_for_operation(api, operation, poll).await?;

    info!(store_name, operation = %completed.name, "document indexed");

    Ok(UploadResult {
        operation_name: completed.name,
        response: completed.response,
    })
}

/// Force-delete a store and everything in it.
///
/// Callers treat a failure as a notice to report, not a reason to abort.
pub async fn delete_store(api: &dyn FileSearchApi, store_name: &str) -> Result<(), GeminiError> {
    api.delete_store(store_name, true)
        .await
        .map_err(|e| e.wrap(GeminiError::Cleanup))?;

    info!(store_name, "deleted file search store");
    Ok(())
}
