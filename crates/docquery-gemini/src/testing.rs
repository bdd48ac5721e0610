//! In-memory [`FileSearchApi`] for tests.
//!
//! Records every call and lets a test script failures and operation
//! progress. Store resource names are `fileSearchStores/{display_name}`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::api::{BoxFuture, FileSearchApi};
use crate::error::GeminiError;
use crate::types::{
    FileSearchStore, GenerateContentRequest, GenerateContentResponse, Operation, Status,
    UploadConfig,
};

/// One recorded upload submission.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub store_name: String,
    pub file_path: PathBuf,
    pub file_existed: bool,
    pub config: UploadConfig,
}

#[derive(Debug, Default)]
struct FakeState {
    created: Vec<String>,
    deleted: Vec<String>,
    uploads: Vec<RecordedUpload>,
    polls: HashMap<String, u32>,
    requests: Vec<(String, GenerateContentRequest)>,

    /// `None` means operations never complete.
    polls_until_done: Option<u32>,
    operation_error: Option<String>,
    fail_create: Option<String>,
    fail_delete: Option<String>,
    fail_upload: Option<String>,
    fail_poll: Option<String>,
    fail_generate: Option<String>,
    reject_key: bool,
    response: GenerateContentResponse,
}

#[derive(Debug)]
pub struct FakeFileSearchApi {
    state: Mutex<FakeState>,
}

impl Default for FakeFileSearchApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeFileSearchApi {
    /// Operations finish on the first poll with no error.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                polls_until_done: Some(1),
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Operations report `done` on the `n`th poll. `0` means the upload
    /// call already returns a finished operation.
    pub fn with_polls_until_done(self, n: u32) -> Self {
        self.state().polls_until_done = Some(n);
        self
    }

    pub fn never_completes(self) -> Self {
        self.state().polls_until_done = None;
        self
    }

    /// Finished operations carry this error instead of a result.
    pub fn with_operation_error(self, message: &str) -> Self {
        self.state().operation_error = Some(message.to_string());
        self
    }

    pub fn with_create_failure(self, message: &str) -> Self {
        self.state().fail_create = Some(message.to_string());
        self
    }

    pub fn with_delete_failure(self, message: &str) -> Self {
        self.state().fail_delete = Some(message.to_string());
        self
    }

    pub fn with_upload_failure(self, message: &str) -> Self {
        self.state().fail_upload = Some(message.to_string());
        self
    }

    pub fn with_poll_failure(self, message: &str) -> Self {
        self.state().fail_poll = Some(message.to_string());
        self
    }

    pub fn with_generate_failure(self, message: &str) -> Self {
        self.state().fail_generate = Some(message.to_string());
        self
    }

    /// Every call fails as the service does for an unknown API key.
    pub fn with_rejected_key(self) -> Self {
        self.state().reject_key = true;
        self
    }

    pub fn with_response(self, response: GenerateContentResponse) -> Self {
        self.state().response = response;
        self
    }

    /// Resource names of every store created, in order.
    pub fn created_stores(&self) -> Vec<String> {
        self.state().created.clone()
    }

    /// Resource names passed to every delete call, in order, including
    /// calls that were scripted to fail.
    pub fn deleted_stores(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Created stores that have not been deleted.
    pub fn live_stores(&self) -> Vec<String> {
        let state = self.state();
        state
            .created
            .iter()
            .filter(|name| !state.deleted.contains(name))
            .cloned()
            .collect()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state().uploads.clone()
    }

    /// Total `get_operation` calls across all operations.
    pub fn poll_count(&self) -> u32 {
        self.state().polls.values().sum()
    }

    /// `(model, request)` for every generate call, in order.
    pub fn generate_requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.state().requests.clone()
    }

    fn finish(state: &FakeState, operation: &mut Operation, store_name: &str) {
        operation.done = true;
        match &state.operation_error {
            Some(message) => {
                operation.error = Some(Status {
                    code: Some(13),
                    message: Some(message.clone()),
                });
            }
            None => {
                operation.response = Some(serde_json::json!({
                    "documentName": format!("{store_name}/documents/doc-1"),
                }));
            }
        }
    }
}

fn rejected_key() -> GeminiError {
    GeminiError::Auth("API key rejected (400): API key not valid".to_string())
}

fn remote_error(message: &str) -> GeminiError {
    GeminiError::Api {
        status: 500,
        message: message.to_string(),
    }
}

impl FileSearchApi for FakeFileSearchApi {
    fn create_store<'a>(
        &'a self,
        display_name: &'a str,
    ) -> BoxFuture<'a, Result<FileSearchStore, GeminiError>> {
        Box::pin(async move {
            let mut state = self.state();
            if state.reject_key {
                return Err(rejected_key());
            }
            if let Some(message) = &state.fail_create {
                return Err(remote_error(message));
            }
            let name = format!("fileSearchStores/{display_name}");
            state.created.push(name.clone());
            Ok(FileSearchStore {
                name,
                display_name: Some(display_name.to_string()),
                create_time: None,
                update_time: None,
            })
        })
    }

    fn delete_store<'a>(
        &'a self,
        store_name: &'a str,
        _force: bool,
    ) -> BoxFuture<'a, Result<(), GeminiError>> {
        Box::pin(async move {
            let mut state = self.state();
            state.deleted.push(store_name.to_string());
            if state.reject_key {
                return Err(rejected_key());
            }
            match &state.fail_delete {
                Some(message) => Err(remote_error(message)),
                None => Ok(()),
            }
        })
    }

    fn upload_to_store<'a>(
        &'a self,
        store_name: &'a str,
        file_path: &'a Path,
        config: &'a UploadConfig,
    ) -> BoxFuture<'a, Result<Operation, GeminiError>> {
        Box::pin(async move {
            let mut state = self.state();
            state.uploads.push(RecordedUpload {
                store_name: store_name.to_string(),
                file_path: file_path.to_path_buf(),
                file_existed: file_path.exists(),
                config: config.clone(),
            });
            if state.reject_key {
                return Err(rejected_key());
            }
            if let Some(message) = &state.fail_upload {
                return Err(remote_error(message));
            }

            let mut operation = Operation {
                name: format!("{store_name}/upload/operations/op-{}", state.uploads.len()),
                ..Operation::default()
            };
            state.polls.insert(operation.name.clone(), 0);
            if state.polls_until_done == Some(0) {
                Self::finish(&state, &mut operation, store_name);
            }
            Ok(operation)
        })
    }

    fn get_operation<'a>(
        &'a self,
        operation_name: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GeminiError>> {
        Box::pin(async move {
            let mut state = self.state();
            let polls = {
                let count = state.polls.entry(operation_name.to_string()).or_insert(0);
                *count += 1;
                *count
            };
            if let Some(message) = &state.fail_poll {
                return Err(remote_error(message));
            }

            let mut operation = Operation {
                name: operation_name.to_string(),
                ..Operation::default()
            };
            if state.polls_until_done.is_some_and(|n| polls >= n) {
                let store_name = operation_name
                    .split_once("/upload/")
                    .map(|(store, _)| store)
                    .unwrap_or(operation_name);
                Self::finish(&state, &mut operation, store_name);
            }
            Ok(operation)
        })
    }

    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a GenerateContentRequest,
    ) -> BoxFuture<'a, Result<GenerateContentResponse, GeminiError>> {
        Box::pin(async move {
            let mut state = self.state();
            state.requests.push((model.to_string(), request.clone()));
            if state.reject_key {
                return Err(rejected_key());
            }
            match &state.fail_generate {
                Some(message) => Err(remote_error(message)),
                None => Ok(state.response.clone()),
            }
        })
    }
}
