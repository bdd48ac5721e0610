use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::GeminiError;
use crate::types::{
    FileSearchStore, GenerateContentRequest, GenerateContentResponse, Operation, UploadConfig,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote calls the document lifecycle depends on.
///
/// [`GeminiClient`](crate::client::GeminiClient) implements this over HTTP.
/// Every method is a single remote attempt; nothing here retries.
///
/// Methods return boxed futures for dyn compatibility.
pub trait FileSearchApi: Send + Sync {
    /// Provision an empty store.
    fn create_store<'a>(
        &'a self,
        display_name: &'a str,
    ) -> BoxFuture<'a, Result<FileSearchStore, GeminiError>>;

    /// Delete a store. With `force` the store's documents go with it.
    fn delete_store<'a>(
        &'a self,
        store_name: &'a str,
        force: bool,
    ) -> BoxFuture<'a, Result<(), GeminiError>>;

    /// Submit a file for indexing. Returns the long-running operation.
    fn upload_to_store<'a>(
        &'a self,
        store_name: &'a str,
        file_path: &'a Path,
        config: &'a UploadConfig,
    ) -> BoxFuture<'a, Result<Operation, GeminiError>>;

    /// Refresh an operation's state.
    fn get_operation<'a>(
        &'a self,
        operation_name: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GeminiError>>;

    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a GenerateContentRequest,
    ) -> BoxFuture<'a, Result<GenerateContentResponse, GeminiError>>;
}
