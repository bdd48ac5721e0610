//! docquery-gemini
//!
//! Gemini file search binding: store lifecycle, operation polling, grounded
//! queries, and response normalization.

pub mod api;
pub mod client;
pub mod error;
pub mod operations;
pub mod query;
pub mod response;
pub mod stores;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::api::FileSearchApi;
pub use crate::client::{ensure_client, ensure_client_with, ClientHandle, ClientOptions, GeminiClient};
pub use crate::error::GeminiError;
pub use crate::operations::{wait_for_operation, PollSettings};
pub use crate::query::{build_conversation, query_file_search};
pub use crate::response::parse_response;
pub use crate::stores::{build_store_name, create_store, delete_store, upload_file, UploadResult};
