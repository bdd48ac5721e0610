//! Grounded generation against a single store.

use docquery_core::models::chat::{ChatRole, ChatTurn};
use tracing::info;

use crate::api::FileSearchApi;
use crate::error::GeminiError;
use crate::types::{Content, GenerateContentRequest, GenerateContentResponse, Role, Tool};

/// Rebuild the wire conversation from the full chat history.
///
/// Turns without a role or with empty content are skipped. `Assistant` maps
/// to the service's `model` role; every other role is sent as `user`.
pub fn build_conversation(history: &[ChatTurn]) -> Vec<Content> {
    history
        .iter()
        .filter(|turn| !turn.content.is_empty())
        .filter_map(|turn| {
            let role = match turn.role? {
                ChatRole::Assistant => Role::Model,
                ChatRole::User | ChatRole::Other => Role::User,
            };
            Some(Content::text(role, turn.content.clone()))
        })
        .collect()
}

/// Generate an answer with file search bound to exactly `store_name`.
///
/// There is no ungrounded fallback and no retry; any failure is returned as
/// [`GeminiError::Query`] so the user can resubmit.
pub async fn query_file_search(
    api: &dyn FileSearchApi,
    conversation: Vec<Content>,
    store_name: &str,
    model: &str,
) -> Result<GenerateContentResponse, GeminiError> {
    let request = GenerateContentRequest {
        contents: conversation,
        tools: vec![Tool::file_search(store_name)],
    };

    info!(model, store_name, turns = request.contents.len(), "querying file search");

    let response = api
        .generate_content(model, &request)
        .await
        .map_err(|e| e.wrap(GeminiError::Query))?;

    info!(
        model,
        candidates = response.candidates.len(),
        total_tokens = response.usage_metadata.map(|u| u.total_token_count).unwrap_or(0),
        "query complete"
    );
    Ok(response)
}
