use std::time::Duration;

use docquery_gemini::client::{ClientOptions, GeminiClient};
use docquery_gemini::error::GeminiError;
use docquery_gemini::stores::upload_config;
use docquery_gemini::types::{Content, GenerateContentRequest, Role, Tool};
use docquery_gemini::FileSearchApi;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer) -> GeminiClient {
    let options = ClientOptions {
        api_base_url: format!("{}/v1beta", server.uri()),
        upload_base_url: format!("{}/upload/v1beta", server.uri()),
        request_timeout: Duration::from_secs(5),
    };
    GeminiClient::new(API_KEY, &options).unwrap()
}

/// Serve `response` for the operation every error-mapping test fetches.
async fn respond_to_get(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/op-1"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_store_posts_display_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/fileSearchStores"))
        .and(header("x-goog-api-key", API_KEY))
        .and(body_json(json!({ "displayName": "streams-pdf-chat-abcd1234" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "fileSearchStores/abc",
            "displayName": "streams-pdf-chat-abcd1234",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = client_for(&server)
        .create_store("streams-pdf-chat-abcd1234")
        .await
        .unwrap();

    assert_eq!(store.name, "fileSearchStores/abc");
    assert_eq!(store.display_name.as_deref(), Some("streams-pdf-chat-abcd1234"));
}

#[tokio::test]
async fn delete_store_forces() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1beta/fileSearchStores/abc"))
        .and(query_param("force", "true"))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .delete_store("fileSearchStores/abc", true)
        .await
        .unwrap();
}

#[tokio::test]
async fn get_operation_reads_resource_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/fileSearchStores/abc/upload/operations/1"))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "fileSearchStores/abc/upload/operations/1",
            "done": true,
            "response": { "documentName": "fileSearchStores/abc/documents/d1" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let operation = client_for(&server)
        .get_operation("fileSearchStores/abc/upload/operations/1")
        .await
        .unwrap();

    assert!(operation.is_done());
    assert_eq!(
        operation.response,
        Some(json!({ "documentName": "fileSearchStores/abc/documents/d1" }))
    );
}

#[tokio::test]
async fn generate_content_strips_model_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", API_KEY))
        .and(body_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "What is X?" }] }],
            "tools": [{ "fileSearch": { "fileSearchStoreNames": ["fileSearchStores/abc"] } }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "X is Y." }] },
                "finishReason": "STOP",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerateContentRequest {
        contents: vec![Content::text(Role::User, "What is X?")],
        tools: vec![Tool::file_search("fileSearchStores/abc")],
    };
    let response = client_for(&server)
        .generate_content("models/gemini-2.5-flash", &request)
        .await
        .unwrap();

    let text = response.candidates[0].content.as_ref().unwrap().parts[0]
        .text
        .as_deref();
    assert_eq!(text, Some("X is Y."));
}

#[tokio::test]
async fn upload_sends_multipart_related_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/fileSearchStores/abc:uploadToFileSearchStore"))
        .and(query_param("uploadType", "multipart"))
        .and(header("X-Goog-Upload-Protocol", "multipart"))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "fileSearchStores/abc/upload/operations/op-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    std::fs::write(file.path(), b"%PDF-1.4 body").unwrap();
    let config = upload_config("report.pdf");

    let operation = client_for(&server)
        .upload_to_store("fileSearchStores/abc", file.path(), &config)
        .await
        .unwrap();
    assert_eq!(operation.name, "fileSearchStores/abc/upload/operations/op-1");
    assert!(!operation.is_done());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let content_type = request
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let boundary = content_type
        .strip_prefix("multipart/related; boundary=")
        .unwrap();

    let metadata = serde_json::to_string(&config).unwrap();
    let expected = format!(
        "--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{boundary}\r\n\
         Content-Type: application/pdf\r\n\r\n\
         %PDF-1.4 body\r\n\
         --{boundary}--\r\n"
    );
    assert_eq!(String::from_utf8(request.body.clone()).unwrap(), expected);
}

#[tokio::test]
async fn error_envelope_message_is_preferred() {
    let server = MockServer::start().await;
    respond_to_get(
        &server,
        ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "Store not found", "status": "NOT_FOUND" },
        })),
    )
    .await;

    let err = client_for(&server)
        .get_operation("operations/op-1")
        .await
        .unwrap_err();

    match err {
        GeminiError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Store not found");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn raw_body_is_used_without_envelope() {
    let server = MockServer::start().await;
    respond_to_get(
        &server,
        ResponseTemplate::new(502).set_body_string("upstream unavailable\n"),
    )
    .await;

    let err = client_for(&server)
        .get_operation("operations/op-1")
        .await
        .unwrap_err();

    match err {
        GeminiError::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_mentions_quota() {
    let server = MockServer::start().await;
    respond_to_get(
        &server,
        ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource exhausted" },
        })),
    )
    .await;

    let err = client_for(&server)
        .get_operation("operations/op-1")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Gemini API error (429): quota exceeded, try again shortly: Resource exhausted"
    );
}

#[tokio::test]
async fn unauthorized_is_an_auth_error() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        respond_to_get(
            &server,
            ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": status, "message": "Permission denied" },
            })),
        )
        .await;

        let err = client_for(&server)
            .get_operation("operations/op-1")
            .await
            .unwrap_err();

        match err {
            GeminiError::Auth(message) => {
                assert!(message.contains(&status.to_string()));
                assert!(message.contains("Permission denied"));
            }
            other => panic!("expected Auth for {status}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn invalid_key_reason_is_an_auth_error() {
    let server = MockServer::start().await;
    respond_to_get(
        &server,
        ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                    "reason": "API_KEY_INVALID",
                    "domain": "googleapis.com",
                }],
            },
        })),
    )
    .await;

    let err = client_for(&server)
        .get_operation("operations/op-1")
        .await
        .unwrap_err();

    assert!(err.is_auth());
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn other_bad_requests_stay_api_errors() {
    let server = MockServer::start().await;
    respond_to_get(
        &server,
        ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Invalid operation name",
                "details": [{ "reason": "BAD_NAME" }],
            },
        })),
    )
    .await;

    let err = client_for(&server)
        .get_operation("operations/op-1")
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::Api { status: 400, .. }));
}

#[tokio::test]
async fn malformed_success_body_is_a_parse_error() {
    let server = MockServer::start().await;
    respond_to_get(
        &server,
        ResponseTemplate::new(200).set_body_string("not json"),
    )
    .await;

    let err = client_for(&server)
        .get_operation("operations/op-1")
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::ResponseParse(_)));
}
