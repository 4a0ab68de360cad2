#![allow(dead_code)]

use gemini_file_chat::Gemini;
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";
pub const MODEL: &str = "gemini-2.5-flash";

pub fn gemini_for(server: &MockServer) -> Gemini {
    let base_url = Url::parse(&server.uri()).expect("mock server uri is a valid URL");
    Gemini::with_base_url(API_KEY, base_url).expect("client builds")
}

pub fn file_uri(file_id: &str) -> String {
    format!("https://generativelanguage.googleapis.com/v1beta/files/{file_id}")
}

pub fn session_path(file_id: &str) -> String {
    format!("/upload-session/{file_id}")
}

/// Matches a resumable upload start; extend with `.and(..)` before responding.
pub fn upload_start_request() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(query_param("key", API_KEY))
        .and(header("x-goog-upload-protocol", "resumable"))
        .and(header("x-goog-upload-command", "start"))
}

/// Upload start response carrying a session URL on the mock server.
pub fn upload_started(server: &MockServer, file_id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header(
        "x-goog-upload-url",
        format!("{}{}", server.uri(), session_path(file_id)),
    )
}

pub fn upload_start(server: &MockServer, file_id: &str) -> Mock {
    upload_start_request().respond_with(upload_started(server, file_id))
}

/// Finalizing transfer that reports the file as `state`.
pub fn upload_finalize(file_id: &str, state: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path(session_path(file_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "name": format!("files/{file_id}"),
                "mimeType": "image/png",
                "sizeBytes": "1024",
                "uri": file_uri(file_id),
                "state": state
            }
        })))
}

pub fn file_status(file_id: &str, body: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/v1beta/files/{file_id}")))
        .and(query_param("key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

pub fn active(file_id: &str) -> Value {
    json!({ "name": format!("files/{file_id}"), "uri": file_uri(file_id), "state": "ACTIVE" })
}

pub fn processing(file_id: &str) -> Value {
    json!({ "name": format!("files/{file_id}"), "uri": file_uri(file_id), "state": "PROCESSING" })
}

pub fn generation_response(text: &str, total_tokens: u32) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {
            "promptTokenCount": total_tokens.saturating_sub(5),
            "candidatesTokenCount": 5,
            "totalTokenCount": total_tokens
        },
        "modelVersion": MODEL
    })
}

pub fn generate_request(model: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(format!("/v1beta/models/{model}:generateContent")))
        .and(query_param("key", API_KEY))
}

pub fn generate(model: &str, body: Value) -> Mock {
    generate_request(model).respond_with(ResponseTemplate::new(200).set_body_json(body))
}
