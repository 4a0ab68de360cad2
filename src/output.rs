//! Shapes a generation result into the record handed back to the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::generation::{GenerationConfig, GenerationResult};

/// File name reported when the host did not provide one.
pub const FALLBACK_FILE_NAME: &str = "uploaded-file";

/// Which output shape to produce. Chosen once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Model, text, token count and basic file facts
    #[default]
    Simple,
    /// Everything known about the item, including the raw response
    Full,
}

/// The compact output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleOutput {
    pub model: String,
    pub response: String,
    pub token_count: u32,
    pub file_name: String,
    pub file_size: usize,
}

/// One projected output record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Simple(SimpleOutput),
    /// Original input fields overlaid with upload and generation metadata
    Full(Map<String, Value>),
}

impl OutputRecord {
    pub fn into_json(self) -> Map<String, Value> {
        match self {
            OutputRecord::Simple(simple) => match serde_json::to_value(simple) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            OutputRecord::Full(map) => map,
        }
    }
}

/// Everything one item's pipeline produced, borrowed for projection.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    /// Model id as supplied by the caller
    pub model: &'a str,
    pub prompt: &'a str,
    pub file_name: Option<&'a str>,
    pub file_size: usize,
    pub mime_type: &'a str,
    pub file_uri: &'a str,
    /// The config actually sent with the request
    pub generation_config: &'a GenerationConfig,
    pub result: &'a GenerationResult,
    /// Fields of the input item
    pub input: &'a Map<String, Value>,
}

impl OutputMode {
    pub fn project(self, projection: &Projection<'_>) -> OutputRecord {
        let file_name = projection.file_name.unwrap_or(FALLBACK_FILE_NAME).to_string();

        match self {
            OutputMode::Simple => OutputRecord::Simple(SimpleOutput {
                model: projection.model.to_string(),
                response: projection.result.text.clone(),
                token_count: projection.result.token_count,
                file_name,
                file_size: projection.file_size,
            }),
            OutputMode::Full => {
                let mut record = projection.input.clone();
                let fields = [
                    ("fileUri", Value::from(projection.file_uri)),
                    ("fileName", Value::from(file_name)),
                    ("mimeType", Value::from(projection.mime_type)),
                    ("fileSize", Value::from(projection.file_size)),
                    ("prompt", Value::from(projection.prompt)),
                    ("model", Value::from(projection.model)),
                    ("tokenCount", Value::from(projection.result.token_count)),
                    (
                        "generationConfig",
                        serde_json::to_value(projection.generation_config).unwrap_or_default(),
                    ),
                    ("response", Value::from(projection.result.text.as_str())),
                    ("fullResponse", projection.result.raw_response.clone()),
                ];
                for (key, value) in fields {
                    record.insert(key.to_string(), value);
                }
                OutputRecord::Full(record)
            }
        }
    }
}
