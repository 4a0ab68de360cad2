//! Loose, host-facing generation settings and their normalization into a
//! [`GenerationConfig`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::generation::model::GenerationConfig;

/// The service accepts at most this many stop sequences.
pub const MAX_STOP_SEQUENCES: usize = 5;

/// A response schema as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseSchema {
    /// Schema typed into a text field; parsed as JSON when the config is built
    Text(String),
    /// Already-structured schema
    Json(Value),
}

impl ResponseSchema {
    fn is_blank(&self) -> bool {
        match self {
            ResponseSchema::Text(text) => text.trim().is_empty(),
            ResponseSchema::Json(value) => value.is_null(),
        }
    }
}

/// Generation settings as they arrive from the host.
///
/// Each knob is independent and optional. Nothing here has a default value: a knob
/// that is `None` is simply not sent.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<i32>,
    pub max_output_tokens: Option<i32>,
    pub candidate_count: Option<i32>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub response_mime_type: Option<String>,
    pub response_schema: Option<ResponseSchema>,
    pub stop_sequences: Vec<String>,
}

impl GenerationOptions {
    /// Whether structured JSON output was requested.
    pub fn wants_json(&self) -> bool {
        self.response_mime_type.as_deref() == Some(mime::APPLICATION_JSON.as_ref())
    }

    /// Builds a config containing exactly the fields that were set.
    ///
    /// A text schema that is not valid JSON is dropped rather than failing the request.
    pub fn build_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
            candidate_count: self.candidate_count,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            response_mime_type: self.response_mime_type.clone(),
            response_schema: self.resolve_schema(),
            stop_sequences: self.resolve_stop_sequences(),
        }
    }

    fn resolve_stop_sequences(&self) -> Option<Vec<String>> {
        let mut sequences: Vec<String> = self
            .stop_sequences
            .iter()
            .filter(|sequence| !sequence.is_empty())
            .cloned()
            .collect();

        if sequences.len() > MAX_STOP_SEQUENCES {
            warn!(
                count = sequences.len(),
                kept = MAX_STOP_SEQUENCES,
                "too many stop sequences; extra entries dropped"
            );
            sequences.truncate(MAX_STOP_SEQUENCES);
        }

        (!sequences.is_empty()).then_some(sequences)
    }

    fn resolve_schema(&self) -> Option<Value> {
        if !self.wants_json() {
            return None;
        }
        let schema = self.response_schema.as_ref().filter(|s| !s.is_blank())?;

        match schema {
            ResponseSchema::Json(value) => Some(value.clone()),
            ResponseSchema::Text(text) => match serde_json::from_str(text) {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(%error, "response schema is not valid JSON; omitting it");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_set_fields_are_emitted() {
        let options = GenerationOptions {
            temperature: Some(0.5),
            ..Default::default()
        };

        let config = options.build_config();
        assert_eq!(serde_json::to_value(&config).unwrap(), json!({ "temperature": 0.5 }));
    }

    #[test]
    fn empty_options_give_empty_config() {
        assert!(GenerationOptions::default().build_config().is_empty());
    }

    #[test]
    fn all_scalar_fields_are_copied() {
        let options = GenerationOptions {
            temperature: Some(0.25),
            top_p: Some(0.5),
            top_k: Some(40),
            max_output_tokens: Some(1024),
            candidate_count: Some(2),
            presence_penalty: Some(-0.5),
            frequency_penalty: Some(1.5),
            response_mime_type: Some("text/plain".to_string()),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(options.build_config()).unwrap(),
            json!({
                "temperature": 0.25,
                "topP": 0.5,
                "topK": 40,
                "maxOutputTokens": 1024,
                "candidateCount": 2,
                "presencePenalty": -0.5,
                "frequencyPenalty": 1.5,
                "responseMimeType": "text/plain"
            })
        );
    }

    #[test]
    fn empty_stop_sequences_are_filtered() {
        let options = GenerationOptions {
            stop_sequences: vec!["END".into(), String::new(), "STOP".into()],
            ..Default::default()
        };
        assert_eq!(
            options.build_config().stop_sequences,
            Some(vec!["END".to_string(), "STOP".to_string()])
        );

        let only_blank = GenerationOptions {
            stop_sequences: vec![String::new(), String::new()],
            ..Default::default()
        };
        assert_eq!(only_blank.build_config().stop_sequences, None);
    }

    #[test]
    fn stop_sequences_are_capped() {
        let options = GenerationOptions {
            stop_sequences: (1..=7).map(|i| format!("S{i}")).collect(),
            ..Default::default()
        };
        let sequences = options.build_config().stop_sequences.unwrap();
        assert_eq!(sequences, vec!["S1", "S2", "S3", "S4", "S5"]);
    }

    #[test]
    fn invalid_schema_text_is_omitted() {
        let options = GenerationOptions {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(ResponseSchema::Text("{bad json".to_string())),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(options.build_config()).unwrap(),
            json!({ "responseMimeType": "application/json" })
        );
    }

    #[test]
    fn schema_text_is_parsed_for_json_output() {
        let options = GenerationOptions {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(ResponseSchema::Text(
                r#"{"type":"object","properties":{"label":{"type":"string"}}}"#.to_string(),
            )),
            ..Default::default()
        };

        assert_eq!(
            options.build_config().response_schema,
            Some(json!({"type": "object", "properties": {"label": {"type": "string"}}}))
        );
    }

    #[test]
    fn structured_schema_passes_through() {
        let schema = json!({"type": "array", "items": {"type": "string"}});
        let options = GenerationOptions {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(ResponseSchema::Json(schema.clone())),
            ..Default::default()
        };

        assert_eq!(options.build_config().response_schema, Some(schema));
    }

    #[test]
    fn schema_ignored_without_json_output() {
        let options = GenerationOptions {
            response_mime_type: Some("text/plain".to_string()),
            response_schema: Some(ResponseSchema::Text(r#"{"type":"string"}"#.to_string())),
            ..Default::default()
        };
        assert_eq!(options.build_config().response_schema, None);

        let no_mime = GenerationOptions {
            response_schema: Some(ResponseSchema::Text(r#"{"type":"string"}"#.to_string())),
            ..Default::default()
        };
        assert_eq!(no_mime.build_config().response_schema, None);
    }

    #[test]
    fn options_deserialize_from_host_bundle() {
        let options: GenerationOptions = serde_json::from_value(json!({
            "temperature": 0.5,
            "responseMimeType": "application/json",
            "responseSchema": "{\"type\":\"string\"}",
            "stopSequences": ["###"]
        }))
        .unwrap();

        assert_eq!(options.temperature, Some(0.5));
        assert_eq!(
            options.response_schema,
            Some(ResponseSchema::Text("{\"type\":\"string\"}".to_string()))
        );
        assert_eq!(options.top_k, None);
        assert_eq!(options.stop_sequences, vec!["###"]);
    }
}
