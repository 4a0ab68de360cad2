//! Runs the upload → wait → generate pipeline over a sequence of host items.
//!
//! Items are processed one after another. Each item yields a
//! `Result<OutputRecord, Error>`; the run's [`FailurePolicy`] then turns that into an
//! [`OutputItem`] or aborts the run.

use mime::Mime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::{
    client::{Error as ClientError, Gemini, ModelId},
    files::{
        handle::DEFAULT_POLL_INTERVAL, model::mime_from_name, Error as FilesError,
        ProcessingTimeout,
    },
    generation::{Error as GenerationError, GenerationOptions},
    output::{OutputMode, OutputRecord, Projection},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to upload file"))]
    Upload { source: ClientError },

    #[snafu(display("file did not become ready"))]
    Processing { source: FilesError },

    #[snafu(display("failed to generate content"))]
    Generation { source: GenerationError },
}

impl Error {
    /// Stable, machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Upload {
                source: ClientError::UploadInit,
            } => "upload_init",
            Error::Upload {
                source: ClientError::UploadTransfer,
            } => "upload_transfer",
            Error::Upload { .. } => "upload",
            Error::Processing {
                source: FilesError::ProcessingFailed { .. },
            } => "processing_failed",
            Error::Processing {
                source: FilesError::ProcessingTimeout { .. },
            } => "processing_timeout",
            Error::Processing { .. } => "processing",
            Error::Generation {
                source: GenerationError::NoResponse { .. },
            } => "no_response",
            Error::Generation { .. } => "generation",
        }
    }
}

/// Error that aborted a fail-fast run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RunError {
    #[snafu(display("item {index} failed"))]
    ItemFailed { index: usize, source: Error },
}

impl RunError {
    /// Index of the input item that failed.
    pub fn index(&self) -> usize {
        match self {
            RunError::ItemFailed { index, .. } => *index,
        }
    }

    pub fn item_error(&self) -> &Error {
        match self {
            RunError::ItemFailed { source, .. } => source,
        }
    }
}

/// What to do when an item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failing item
    #[default]
    FailFast,
    /// Record the failure on the item and carry on
    ContinueOnFail,
}

/// Serializable description of a failed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub kind: String,
    pub message: String,
    pub item_index: usize,
}

impl ErrorDescriptor {
    pub fn new(index: usize, error: &Error) -> Self {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }

        Self {
            kind: error.kind().to_string(),
            message,
            item_index: index,
        }
    }
}

/// One record of the run's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputItem {
    pub json: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
    /// Index of the input item that produced this record
    pub paired_item: usize,
}

impl FailurePolicy {
    /// Turns one item's outcome into an output record, or aborts under `FailFast`.
    pub fn apply(
        self,
        index: usize,
        input: Map<String, Value>,
        outcome: Result<OutputRecord, Error>,
    ) -> Result<OutputItem, RunError> {
        match (outcome, self) {
            (Ok(record), _) => Ok(OutputItem {
                json: record.into_json(),
                error: None,
                paired_item: index,
            }),
            (Err(error), FailurePolicy::ContinueOnFail) => {
                warn!(item.index = index, error = %error, "item failed; continuing");
                Ok(OutputItem {
                    json: input,
                    error: Some(ErrorDescriptor::new(index, &error)),
                    paired_item: index,
                })
            }
            (Err(source), FailurePolicy::FailFast) => Err(RunError::ItemFailed { index, source }),
        }
    }

    /// Folds a sequence of item outcomes into the run output.
    ///
    /// Under `FailFast` the sequence is not consumed past the first error.
    pub fn reduce<I>(self, outcomes: I) -> Result<Vec<OutputItem>, RunError>
    where
        I: IntoIterator<Item = (Map<String, Value>, Result<OutputRecord, Error>)>,
    {
        outcomes
            .into_iter()
            .enumerate()
            .map(|(index, (input, outcome))| self.apply(index, input, outcome))
            .collect()
    }
}

/// A binary payload as handed over by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryFile {
    pub data: Vec<u8>,
    /// Declared MIME type; guessed from the file name when absent
    pub mime_type: Option<Mime>,
    pub file_name: Option<String>,
}

impl BinaryFile {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
            file_name: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: Mime) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Declared MIME type, else a guess from the file name, else
    /// `application/octet-stream`.
    pub fn resolved_mime_type(&self) -> Mime {
        self.mime_type
            .clone()
            .unwrap_or_else(|| mime_from_name(self.file_name.as_deref()))
    }
}

/// Per-item parameters.
#[derive(Debug, Clone)]
pub struct ItemParameters {
    pub prompt: String,
    pub model: ModelId,
    pub generation: GenerationOptions,
    pub processing_timeout: ProcessingTimeout,
}

impl ItemParameters {
    pub fn new(prompt: impl Into<String>, model: impl Into<ModelId>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            generation: GenerationOptions::default(),
            processing_timeout: ProcessingTimeout::default(),
        }
    }

    pub fn with_generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_processing_timeout(mut self, timeout: ProcessingTimeout) -> Self {
        self.processing_timeout = timeout;
        self
    }
}

/// One input item.
#[derive(Debug, Clone)]
pub struct WorkflowItem {
    /// The item's own fields; echoed back in full mode and on failure
    pub json: Map<String, Value>,
    pub file: BinaryFile,
    pub parameters: ItemParameters,
}

impl WorkflowItem {
    pub fn new(file: BinaryFile, parameters: ItemParameters) -> Self {
        Self {
            json: Map::new(),
            file,
            parameters,
        }
    }

    pub fn with_json(mut self, json: Map<String, Value>) -> Self {
        self.json = json;
        self
    }
}

/// Settings fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub output_mode: OutputMode,
    pub failure_policy: FailurePolicy,
    /// Spacing between file status polls
    pub poll_interval: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::default(),
            failure_policy: FailurePolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl RunSettings {
    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Sequences upload, processing wait, generation and projection for each item.
#[derive(Debug, Clone)]
pub struct Workflow {
    gemini: Gemini,
    settings: RunSettings,
}

impl Workflow {
    pub fn new(gemini: Gemini, settings: RunSettings) -> Self {
        Self { gemini, settings }
    }

    /// Processes `items` in order.
    ///
    /// Under [`FailurePolicy::FailFast`] the first failure is returned and later items
    /// are never started.
    #[instrument(skip_all, fields(
        items.count = items.len(),
        output.mode = ?self.settings.output_mode,
        failure.policy = ?self.settings.failure_policy,
    ))]
    pub async fn run(&self, items: Vec<WorkflowItem>) -> Result<Vec<OutputItem>, RunError> {
        let mut output = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let WorkflowItem {
                json,
                file,
                parameters,
            } = item;
            let outcome = self.process_item(index, file, &parameters, &json).await;
            output.push(self.settings.failure_policy.apply(index, json, outcome)?);
        }

        info!(records = output.len(), "run finished");
        Ok(output)
    }

    /// Runs the full pipeline for a single item.
    #[instrument(skip_all, fields(
        item.index = index,
        model = %parameters.model,
        file.size = file.data.len(),
    ))]
    pub async fn process_item(
        &self,
        index: usize,
        file: BinaryFile,
        parameters: &ItemParameters,
        input: &Map<String, Value>,
    ) -> Result<OutputRecord, Error> {
        let mime_type = file.resolved_mime_type();
        let file_size = file.data.len();

        let mut handle = self
            .gemini
            .create_file(file.data)
            .display_name(format!("Uploaded file {}", index + 1))
            .with_mime_type(mime_type.clone())
            .upload()
            .await
            .context(UploadSnafu)?;

        handle
            .wait_until_active(parameters.processing_timeout, self.settings.poll_interval)
            .await
            .context(ProcessingSnafu)?;

        let generation_config = parameters.generation.build_config();

        let result = self
            .gemini
            .generate_content(parameters.model.clone())
            .with_user_message_and_file(parameters.prompt.as_str(), &handle)
            .with_generation_config(generation_config.clone())
            .execute()
            .await
            .context(GenerationSnafu)?;

        let projection = Projection {
            model: parameters.model.as_str(),
            prompt: &parameters.prompt,
            file_name: file.file_name.as_deref(),
            file_size,
            mime_type: mime_type.as_ref(),
            file_uri: handle.uri(),
            generation_config: &generation_config,
            result: &result,
            input,
        };
        Ok(self.settings.output_mode.project(&projection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SimpleOutput;
    use serde_json::json;

    fn record(text: &str) -> OutputRecord {
        OutputRecord::Simple(SimpleOutput {
            model: "gemini-2.5-flash".to_string(),
            response: text.to_string(),
            token_count: 3,
            file_name: "a.png".to_string(),
            file_size: 10,
        })
    }

    fn input(n: u64) -> Map<String, Value> {
        json!({ "n": n }).as_object().cloned().unwrap()
    }

    fn failure() -> Error {
        Error::Upload {
            source: ClientError::UploadInit,
        }
    }

    #[test]
    fn continue_on_fail_keeps_order_and_records_error() {
        let outcomes = vec![
            (input(1), Ok(record("one"))),
            (input(2), Err(failure())),
            (input(3), Ok(record("three"))),
        ];

        let output = FailurePolicy::ContinueOnFail.reduce(outcomes).unwrap();

        assert_eq!(output.len(), 3);
        assert_eq!(
            output.iter().map(|item| item.paired_item).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(output[0].json["response"], "one");
        assert!(output[0].error.is_none());
        assert_eq!(output[1].json, input(2));
        let error = output[1].error.as_ref().unwrap();
        assert_eq!(error.kind, "upload_init");
        assert_eq!(error.item_index, 1);
        assert!(error.message.contains("upload URL"));
        assert_eq!(output[2].json["response"], "three");
    }

    #[test]
    fn fail_fast_stops_at_first_error() {
        let mut consumed = 0;
        let outcomes = vec![
            (input(1), Ok(record("one"))),
            (input(2), Err(failure())),
            (input(3), Ok(record("three"))),
        ]
        .into_iter()
        .inspect(|_| consumed += 1);

        let error = FailurePolicy::FailFast.reduce(outcomes).unwrap_err();

        assert_eq!(error.index(), 1);
        assert_eq!(error.item_error().kind(), "upload_init");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn mime_type_resolution() {
        let declared = BinaryFile::new(vec![0u8; 4])
            .with_mime_type(mime::IMAGE_JPEG)
            .with_file_name("photo.png");
        assert_eq!(declared.resolved_mime_type(), mime::IMAGE_JPEG);

        let guessed = BinaryFile::new(vec![0u8; 4]).with_file_name("photo.png");
        assert_eq!(guessed.resolved_mime_type(), mime::IMAGE_PNG);

        let unknown = BinaryFile::new(vec![0u8; 4]);
        assert_eq!(unknown.resolved_mime_type(), mime::APPLICATION_OCTET_STREAM);
    }
}
