use mime::Mime;
use snafu::ResultExt;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument};
use url::Url;

use crate::{
    client::{Error as ClientError, GeminiClient, UploadedFile},
    files::{
        model::{extract_file_id, File, FileState, ProcessingTimeout, UploadRequest},
        ClientSnafu, Error, ProcessingFailedSnafu, ProcessingTimeoutSnafu,
    },
};

/// Default spacing between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A handle to a file that was uploaded through the resumable upload protocol.
///
/// The file URI is the durable reference used in generation requests; the file id
/// (its last path segment) addresses the file in `files.get`.
#[derive(Debug, Clone)]
pub struct FileHandle {
    client: Arc<GeminiClient>,
    upload_url: Url,
    file_id: String,
    file_uri: String,
    mime_type: Mime,
    size_bytes: usize,
    file: File,
}

impl FileHandle {
    pub(crate) fn from_upload(
        client: Arc<GeminiClient>,
        uploaded: UploadedFile,
        request: &UploadRequest,
    ) -> Result<Self, ClientError> {
        let file_id = extract_file_id(&uploaded.uri)?;
        Ok(Self {
            client,
            upload_url: uploaded.upload_url,
            file_id,
            file_uri: uploaded.uri,
            mime_type: request.mime_type.clone(),
            size_bytes: request.file_bytes.len(),
            file: uploaded.file,
        })
    }

    /// The session URL the bytes were finalized on.
    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub fn id(&self) -> &str {
        &self.file_id
    }

    pub fn uri(&self) -> &str {
        &self.file_uri
    }

    pub fn mime_type(&self) -> &Mime {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// The last known file metadata.
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn state(&self) -> FileState {
        self.file.state
    }

    #[instrument(skip_all, fields(file.id = %self.file_id))]
    pub async fn refresh(&mut self) -> Result<FileState, ClientError> {
        self.file = self.client.get_file(&self.file_id).await?;
        Ok(self.file.state)
    }

    /// Polls the file until it becomes `ACTIVE`.
    ///
    /// Each poll consumes one attempt out of `timeout.max_attempts()`, with `interval`
    /// between attempts. A `FAILED` state ends the wait immediately.
    #[instrument(skip_all, fields(
        file.id = %self.file_id,
        poll.interval.ms = interval.as_millis() as u64,
        timeout.secs = timeout.as_secs(),
    ))]
    pub async fn wait_until_active(
        &mut self,
        timeout: ProcessingTimeout,
        interval: Duration,
    ) -> Result<(), Error> {
        let max_attempts = timeout.max_attempts();
        let mut attempts = 0;

        while attempts < max_attempts {
            let state = self.refresh().await.map_err(Box::new).context(ClientSnafu)?;

            match state {
                FileState::Active => {
                    info!(attempts = attempts + 1, "file is active");
                    return Ok(());
                }
                FileState::Failed => {
                    let message = self
                        .file
                        .error
                        .as_ref()
                        .and_then(|status| status.message.clone())
                        .unwrap_or_else(|| "unknown error".to_string());
                    return ProcessingFailedSnafu {
                        name: self.file_id.clone(),
                        message,
                    }
                    .fail();
                }
                other => {
                    debug!(state = %other, attempt = attempts + 1, "file not ready yet");
                    tokio::time::sleep(interval).await;
                    attempts += 1;
                }
            }
        }

        ProcessingTimeoutSnafu {
            name: self.file_id.clone(),
            last_state: self.file.state,
            attempts,
        }
        .fail()
    }
}
