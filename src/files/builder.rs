use mime::Mime;
use std::sync::Arc;
use tracing::instrument;

use crate::{
    client::{Error as ClientError, GeminiClient},
    files::{
        handle::FileHandle,
        model::{mime_from_name, UploadRequest},
    },
};

/// A builder for uploading a file through the resumable upload protocol.
pub struct FileBuilder {
    client: Arc<GeminiClient>,
    file_bytes: Vec<u8>,
    display_name: Option<String>,
    mime_type: Option<Mime>,
}

impl FileBuilder {
    pub(crate) fn new<B: Into<Vec<u8>>>(client: Arc<GeminiClient>, file_bytes: B) -> Self {
        Self {
            client,
            file_bytes: file_bytes.into(),
            display_name: None,
            mime_type: None,
        }
    }

    /// The display name of the file.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// The MIME type of the file.
    ///
    /// When unset, the type is guessed from the display name and falls back to
    /// `application/octet-stream`.
    pub fn with_mime_type(mut self, mime_type: Mime) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    /// Builds the [`UploadRequest`] without sending it.
    pub(crate) fn build(self) -> (Arc<GeminiClient>, UploadRequest) {
        let mime_type = self
            .mime_type
            .unwrap_or_else(|| mime_from_name(self.display_name.as_deref()));

        let request = UploadRequest {
            file_bytes: self.file_bytes,
            mime_type,
            display_name: self.display_name,
        };
        (self.client, request)
    }

    /// Upload the file.
    #[instrument(skip_all, fields(
        file.size = self.file_bytes.len(),
        display_name = self.display_name.as_deref(),
    ))]
    pub async fn upload(self) -> Result<FileHandle, ClientError> {
        let (client, request) = self.build();
        let uploaded = client.upload_file(&request).await?;

        FileHandle::from_upload(client, uploaded, &request)
    }
}
