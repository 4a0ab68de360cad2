use mime::Mime;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE},
    Client, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use snafu::{OptionExt, ResultExt, Snafu};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    catalog::{ListModelsResponse, ModelInfo},
    files::{File, FileBuilder, UploadRequest, UploadResponse},
    generation::{ContentBuilder, GenerateContentRequest},
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const API_VERSION: &str = "v1beta";
const MODEL_PREFIX: &str = "models/";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const UPLOAD_PROTOCOL: &str = "x-goog-upload-protocol";
const UPLOAD_COMMAND: &str = "x-goog-upload-command";
const UPLOAD_OFFSET: &str = "x-goog-upload-offset";
const UPLOAD_HEADER_CONTENT_LENGTH: &str = "x-goog-upload-header-content-length";
const UPLOAD_HEADER_CONTENT_TYPE: &str = "x-goog-upload-header-content-type";
const UPLOAD_URL: &str = "x-goog-upload-url";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("missing Gemini API key"))]
    MissingApiKey,

    #[snafu(display("failed to build HTTP client"))]
    BuildHttpClient { source: reqwest::Error },

    #[snafu(display("failed to construct URL for '{suffix}'"))]
    ConstructUrl {
        source: url::ParseError,
        suffix: String,
    },

    #[snafu(display("failed to perform request to '{endpoint}'"))]
    PerformRequest {
        source: reqwest::Error,
        endpoint: String,
    },

    #[snafu(display(
        "bad response from server; code {code}; description: {}",
        description.as_deref().unwrap_or("none")
    ))]
    BadResponse {
        /// HTTP status code
        code: u16,
        /// HTTP error description
        description: Option<String>,
    },

    #[snafu(display("failed to decode response body"))]
    DecodeResponse { source: reqwest::Error },

    #[snafu(display("failed to deserialize JSON response"))]
    Deserialize { source: serde_json::Error },

    #[snafu(display("invalid value for header '{name}'"))]
    InvalidHeader {
        source: reqwest::header::InvalidHeaderValue,
        name: &'static str,
    },

    #[snafu(display("failed to get upload URL from Gemini API"))]
    UploadInit,

    #[snafu(display("failed to upload file to Gemini API: response has no file URI"))]
    UploadTransfer,

    #[snafu(display("invalid resource name or URI: '{name}'"))]
    InvalidResourceName { name: String },
}

/// Model identifier as chosen by the caller.
///
/// The Gemini API addresses models as `models/<id>`, while model pickers usually show
/// the bare id. Both forms are accepted; [`path`](Self::path) always yields the
/// prefixed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier with the `models/` namespace prefix.
    pub fn path(&self) -> String {
        if self.0.starts_with(MODEL_PREFIX) {
            self.0.clone()
        } else {
            format!("{MODEL_PREFIX}{}", self.0)
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Result of a finalized resumable upload.
#[derive(Debug, Clone)]
pub(crate) struct UploadedFile {
    pub upload_url: Url,
    pub file: File,
    pub uri: String,
}

#[derive(Serialize)]
struct StartUploadRequest<'a> {
    file: StartUploadFile<'a>,
}

#[derive(Serialize)]
struct StartUploadFile<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
}

/// Internal client for making requests to the Gemini API
pub(crate) struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: Url,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Start a resumable upload session and push the whole payload in one shot.
    #[instrument(skip_all, fields(
        file.size = request.file_bytes.len(),
        mime.type = %request.mime_type,
        display_name = request.display_name.as_deref(),
    ))]
    pub(crate) async fn upload_file(&self, request: &UploadRequest) -> Result<UploadedFile, Error> {
        let upload_url = self.start_upload(request).await?;
        debug!(upload.url = %upload_url, "upload session started");

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_LENGTH,
            HeaderValue::from(request.file_bytes.len()),
        );
        headers.insert(UPLOAD_OFFSET, HeaderValue::from_static("0"));
        headers.insert(UPLOAD_COMMAND, HeaderValue::from_static("upload, finalize"));
        headers.insert(CONTENT_TYPE, mime_header(&request.mime_type)?);

        let response = self
            .http_client
            .post(upload_url.clone())
            .headers(headers)
            .body(request.file_bytes.clone())
            .send()
            .await
            .context(PerformRequestSnafu {
                endpoint: "upload session",
            })?;
        let response = Self::check_response(response).await?;
        let envelope: UploadResponse = Self::decode(response).await?;

        let file = envelope.file.context(UploadTransferSnafu)?;
        let uri = file
            .uri
            .clone()
            .filter(|uri| !uri.is_empty())
            .context(UploadTransferSnafu)?;

        Ok(UploadedFile {
            upload_url,
            file,
            uri,
        })
    }

    async fn start_upload(&self, request: &UploadRequest) -> Result<Url, Error> {
        let url = self.build_url(&format!("upload/{API_VERSION}/files"))?;

        let mut headers = HeaderMap::new();
        headers.insert(UPLOAD_PROTOCOL, HeaderValue::from_static("resumable"));
        headers.insert(UPLOAD_COMMAND, HeaderValue::from_static("start"));
        headers.insert(
            UPLOAD_HEADER_CONTENT_LENGTH,
            HeaderValue::from(request.file_bytes.len()),
        );
        headers.insert(
            UPLOAD_HEADER_CONTENT_TYPE,
            mime_header(&request.mime_type)?,
        );

        let body = StartUploadRequest {
            file: StartUploadFile {
                display_name: request.display_name.as_deref(),
            },
        };

        let response = self
            .http_client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context(PerformRequestSnafu {
                endpoint: "upload start",
            })?;
        let response = Self::check_response(response).await?;

        let upload_url = response
            .headers()
            .get(UPLOAD_URL)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .context(UploadInitSnafu)?;

        Url::parse(upload_url).context(ConstructUrlSnafu {
            suffix: upload_url.to_string(),
        })
    }

    /// Fetch file metadata by id (the last segment of the file URI).
    pub(crate) async fn get_file(&self, file_id: &str) -> Result<File, Error> {
        let url = self.build_url(&format!("{API_VERSION}/files/{file_id}"))?;
        self.get_json(url, "files.get").await
    }

    /// Generate content, returning the raw response body.
    pub(crate) async fn generate_content(
        &self,
        model: &ModelId,
        request: &GenerateContentRequest,
    ) -> Result<Value, Error> {
        let url = self.build_url(&format!("{API_VERSION}/{}:generateContent", model.path()))?;
        self.post_json(url, request, "generateContent").await
    }

    /// List models available to the API key.
    pub(crate) async fn list_models(
        &self,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<ListModelsResponse, Error> {
        let mut url = self.build_url(&format!("{API_VERSION}/models"))?;

        if let Some(size) = page_size {
            url.query_pairs_mut()
                .append_pair("pageSize", &size.to_string());
        }
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", &token);
        }

        self.get_json(url, "models.list").await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, endpoint: &str) -> Result<T, Error> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context(PerformRequestSnafu { endpoint })?;
        let response = Self::check_response(response).await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
        endpoint: &str,
    ) -> Result<T, Error> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .context(PerformRequestSnafu { endpoint })?;
        let response = Self::check_response(response).await?;
        Self::decode(response).await
    }

    async fn check_response(response: Response) -> Result<Response, Error> {
        let status = response.status();
        if !status.is_success() {
            let description = response.text().await.ok();
            return BadResponseSnafu {
                code: status.as_u16(),
                description,
            }
            .fail();
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
        let bytes = response.bytes().await.context(DecodeResponseSnafu)?;
        serde_json::from_slice(&bytes).context(DeserializeSnafu)
    }

    /// Build a URL for the API, carrying the key as a query parameter.
    fn build_url(&self, suffix: &str) -> Result<Url, Error> {
        let mut url = self
            .base_url
            .join(suffix)
            .context(ConstructUrlSnafu { suffix })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

fn mime_header(mime_type: &Mime) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(mime_type.as_ref()).context(InvalidHeaderSnafu {
        name: "content-type",
    })
}

/// Configuration for a [`Gemini`] client.
pub struct GeminiBuilder {
    api_key: String,
    base_url: Option<Url>,
    request_timeout: Duration,
    http_client: Option<Client>,
}

impl GeminiBuilder {
    /// Override the API host, e.g. to point at a proxy or a mock server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Upper bound for each individual HTTP call (upload start, transfer, poll, generate).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client. The request timeout is then left to that client.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<Gemini, Error> {
        let api_key = self.api_key.trim().to_string();
        snafu::ensure!(!api_key.is_empty(), MissingApiKeySnafu);

        let mut base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL).context(ConstructUrlSnafu {
                suffix: DEFAULT_BASE_URL,
            })?,
        };
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.request_timeout)
                .build()
                .context(BuildHttpClientSnafu)?,
        };

        Ok(Gemini {
            client: Arc::new(GeminiClient {
                http_client,
                api_key,
                base_url,
            }),
        })
    }
}

/// Client for the Gemini API
#[derive(Debug, Clone)]
pub struct Gemini {
    client: Arc<GeminiClient>,
}

impl Gemini {
    /// Create a new client with the specified API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        Self::builder(api_key).build()
    }

    /// Create a new client with custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: Url) -> Result<Self, Error> {
        Self::builder(api_key).with_base_url(base_url).build()
    }

    pub fn builder(api_key: impl Into<String>) -> GeminiBuilder {
        GeminiBuilder {
            api_key: api_key.into(),
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            http_client: None,
        }
    }

    /// Start building a file upload.
    pub fn create_file<B: Into<Vec<u8>>>(&self, bytes: B) -> FileBuilder {
        FileBuilder::new(self.client.clone(), bytes)
    }

    /// Start building a content generation request for `model`.
    pub fn generate_content(&self, model: impl Into<ModelId>) -> ContentBuilder {
        ContentBuilder::new(self.client.clone(), model.into())
    }

    /// Lists the models available to this API key.
    ///
    /// This method returns a stream that handles pagination automatically.
    pub fn list_models(
        &self,
        page_size: impl Into<Option<u32>>,
    ) -> impl futures::Stream<Item = Result<ModelInfo, Error>> + Send {
        let client = self.client.clone();
        let page_size = page_size.into();
        async_stream::try_stream! {
            let mut page_token: Option<String> = None;
            loop {
                let response = client.list_models(page_size, page_token.clone()).await?;

                for model in response.models {
                    yield model;
                }

                if let Some(next_page_token) = response.next_page_token {
                    page_token = Some(next_page_token);
                } else {
                    break;
                }
            }
        }
    }
}
