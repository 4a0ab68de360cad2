use snafu::Snafu;

use crate::client::Error as ClientError;

pub mod builder;
pub mod handle;
pub mod model;

pub use builder::FileBuilder;
pub use handle::FileHandle;
pub(crate) use model::{UploadRequest, UploadResponse};
pub use model::{extract_file_id, File, FileState, FileStatus, ProcessingTimeout};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("client invocation error"))]
    Client { source: Box<ClientError> },

    #[snafu(display("Gemini API failed to process file '{name}': {message}"))]
    ProcessingFailed { name: String, message: String },

    #[snafu(display(
        "file '{name}' not processed after {attempts} attempts; last state: {last_state}"
    ))]
    ProcessingTimeout {
        name: String,
        last_state: FileState,
        attempts: u32,
    },

    #[snafu(display(
        "file processing timeout of {secs}s is outside the allowed range of {}..={} seconds",
        model::ProcessingTimeout::MIN_SECS,
        model::ProcessingTimeout::MAX_SECS
    ))]
    InvalidTimeout { secs: u32 },
}
