use snafu::Snafu;

use crate::client::Error as ClientError;

pub mod builder;
pub mod model;
pub mod options;

pub use builder::ContentBuilder;
pub use model::{
    response_text, total_token_count, GenerateContentRequest, GenerationConfig,
    GenerationResult,
};
pub use options::{GenerationOptions, ResponseSchema, MAX_STOP_SEQUENCES};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("client invocation error"))]
    Client { source: Box<ClientError> },

    #[snafu(display("no response generated from Gemini API (model '{model}')"))]
    NoResponse { model: String },
}
