//! # gemini-file-chat
//!
//! Upload a file to the Google Gemini Files API, wait until the service has processed
//! it, and ask a model about it.
//!
//! ```rust,ignore
//! use gemini_file_chat::prelude::*;
//!
//! let gemini = Gemini::new(std::env::var("GEMINI_API_KEY")?)?;
//! let workflow = Workflow::new(gemini, RunSettings::default());
//! let item = WorkflowItem::new(
//!     BinaryFile::new(std::fs::read("photo.png")?).with_file_name("photo.png"),
//!     ItemParameters::new("Describe this file", "gemini-2.5-flash"),
//! );
//! let output = workflow.run(vec![item]).await?;
//! ```

mod catalog;
mod client;
mod common;
pub mod files;
pub mod generation;
mod models;
pub mod output;
pub mod prelude;
pub mod workflow;


pub use catalog::ModelInfo;
pub use client::{Error as ClientError, Gemini, GeminiBuilder, ModelId};
pub use files::{
    Error as FilesError, File, FileBuilder, FileHandle, FileState, FileStatus, ProcessingTimeout,
};
pub use generation::{
    ContentBuilder, Error as GenerationError, GenerateContentRequest, GenerationConfig,
    GenerationOptions, GenerationResult, ResponseSchema,
};
pub use models::{Content, FileData, Part, Role};
pub use output::{OutputMode, OutputRecord, SimpleOutput};
pub use workflow::{
    BinaryFile, Error as WorkflowError, ErrorDescriptor, FailurePolicy, ItemParameters,
    OutputItem, RunError, RunSettings, Workflow, WorkflowItem,
};
