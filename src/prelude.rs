//! # Prelude
//!
//! Re-exports the types needed to run the upload-and-ask workflow:
//!
//! ```rust,ignore
//! use gemini_file_chat::prelude::*;
//! ```

pub use crate::client::{Error as ClientError, Gemini, ModelId};
pub use crate::files::{FileHandle, FileState, ProcessingTimeout};
pub use crate::generation::{GenerationConfig, GenerationOptions, ResponseSchema};
pub use crate::output::{OutputMode, OutputRecord};
pub use crate::workflow::{
    BinaryFile, FailurePolicy, ItemParameters, OutputItem, RunError, RunSettings, Workflow,
    WorkflowItem,
};
