//! Structured-generation backends shared by the query synthesizer and the
//! claim extractor.

pub mod error;
pub mod generator;
pub mod openai;
pub mod schema;

pub use error::LlmError;
pub use generator::{generate_structured, GenerationRequest, StructuredGenerator};
pub use openai::OpenAiGenerator;
pub use schema::StructuredOutput;
