use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;
use crate::schema::StructuredOutput;

/// One structured-generation call: instructions, input and the JSON schema the
/// answer must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub schema_name: String,
    pub schema: Value,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A backend that turns a prompt into JSON matching a schema.
///
/// Shared by the query synthesizer and the claim extractor as an
/// `Arc<dyn StructuredGenerator>`.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, LlmError>;
}

/// Ask `generator` for a `T`, building the strict schema from the type.
///
/// # Errors
///
/// Returns the backend's [`LlmError`], or [`LlmError::Malformed`] if the JSON
/// it produced does not deserialize into `T`.
pub async fn generate_structured<T: StructuredOutput>(
    generator: &dyn StructuredGenerator,
    system: &str,
    prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<T, LlmError> {
    let schema_name = <T as StructuredOutput>::schema_name();
    let request = GenerationRequest {
        system: system.to_string(),
        prompt: prompt.to_string(),
        schema_name: schema_name.clone(),
        schema: T::strict_schema(),
        temperature,
        max_tokens,
    };

    let value = generator.generate(&request).await?;
    serde_json::from_value(value).map_err(|source| LlmError::Malformed {
        context: schema_name,
        source,
    })
}
