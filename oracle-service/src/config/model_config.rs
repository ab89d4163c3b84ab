/// Configuration for a single oracle model invocation.
///
/// This struct contains both general and endpoint-specific parameters and can
/// be extended as needed to support new backends or features.
#[derive(Debug, Clone)]
pub struct OracleModelConfig {
    /// Model identifier string (e.g., `"gpt-4o-mini"`).
    pub model: String,

    /// Inference endpoint (remote API URL, e.g. `https://api.openai.com`).
    pub endpoint: String,

    /// Optional API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (controls creativity).
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,

    /// Ask the endpoint for a structured JSON object response
    /// (`response_format: {"type": "json_object"}`).
    pub json_mode: bool,
}
