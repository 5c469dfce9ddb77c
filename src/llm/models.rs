use serde::{Deserialize, Serialize};

/// Characters that end a completion: one statement, never a trailing comment.
pub const STOP_SEQUENCES: [&str; 2] = ["#", ";"];

/// Fixed decoding parameters for SQL completion.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingParameters {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop: Vec<String>,
}

impl Default for DecodingParameters {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 200,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// Request body for the completions endpoint
#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(prompt: &str, model: Option<String>, params: &DecodingParameters) -> Self {
        Self {
            model,
            prompt: prompt.to_string(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
            stop: params.stop.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
}
