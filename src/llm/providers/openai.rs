use crate::config::OpenAiConfig;
use crate::llm::models::{CompletionRequest, CompletionResponse, DecodingParameters, STOP_SEQUENCES};
use crate::llm::{CompletionModel, LlmError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Auth {
    ApiKey(String),
    Bearer(String),
}

/// Text-completion client for Azure OpenAI and OpenAI.
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    url: String,
    api_version: Option<String>,
    auth: Auth,
    /// Sent as `model` in the body; Azure addresses the deployment by URL instead.
    model: Option<String>,
    params: DecodingParameters,
}

impl OpenAiCompletionProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let base = config.api_base.trim_end_matches('/');

        let (url, api_version, auth, model) = match config.api_type.to_lowercase().as_str() {
            "azure" | "azure_ad" => {
                let url = format!("{}/openai/deployments/{}/completions", base, config.deployment_name);
                let auth = if config.api_type.eq_ignore_ascii_case("azure_ad") {
                    Auth::Bearer(config.api_key.clone())
                } else {
                    Auth::ApiKey(config.api_key.clone())
                };
                (url, Some(config.api_version.clone()), auth, None)
            }
            "open_ai" | "openai" => (
                format!("{}/completions", base),
                None,
                Auth::Bearer(config.api_key.clone()),
                Some(config.deployment_name.clone()),
            ),
            other => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported OpenAI API type: {}",
                    other
                )))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            url,
            api_version,
            auth,
            model,
            params: DecodingParameters::default(),
        })
    }
}

/// Cuts the text at the first stop sequence, if the upstream let one through.
pub fn truncate_at_stop(text: &str) -> &str {
    let cut = STOP_SEQUENCES
        .iter()
        .filter_map(|stop| text.find(stop))
        .min()
        .unwrap_or(text.len());
    &text[..cut]
}

#[async_trait]
impl CompletionModel for OpenAiCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = CompletionRequest::new(prompt, self.model.clone(), &self.params);

        info!("Sending an SQL generation request to OpenAI");
        debug!("Completion endpoint: {}", self.url);

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(version) = &self.api_version {
            builder = builder.query(&[("api-version", version.as_str())]);
        }
        builder = match &self.auth {
            Auth::ApiKey(key) => builder.header("api-key", key),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("OpenAI API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        debug!("Raw response from OpenAI: {}", response_text);

        let completion: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| LlmError::ResponseError(format!("Failed to parse response: {}", e)))?;

        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(LlmError::ResponseError("No choices in response".to_string()));
        };

        Ok(truncate_at_stop(&choice.text).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn config(api_type: &str, base: &str) -> OpenAiConfig {
        OpenAiConfig {
            api_type: api_type.to_string(),
            api_base: base.to_string(),
            api_version: "2023-05-15".to_string(),
            api_key: "test-key".to_string(),
            deployment_name: "sql-davinci".to_string(),
        }
    }

    #[tokio::test]
    async fn azure_request_carries_fixed_decoding_parameters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/sql-davinci/completions")
                    .query_param("api-version", "2023-05-15")
                    .header("api-key", "test-key")
                    .json_body(json!({
                        "prompt": "# schema\nSELECT",
                        "temperature": 0.0,
                        "max_tokens": 200,
                        "top_p": 1.0,
                        "frequency_penalty": 0.0,
                        "presence_penalty": 0.0,
                        "stop": ["#", ";"]
                    }));
                then.status(200).json_body(json!({
                    "choices": [{"text": " AVG(Salary) FROM Employees", "index": 0}]
                }));
            })
            .await;

        let provider = OpenAiCompletionProvider::new(&config("azure", &server.base_url())).unwrap();
        let text = provider.complete("# schema\nSELECT").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, " AVG(Salary) FROM Employees");
    }

    #[tokio::test]
    async fn openai_request_uses_bearer_and_model() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/completions")
                    .header("Authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "sql-davinci"}"#);
                then.status(200)
                    .json_body(json!({"choices": [{"text": " COUNT(*) FROM Orders"}]}));
            })
            .await;

        let provider = OpenAiCompletionProvider::new(&config("open_ai", &server.base_url())).unwrap();
        let text = provider.complete("prompt").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, " COUNT(*) FROM Orders");
    }

    #[tokio::test]
    async fn completion_never_contains_stop_characters() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "choices": [{"text": " 1 FROM t; DROP TABLE t # comment"}]
                }));
            })
            .await;

        let provider = OpenAiCompletionProvider::new(&config("azure", &server.base_url())).unwrap();
        let text = provider.complete("prompt").await.unwrap();

        assert_eq!(text, " 1 FROM t");
    }

    #[tokio::test]
    async fn empty_choices_is_a_response_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let provider = OpenAiCompletionProvider::new(&config("azure", &server.base_url())).unwrap();
        let err = provider.complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::ResponseError(_)));
    }

    #[tokio::test]
    async fn upstream_failure_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("quota exceeded");
            })
            .await;

        let provider = OpenAiCompletionProvider::new(&config("azure", &server.base_url())).unwrap();
        let err = provider.complete("prompt").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"), "{}", message);
        assert!(message.contains("quota exceeded"), "{}", message);
    }

    #[test]
    fn rejects_unknown_api_type() {
        let err = OpenAiCompletionProvider::new(&config("bedrock", "http://localhost"))
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn truncates_at_earliest_stop() {
        assert_eq!(truncate_at_stop("a # b ; c"), "a ");
        assert_eq!(truncate_at_stop("a ; b # c"), "a ");
        assert_eq!(truncate_at_stop("plain"), "plain");
    }
}
