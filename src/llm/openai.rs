//! `OpenAI` chat completions provider implementation

use super::types::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole, ResponseFormat, Usage,
};
use super::{LlmError, LlmService, ProviderOptions};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// `OpenAI` models usable for tutoring (all accept image input)
#[derive(Debug, Clone, Copy)]
pub enum OpenAIModel {
    GPT4o,
    GPT4oMini,
    O4Mini,
}

impl OpenAIModel {
    pub fn api_name(self) -> &'static str {
        match self {
            OpenAIModel::GPT4o => "gpt-4o",
            OpenAIModel::GPT4oMini => "gpt-4o-mini",
            OpenAIModel::O4Mini => "o4-mini",
        }
    }

    pub fn model_id(self) -> &'static str {
        self.api_name()
    }

    /// Models that use `max_completion_tokens` instead of `max_tokens`
    pub fn uses_max_completion_tokens(self) -> bool {
        matches!(self, OpenAIModel::O4Mini)
    }
}

/// OpenAI-compatible service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: OpenAIModel,
    base_url: String,
    model_id: String,
}

impl OpenAIService {
    pub fn new(api_key: String, model: OpenAIModel, options: &ProviderOptions) -> Result<Self, String> {
        let base_url = match options.gateway.as_deref() {
            Some(gw) => format!("{}/openai/v1/chat/completions", gw.trim_end_matches('/')),
            None => "https://api.openai.com/v1/chat/completions".to_string(),
        };

        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            model_id: model.model_id().to_string(),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::new();

        if !request.system.is_empty() {
            let system_text = request
                .system
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(OpenAIContent::Text(system_text)),
            });
        }

        for msg in &request.messages {
            messages.push(Self::translate_message(msg));
        }

        let (max_tokens, max_completion_tokens) = if self.model.uses_max_completion_tokens() {
            (None, request.max_tokens)
        } else {
            (request.max_tokens, None)
        };

        let response_format = match request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(OpenAIResponseFormat {
                r#type: "json_object".to_string(),
            }),
        };

        OpenAIRequest {
            model: self.model.api_name().to_string(),
            messages,
            max_tokens,
            max_completion_tokens,
            response_format,
            stream: false,
        }
    }

    /// Text-only messages are sent as a plain string; anything carrying an
    /// image is sent as a list of content parts.
    fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
        let role = match msg.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        let has_image = msg
            .content
            .iter()
            .any(|block| matches!(block, ContentBlock::Image { .. }));

        let content = if has_image {
            let parts = msg
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => OpenAIContentPart::Text { text: text.clone() },
                    ContentBlock::Image { source } => OpenAIContentPart::ImageUrl {
                        image_url: OpenAIImageUrl {
                            url: source.to_data_url(),
                        },
                    },
                })
                .collect();
            OpenAIContent::Parts(parts)
        } else {
            let text = msg
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            OpenAIContent::Text(text)
        };

        OpenAIMessage {
            role: role.to_string(),
            content: Some(content),
        }
    }

    fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let mut content = Vec::new();
        match choice.message.content {
            Some(OpenAIContent::Text(text)) if !text.is_empty() => {
                content.push(ContentBlock::Text { text });
            }
            Some(OpenAIContent::Parts(parts)) => {
                for part in parts {
                    if let OpenAIContentPart::Text { text } = part {
                        content.push(ContentBlock::Text { text });
                    }
                }
            }
            _ => {}
        }

        let end_turn = choice.finish_reason.as_deref() == Some("stop");
        let usage = resp.usage.unwrap_or_default();

        Ok(LlmResponse {
            content,
            end_turn,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_tokens),
                output_tokens: u64::from(usage.completion_tokens),
            },
        })
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(&body) {
                return Err(LlmError::from_status(status.as_u16(), &error_resp.error.message));
            }
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<OpenAIContent>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ImageSource;
    use std::time::Duration;

    fn service(model: OpenAIModel) -> OpenAIService {
        let options = ProviderOptions {
            gateway: None,
            timeout: Duration::from_secs(5),
        };
        OpenAIService::new("test-key".to_string(), model, &options).unwrap()
    }

    #[test]
    fn test_text_request_shape() {
        let request = LlmRequest::user(vec![ContentBlock::text("2+2?")])
            .with_system("You are a math tutor.");
        let body = serde_json::to_value(service(OpenAIModel::GPT4oMini).translate_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a math tutor.");
        assert_eq!(body["messages"][1]["content"], "2+2?");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_image_and_json_request_shape() {
        let request = LlmRequest::user(vec![
            ContentBlock::text("Check this"),
            ContentBlock::Image {
                source: ImageSource::Base64 {
                    media_type: "image/png".to_string(),
                    data: "aGVsbG8=".to_string(),
                },
            },
        ])
        .json_object();
        let body = serde_json::to_value(service(OpenAIModel::GPT4o).translate_request(&request)).unwrap();

        assert_eq!(body["response_format"]["type"], "json_object");
        let parts = &body["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_max_completion_tokens_for_reasoning_models() {
        let mut request = LlmRequest::user(vec![ContentBlock::text("hi")]);
        request.max_tokens = Some(100);
        let body = serde_json::to_value(service(OpenAIModel::O4Mini).translate_request(&request)).unwrap();
        assert_eq!(body["max_completion_tokens"], 100);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_normalize_response() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"is_math\": true}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }"#;
        let parsed: OpenAIResponse = serde_json::from_str(raw).unwrap();
        let response = OpenAIService::normalize_response(parsed).unwrap();
        assert_eq!(response.text(), "{\"is_math\": true}");
        assert!(response.end_turn);
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[test]
    fn test_normalize_empty_choices_is_error() {
        let parsed: OpenAIResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(OpenAIService::normalize_response(parsed).is_err());
    }
}
