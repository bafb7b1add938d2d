// Mappers module
pub mod common_utils;
pub mod finish_reason;
pub mod gemini_to_openai;
pub mod models;
pub mod openai_to_gemini;

use models::gemini::{CountTokensRequest, CountTokensResponse, GenerateContentRequest, GenerateContentResponse};
use models::openai::{ChatCompletionResponse, ChatCompletionsPayload};

pub use openai_to_gemini::StreamTranslator;

/// Gemini `generateContent` / `streamGenerateContent` body -> chat completions payload.
pub fn translate_request(body: &GenerateContentRequest, model: &str, stream: bool) -> ChatCompletionsPayload {
    gemini_to_openai::convert_generate_request(body, model, stream)
}

/// Complete chat completion -> Gemini response.
pub fn translate_response(response: &ChatCompletionResponse) -> GenerateContentResponse {
    openai_to_gemini::convert_chat_response(response)
}

/// Gemini `countTokens` body -> chat completions payload with `max_tokens` 1.
pub fn translate_count_tokens_request(body: &CountTokensRequest, model: &str) -> ChatCompletionsPayload {
    gemini_to_openai::convert_count_tokens_request(body, model)
}

pub fn translate_token_count(total_tokens: u64) -> CountTokensResponse {
    CountTokensResponse { total_tokens }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_count_serializes_camel_case() {
        assert_eq!(serde_json::to_value(translate_token_count(42)).unwrap(), json!({"totalTokens": 42}));
    }

    #[test]
    fn count_tokens_request_pins_one_token() {
        let body: CountTokensRequest = serde_json::from_value(json!({
            "contents": [{"role": "user", "parts": [{"text": "count me"}]}]
        }))
        .unwrap();
        let payload = translate_count_tokens_request(&body, "gemini-2.5-flash");
        assert_eq!(payload.max_tokens, Some(1));
        assert_eq!(payload.stream, None);
        assert_eq!(payload.model, "gemini-2.0-flash-001");
        assert!(serde_json::to_value(&payload).unwrap().get("stream").is_none());
    }
}
