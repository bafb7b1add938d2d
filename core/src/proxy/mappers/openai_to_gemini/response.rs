//! Non-streaming OpenAI chat completion -> Gemini `generateContent` response

use serde_json::{Map, Value};

use super::super::common_utils::parse_data_url;
use super::super::finish_reason;
use super::super::models::gemini::{Candidate, Content, GenerateContentResponse, InlineData, Part, UsageMetadata};
use super::super::models::openai::{ChatCompletionResponse, ContentPart, MessageContent, ResponseMessage, ToolCall, Usage};

/// Convert a complete chat completion into a Gemini response. Usage metadata
/// is always present, zeroed when the backend omitted it.
pub fn convert_chat_response(response: &ChatCompletionResponse) -> GenerateContentResponse {
    let candidates = response
        .choices
        .iter()
        .enumerate()
        .map(|(i, choice)| Candidate {
            content: convert_message(&choice.message),
            finish_reason: Some(finish_reason::to_gemini(choice.finish_reason)),
            index: i as u32,
        })
        .collect();

    GenerateContentResponse {
        candidates,
        usage_metadata: Some(usage_metadata(response.usage.as_ref())),
    }
}

pub(crate) fn usage_metadata(usage: Option<&Usage>) -> UsageMetadata {
    let usage = usage.copied().unwrap_or_default();
    UsageMetadata {
        prompt_token_count: usage.prompt_tokens,
        candidates_token_count: usage.completion_tokens,
        total_token_count: usage.total_tokens,
    }
}

fn convert_message(message: &ResponseMessage) -> Content {
    let mut parts = Vec::new();

    match &message.content {
        Some(MessageContent::Text(text)) if !text.is_empty() => parts.push(Part::text(text.clone())),
        Some(MessageContent::Parts(items)) => {
            for item in items {
                match item {
                    ContentPart::Text { text } => parts.push(Part::text(text.clone())),
                    ContentPart::ImageUrl { image_url } => {
                        if let Some((mime_type, data)) = parse_data_url(&image_url.url) {
                            parts.push(Part::InlineData {
                                inline_data: InlineData { mime_type, data },
                            });
                        }
                    }
                }
            }
        }
        _ => {}
    }

    for call in message.tool_calls.iter().flatten() {
        parts.push(Part::function_call(call.function.name.clone(), parse_arguments(call)));
    }

    Content::model(parts)
}

/// Empty arguments mean no arguments; unparseable ones degrade to `{}`.
fn parse_arguments(call: &ToolCall) -> Value {
    let raw = call.function.arguments.trim();
    if raw.is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Tool call {} has malformed arguments: {}", call.function.name, e);
        Value::Object(Map::new())
    })
}
