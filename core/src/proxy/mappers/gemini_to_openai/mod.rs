//! Gemini to OpenAI request conversion

pub mod contents;
pub mod tools;

use super::models::gemini::{CountTokensRequest, GenerateContentRequest};
use super::models::openai::ChatCompletionsPayload;
use crate::proxy::common::model_mapping::map_builtin_model;

pub use contents::translate_contents;
pub use tools::{select_tools, synthesize_tools, translate_tool_choice, translate_tools};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Convert a `generateContent` / `streamGenerateContent` request.
///
/// The two variants differ only in the `stream` flag.
pub fn convert_generate_request(body: &GenerateContentRequest, model: &str, stream: bool) -> ChatCompletionsPayload {
    let tools = select_tools(body.tools.as_deref(), &body.contents);
    let tool_choice = tools
        .as_ref()
        .and_then(|_| translate_tool_choice(body.tool_config.as_ref()));
    let gen_config = body.generation_config.clone().unwrap_or_default();

    ChatCompletionsPayload {
        model: map_builtin_model(model),
        messages: translate_contents(&body.contents, body.system_instruction.as_ref()),
        max_tokens: Some(
            gen_config
                .max_output_tokens
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_TOKENS),
        ),
        stop: gen_config.stop_sequences,
        stream: Some(stream),
        temperature: gen_config.temperature,
        top_p: gen_config.top_p,
        tools,
        tool_choice,
    }
}

/// Convert a `countTokens` request: same reconciliation, one output token,
/// no stream flag.
pub fn convert_count_tokens_request(body: &CountTokensRequest, model: &str) -> ChatCompletionsPayload {
    ChatCompletionsPayload {
        model: map_builtin_model(model),
        messages: translate_contents(&body.contents, body.system_instruction.as_ref()),
        max_tokens: Some(1),
        tools: select_tools(body.tools.as_deref(), &body.contents),
        ..Default::default()
    }
}
