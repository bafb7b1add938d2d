//! Finish reason mapping between the two protocols
//!
//! Both directions are total: unknown or missing values fall back to
//! `FINISH_REASON_UNSPECIFIED` (to Gemini) or `stop` (to OpenAI).

use super::models::gemini::FinishReason as GeminiFinishReason;
use super::models::openai::FinishReason as OpenAiFinishReason;

/// OpenAI `finish_reason` -> Gemini `finishReason`
pub fn to_gemini(reason: Option<OpenAiFinishReason>) -> GeminiFinishReason {
    match reason {
        Some(OpenAiFinishReason::Stop) => GeminiFinishReason::Stop,
        Some(OpenAiFinishReason::Length) => GeminiFinishReason::MaxTokens,
        Some(OpenAiFinishReason::ContentFilter) => GeminiFinishReason::Safety,
        // Gemini has no terminal state dedicated to tool calls
        Some(OpenAiFinishReason::ToolCalls) => GeminiFinishReason::Stop,
        Some(OpenAiFinishReason::Unknown) | None => GeminiFinishReason::FinishReasonUnspecified,
    }
}

/// Gemini `finishReason` -> OpenAI `finish_reason`
pub fn to_openai(reason: Option<GeminiFinishReason>) -> OpenAiFinishReason {
    match reason {
        Some(GeminiFinishReason::MaxTokens) => OpenAiFinishReason::Length,
        Some(
            GeminiFinishReason::Safety
            | GeminiFinishReason::Recitation
            | GeminiFinishReason::Blocklist
            | GeminiFinishReason::ProhibitedContent
            | GeminiFinishReason::Spii
            | GeminiFinishReason::ImageSafety,
        ) => OpenAiFinishReason::ContentFilter,
        Some(
            GeminiFinishReason::Stop
            | GeminiFinishReason::FinishReasonUnspecified
            | GeminiFinishReason::MalformedFunctionCall,
        )
        | None => OpenAiFinishReason::Stop,
    }
}
