//! Streaming OpenAI chunks -> Gemini `streamGenerateContent` SSE frames

use std::collections::HashMap;
use std::io;

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde_json::Value;

use super::super::finish_reason;
use super::super::models::gemini::{Candidate, Content, GenerateContentResponse, Part};
use super::super::models::openai::{ChatCompletionChunk, Delta, ToolCallDelta};
use super::response::usage_metadata;

/// Characters per frame when a complete reply is replayed as a stream.
pub const FALLBACK_CHUNK_CHARS: usize = 50;

#[derive(Debug, Clone)]
struct PartialToolCall {
    name: String,
    arguments: String,
    id: Option<String>,
}

/// Per-stream translator state. Tool call argument fragments are buffered by
/// their stream index until they form complete JSON.
///
/// One instance belongs to exactly one backend stream; it is dropped with the
/// stream so no fragment outlives its request.
#[derive(Debug, Default)]
pub struct StreamTranslator {
    pending: HashMap<u32, PartialToolCall>,
}

impl StreamTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tool calls still waiting for more argument text.
    pub fn pending_tool_calls(&self) -> usize {
        self.pending.len()
    }

    /// Translate one backend chunk. Returns `None` when the chunk carries
    /// nothing worth relaying.
    pub fn translate_chunk(&mut self, chunk: &ChatCompletionChunk) -> Option<GenerateContentResponse> {
        let choice = chunk.choices.first()?;
        let finish = choice.finish_reason;

        let mut parts = self.collect_parts(&choice.delta);
        if parts.is_empty() {
            if finish.is_none() {
                return None;
            }
            parts.push(Part::text(""));
        }

        if finish.is_none() && only_nameless_calls(&parts) {
            return None;
        }

        let (finish_reason, usage) = match finish {
            Some(reason) => (
                Some(finish_reason::to_gemini(Some(reason))),
                Some(usage_metadata(chunk.usage.as_ref())),
            ),
            None => (None, None),
        };

        Some(GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content::model(parts),
                finish_reason,
                index: choice.index,
            }],
            usage_metadata: usage,
        })
    }

    fn collect_parts(&mut self, delta: &Delta) -> Vec<Part> {
        let mut parts = Vec::new();

        if let Some(text) = delta.content.as_deref().filter(|t| !t.is_empty()) {
            parts.push(Part::text(text));
        }

        for fragment in delta.tool_calls.iter().flatten() {
            if let Some(part) = self.accept_fragment(fragment) {
                parts.push(part);
            }
        }

        parts
    }

    fn accept_fragment(&mut self, fragment: &ToolCallDelta) -> Option<Part> {
        let function = fragment.function.as_ref();
        let arguments = function.and_then(|f| f.arguments.as_deref()).unwrap_or("");
        let name = function
            .and_then(|f| f.name.as_deref())
            .filter(|n| !n.trim().is_empty());

        match name {
            // First fragment of a call: reseed, then try in case the backend sent
            // the arguments whole.
            Some(name) => {
                self.pending.insert(
                    fragment.index,
                    PartialToolCall {
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                        id: fragment.id.clone(),
                    },
                );
                if arguments.is_empty() {
                    return None;
                }
            }
            None => {
                if arguments.is_empty() {
                    return None;
                }
                self.pending.get_mut(&fragment.index)?.arguments.push_str(arguments);
            }
        }

        self.try_complete(fragment.index)
    }

    fn try_complete(&mut self, index: u32) -> Option<Part> {
        let call = self.pending.get(&index)?;
        let args: Value = serde_json::from_str(&call.arguments).ok()?;
        let call = self.pending.remove(&index)?;
        tracing::debug!(
            "Tool call {} ({}) complete at index {}",
            call.name,
            call.id.as_deref().unwrap_or("-"),
            index
        );
        Some(Part::function_call(call.name, args))
    }
}

fn only_nameless_calls(parts: &[Part]) -> bool {
    !parts.is_empty()
        && parts.iter().all(|part| match part {
            Part::FunctionCall { function_call } => function_call.name.trim().is_empty(),
            _ => false,
        })
}

/// Encode one response as an SSE `data:` frame.
pub fn sse_frame(response: &GenerateContentResponse) -> Result<Bytes, io::Error> {
    let json = serde_json::to_string(response).map_err(io::Error::other)?;
    Ok(Bytes::from(format!("data: {}\n\n", json)))
}

/// Wrap a backend SSE byte stream into a Gemini SSE byte stream.
///
/// Chunks are translated strictly in arrival order. `[DONE]` ends the stream,
/// undecodable chunks are skipped and a transport error stops iteration.
pub fn create_gemini_sse_stream<S, E>(
    upstream: S,
    trace_id: String,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut translator = StreamTranslator::new();
        let events = upstream.eventsource();
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("[{}] Backend stream error: {}", trace_id, e);
                    break;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                tracing::debug!("[{}] Backend stream finished", trace_id);
                break;
            }

            let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!("[{}] Skipping undecodable chunk: {}", trace_id, e);
                    continue;
                }
            };

            if let Some(response) = translator.translate_chunk(&chunk) {
                yield sse_frame(&response);
            }
        }

        if translator.pending_tool_calls() > 0 {
            tracing::warn!(
                "[{}] Stream ended with {} incomplete tool call(s)",
                trace_id,
                translator.pending_tool_calls()
            );
        }
    }
}

/// Replay a complete response as stream frames.
///
/// Text in the first part of the first candidate is cut into
/// `FALLBACK_CHUNK_CHARS` character slices; finish reason and usage ride on
/// the last slice only. Anything else is sent as a single frame.
pub fn split_complete_response(response: GenerateContentResponse) -> Vec<GenerateContentResponse> {
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .and_then(Part::as_text)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);
    let Some(text) = text else {
        return vec![response];
    };
    let finish_reason = response.candidates.first().and_then(|c| c.finish_reason);

    let chars: Vec<char> = text.chars().collect();
    let slices: Vec<String> = chars
        .chunks(FALLBACK_CHUNK_CHARS)
        .map(|slice| slice.iter().collect())
        .collect();
    let last = slices.len() - 1;

    slices
        .into_iter()
        .enumerate()
        .map(|(i, slice)| {
            let is_last = i == last;
            GenerateContentResponse {
                candidates: vec![Candidate {
                    content: Content::model(vec![Part::text(slice)]),
                    finish_reason: if is_last { finish_reason } else { None },
                    index: 0,
                }],
                usage_metadata: if is_last { response.usage_metadata } else { None },
            }
        })
        .collect()
}
