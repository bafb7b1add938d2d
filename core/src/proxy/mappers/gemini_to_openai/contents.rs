//! Conversation history reconciliation: Gemini turns -> OpenAI messages
//!
//! Gemini identifies a function response only by function name, while
//! OpenAI pairs tool results to calls by id. Ids are minted here when an
//! assistant turn is translated and matched back to later responses by
//! name, in call order.

use std::collections::HashSet;

use serde_json::Value;

use super::super::common_utils::{generate_tool_call_id, to_data_url};
use super::super::models::gemini::{Content, ContentEntry, FunctionResponse, Part};
use super::super::models::openai::{ContentPart, ImageUrl, Message, MessageContent, Role, ToolCall};

/// Tool-call ids minted during one reconciliation pass, in creation order
#[derive(Debug, Default)]
struct PendingCalls {
    entries: Vec<(String, String)>,
}

impl PendingCalls {
    fn register(&mut self, id: String, name: String) {
        self.entries.push((id, name));
    }

    /// Removes and returns the oldest unmatched id for `name`
    fn take_by_name(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(_, n)| n == name)?;
        Some(self.entries.remove(pos).0)
    }
}

/// Translate a Gemini history (plus optional system instruction) into an
/// OpenAI message list that the backend will accept.
pub fn translate_contents(contents: &[ContentEntry], system_instruction: Option<&Content>) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut pending = PendingCalls::default();

    if let Some(system) = system_instruction {
        let text = system.text();
        if !text.is_empty() {
            messages.push(Message::text(Role::System, text));
        }
    }

    for entry in contents {
        match entry {
            ContentEntry::ResponseBatch(parts) => {
                push_function_responses(function_responses(parts), &mut pending, &mut messages);
            }
            ContentEntry::Turn(turn) => translate_turn(turn, &mut pending, &mut messages),
        }
    }

    remove_unanswered_tool_calls(&mut messages);
    let messages = dedupe_tool_results(messages);
    merge_consecutive_same_role(messages)
}

fn translate_turn(turn: &Content, pending: &mut PendingCalls, messages: &mut Vec<Message>) {
    let role = if turn.is_model() { Role::Assistant } else { Role::User };

    let responses: Vec<&FunctionResponse> = function_responses(&turn.parts).collect();
    if !responses.is_empty() {
        push_function_responses(responses.into_iter(), pending, messages);
    }

    let has_calls = turn.parts.iter().any(|p| matches!(p, Part::FunctionCall { .. }));
    if has_calls && role == Role::Assistant {
        messages.push(assistant_tool_calls(turn, pending));
        return;
    }

    if let Some(content) = translate_regular_content(turn) {
        messages.push(Message {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        });
    }
}

fn function_responses(parts: &[Part]) -> impl Iterator<Item = &FunctionResponse> {
    parts.iter().filter_map(|part| match part {
        Part::FunctionResponse { function_response } => Some(function_response),
        _ => None,
    })
}

/// Unmatched responses are dropped.
fn push_function_responses<'a>(
    responses: impl Iterator<Item = &'a FunctionResponse>,
    pending: &mut PendingCalls,
    messages: &mut Vec<Message>,
) {
    for response in responses {
        let Some(id) = pending.take_by_name(&response.name) else {
            tracing::debug!("Dropping function response without pending call: {}", response.name);
            continue;
        };
        messages.push(Message::tool_result(id, stringify(&response.response)));
    }
}

fn assistant_tool_calls(turn: &Content, pending: &mut PendingCalls) -> Message {
    let tool_calls = turn
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::FunctionCall { function_call } => Some(function_call),
            _ => None,
        })
        .map(|call| {
            let id = generate_tool_call_id(&call.name);
            pending.register(id.clone(), call.name.clone());
            ToolCall::function(id, call.name.clone(), stringify(&call.args))
        })
        .collect();

    let text = turn.text();
    Message {
        role: Role::Assistant,
        content: if text.is_empty() { None } else { Some(MessageContent::Text(text)) },
        tool_calls: Some(tool_calls),
        tool_call_id: None,
    }
}

/// Plain string for text-only turns, a part list once media is involved.
/// Returns `None` when the turn has nothing to say.
fn translate_regular_content(turn: &Content) -> Option<MessageContent> {
    if turn.parts.is_empty() {
        return None;
    }

    let has_media = turn.parts.iter().any(|p| matches!(p, Part::InlineData { .. }));
    if !has_media {
        let text = turn.text();
        return if text.is_empty() { None } else { Some(MessageContent::Text(text)) };
    }

    let parts = turn
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } => Some(ContentPart::Text { text: text.clone() }),
            Part::InlineData { inline_data } => Some(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: to_data_url(&inline_data.mime_type, &inline_data.data),
                    detail: None,
                },
            }),
            _ => None,
        })
        .collect();
    Some(MessageContent::Parts(parts))
}

fn stringify(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Drops assistant tool-call messages with any call id that never received
/// a tool result (a cancelled invocation left in client history).
fn remove_unanswered_tool_calls(messages: &mut Vec<Message>) {
    let answered: HashSet<String> = messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.clone())
        .collect();

    messages.retain(|message| {
        let Some(calls) = message.tool_calls.as_ref().filter(|_| message.role == Role::Assistant) else {
            return true;
        };
        let complete = calls.iter().all(|call| answered.contains(&call.id));
        if !complete {
            tracing::debug!("Removing assistant message with {} unanswered tool call(s)", calls.len());
        }
        complete
    });
}

/// Keeps only the first tool result per `tool_call_id`.
fn dedupe_tool_results(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|message| match (&message.role, &message.tool_call_id) {
            (Role::Tool, Some(id)) => seen.insert(id.clone()),
            _ => true,
        })
        .collect()
}

fn is_mergeable(message: &Message) -> bool {
    message.tool_calls.is_none() && message.tool_call_id.is_none()
}

/// Folds adjacent plain-text messages of the same role into one. The
/// backend rejects empty user content, so blank user text becomes a space.
fn merge_consecutive_same_role(messages: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());

    for mut message in messages {
        if let Some(last) = merged.last_mut() {
            if last.role == message.role && is_mergeable(last) && is_mergeable(&message) {
                if let (Some(MessageContent::Text(prev)), Some(MessageContent::Text(next))) =
                    (&mut last.content, &message.content)
                {
                    prev.push_str("\n\n");
                    prev.push_str(next);
                    continue;
                }
                merged.push(message);
                continue;
            }
        }

        if message.role == Role::User {
            if let Some(MessageContent::Text(text)) = message.content.as_mut() {
                if text.trim().is_empty() {
                    *text = " ".to_string();
                }
            }
        }
        merged.push(message);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(value: Value) -> Vec<ContentEntry> {
        serde_json::from_value(value).unwrap()
    }

    fn tool_messages(messages: &[Message]) -> Vec<&Message> {
        messages.iter().filter(|m| m.role == Role::Tool).collect()
    }

    #[test]
    fn adjacent_user_turns_are_merged() {
        let contents = entries(json!([
            {"role": "user", "parts": [{"text": "Hello."}]},
            {"role": "user", "parts": [{"text": "How are you?"}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages, vec![Message::text(Role::User, "Hello.\n\nHow are you?")]);
    }

    #[test]
    fn empty_history_yields_no_messages() {
        assert!(translate_contents(&[], None).is_empty());

        let blank_system = Content {
            role: None,
            parts: vec![],
        };
        assert!(translate_contents(&[], Some(&blank_system)).is_empty());
    }

    #[test]
    fn system_instruction_comes_first() {
        let system = Content {
            role: None,
            parts: vec![Part::text("Be terse."), Part::text("No emoji.")],
        };
        let contents = entries(json!([{"role": "user", "parts": [{"text": "hi"}]}]));
        let messages = translate_contents(&contents, Some(&system));
        assert_eq!(messages[0], Message::text(Role::System, "Be terse.\n\nNo emoji."));
        assert_eq!(messages[1], Message::text(Role::User, "hi"));
    }

    #[test]
    fn call_and_response_are_paired_by_generated_id() {
        let contents = entries(json!([
            {"role": "user", "parts": [{"text": "list files"}]},
            {"role": "model", "parts": [
                {"text": "Looking."},
                {"functionCall": {"name": "ls", "args": {"dir": "."}}}
            ]},
            {"role": "user", "parts": [{"functionResponse": {"name": "ls", "response": {"files": ["a"]}}}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages.len(), 3);

        let assistant = &messages[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.text_content(), Some("Looking."));
        let call = &assistant.tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.function.name, "ls");
        assert_eq!(call.function.arguments, r#"{"dir":"."}"#);

        let tool = &messages[2];
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some(call.id.as_str()));
        assert_eq!(tool.text_content(), Some(r#"{"files":["a"]}"#));
    }

    #[test]
    fn tool_call_only_turn_has_null_content() {
        let contents = entries(json!([
            {"role": "model", "parts": [{"functionCall": {"name": "ls", "args": {}}}]},
            {"role": "user", "parts": [{"functionResponse": {"name": "ls", "response": {}}}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages[0].content, None);
        assert_eq!(messages[0].tool_calls.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn bare_response_arrays_are_accepted() {
        let contents = entries(json!([
            {"role": "model", "parts": [{"functionCall": {"name": "read", "args": {"p": "x"}}}]},
            [{"functionResponse": {"name": "read", "response": {"output": "data"}}}]
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Tool);
        assert_eq!(
            messages[1].tool_call_id,
            Some(messages[0].tool_calls.as_ref().unwrap()[0].id.clone())
        );
    }

    #[test]
    fn unanswered_tool_call_is_removed() {
        let contents = entries(json!([
            {"role": "model", "parts": [{"functionCall": {"name": "ls", "args": {}}}]},
            {"role": "user", "parts": [{"text": "never mind"}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert!(messages.iter().all(|m| m.role != Role::Assistant));
        assert_eq!(messages, vec![Message::text(Role::User, "never mind")]);
    }

    #[test]
    fn partially_answered_parallel_calls_drop_the_assistant_message() {
        let contents = entries(json!([
            {"role": "model", "parts": [
                {"functionCall": {"name": "a", "args": {}}},
                {"functionCall": {"name": "b", "args": {}}}
            ]},
            {"role": "user", "parts": [{"functionResponse": {"name": "a", "response": {}}}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert!(messages.iter().all(|m| m.tool_calls.is_none()));
    }

    #[test]
    fn unmatched_function_response_is_dropped() {
        let contents = entries(json!([
            {"role": "user", "parts": [{"functionResponse": {"name": "ghost", "response": {}}}]},
            {"role": "user", "parts": [{"text": "hello"}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages, vec![Message::text(Role::User, "hello")]);
    }

    #[test]
    fn duplicate_function_responses_yield_one_tool_message() {
        let contents = entries(json!([
            {"role": "model", "parts": [{"functionCall": {"name": "ls", "args": {}}}]},
            {"role": "user", "parts": [
                {"functionResponse": {"name": "ls", "response": {"n": 1}}},
                {"functionResponse": {"name": "ls", "response": {"n": 2}}}
            ]}
        ]));
        let messages = translate_contents(&contents, None);
        let tools = tool_messages(&messages);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].text_content(), Some(r#"{"n":1}"#));
    }

    #[test]
    fn dedupe_keeps_first_result_per_call_id() {
        let messages = vec![
            Message::tool_result("call_1", "first"),
            Message::text(Role::User, "between"),
            Message::tool_result("call_1", "second"),
            Message::tool_result("call_2", "other"),
        ];
        let deduped = dedupe_tool_results(messages);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].text_content(), Some("first"));
        assert_eq!(deduped[2].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn same_named_calls_match_responses_in_call_order() {
        let contents = entries(json!([
            {"role": "model", "parts": [
                {"functionCall": {"name": "read", "args": {"p": "1"}}},
                {"functionCall": {"name": "read", "args": {"p": "2"}}}
            ]},
            {"role": "user", "parts": [
                {"functionResponse": {"name": "read", "response": {"r": "one"}}},
                {"functionResponse": {"name": "read", "response": {"r": "two"}}}
            ]}
        ]));
        let messages = translate_contents(&contents, None);
        let calls = messages[0].tool_calls.as_ref().unwrap();
        let tools = tool_messages(&messages);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].tool_call_id.as_deref(), Some(calls[0].id.as_str()));
        assert_eq!(tools[0].text_content(), Some(r#"{"r":"one"}"#));
        assert_eq!(tools[1].tool_call_id.as_deref(), Some(calls[1].id.as_str()));
    }

    #[test]
    fn every_answered_call_gets_exactly_one_tool_message() {
        let contents = entries(json!([
            {"role": "user", "parts": [{"text": "go"}]},
            {"role": "model", "parts": [{"functionCall": {"name": "a", "args": {}}}]},
            {"role": "user", "parts": [{"functionResponse": {"name": "a", "response": {}}}]},
            {"role": "model", "parts": [{"functionCall": {"name": "b", "args": {}}}]},
            [{"functionResponse": {"name": "b", "response": {}}}],
            {"role": "model", "parts": [{"text": "done"}]}
        ]));
        let messages = translate_contents(&contents, None);
        let call_ids: Vec<String> = messages
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .flatten()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(call_ids.len(), 2);
        for id in &call_ids {
            let answers = tool_messages(&messages)
                .into_iter()
                .filter(|m| m.tool_call_id.as_ref() == Some(id))
                .count();
            assert_eq!(answers, 1);
        }
    }

    #[test]
    fn inline_data_becomes_image_url_parts() {
        let contents = entries(json!([
            {"role": "user", "parts": [
                {"text": "what is this?"},
                {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
            ]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(
            messages[0].content,
            Some(MessageContent::Parts(vec![
                ContentPart::Text { text: "what is this?".to_string() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".to_string(),
                        detail: None,
                    },
                },
            ]))
        );
    }

    #[test]
    fn part_list_messages_are_not_merged() {
        let contents = entries(json!([
            {"role": "user", "parts": [{"text": "look"}]},
            {"role": "user", "parts": [{"inlineData": {"mimeType": "image/jpeg", "data": "BBBB"}}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn whitespace_user_content_becomes_a_single_space() {
        let contents = entries(json!([
            {"role": "model", "parts": [{"text": "hi"}]},
            {"role": "user", "parts": [{"text": "   "}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages[1], Message::text(Role::User, " "));
    }

    #[test]
    fn empty_turns_emit_nothing() {
        let contents = entries(json!([
            {"role": "user", "parts": []},
            {"role": "model", "parts": [{"text": ""}]},
            {"role": "user", "parts": [{"text": "real"}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages, vec![Message::text(Role::User, "real")]);
    }

    #[test]
    fn unknown_roles_are_treated_as_user() {
        let contents = entries(json!([
            {"role": "function", "parts": [{"text": "x"}]},
            {"parts": [{"text": "y"}]}
        ]));
        let messages = translate_contents(&contents, None);
        assert_eq!(messages, vec![Message::text(Role::User, "x\n\ny")]);
    }
}
