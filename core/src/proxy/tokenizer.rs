//! Local token estimation for `countTokens`

use tiktoken_rs::CoreBPE;

use super::mappers::models::openai::{ContentPart, Message, MessageContent, Role};

/// Framing overhead added for every message.
pub const TOKENS_PER_MESSAGE: u64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCount {
    pub input: u64,
    pub output: u64,
}

impl TokenCount {
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

pub trait TokenEstimator: Send + Sync {
    fn count(&self, messages: &[Message]) -> TokenCount;
}

/// `o200k_base` estimator. Assistant messages are counted as output.
pub struct TiktokenEstimator {
    bpe: &'static CoreBPE,
}

impl TiktokenEstimator {
    pub fn new() -> Self {
        Self {
            bpe: tiktoken_rs::o200k_base_singleton(),
        }
    }

    fn encode_len(&self, text: &str) -> u64 {
        self.bpe.encode_with_special_tokens(text).len() as u64
    }

    fn message_tokens(&self, message: &Message) -> u64 {
        let mut tokens = TOKENS_PER_MESSAGE;

        match &message.content {
            Some(MessageContent::Text(text)) => tokens += self.encode_len(text),
            Some(MessageContent::Parts(parts)) => {
                for part in parts {
                    if let ContentPart::Text { text } = part {
                        tokens += self.encode_len(text);
                    }
                }
            }
            None => {}
        }

        for call in message.tool_calls.iter().flatten() {
            tokens += self.encode_len(&call.function.name);
            tokens += self.encode_len(&call.function.arguments);
        }

        tokens
    }
}

impl Default for TiktokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn count(&self, messages: &[Message]) -> TokenCount {
        messages.iter().fold(TokenCount::default(), |mut acc, message| {
            let tokens = self.message_tokens(message);
            if message.role == Role::Assistant {
                acc.output += tokens;
            } else {
                acc.input += tokens;
            }
            acc
        })
    }
}
