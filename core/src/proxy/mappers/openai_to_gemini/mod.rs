//! OpenAI to Gemini response conversion

pub mod response;
pub mod streaming;

pub use response::convert_chat_response;
pub use streaming::{create_gemini_sse_stream, split_complete_response, sse_frame, StreamTranslator};
