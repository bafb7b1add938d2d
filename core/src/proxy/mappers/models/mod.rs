//! Wire models for both sides of the bridge

pub mod gemini;
pub mod openai;
