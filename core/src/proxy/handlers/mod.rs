// Handlers module
pub mod gemini;
