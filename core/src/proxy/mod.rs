//! Proxy module - Gemini API surface over an OpenAI-compatible backend

pub mod common;
pub mod handlers;
pub mod mappers;
pub mod rate_limit;
pub mod server;
pub mod tokenizer;
pub mod upstream;

pub use rate_limit::RateLimiter;
pub use server::{build_router, AppState, ProxyServer};
pub use tokenizer::{TiktokenEstimator, TokenCount, TokenEstimator};
