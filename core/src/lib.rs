//! gembridge Core Library
//! Gemini <-> OpenAI protocol translation, backend client and HTTP surface

pub mod config;
pub mod error;
pub mod proxy;

pub use error::ProxyError;
