//! Remote analysis: request builders, an HTTP client for `generateContent`
//! endpoints, and a tolerant parser for the line-oriented diagnosis template.

pub mod client;
pub mod parse;
pub mod request;

pub use client::{
    DEFAULT_API_BASE, GeminiClient, Generation, ModelInfo, RemoteAnalyzer, RemoteError, list_models,
};
pub use parse::parse_analysis;
pub use request::{GenerateRequest, chat_request, plant_analysis_request};
