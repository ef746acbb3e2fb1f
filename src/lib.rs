//! Client SDK for Gemini models on Vertex AI.
//!
//! Every generation call is streamed. A [`StreamGenerateContentResult`] exposes
//! the parsed chunks as they arrive and a future resolving to the merged
//! response. [`ChatSession`] keeps the conversation history across turns.

pub mod accumulator;
pub mod auth;
pub mod chat;
pub mod chunk_stream;
pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod response;
pub mod types;
pub mod validation;
mod wire;

// Re-export core types for easy usage
pub use accumulator::ResponseAccumulator;
pub use auth::{ApplicationDefaultCredentials, StaticToken, TokenProvider};
pub use chat::{ChatSession, StartChatParams};
pub use chunk_stream::{ChunkStream, ChunkStreamExt};
pub use client::{ModelParams, VertexAI};
pub use config::VertexConfig;
pub use error::{Error, ErrorKind};
pub use generator::ContentGenerator;
pub use model::GenerativeModel;
pub use response::{ResponseFuture, ResponseStream, StreamGenerateContentResult};
pub use types::*;
