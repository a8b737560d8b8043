//! LLM client layer
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for provider abstraction
//! - AnthropicClient and OllamaClient implementations
//! - JSON extraction from model output

pub mod anthropic;
pub mod client;
pub mod extract;
pub mod ollama;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError, MockLlmClient};
pub use extract::extract_json_object;
pub use ollama::{OllamaClient, OllamaConfig};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};
