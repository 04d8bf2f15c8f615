//! LLM provider implementations.
//!
//! [`LlmProvider`] drives classification and response generation;
//! [`ImageDescriber`] turns image URLs into text. Both ship with an
//! OpenAI-compatible HTTP implementation.

pub mod error;
pub mod json;
pub mod model;
pub mod openai;
pub mod vision;

pub use {
    error::{Error, Result},
    model::{ChatMessage, CompletionResponse, ContentPart, LlmProvider, Usage, UserContent},
    openai::OpenAiProvider,
    vision::{ImageDescriber, ImageDescription, OpenAiVisionDescriber},
};
