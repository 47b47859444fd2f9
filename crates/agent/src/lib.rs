//! Remote classification for Foreman.
//!
//! - `llm`: the [`LlmClient`] seam and [`HttpLlmClient`] for OpenAI,
//!   Anthropic and Ollama.
//! - `classifier`: [`RemoteClassifierStrategy`], a resolution strategy that
//!   constrains the model to a phrase table's label vocabulary.
//!
//! The model only ever picks a label. A failed, slow or out-of-vocabulary
//! answer hands the query back to local fuzzy matching.

pub mod classifier;
pub mod llm;

pub use classifier::{build_resolver, RemoteClassifierStrategy};
pub use llm::{HttpLlmClient, LlmClient};
