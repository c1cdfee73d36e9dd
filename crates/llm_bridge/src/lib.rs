//! LLM bridge for the remote vision extraction tier
//!
//! Talks to a local or remote vision-capable LLM over the Ollama chat
//! API and adapts it to the pipeline's `VisionService` contract.

pub mod client;
pub mod vision;

pub use client::{ChatClient, ChatConfig};
pub use vision::CardVisionModel;
