//! Gemini adapter: structured incident analysis and the streamed companion chat.

use async_trait::async_trait;
use justice_core::AnalysisResult;

mod error;
pub use error::AiError;

pub mod analysis;
pub use analysis::{build_request, parse_analysis};

mod sse;
pub use sse::SseDecoder;

pub mod wire;

mod session;
pub use session::{COMPANION_INSTRUCTION, ChatModel, ConversationSession, TurnStream};

mod gemini;
pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT, GeminiClient, GeminiConfig};

/// Turns a raw incident narrative into a structured, redacted analysis.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AiError>;
}
