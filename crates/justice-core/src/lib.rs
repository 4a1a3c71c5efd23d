//! Core types for Justice: incident entries, analyses, drafts, chat turns,
//! and the Kenyan legal reference material they are annotated with.

pub mod analysis;
pub mod conversation;
pub mod incident;
pub mod law;

pub use analysis::{AnalysisResult, Draft, LegalGuidance};
pub use conversation::{ConversationTurn, Role, user_authored_text};
pub use incident::{
    Classification, IncidentEntry, ParseUrgencyError, Urgency, dedup_classifications,
};
