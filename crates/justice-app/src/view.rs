//! Screens. Each variant carries exactly the data its screen needs, so
//! leaving a screen drops that data.

use justice_ai::ConversationSession;
use justice_core::{ConversationTurn, Draft};

/// Opening line of every companion chat.
pub const COMPANION_GREETING: &str =
    "I'm here. This is a quiet, safe space for you to speak your truth. Take your time.";

/// Shown in place of a companion reply that failed.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having a hard time connecting right now. But I am still here with you.";

/// Identifies one outstanding analysis or chat turn.
///
/// A result is only applied while the screen that issued the ticket is
/// still showing and still waiting on that ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) u64);

#[derive(Debug)]
pub enum View {
    Gate,
    Dashboard,
    Companion(ChatScreen),
    Disclosure(DisclosureForm),
    Review(Draft),
    Vault(VaultScreen),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gate => "gate",
            Self::Dashboard => "dashboard",
            Self::Companion(_) => "companion",
            Self::Disclosure(_) => "disclosure",
            Self::Review(_) => "review",
            Self::Vault(_) => "vault",
        }
    }
}

/// A reply being streamed in.
#[derive(Debug)]
pub struct PendingReply {
    pub(crate) ticket: Ticket,
    pub text: String,
}

pub struct ChatScreen {
    pub(crate) session: ConversationSession,
    pub transcript: Vec<ConversationTurn>,
    pub pending: Option<PendingReply>,
    /// The companion suggested a pause; a breathing prompt is showing.
    pub breathing: bool,
}

impl ChatScreen {
    pub(crate) fn new(session: ConversationSession) -> Self {
        Self {
            session,
            transcript: vec![ConversationTurn::companion(COMPANION_GREETING)],
            pending: None,
            breathing: false,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.pending.is_some()
    }
}

impl std::fmt::Debug for ChatScreen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatScreen")
            .field("turns", &self.transcript.len())
            .field("typing", &self.is_typing())
            .field("breathing", &self.breathing)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Awaiting(Ticket),
}

pub struct DisclosureForm {
    pub input: String,
    pub phase: FormPhase,
    /// Inline notice left by a failed analysis.
    pub notice: Option<String>,
}

impl DisclosureForm {
    pub(crate) fn new(input: String) -> Self {
        Self {
            input,
            phase: FormPhase::Idle,
            notice: None,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.phase, FormPhase::Awaiting(_))
    }
}

impl std::fmt::Debug for DisclosureForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisclosureForm")
            .field("input_len", &self.input.len())
            .field("phase", &self.phase)
            .field("notice", &self.notice)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct VaultScreen {
    /// Entry awaiting the user's delete confirmation.
    pub pending_delete: Option<String>,
}

/// Where the disclosure workflow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    AwaitingAnalysis,
    DraftReady,
}

/// Whether a reply warrants the breathing prompt.
pub(crate) fn suggests_pause(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    lower.contains("breathe") || lower.contains("pause")
}
