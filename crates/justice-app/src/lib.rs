//! Application layer: the disguise gate, the screen state machine, and the
//! disclosure-to-vault workflow.

mod app;
pub use app::{AnalysisJob, App, AppError, ChatTurn};

pub mod gate;
pub use gate::{DisguiseGate, GateConfigError, GateOutcome, Key, UnlockCode};

pub mod view;
pub use view::{
    COMPANION_GREETING, ChatScreen, DisclosureForm, FALLBACK_REPLY, FormPhase, Ticket, View,
    VaultScreen, WorkflowState,
};
