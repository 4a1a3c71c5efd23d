//! The application: one owned vault, the gate, and the active screen.
//!
//! Every operation is synchronous. Remote work is handed back to the caller
//! as a future or stream tagged with a [`Ticket`]; the caller drives it and
//! reports the outcome, which is applied only if the ticket is still current.

use std::mem;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use justice_ai::{AiError, Analyzer, ChatModel, ConversationSession, TurnStream};
use justice_core::{AnalysisResult, ConversationTurn, Draft, user_authored_text};
use justice_store::{StoreError, Vault};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gate::{DisguiseGate, GateOutcome, Key};
use crate::view::{
    ChatScreen, DisclosureForm, FALLBACK_REPLY, FormPhase, PendingReply, Ticket, View,
    VaultScreen, WorkflowState, suggests_pause,
};

const ANALYSIS_FAILED_NOTICE: &str =
    "Analysis failed. Your text has been kept; please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("'{action}' is not available on the {view} screen")]
    WrongView {
        action: &'static str,
        view: &'static str,
    },

    #[error("an analysis is already in progress")]
    AnalysisInProgress,

    #[error("the companion is still replying")]
    ReplyInProgress,

    #[error("no entry with id {0}")]
    UnknownEntry(String),

    #[error("no deletion awaiting confirmation")]
    NoPendingDeletion,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// An analysis handed to the caller to run.
pub struct AnalysisJob {
    pub ticket: Ticket,
    pub future: BoxFuture<'static, Result<AnalysisResult, AiError>>,
}

/// A companion reply handed to the caller to stream.
pub struct ChatTurn {
    pub ticket: Ticket,
    pub stream: TurnStream,
}

pub struct App {
    vault: Vault,
    analyzer: Arc<dyn Analyzer>,
    chat_model: Arc<dyn ChatModel>,
    gate: DisguiseGate,
    view: View,
    /// Text carried from the companion chat into the disclosure form.
    prefill: String,
    next_ticket: u64,
}

impl App {
    pub fn new(
        vault: Vault,
        analyzer: Arc<dyn Analyzer>,
        chat_model: Arc<dyn ChatModel>,
        gate: DisguiseGate,
    ) -> Self {
        Self {
            vault,
            analyzer,
            chat_model,
            gate,
            view: View::Gate,
            prefill: String::new(),
            next_ticket: 0,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn gate_display(&self) -> &str {
        self.gate.display()
    }

    pub fn prefill(&self) -> &str {
        &self.prefill
    }

    pub fn workflow_state(&self) -> WorkflowState {
        match &self.view {
            View::Disclosure(form) if form.is_analyzing() => WorkflowState::AwaitingAnalysis,
            View::Review(_) => WorkflowState::DraftReady,
            _ => WorkflowState::Idle,
        }
    }

    fn wrong_view(&self, action: &'static str) -> AppError {
        AppError::WrongView {
            action,
            view: self.view.name(),
        }
    }

    fn require_unlocked(&self, action: &'static str) -> Result<(), AppError> {
        if matches!(self.view, View::Gate) {
            return Err(self.wrong_view(action));
        }
        Ok(())
    }

    // ── Gate and navigation ──

    pub fn press_key(&mut self, key: Key) -> Result<GateOutcome, AppError> {
        if !matches!(self.view, View::Gate) {
            return Err(self.wrong_view("press-key"));
        }
        let outcome = self.gate.press(key);
        if outcome == GateOutcome::Unlocked {
            info!("unlocked");
            self.view = View::Dashboard;
        }
        Ok(outcome)
    }

    pub fn home(&mut self) -> Result<(), AppError> {
        self.require_unlocked("home")?;
        self.view = View::Dashboard;
        Ok(())
    }

    /// Start a fresh companion chat. Any previous chat is gone.
    pub fn open_chat(&mut self) -> Result<(), AppError> {
        self.require_unlocked("open-chat")?;
        let session = ConversationSession::start(Arc::clone(&self.chat_model));
        self.view = View::Companion(ChatScreen::new(session));
        Ok(())
    }

    /// Show the disclosure form. A form already showing is left as it is,
    /// typed text and any outstanding analysis included.
    pub fn open_disclosure(&mut self) -> Result<(), AppError> {
        self.require_unlocked("open-disclosure")?;
        if matches!(self.view, View::Disclosure(_)) {
            return Ok(());
        }
        self.view = View::Disclosure(DisclosureForm::new(self.prefill.clone()));
        Ok(())
    }

    pub fn open_vault(&mut self) -> Result<(), AppError> {
        self.require_unlocked("open-vault")?;
        self.view = View::Vault(VaultScreen::default());
        Ok(())
    }

    /// Back to the calculator. Screen data goes with the screen; the chat
    /// prefill is kept.
    pub fn lock(&mut self) {
        self.gate.reset();
        self.view = View::Gate;
        debug!("locked");
    }

    /// Leave immediately, dropping every trace of unsaved work.
    pub fn panic(&mut self) {
        self.gate.reset();
        self.view = View::Gate;
        self.prefill.clear();
        info!("panic exit");
    }

    // ── Disclosure workflow ──

    pub fn edit_disclosure(&mut self, text: &str) -> Result<(), AppError> {
        let View::Disclosure(form) = &mut self.view else {
            return Err(self.wrong_view("edit-disclosure"));
        };
        if form.is_analyzing() {
            return Err(AppError::AnalysisInProgress);
        }
        form.input.clear();
        form.input.push_str(text);
        Ok(())
    }

    /// Submit the form for analysis.
    ///
    /// Blank input is ignored and yields `None`.
    pub fn submit_disclosure(&mut self) -> Result<Option<AnalysisJob>, AppError> {
        let ticket = Ticket(self.next_ticket + 1);
        let View::Disclosure(form) = &mut self.view else {
            return Err(self.wrong_view("submit-disclosure"));
        };
        if form.is_analyzing() {
            return Err(AppError::AnalysisInProgress);
        }
        if form.input.trim().is_empty() {
            return Ok(None);
        }

        form.phase = FormPhase::Awaiting(ticket);
        form.notice = None;
        let text = form.input.clone();
        self.next_ticket = ticket.0;
        debug!(ticket = ticket.0, text_len = text.len(), "analysis submitted");

        let analyzer = Arc::clone(&self.analyzer);
        let future = async move { analyzer.analyze(&text).await }.boxed();
        Ok(Some(AnalysisJob { ticket, future }))
    }

    /// Apply the outcome of an analysis. Returns `false` when the ticket is
    /// stale and the outcome was dropped.
    pub fn complete_analysis(
        &mut self,
        ticket: Ticket,
        outcome: Result<AnalysisResult, AiError>,
    ) -> bool {
        let View::Disclosure(form) = &mut self.view else {
            debug!(ticket = ticket.0, "discarding analysis for a closed form");
            return false;
        };
        if form.phase != FormPhase::Awaiting(ticket) {
            debug!(ticket = ticket.0, "discarding stale analysis");
            return false;
        }

        match outcome {
            Ok(result) => {
                let raw = mem::take(&mut form.input);
                info!(
                    ticket = ticket.0,
                    classifications = result.classifications.len(),
                    urgency = %result.urgency,
                    "draft ready"
                );
                self.view = View::Review(Draft::new(result, raw));
            }
            Err(e) => {
                warn!(ticket = ticket.0, error = %e, "analysis failed");
                form.phase = FormPhase::Idle;
                form.notice = Some(ANALYSIS_FAILED_NOTICE.to_string());
            }
        }
        true
    }

    /// Commit the draft to the vault and show the vault.
    ///
    /// If the write fails the entry is still in the vault and the error is
    /// returned.
    pub fn confirm_draft(&mut self) -> Result<String, AppError> {
        let draft = match mem::replace(&mut self.view, View::Vault(VaultScreen::default())) {
            View::Review(draft) => draft,
            other => {
                self.view = other;
                return Err(self.wrong_view("confirm-draft"));
            }
        };

        let timestamp = chrono::Utc::now().timestamp_millis();
        let id = self.vault.next_id(timestamp);
        let entry = draft.into_entry(id.clone(), timestamp);
        self.prefill.clear();
        self.vault.add(entry)?;
        Ok(id)
    }

    /// Drop the draft and reopen the form with the original text.
    pub fn discard_draft(&mut self) -> Result<(), AppError> {
        match mem::replace(&mut self.view, View::Dashboard) {
            View::Review(draft) => {
                self.view = View::Disclosure(DisclosureForm::new(draft.into_raw_text()));
            }
            other => {
                self.view = other;
                return Err(self.wrong_view("discard-draft"));
            }
        }
        Ok(())
    }

    // ── Vault ──

    /// First step of deleting an entry: ask for confirmation.
    pub fn request_delete(&mut self, id: &str) -> Result<(), AppError> {
        let known = self.vault.get(id).is_some();
        let View::Vault(screen) = &mut self.view else {
            return Err(self.wrong_view("delete-entry"));
        };
        if !known {
            return Err(AppError::UnknownEntry(id.to_string()));
        }
        screen.pending_delete = Some(id.to_string());
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        if let View::Vault(screen) = &mut self.view {
            screen.pending_delete = None;
        }
    }

    pub fn confirm_delete(&mut self) -> Result<(), AppError> {
        let View::Vault(screen) = &mut self.view else {
            return Err(self.wrong_view("confirm-delete"));
        };
        let id = screen.pending_delete.take().ok_or(AppError::NoPendingDeletion)?;
        self.vault.remove(&id)?;
        Ok(())
    }

    // ── Companion chat ──

    /// Send a chat message. Blank messages are ignored and yield `None`.
    pub fn send_chat(&mut self, message: &str) -> Result<Option<ChatTurn>, AppError> {
        let ticket = Ticket(self.next_ticket + 1);
        let View::Companion(chat) = &mut self.view else {
            return Err(self.wrong_view("send-chat"));
        };
        if chat.is_typing() {
            return Err(AppError::ReplyInProgress);
        }
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        chat.transcript.push(ConversationTurn::user(message));
        chat.pending = Some(PendingReply {
            ticket,
            text: String::new(),
        });
        let stream = chat.session.send(message);
        self.next_ticket = ticket.0;
        Ok(Some(ChatTurn { ticket, stream }))
    }

    fn pending_reply(&mut self, ticket: Ticket) -> Option<&mut ChatScreen> {
        match &mut self.view {
            View::Companion(chat)
                if chat.pending.as_ref().is_some_and(|p| p.ticket == ticket) =>
            {
                Some(chat)
            }
            _ => None,
        }
    }

    /// Append a streamed fragment. Returns `false` for a stale ticket.
    pub fn chat_fragment(&mut self, ticket: Ticket, fragment: &str) -> bool {
        let Some(chat) = self.pending_reply(ticket) else {
            return false;
        };
        if let Some(pending) = chat.pending.as_mut() {
            pending.text.push_str(fragment);
            if suggests_pause(&pending.text) {
                chat.breathing = true;
            }
        }
        true
    }

    /// Close out a reply. A failed turn shows the fallback reply instead.
    pub fn finish_chat_turn(&mut self, ticket: Ticket, outcome: Result<(), AiError>) -> bool {
        let Some(chat) = self.pending_reply(ticket) else {
            debug!(ticket = ticket.0, "discarding stale chat turn");
            return false;
        };
        let Some(pending) = chat.pending.take() else {
            return false;
        };
        let reply = match outcome {
            Ok(()) if !pending.text.is_empty() => pending.text,
            Ok(()) => {
                warn!(ticket = ticket.0, "companion reply was empty");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                warn!(ticket = ticket.0, error = %e, "companion reply failed");
                FALLBACK_REPLY.to_string()
            }
        };
        chat.transcript.push(ConversationTurn::companion(reply));
        true
    }

    pub fn dismiss_breathing(&mut self) {
        if let View::Companion(chat) = &mut self.view {
            chat.breathing = false;
        }
    }

    /// Carry everything the user wrote in the chat into the disclosure form.
    pub fn proceed_from_chat(&mut self) -> Result<(), AppError> {
        let View::Companion(chat) = &self.view else {
            return Err(self.wrong_view("proceed-from-chat"));
        };
        self.prefill = user_authored_text(&chat.transcript);
        self.view = View::Disclosure(DisclosureForm::new(self.prefill.clone()));
        Ok(())
    }
}
