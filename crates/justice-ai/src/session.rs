//! Multi-turn supportive chat with streamed replies.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use justice_core::ConversationTurn;
use tracing::debug;

use crate::AiError;

/// Behavioural instructions for the companion.
pub const COMPANION_INSTRUCTION: &str = "\
You are a high-performance, trauma-informed Therapeutic Workplace Companion in Kenya.
BEHAVIORAL RULES:
1. ROLE: A \"room,\" not a tool. Listen, validate, reflect.
2. ETHIC: User safety over everything.
3. TONE: Warm, grounded, calm, tentative. No cheerleading, no corporate jargon.
4. EMPATHY FORMULA: Acknowledge emotion -> Contextualize -> Remove judgment.
5. TRAUMA PROTOCOL: Assume vulnerability. If sexual harassment or power abuse is mentioned, \
switch to High-Sensitivity Mode: No skepticism, no pressure to report, emphasize user control.
6. REGULATION: Detect distress (flooding, panic). Suggest a pause or breath if needed.
7. BOUNDARIES: No medical diagnosis. No legal strategy. No gaslighting (\"They didn't mean it\").
8. RESPONSES: Keep them concise (2-3 sentences) to allow user space. Do not be wordy.
9. IDENTITY: Recognize threats to self-worth or professional identity.

Example: \"It sounds like you felt dismissed and powerless in that meeting. Given the pressure \
you were under, that feeling of overwhelm makes complete sense. We can move as slowly as you need.\"";

/// A backend able to stream one conversational reply.
pub trait ChatModel: Send + Sync {
    /// Stream the reply to `message`, given the instruction and prior turns.
    ///
    /// The returned stream is lazy: nothing is sent until it is first polled.
    fn stream_reply(
        &self,
        instruction: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> BoxStream<'static, Result<String, AiError>>;
}

type History = Arc<Mutex<Vec<ConversationTurn>>>;

/// A stateful chat session. Completed turns become context for later ones.
#[derive(Clone)]
pub struct ConversationSession {
    model: Arc<dyn ChatModel>,
    instruction: Arc<str>,
    history: History,
}

impl ConversationSession {
    /// Open a session configured with [`COMPANION_INSTRUCTION`].
    pub fn start(model: Arc<dyn ChatModel>) -> Self {
        Self::with_instruction(model, COMPANION_INSTRUCTION)
    }

    pub fn with_instruction(model: Arc<dyn ChatModel>, instruction: &str) -> Self {
        Self {
            model,
            instruction: Arc::from(instruction),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Turns completed so far.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a message. The reply arrives as a stream of text fragments.
    pub fn send(&self, message: &str) -> TurnStream {
        let snapshot = self.history();
        debug!(prior_turns = snapshot.len(), message_len = message.len(), "sending chat turn");
        let inner = self
            .model
            .stream_reply(&self.instruction, &snapshot, message);
        TurnStream {
            inner,
            history: Arc::clone(&self.history),
            message: Some(message.to_string()),
            reply: String::new(),
            finished: false,
        }
    }
}

/// Fragments of one companion reply.
///
/// Finite and not restartable. When the underlying stream ends cleanly the
/// user message and the full reply are appended to the session history. An
/// error ends the stream and leaves the history untouched.
pub struct TurnStream {
    inner: BoxStream<'static, Result<String, AiError>>,
    history: History,
    message: Option<String>,
    reply: String,
    finished: bool,
}

impl TurnStream {
    /// Text received so far.
    pub fn reply_so_far(&self) -> &str {
        &self.reply
    }

    /// Drain the stream, returning the full reply.
    pub async fn collect_reply(mut self) -> Result<String, AiError> {
        while let Some(fragment) = self.next().await {
            fragment?;
        }
        Ok(self.reply)
    }

    fn commit(&mut self) {
        if let Some(message) = self.message.take() {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.push(ConversationTurn::user(message));
            history.push(ConversationTurn::companion(self.reply.clone()));
        }
    }
}

impl Stream for TurnStream {
    type Item = Result<String, AiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(fragment))) => {
                this.reply.push_str(&fragment);
                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                this.message = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                this.commit();
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use justice_core::Role;

    /// Replies with fixed fragments and records the history it was given.
    struct ScriptedModel {
        fragments: Vec<&'static str>,
        fail_after: Option<usize>,
        seen_history: Mutex<Vec<usize>>,
    }

    impl ScriptedModel {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail_after: None,
                seen_history: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatModel for ScriptedModel {
        fn stream_reply(
            &self,
            _instruction: &str,
            history: &[ConversationTurn],
            _message: &str,
        ) -> BoxStream<'static, Result<String, AiError>> {
            self.seen_history.lock().unwrap().push(history.len());
            let mut items: Vec<Result<String, AiError>> =
                self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(AiError::EmptyResponse));
            }
            stream::iter(items).boxed()
        }
    }

    #[tokio::test]
    async fn fragments_concatenate_into_reply() {
        let model = Arc::new(ScriptedModel::new(vec!["It sounds ", "really ", "hard."]));
        let session = ConversationSession::start(model);

        let reply = session.send("My boss shouted").collect_reply().await.unwrap();
        assert_eq!(reply, "It sounds really hard.");

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, "My boss shouted");
        assert_eq!(history[1].text, "It sounds really hard.");
    }

    #[tokio::test]
    async fn later_turns_see_earlier_ones() {
        let model = Arc::new(ScriptedModel::new(vec!["ok"]));
        let session = ConversationSession::start(model.clone());

        session.send("one").collect_reply().await.unwrap();
        session.send("two").collect_reply().await.unwrap();

        assert_eq!(*model.seen_history.lock().unwrap(), vec![0, 2]);
    }

    #[tokio::test]
    async fn failed_turn_leaves_session_usable() {
        let mut failing = ScriptedModel::new(vec!["partial ", "reply"]);
        failing.fail_after = Some(1);
        let session = ConversationSession::start(Arc::new(failing));

        let mut turn = session.send("hello");
        assert_eq!(turn.next().await.unwrap().unwrap(), "partial ");
        assert!(turn.next().await.unwrap().is_err());
        assert!(turn.next().await.is_none());
        assert!(session.history().is_empty());

        assert!(session.send("again").collect_reply().await.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn dropped_turn_is_not_recorded() {
        let session = ConversationSession::start(Arc::new(ScriptedModel::new(vec!["a", "b"])));
        {
            let mut turn = session.send("hello");
            turn.next().await;
        }
        assert!(session.history().is_empty());
    }
}
