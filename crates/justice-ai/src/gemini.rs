//! HTTP client for the Gemini `generateContent` API.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use justice_core::{AnalysisResult, ConversationTurn};
use tracing::{info, warn};

use crate::analysis;
use crate::session::{ChatModel, ConversationSession};
use crate::sse::SseDecoder;
use crate::wire::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::{AiError, Analyzer};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CHAT_TEMPERATURE: f32 = 0.7;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound on a whole request, including a streamed body.
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Gemini client implementing both [`Analyzer`] and [`ChatModel`].
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Open a companion chat session backed by this client.
    pub fn start_conversation(self: &Arc<Self>) -> ConversationSession {
        ConversationSession::start(Arc::clone(self) as Arc<dyn ChatModel>)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{method}", self.base_url, self.model)
    }

    /// Single request/response generation.
    pub async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, AiError> {
        let resp = self
            .client
            .post(self.endpoint("generateContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(AiError::from_transport)?;
        let resp = check_status(resp).await?;
        let body = resp.text().await.map_err(AiError::from_transport)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Streamed generation, yielding text fragments as they arrive.
    pub fn stream_generate(
        &self,
        request: GenerateContentRequest,
    ) -> BoxStream<'static, Result<String, AiError>> {
        let send = self
            .client
            .post(self.endpoint("streamGenerateContent"))
            .query(&[("alt", "sse")])
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send();

        let fragments = async move {
            let resp = send.await.map_err(AiError::from_transport)?;
            let resp = check_status(resp).await?;
            Ok::<_, AiError>(sse_fragments(resp.bytes_stream()))
        };

        stream::once(fragments).try_flatten().boxed()
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, AiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "gemini returned an error status");
    Err(AiError::server(status.as_u16(), &body))
}

struct SseState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Decode an SSE body of `GenerateContentResponse` chunks into text fragments.
fn sse_fragments<S, B>(body: S) -> BoxStream<'static, Result<String, AiError>>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(data) = st.pending.pop_front() {
                let chunk = serde_json::from_str::<GenerateContentResponse>(&data)
                    .map_err(AiError::from)
                    .and_then(|c| c.text());
                match chunk {
                    Ok(Some(text)) => return Some((Ok(text), st)),
                    Ok(None) => continue,
                    Err(e) => {
                        st.done = true;
                        st.pending.clear();
                        return Some((Err(e), st));
                    }
                }
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => st.pending.extend(st.decoder.push(bytes.as_ref())),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(AiError::from_transport(e)), st));
                }
                None => {
                    st.done = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AiError> {
        let start = Instant::now();
        let request = analysis::build_request(text);
        let response = self.generate(&request).await?;
        let body = response.text()?.ok_or(AiError::EmptyResponse)?;
        let result = analysis::parse_analysis(&body)?;
        info!(
            text_len = text.len(),
            classifications = result.classifications.len(),
            urgency = %result.urgency,
            vague = result.is_vague,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis complete"
        );
        Ok(result)
    }
}

impl ChatModel for GeminiClient {
    fn stream_reply(
        &self,
        instruction: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> BoxStream<'static, Result<String, AiError>> {
        let mut contents: Vec<Content> = history.iter().map(Content::from_turn).collect();
        contents.push(Content::text(Some("user"), message));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::text(None, instruction)),
            generation_config: GenerationConfig {
                temperature: CHAT_TEMPERATURE,
                response_mime_type: None,
                response_schema: None,
            },
        };
        self.stream_generate(request)
    }
}
