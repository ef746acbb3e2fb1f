//! Multi-turn conversations over a [`ContentGenerator`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use crate::generator::ContentGenerator;
use crate::response::{ResponseFuture, StreamGenerateContentResult};
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, SafetySetting,
};
use crate::Error;

/// Settings for a new chat session.
#[derive(Debug, Clone, Default)]
pub struct StartChatParams {
    /// Turns the conversation starts from.
    pub history: Vec<Content>,
    pub generation_config: Option<GenerationConfig>,
    pub safety_settings: Option<Vec<SafetySetting>>,
}

impl StartChatParams {
    pub fn history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub fn safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = Some(settings);
        self
    }
}

/// One logical conversation.
///
/// Each successful turn appends the user content and the first candidate's
/// content to the history. Failed turns leave the history untouched, including
/// turns whose first candidate came back without content (e.g. safety blocks).
/// Only one turn may be in flight at a time; a second call fails with
/// [`Error::SessionBusy`].
pub struct ChatSession {
    generator: Arc<dyn ContentGenerator>,
    history: Arc<Mutex<Vec<Content>>>,
    in_flight: Arc<AtomicBool>,
    generation_config: Option<GenerationConfig>,
    safety_settings: Option<Vec<SafetySetting>>,
}

impl ChatSession {
    pub fn new(generator: Arc<dyn ContentGenerator>, params: StartChatParams) -> Self {
        Self {
            generator,
            history: Arc::new(Mutex::new(params.history)),
            in_flight: Arc::new(AtomicBool::new(false)),
            generation_config: params.generation_config,
            safety_settings: params.safety_settings,
        }
    }

    /// Snapshot of the conversation so far.
    pub fn history(&self) -> Vec<Content> {
        lock(&self.history).clone()
    }

    /// Send a turn and wait for the merged reply.
    pub async fn send_message(
        &self,
        content: impl Into<Content>,
    ) -> Result<GenerateContentResponse, Error> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let user = content.into();

        let response = self
            .generator
            .generate_content(self.request(user.clone()))
            .await?;

        record_turn(&self.history, user, &response)?;
        Ok(response)
    }

    /// Send a turn and stream the reply.
    ///
    /// History is updated once the merged reply is complete, before the
    /// returned `response` resolves. The session stays busy until then.
    pub async fn send_message_stream(
        &self,
        content: impl Into<Content>,
    ) -> Result<StreamGenerateContentResult, Error> {
        let guard = InFlightGuard::acquire(&self.in_flight)?;
        let user = content.into();

        let result = self
            .generator
            .generate_content_stream(self.request(user.clone()))
            .await?;

        let StreamGenerateContentResult { stream, response } = result;
        let history = self.history.clone();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = match response.await {
                Ok(merged) => record_turn(&history, user, &merged).map(|()| merged),
                Err(e) => Err(e),
            };
            drop(guard);
            let _ = tx.send(outcome);
        });

        Ok(StreamGenerateContentResult {
            stream,
            response: ResponseFuture::new(rx),
        })
    }

    /// Outgoing request: the history so far plus the new turn.
    fn request(&self, user: Content) -> GenerateContentRequest {
        let mut contents = self.history();
        contents.push(user);

        let mut request = GenerateContentRequest::new(contents);
        request.generation_config = self.generation_config.clone();
        request.safety_settings = self.safety_settings.clone();
        request
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("history_len", &lock(&self.history).len())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn record_turn(
    history: &Mutex<Vec<Content>>,
    user: Content,
    response: &GenerateContentResponse,
) -> Result<(), Error> {
    let candidate = response.candidates.first().ok_or(Error::EmptyResponse)?;
    // A blocked candidate carries no parts; recording it would poison every later turn.
    if candidate.content.parts.is_empty() {
        tracing::warn!(
            finish_reason = ?candidate.finish_reason,
            "reply has no content, chat history left unchanged"
        );
        return Err(Error::EmptyResponse);
    }
    let reply = candidate.content.clone();

    let mut history = lock(history);
    history.push(user);
    history.push(reply);
    tracing::debug!(turns = history.len(), "chat history updated");
    Ok(())
}

fn lock(history: &Mutex<Vec<Content>>) -> MutexGuard<'_, Vec<Content>> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the session's in-flight flag; releases it on drop.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, Error> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SessionBusy)?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
