//! Scripted doubles for the AI capabilities and the delivery transport.
//!
//! Used by this crate's tests and by downstream crates that want to drive
//! the lifecycle without network access.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use deskbot_models::{CompletionProvider, CompletionRequest, Embedding, EmbeddingProvider};

use crate::delivery::{DEFAULT_MESSAGE_LIMIT, DeliverySink};
use crate::error::DeliveryError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// MockEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Embedding provider answering from a fixed table.
///
/// Texts with no scripted vector use the default vector if one is set and
/// fail otherwise.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    vectors: HashMap<String, Embedding>,
    default: Option<Embedding>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: Embedding) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    pub fn with_default(mut self, vector: Embedding) -> Self {
        self.default = Some(vector);
        self
    }

    /// Texts passed to `embed`, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> deskbot_models::Result<Embedding> {
        lock(&self.calls).push(text.to_string());
        if self.failing {
            return Err(deskbot_models::Error::ProviderApi("scripted failure".into()));
        }
        self.vectors
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| deskbot_models::Error::ProviderApi(format!("no vector for {text:?}")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MockCompleter
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail,
    Panic,
}

#[derive(Debug, Default)]
struct CompleterState {
    queued: VecDeque<Script>,
    requests: Vec<CompletionRequest>,
}

/// Completion provider with scripted results.
///
/// Queued results are consumed first, one per call; after that every call
/// gets the standing behaviour. Clones share their queue and request log.
#[derive(Debug, Clone)]
pub struct MockCompleter {
    standing: Script,
    state: Arc<Mutex<CompleterState>>,
}

impl MockCompleter {
    /// Answers every call with empty text.
    pub fn new() -> Self {
        Self::scripted(Script::Reply(String::new()))
    }

    pub fn failing() -> Self {
        Self::scripted(Script::Fail)
    }

    /// Panics inside `complete`.
    pub fn panicking() -> Self {
        Self::scripted(Script::Panic)
    }

    fn scripted(standing: Script) -> Self {
        Self {
            standing,
            state: Arc::default(),
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.standing = Script::Reply(reply.to_string());
        self
    }

    /// Answer the next unanswered call with `reply`.
    pub fn queue_reply(&self, reply: &str) {
        lock(&self.state)
            .queued
            .push_back(Script::Reply(reply.to_string()));
    }

    /// Fail the next unanswered call.
    pub fn queue_error(&self) {
        lock(&self.state).queued.push_back(Script::Fail);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.state).requests.len()
    }
}

impl Default for MockCompleter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompleter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> deskbot_models::Result<String> {
        let script = {
            let mut state = lock(&self.state);
            state.requests.push(request);
            state
                .queued
                .pop_front()
                .unwrap_or_else(|| self.standing.clone())
        };
        match script {
            Script::Reply(text) => Ok(text),
            Script::Fail => Err(deskbot_models::Error::ProviderApi(
                "scripted failure".into(),
            )),
            Script::Panic => panic!("scripted completion panic"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RecordingSink
// ────────────────────────────────────────────────────────────────────────────

/// A message accepted by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: String,
    pub text: String,
    pub message_id: String,
}

/// Reactions attached through [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReactions {
    pub message_id: String,
    pub emojis: [String; 2],
}

/// Delivery sink that records instead of sending.
///
/// Message ids are `msg-1`, `msg-2`, ... in send order.
#[derive(Debug)]
pub struct RecordingSink {
    failing: AtomicBool,
    limit: usize,
    counter: AtomicUsize,
    sent: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<SentReactions>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            failing: AtomicBool::new(false),
            limit: DEFAULT_MESSAGE_LIMIT,
            counter: AtomicUsize::new(0),
            sent: Mutex::default(),
            reactions: Mutex::default(),
        }
    }

    /// Every send fails until [`set_failing`](Self::set_failing)`(false)`.
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_failing(true);
        sink
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    pub fn reactions(&self) -> Vec<SentReactions> {
        lock(&self.reactions).clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn send(&self, channel_id: &str, text: &str) -> Result<String, DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Send("scripted transport failure".into()));
        }
        let message_id = format!("msg-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.sent).push(SentMessage {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
            message_id: message_id.clone(),
        });
        Ok(message_id)
    }

    async fn react_two_way(
        &self,
        message_id: &str,
        positive: &str,
        negative: &str,
    ) -> Result<(), DeliveryError> {
        lock(&self.reactions).push(SentReactions {
            message_id: message_id.to_string(),
            emojis: [positive.to_string(), negative.to_string()],
        });
        Ok(())
    }

    fn message_limit(&self) -> usize {
        self.limit
    }
}
