//! Scripted backend for tests and demonstrations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Generation, GenerationBackend};
use crate::error::{InferenceError, Result};

/// One scripted reaction of a [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Answer with this text.
    Text(String),
    /// Echo the prompt back.
    Echo,
    /// Fail as if the provider were unreachable.
    Fail,
    /// Sleep, then answer. Used to trigger timeouts.
    Delay(Duration),
}

/// Backend that replays a script, then repeats a fallback reply forever.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    available: bool,
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Backend that echoes every prompt.
    pub fn echo(name: impl Into<String>) -> Self {
        Self::with_fallback(name, MockReply::Echo)
    }

    /// Backend whose every call fails.
    pub fn failing(name: impl Into<String>) -> Self {
        Self::with_fallback(name, MockReply::Fail)
    }

    /// Backend whose every call sleeps for `delay` first.
    pub fn slow(name: impl Into<String>, delay: Duration) -> Self {
        Self::with_fallback(name, MockReply::Delay(delay))
    }

    pub fn with_fallback(name: impl Into<String>, fallback: MockReply) -> Self {
        Self {
            name: name.into(),
            available: true,
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Replies used, in order, before the fallback.
    pub fn with_script(self, script: impl IntoIterator<Item = MockReply>) -> Self {
        if let Ok(mut queue) = self.script.lock() {
            queue.extend(script);
        }
        self
    }

    /// Makes the health check fail.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply() {
            MockReply::Text(text) => Ok(Generation::new(text, self.name())),
            MockReply::Echo => Ok(Generation::new(prompt, self.name())),
            MockReply::Fail => Err(InferenceError::Unavailable(self.name())),
            MockReply::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Generation::new(prompt, self.name()))
            }
        }
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}
