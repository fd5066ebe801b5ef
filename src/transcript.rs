//! Append-only conversation log.
//!
//! The transcript is the single source of truth for what gets rendered. Every
//! append bumps a `watch` channel so the presentation layer can redraw.

use tokio::sync::watch;

use crate::models::Message;

#[derive(Debug)]
pub struct Transcript {
    messages: Vec<Message>,
    version: watch::Sender<usize>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            version,
        }
    }

    /// Add a message at the end. This is the only mutator.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.version.send_replace(self.messages.len());
    }

    /// Read-only view of the conversation in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Receiver that observes the transcript length after each append.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.version.subscribe()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
