//! Chat session state: draft, transcript and the loading flag
//!
//! The session is the single owner of the conversation. Front ends edit the
//! draft, call [`ChatSession::submit`] and hand the returned query to a
//! [`WebhookClient`]; the reply comes back through
//! [`ChatSession::receive_reply`]. While a reply is outstanding every
//! submission is rejected, so at most one request is ever in flight.

use tracing::{debug, warn};

use crate::state::{Message, Transcript};
use crate::webhook::WebhookClient;

/// Where the session is in a turn. The loading flag is the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Awaiting,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    draft: String,
    transcript: Transcript,
    loading: bool,
    revision: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Edit the draft in place; returns whatever the closure returns.
    pub fn edit_draft<R>(&mut self, edit: impl FnOnce(&mut String) -> R) -> R {
        edit(&mut self.draft)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn state(&self) -> TurnState {
        if self.loading {
            TurnState::Awaiting
        } else {
            TurnState::Idle
        }
    }

    /// Bumped whenever the transcript or the loading flag changes.
    /// Renderers compare it against the last value they drew.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && !self.draft.trim().is_empty()
    }

    /// Move the draft into the transcript and enter the awaiting state.
    ///
    /// Returns the submitted text, or `None` without touching anything when
    /// the draft is blank or a reply is still outstanding.
    pub fn submit(&mut self) -> Option<String> {
        if self.loading {
            debug!("submit rejected: reply outstanding");
            return None;
        }
        if self.draft.trim().is_empty() {
            return None;
        }

        let query = std::mem::take(&mut self.draft);
        self.transcript.append(Message::user(query.clone()));
        self.loading = true;
        self.revision += 1;
        debug!(messages = self.transcript.len(), "turn submitted");

        Some(query)
    }

    /// Record the bot's answer (or failure text) and return to idle.
    pub fn receive_reply(&mut self, text: impl Into<String>) {
        if !self.loading {
            warn!("reply received with no request outstanding");
        }
        self.transcript.append(Message::bot(text));
        self.loading = false;
        self.revision += 1;
        debug!(messages = self.transcript.len(), "turn completed");
    }

    /// Ask the workflow about `query` and append its reply.
    /// Always leaves the session idle.
    pub async fn fetch_reply(&mut self, client: &WebhookClient, query: &str) {
        let text = client.reply(query).await;
        self.receive_reply(text);
    }

    /// Submit the current draft and wait for the reply.
    /// Returns the appended bot message, or `None` if the submit was rejected.
    pub async fn send(&mut self, client: &WebhookClient) -> Option<&Message> {
        let query = self.submit()?;
        self.fetch_reply(client, &query).await;
        self.transcript.last()
    }
}
