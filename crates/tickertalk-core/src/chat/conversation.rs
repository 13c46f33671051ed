//! Conversation manager for one live session.

use std::sync::Arc;

use tracing::info_span;

use tickertalk_types::chat::{SessionInfo, Turn};
use tickertalk_types::llm::Message;

use super::stream::{EventStream, StreamInSpan};
use crate::llm::CompletionSettings;
use crate::llm::box_provider::BoxLlmProvider;

/// Ordered history plus the client handle for one session.
///
/// Created on connect, dropped on disconnect, never persisted. Turns are
/// append-only and not validated; the pipeline is responsible for appending
/// them in user/assistant pairs.
pub struct Conversation {
    info: SessionInfo,
    turns: Vec<Turn>,
    client: Arc<BoxLlmProvider>,
    settings: CompletionSettings,
}

impl Conversation {
    pub fn new(client: Arc<BoxLlmProvider>, settings: CompletionSettings) -> Self {
        Self {
            info: SessionInfo::new(),
            turns: Vec::new(),
            client,
            settings,
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.info.turn_count = self.turns.len();
    }

    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    pub fn client(&self) -> &Arc<BoxLlmProvider> {
        &self.client
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget every turn. The session id and client are kept.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.info.turn_count = 0;
    }

    /// Stream a completion over the full history followed by `pending`,
    /// which is not appended.
    pub fn stream_reply(&self, pending: &Turn) -> EventStream {
        let messages: Vec<Message> = self
            .turns
            .iter()
            .chain(std::iter::once(pending))
            .map(Message::from)
            .collect();
        let request = self.settings.request(messages, true);

        let span = info_span!(
            "gen_ai.stream",
            session_id = %self.info.id,
            gen_ai.operation.name = "summarize",
            gen_ai.system = self.client.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = true,
            history_turns = self.turns.len(),
        );

        Box::pin(StreamInSpan::new(self.client.stream(request), span))
    }
}
