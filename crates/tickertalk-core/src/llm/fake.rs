//! Scripted LLM provider used by core unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures_util::Stream;

use tickertalk_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason,
    StreamEvent, TokenCount, Usage,
};

use super::approx_tokens;
use super::provider::LlmProvider;

type StreamScript = Vec<Result<StreamEvent, LlmError>>;

/// Replays queued completions and streams in call order and records every
/// request it receives.
pub(crate) struct ScriptedProvider {
    capabilities: ProviderCapabilities,
    completions: Mutex<VecDeque<Result<String, LlmError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            capabilities: ProviderCapabilities {
                streaming: true,
                max_context_tokens: 128_000,
                max_output_tokens: 4096,
            },
            completions: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_completion(self, result: Result<String, LlmError>) -> Self {
        self.completions.lock().unwrap().push_back(result);
        self
    }

    /// Queue a successful stream that yields each fragment as a text delta.
    pub(crate) fn with_stream_text(self, fragments: &[&str]) -> Self {
        let mut script: StreamScript = vec![Ok(StreamEvent::Connected)];
        script.extend(fragments.iter().map(|f| {
            Ok(StreamEvent::TextDelta {
                text: (*f).to_string(),
            })
        }));
        script.push(Ok(StreamEvent::MessageDelta {
            stop_reason: StopReason::EndTurn,
        }));
        script.push(Ok(StreamEvent::Done));
        self.with_stream(script)
    }

    pub(crate) fn with_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    /// Shared handle to the recorded requests; stays valid after boxing.
    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.completions.lock().unwrap().pop_front();
        let model = request.model.clone();
        async move {
            let content = next.unwrap_or_else(|| {
                Err(LlmError::Provider {
                    message: "completion script exhausted".into(),
                })
            })?;
            Ok(CompletionResponse {
                id: "scripted".into(),
                content,
                model,
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            })
        }
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.requests.lock().unwrap().push(request);
        let script = self.streams.lock().unwrap().pop_front().unwrap_or_else(|| {
            vec![Err(LlmError::Stream("stream script exhausted".into()))]
        });
        Box::pin(async_stream::stream! {
            for event in script {
                yield event;
            }
        })
    }

    fn count_tokens(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<TokenCount, LlmError>> + Send {
        let tokens: usize = request
            .messages
            .iter()
            .map(|m| approx_tokens(&m.content))
            .sum();
        async move {
            Ok(TokenCount {
                input_tokens: tokens as u32,
            })
        }
    }
}
