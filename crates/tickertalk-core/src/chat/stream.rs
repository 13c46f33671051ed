//! Span-carrying stream wrapper.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;

use tickertalk_types::llm::{LlmError, StreamEvent};

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Keeps a tracing span entered on every poll, so the span covers the
/// whole streaming duration rather than just stream creation.
pub struct StreamInSpan {
    inner: EventStream,
    span: tracing::Span,
}

impl StreamInSpan {
    pub fn new(inner: EventStream, span: tracing::Span) -> Self {
        Self { inner, span }
    }
}

impl Stream for StreamInSpan {
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Both fields are Unpin, so no projection is needed.
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}
