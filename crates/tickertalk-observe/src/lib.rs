//! Observability setup for TickerTalk: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
