//! WebSocket chat adapter.
//!
//! The `/ws/chat` endpoint upgrades an HTTP connection to a WebSocket and
//! binds one session to it:
//!
//! - **On connect:** a fresh conversation is created and registered, and the
//!   client receives a `session` frame with its id and the starter questions.
//! - **Per message:** a typed question or a follow-up click runs the
//!   pipeline. Progress is pushed as `step` and `token` frames while it runs,
//!   followed by one `reply` or `error` frame.
//! - **On disconnect:** the conversation is dropped and unregistered.
//!
//! Frames are handled strictly in order, so one connection never has two
//! pipelines in flight.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tickertalk_core::assistant::DataAssistant;
use tickertalk_core::chat::conversation::Conversation;
use tickertalk_core::pipeline::Pipeline;
use tickertalk_types::reply::{FOLLOW_UP_ACTION, PipelineEvent, Reply, StepKind};
use tickertalk_types::starter::{Starter, default_starters};

use crate::state::{AppState, SessionRegistry};

/// Incoming frame from a WebSocket client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// A typed question.
    Message { content: String },
    /// A clicked follow-up suggestion.
    Action {
        name: String,
        #[serde(default)]
        payload: ActionPayload,
    },
    /// Keep-alive ping. Server responds with `{"type":"pong"}`.
    Ping,
}

#[derive(Debug, Default, Deserialize)]
struct ActionPayload {
    #[serde(default)]
    value: String,
}

/// Outgoing frame to a WebSocket client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Session {
        session_id: Uuid,
        starters: Vec<Starter>,
    },
    Step {
        name: StepKind,
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<&'static str>,
    },
    Token {
        text: String,
    },
    Reply(Reply),
    Error {
        code: String,
        message: String,
    },
    Pong,
}

impl From<PipelineEvent> for ServerMessage {
    fn from(event: PipelineEvent) -> Self {
        match event {
            PipelineEvent::Step(step) => ServerMessage::Step {
                language: step.name.language(),
                name: step.name,
                output: step.output,
            },
            PipelineEvent::Token { text } => ServerMessage::Token { text },
        }
    }
}

/// What to do with one inbound text frame.
#[derive(Debug, PartialEq)]
enum Inbound {
    Ask(String),
    Ping,
    Reject { code: &'static str, message: String },
}

fn classify(text: &str) -> Inbound {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            return Inbound::Reject {
                code: "INVALID_MESSAGE",
                message: format!("Unrecognized message: {err}"),
            };
        }
    };

    let question = match message {
        ClientMessage::Ping => return Inbound::Ping,
        ClientMessage::Message { content } => content,
        ClientMessage::Action { name, .. } if name != FOLLOW_UP_ACTION => {
            return Inbound::Reject {
                code: "UNKNOWN_ACTION",
                message: format!("Unknown action '{name}'"),
            };
        }
        ClientMessage::Action { payload, .. } => payload.value,
    };

    let question = question.trim();
    if question.is_empty() {
        return Inbound::Reject {
            code: "EMPTY_MESSAGE",
            message: "Message is empty".to_string(),
        };
    }
    Inbound::Ask(question.to_string())
}

/// Upgrade an HTTP request to a chat WebSocket. Mounted at `/ws/chat`.
pub async fn ws_chat(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let mut conversation = state.new_conversation();
    let session_id = conversation.info().id;
    state.sessions.register(conversation.info());
    info!(%session_id, "Chat session connected");

    let hello = ServerMessage::Session {
        session_id,
        starters: default_starters(),
    };
    let mut open = send(&mut ws_sender, &hello).await.is_ok();

    while open {
        let text = match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(err)) => {
                debug!("WebSocket receive error: {err}");
                break;
            }
            // Binary, ping and pong protocol frames are handled by axum.
            Some(Ok(_)) => continue,
        };

        let sent = match classify(text.as_str()) {
            Inbound::Ping => send(&mut ws_sender, &ServerMessage::Pong).await,
            Inbound::Reject { code, message } => {
                warn!(%session_id, code, "Rejected WebSocket message: {message}");
                let error = ServerMessage::Error {
                    code: code.to_string(),
                    message,
                };
                send(&mut ws_sender, &error).await
            }
            Inbound::Ask(question) => {
                run_exchange(
                    &*state.pipeline,
                    &state.sessions,
                    &mut conversation,
                    &question,
                    &mut ws_sender,
                )
                .await
            }
        };
        open = sent.is_ok();
    }

    state.sessions.unregister(&session_id);
    info!(%session_id, turns = conversation.len(), "Chat session disconnected");
}

/// Run one pipeline, forwarding its events as they arrive, then send the
/// reply or the error. A failed run leaves the conversation untouched.
async fn run_exchange<A: DataAssistant>(
    pipeline: &Pipeline<A>,
    sessions: &SessionRegistry,
    conversation: &mut Conversation,
    question: &str,
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
) -> Result<(), axum::Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let forward = async {
        while let Some(event) = rx.recv().await {
            send(&mut *ws_sender, &ServerMessage::from(event)).await?;
        }
        Ok::<(), axum::Error>(())
    };
    let (result, forwarded) =
        tokio::join!(pipeline.run(question, conversation, tx), forward);
    forwarded?;

    let message = match result {
        Ok(reply) => {
            sessions.update(conversation.info());
            ServerMessage::Reply(reply)
        }
        Err(err) => {
            warn!(
                session_id = %conversation.info().id,
                code = err.code(),
                "Pipeline failed: {err}"
            );
            ServerMessage::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            }
        }
    };
    send(ws_sender, &message).await
}

async fn send(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    ws_sender.send(Message::Text(json.into())).await
}
