//! One-shot question answering in the terminal.

use std::process::ExitCode;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use tickertalk_core::chat::conversation::Conversation;
use tickertalk_types::error::PipelineError;
use tickertalk_types::reply::{PipelineEvent, Reply, StepKind};

use super::chat::renderer::ChatRenderer;
use crate::state::{AppState, ConcretePipeline};

/// Answer one question in a throwaway conversation.
///
/// Pipeline failures are reported here and turned into a failing exit
/// status, so they are printed exactly once.
pub async fn ask(state: &AppState, question: &str, json: bool) -> anyhow::Result<ExitCode> {
    let mut conversation = state.new_conversation();

    if json {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let drain = async { while rx.recv().await.is_some() {} };
        let (result, ()) = tokio::join!(
            state.pipeline.run(question, &mut conversation, tx),
            drain
        );
        let (body, succeeded) = json_report(&result)?;
        println!("{body}");
        return Ok(exit_code(succeeded));
    }

    let renderer = ChatRenderer::new(Some(crossterm::style::Color::Cyan));
    match run_question(&state.pipeline, &mut conversation, question, &renderer).await {
        Ok(reply) => {
            renderer.print_reply_details(&reply);
            println!();
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_pipeline_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Pretty JSON for `ask --json`: the reply, or an `error` object carrying
/// the pipeline error code. The flag is false for the error case.
fn json_report(result: &Result<Reply, PipelineError>) -> serde_json::Result<(String, bool)> {
    match result {
        Ok(reply) => Ok((serde_json::to_string_pretty(reply)?, true)),
        Err(e) => {
            let body = serde_json::json!({ "error": { "code": e.code(), "message": e.to_string() } });
            Ok((serde_json::to_string_pretty(&body)?, false))
        }
    }
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the pipeline while rendering its progress: a spinner between steps,
/// the SQL once written, then the summary token by token.
pub async fn run_question(
    pipeline: &ConcretePipeline,
    conversation: &mut Conversation,
    question: &str,
    renderer: &ChatRenderer,
) -> Result<Reply, PipelineError> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(spinner_message(None));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let render = async {
        let mut streaming = false;
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Step(step) => {
                    spinner.suspend(|| renderer.print_step(&step));
                    spinner.set_message(spinner_message(Some(step.name)));
                }
                PipelineEvent::Token { text } => {
                    if !streaming {
                        spinner.finish_and_clear();
                        println!();
                        print!("  ");
                        streaming = true;
                    }
                    renderer.print_streaming_token(&text);
                }
            }
        }
        spinner.finish_and_clear();
        streaming
    };

    let (result, streamed) = tokio::join!(pipeline.run(question, conversation, tx), render);
    if streamed {
        println!();
    }
    result
}

/// What the pipeline is doing after `completed` finished.
fn spinner_message(completed: Option<StepKind>) -> &'static str {
    match completed {
        None => "writing SQL...",
        Some(StepKind::WriteSql) => "running query...",
        Some(StepKind::ExecuteSql) => "drawing chart...",
        Some(StepKind::Plot) => "suggesting follow-ups...",
        Some(StepKind::FollowUp) => "summarizing...",
    }
}

pub fn print_pipeline_error(error: &PipelineError) {
    eprintln!(
        "\n  {} {}",
        style(format!("[{}]", error.code())).red().bold(),
        error
    );
}
