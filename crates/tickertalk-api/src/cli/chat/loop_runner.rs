//! The interactive chat loop.
//!
//! Reads a line, runs the pipeline on it and renders the reply. Pipelines
//! run one at a time, so history appends never interleave. A bare number
//! picks from the current suggestions (starters before the first answer,
//! follow-ups afterwards) and is submitted exactly as if it had been typed.

use console::style;

use tickertalk_core::chat::conversation::Conversation;
use tickertalk_types::chat::MessageRole;
use tickertalk_types::starter::default_starters;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::ChatRenderer;
use crate::cli::ask::{print_pipeline_error, run_question};
use crate::state::AppState;

/// Characters of each turn shown by `/history`.
const HISTORY_PREVIEW_CHARS: usize = 100;

pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let mut conversation = state.new_conversation();
    let renderer = ChatRenderer::new(Some(crossterm::style::Color::Cyan));

    let starters = default_starters();
    print_welcome_banner(
        &state.config.llm.model,
        &conversation.info().id.to_string(),
        &starters,
    );

    // Texts submitted when the user types 1..=n.
    let mut suggestions: Vec<String> = starters.into_iter().map(|s| s.message).collect();

    let prompt = format!("{} ", style("you >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!(
                    "\n  {}",
                    style("Press Ctrl+D to exit, or keep chatting.").dim()
                );
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Reset => {
                    conversation.clear();
                    suggestions.clear();
                    println!("\n  {}\n", style("Conversation cleared.").dim());
                }
                ChatCommand::Exit => {
                    println!("\n  {}", style("Session ended.").dim());
                    break;
                }
                ChatCommand::History => print_history(&conversation),
                ChatCommand::Unknown(name) => println!(
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(name).dim()
                ),
            }
            continue;
        }

        let question = match commands::parse_choice(&text, suggestions.len()) {
            Some(index) => {
                let picked = suggestions[index].clone();
                println!("  {} {}", style("->").dim(), style(&picked).cyan());
                picked
            }
            None => text,
        };

        match run_question(&state.pipeline, &mut conversation, &question, &renderer).await {
            Ok(reply) => {
                renderer.print_reply_details(&reply);
                suggestions = reply.actions.into_iter().map(|a| a.value).collect();
                tracing::debug!(turns = conversation.len(), "Exchange complete");
            }
            Err(e) => {
                print_pipeline_error(&e);
                eprintln!(
                    "  {}",
                    style("Nothing was added to the conversation. Try rephrasing.").dim()
                );
            }
        }
        println!();
    }

    Ok(())
}

fn print_history(conversation: &Conversation) {
    println!();
    if conversation.is_empty() {
        println!("  {}", style("No messages yet.").dim());
    }
    for turn in conversation.history() {
        let label = match turn.role {
            MessageRole::User => style("you").green().bold(),
            _ => style("tickertalk").cyan().bold(),
        };
        let preview: String = turn.content.chars().take(HISTORY_PREVIEW_CHARS).collect();
        let ellipsis = if turn.content.chars().count() > HISTORY_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        println!("  {label} {}{ellipsis}", preview.replace('\n', " "));
    }
    println!();
}
