//! Input parsing for the chat loop.
//!
//! Lines starting with `/` are slash commands; a bare number picks one of
//! the currently offered suggestions.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Forget the conversation so far.
    Reset,
    /// Exit the chat session.
    Exit,
    /// Show conversation history for this session.
    History,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/reset" | "/new" => Some(ChatCommand::Reset),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/history" => Some(ChatCommand::History),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Interpret `input` as a 1-based pick among `available` suggestions.
pub fn parse_choice(input: &str, available: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=available).contains(&n).then(|| n - 1)
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}    {}", style("/help").cyan(), "Show this help message");
    println!("  {}   {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}   {}", style("/reset").cyan(), "Forget the conversation so far");
    println!("  {} {}", style("/history").cyan(), "Show conversation history");
    println!("  {}    {}", style("/exit").cyan(), "End the chat session");
    println!();
    println!(
        "  {}",
        style("Type a suggestion's number to ask it. Ctrl+D to exit.").dim()
    );
    println!();
}
