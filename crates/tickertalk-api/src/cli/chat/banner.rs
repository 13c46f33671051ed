//! Welcome banner display for chat sessions.

use console::style;

use tickertalk_types::starter::Starter;

/// Print the welcome banner: model, session id and the starter questions,
/// numbered so they can be picked like follow-ups.
pub fn print_welcome_banner(model: &str, session_id: &str, starters: &[Starter]) {
    println!();
    println!("  {} {}", style("$").green().bold(), style("TickerTalk").cyan().bold());
    println!(
        "  {}",
        style("Ask anything about the stock price database.").dim()
    );
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(&session_id[..8.min(session_id.len())]).dim()
    );

    if !starters.is_empty() {
        println!();
        println!("  {}", style("Try one of these:").bold());
        for (i, starter) in starters.iter().enumerate() {
            println!("  {} {}", style(format!("[{}]", i + 1)).cyan(), starter.label);
        }
    }

    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
