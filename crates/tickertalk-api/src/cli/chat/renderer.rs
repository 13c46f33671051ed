//! Terminal rendering of pipeline progress and replies.
//!
//! `ChatRenderer` combines `termimad` for prose, `syntect` for SQL and JSON
//! highlighting and `comfy-table` for result tables. During streaming,
//! tokens are printed raw.

use std::io::Write;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use crossterm::style::Color as TermColor;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use termimad::MadSkin;

use tickertalk_types::chart::Figure;
use tickertalk_types::query::{QueryResult, cell_text};
use tickertalk_types::reply::{FollowUpAction, Reply, StepKind, StepRecord};

const THEME: &str = "base16-ocean.dark";

/// Rows shown in terminal tables before truncating.
pub const MAX_TABLE_ROWS: usize = 20;

/// Terminal renderer with syntax highlighting.
pub struct ChatRenderer {
    skin: MadSkin,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl ChatRenderer {
    /// Create a new renderer with an optional accent color for headers and bold text.
    pub fn new(accent_color: Option<TermColor>) -> Self {
        let mut skin = MadSkin::default_dark();

        if let Some(color) = accent_color {
            let tc = Self::crossterm_to_termimad(color);
            skin.bold.set_fg(tc);
            skin.headers[0].set_fg(tc);
            skin.headers[1].set_fg(tc);
        }

        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);

        Self {
            skin,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Render a complete markdown answer. Fenced code blocks are
    /// highlighted via syntect; everything else goes through termimad.
    pub fn render_final(&self, markdown: &str) -> String {
        let mut output = String::new();
        let mut in_code_block = false;
        let mut code_lang = String::new();
        let mut code_buf = String::new();

        for line in markdown.lines() {
            if line.starts_with("```") && !in_code_block {
                in_code_block = true;
                code_lang = line.trim_start_matches('`').trim().to_string();
                code_buf.clear();
            } else if line.starts_with("```") && in_code_block {
                in_code_block = false;
                output.push_str(&self.highlight_code(&code_buf, &code_lang));
                output.push('\n');
            } else if in_code_block {
                code_buf.push_str(line);
                code_buf.push('\n');
            } else {
                output.push_str(&format!("{}", self.skin.term_text(line)));
            }
        }

        if in_code_block && !code_buf.is_empty() {
            output.push_str(&self.highlight_code(&code_buf, &code_lang));
        }

        output
    }

    /// Print a single streaming token (raw, no formatting).
    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Print a completed pipeline step. Only the SQL is shown in full; the
    /// table, chart and follow-ups are printed with the final reply.
    pub fn print_step(&self, step: &StepRecord) {
        println!("  {} {}", style("▸").cyan(), style(step.name).dim());
        if step.name == StepKind::WriteSql {
            print!("{}", self.highlight_code(&step.output, "sql"));
        }
    }

    /// Print everything in the reply except the already-streamed text.
    pub fn print_reply_details(&self, reply: &Reply) {
        println!();
        println!("{}", result_table(&reply.table, MAX_TABLE_ROWS));
        if reply.table.row_count() > MAX_TABLE_ROWS {
            println!(
                "  {}",
                style(format!(
                    "showing {MAX_TABLE_ROWS} of {} rows",
                    reply.table.row_count()
                ))
                .dim()
            );
        }
        if let Some(summary) = chart_summary(&reply.chart) {
            println!("  {} {}", style("Chart:").bold(), style(summary).dim());
        }
        print_followups(&reply.actions);
    }

    /// Highlight a code snippet using syntect.
    pub fn highlight_code(&self, code: &str, lang: &str) -> String {
        let Some(theme) = self.theme_set.themes.get(THEME) else {
            return code.lines().map(|l| format!("  {l}\n")).collect();
        };
        let syntax = if lang.is_empty() {
            self.syntax_set.find_syntax_plain_text()
        } else {
            self.syntax_set
                .find_syntax_by_token(lang)
                .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
        };
        let mut h = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        for line in code.lines() {
            let ranges: Vec<(Style, &str)> = h
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_default();
            let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
            output.push_str(&format!("  {escaped}\x1b[0m\n"));
        }
        output
    }

    fn crossterm_to_termimad(color: TermColor) -> termimad::crossterm::style::Color {
        match color {
            TermColor::Cyan => termimad::crossterm::style::Color::Cyan,
            TermColor::Green => termimad::crossterm::style::Color::Green,
            TermColor::Yellow => termimad::crossterm::style::Color::Yellow,
            TermColor::Magenta => termimad::crossterm::style::Color::Magenta,
            TermColor::Blue => termimad::crossterm::style::Color::Blue,
            TermColor::Rgb { r, g, b } => termimad::crossterm::style::Color::Rgb { r, g, b },
            _ => termimad::crossterm::style::Color::Cyan,
        }
    }
}

/// Build a terminal table of at most `max_rows` rows.
pub fn result_table(result: &QueryResult, max_rows: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(
        result
            .columns
            .iter()
            .map(|c| Cell::new(c).fg(Color::White)),
    );
    for row in result.rows.iter().take(max_rows) {
        table.add_row(row.iter().map(|v| Cell::new(cell_text(v))));
    }
    table
}

/// One-line description of a figure: trace type and title, if any.
pub fn chart_summary(figure: &Figure) -> Option<String> {
    let kind = figure.first_trace_type()?;
    let title = figure
        .layout
        .get("title")
        .and_then(|t| t.get("text").or(Some(t)))
        .and_then(|t| t.as_str());
    Some(match title {
        Some(title) => format!("{kind} \u{00b7} {title}"),
        None => kind.to_string(),
    })
}

/// Numbered follow-up suggestions. Typing the number in `chat` submits it.
pub fn print_followups(actions: &[FollowUpAction]) {
    if actions.is_empty() {
        return;
    }
    println!();
    println!("  {}", style("Follow-up questions:").bold());
    for (i, action) in actions.iter().enumerate() {
        println!("  {} {}", style(format!("[{}]", i + 1)).cyan(), action.label);
    }
}
