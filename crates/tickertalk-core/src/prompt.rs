//! Prompt construction and response parsing for the SQL translator.
//!
//! Three prompts are built here: SQL generation (retrieval-augmented),
//! chart description, and follow-up questions. The matching parsers turn raw
//! model output back into SQL text and question lists.

use std::sync::LazyLock;

use regex::Regex;

use tickertalk_types::chart::ChartSpec;
use tickertalk_types::knowledge::RetrievedContext;
use tickertalk_types::llm::Message;
use tickertalk_types::query::QueryResult;

use crate::llm::approx_tokens;

/// Default approximate token ceiling for the SQL-generation system prompt.
pub const DEFAULT_MAX_PROMPT_TOKENS: usize = 14_000;

/// Rows of the result shown to the model in the follow-up prompt.
const FOLLOWUP_PREVIEW_ROWS: usize = 25;

/// Build the SQL-generation message log.
///
/// The system message carries the DDL and documentation that fit within
/// `max_tokens`, then the response guidelines. Each retrieved example is
/// replayed as a user/assistant exchange before the actual question.
pub fn sql_prompt(
    ctx: &RetrievedContext,
    question: &str,
    dialect: &str,
    max_tokens: usize,
) -> Vec<Message> {
    let mut system = format!(
        "You are a {dialect} expert. Please help to generate a SQL query to answer the question. \
         Your response should ONLY be based on the given context and follow the response \
         guidelines and format instructions. "
    );

    if !ctx.ddl.is_empty() {
        system.push_str("\n===Tables \n");
        for ddl in &ctx.ddl {
            if approx_tokens(&system) + approx_tokens(ddl) < max_tokens {
                system.push_str(ddl);
                system.push_str("\n\n");
            }
        }
    }

    if !ctx.documentation.is_empty() {
        system.push_str("\n===Additional Context \n\n");
        for doc in &ctx.documentation {
            if approx_tokens(&system) + approx_tokens(doc) < max_tokens {
                system.push_str(doc);
                system.push_str("\n\n");
            }
        }
    }

    system.push_str("===Response Guidelines \n");
    system.push_str(
        "1. If the provided context is sufficient, please generate a valid SQL query without \
         any explanations for the question. \n",
    );
    system.push_str(
        "2. If the provided context is almost sufficient but requires knowledge of a specific \
         string in a particular column, please generate an intermediate SQL query to find the \
         distinct strings in that column. Prepend the query with a comment saying \
         intermediate_sql \n",
    );
    system.push_str(
        "3. If the provided context is insufficient, please explain why it can't be generated. \n",
    );
    system.push_str("4. Please use the most relevant table(s). \n");
    system.push_str(
        "5. If the question has been asked and answered before, please repeat the answer \
         exactly as it was given before. \n",
    );
    system.push_str(&format!(
        "6. Ensure that the output SQL is {dialect}-compliant and executable, and free of \
         syntax errors. \n"
    ));

    let mut messages = Vec::with_capacity(2 + ctx.question_sql.len() * 2);
    messages.push(Message::system(system));
    for example in &ctx.question_sql {
        messages.push(Message::user(&example.question));
        messages.push(Message::assistant(&example.sql));
    }
    messages.push(Message::user(question));
    messages
}

static WITH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\bWITH\b .*?;").expect("Invalid WITH regex"));
static SELECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\bSELECT\b .*?;").expect("Invalid SELECT regex"));
static SQL_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```sql\s*\n(.*?)```").expect("Invalid sql fence regex"));
static ANY_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*\n?(.*?)```").expect("Invalid fence regex")
});
static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+\s*[.)]|[-*\u{2022}])\s*").expect("Invalid list marker regex")
});

/// Pull the SQL statement out of a model response.
///
/// Tries, in order: the last ```` ```sql ```` block, the last uppercase
/// `WITH ... ;` statement, the last uppercase `SELECT ... ;` statement, the
/// last fenced block of any language, and finally the trimmed response.
/// Keywords are case-sensitive so prose such as "start with the table" is
/// never taken for SQL.
pub fn extract_sql(response: &str) -> String {
    if let Some(body) = last_fence_body(&SQL_FENCE_RE, response) {
        return body;
    }
    for statement in [&*WITH_RE, &*SELECT_RE] {
        if let Some(m) = statement.find_iter(response).last() {
            return m.as_str().trim().to_string();
        }
    }
    last_fence_body(&ANY_FENCE_RE, response).unwrap_or_else(|| response.trim().to_string())
}

fn last_fence_body(fence: &Regex, response: &str) -> Option<String> {
    fence
        .captures_iter(response)
        .last()
        .and_then(|c| c.get(1))
        .map(|body| body.as_str().trim().to_string())
}

/// Build the chart-description message log.
pub fn chart_prompt(question: &str, sql: &str, result: &QueryResult) -> Vec<Message> {
    let system = format!(
        "The following is a table that contains the results of the query that answers the \
         question the user asked: '{question}'\n\n\
         The table was produced using this query: {sql}\n\n\
         The following is information about the columns of the resulting table: \n{}",
        result.dtypes()
    );

    let schema = schemars::schema_for!(ChartSpec);
    let mut user = format!(
        "Describe a chart of the results in this table. Respond with a single JSON object \
         matching this JSON schema:\n{:#}\n\n\
         Every column you reference must be one of: {}. ",
        schema.as_value(),
        result.columns.join(", ")
    );
    if result.is_single_value() {
        user.push_str("There is only one value in the table, so use an indicator. ");
    }
    user.push_str("Respond with only the JSON object. Do not answer with any explanations -- just the JSON.");

    vec![Message::system(system), Message::user(user)]
}

/// Build the follow-up-question message log.
pub fn followup_prompt(question: &str, sql: &str, result: &QueryResult, n: usize) -> Vec<Message> {
    let system = format!(
        "You are a helpful data assistant. The user asked the question: '{question}'\n\n\
         The SQL query for this question was: {sql}\n\n\
         The following is a table with the results of the query: \n{}\n\n",
        result.to_markdown(FOLLOWUP_PREVIEW_ROWS)
    );
    let user = format!(
        "Generate a list of {n} followup questions that the user might ask about this data. \
         Respond with a list of questions, one per line. Do not answer with any explanations \
         -- just the questions. Remember that there should be an unambiguous SQL query that \
         can be generated from the question. Prefer questions that are answerable outside of \
         the context of this conversation. Prefer questions that are slight modifications of \
         the SQL query that was generated that allow digging deeper into the data. Each \
         question will be turned into a button that the user can click to generate a new SQL \
         query so don't use 'example' type questions. Each question must have a one-to-one \
         correspondence with an instantiated SQL query."
    );
    vec![Message::system(system), Message::user(user)]
}

/// Split a follow-up response into questions, one per non-blank line, with
/// list markers (`1.`, `2)`, `-`, `*`) removed. Order is preserved.
pub fn parse_followups(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| LIST_MARKER_RE.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tickertalk_types::knowledge::QuestionSql;
    use tickertalk_types::llm::MessageRole;

    use super::*;

    fn context() -> RetrievedContext {
        RetrievedContext {
            question_sql: vec![QuestionSql {
                question: "What was Apple's closing price on 2024-01-02?".into(),
                sql: "SELECT close FROM stock_prices WHERE ticker = 'AAPL' AND date = '2024-01-02';"
                    .into(),
            }],
            ddl: vec!["CREATE TABLE stock_prices (ticker TEXT, date TEXT, close REAL)".into()],
            documentation: vec!["Prices are quoted in USD.".into()],
        }
    }

    #[test]
    fn test_sql_prompt_layout() {
        let messages = sql_prompt(&context(), "Highest Illumina price?", "SQLite", 14_000);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.starts_with("You are a SQLite expert."));
        assert!(messages[0].content.contains("===Tables \nCREATE TABLE stock_prices"));
        assert!(
            messages[0]
                .content
                .contains("===Additional Context \n\nPrices are quoted in USD.")
        );
        assert!(messages[0].content.contains("6. Ensure that the output SQL is SQLite-compliant"));
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[3].content, "Highest Illumina price?");
    }

    #[test]
    fn test_sql_prompt_skips_sections_without_context() {
        let messages = sql_prompt(&RetrievedContext::default(), "q", "SQLite", 14_000);
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].content.contains("===Tables"));
        assert!(!messages[0].content.contains("===Additional Context"));
    }

    #[test]
    fn test_sql_prompt_respects_token_budget() {
        let mut ctx = context();
        ctx.ddl = vec!["x".repeat(400), "y".repeat(40)];
        let messages = sql_prompt(&ctx, "q", "SQLite", 100);
        assert!(!messages[0].content.contains(&"x".repeat(400)));
        assert!(messages[0].content.contains(&"y".repeat(40)));
    }

    #[test]
    fn test_extract_sql_prefers_with() {
        let response = "Here you go:\nWITH t AS (SELECT 1) SELECT * FROM t;\nThanks";
        assert_eq!(extract_sql(response), "WITH t AS (SELECT 1) SELECT * FROM t;");
    }

    #[test]
    fn test_extract_sql_takes_last_select() {
        let response = "-- intermediate_sql\nSELECT DISTINCT ticker FROM stock_prices;\n\
                        Then: SELECT MAX(high) FROM stock_prices WHERE ticker = 'ILMN';";
        assert_eq!(
            extract_sql(response),
            "SELECT MAX(high) FROM stock_prices WHERE ticker = 'ILMN';"
        );
    }

    #[test]
    fn test_extract_sql_from_fence_without_semicolon() {
        let response = "```sql\nSELECT MAX(high) FROM stock_prices\n```";
        assert_eq!(extract_sql(response), "SELECT MAX(high) FROM stock_prices");
    }

    #[test]
    fn test_extract_sql_ignores_prose_with_keyword() {
        let response = "I'll start with the stock_prices table:\n```sql\n\
                        SELECT MAX(high) FROM stock_prices WHERE ticker = 'ILMN';\n```";
        assert_eq!(
            extract_sql(response),
            "SELECT MAX(high) FROM stock_prices WHERE ticker = 'ILMN';"
        );
    }

    #[test]
    fn test_extract_sql_ignores_prose_select_keyword() {
        let response = "Please select from the table below.\n\nSELECT MAX(high) FROM stock_prices;";
        assert_eq!(extract_sql(response), "SELECT MAX(high) FROM stock_prices;");
    }

    #[test]
    fn test_extract_sql_prefers_sql_fence_over_bare_statement() {
        let response = "SELECT 1;\n```sql\nSELECT ticker FROM stock_prices;\n```";
        assert_eq!(extract_sql(response), "SELECT ticker FROM stock_prices;");
    }

    #[test]
    fn test_extract_sql_from_generic_fence() {
        let response = "```\nPRAGMA table_info(stock_prices)\n```";
        assert_eq!(extract_sql(response), "PRAGMA table_info(stock_prices)");
    }

    #[test]
    fn test_extract_sql_falls_back_to_raw() {
        assert_eq!(
            extract_sql("  The context is insufficient.  "),
            "The context is insufficient."
        );
    }

    #[test]
    fn test_chart_prompt_mentions_schema_and_columns() {
        let result = QueryResult::new(
            vec!["date".into(), "close".into()],
            vec![vec![json!("2024-01-02"), json!(481.68)]],
        );
        let messages = chart_prompt("NVIDIA overview", "SELECT date, close ...", &result);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("date: categorical\nclose: numeric"));
        assert!(messages[1].content.contains("\"kind\""));
        assert!(messages[1].content.contains("one of: date, close"));
        assert!(!messages[1].content.contains("use an indicator"));
    }

    #[test]
    fn test_chart_prompt_single_value_hint() {
        let result = QueryResult::new(vec!["max_high".into()], vec![vec![json!(555.77)]]);
        let messages = chart_prompt("q", "SELECT MAX(high) ...", &result);
        assert!(messages[1].content.contains("use an indicator"));
    }

    #[test]
    fn test_followup_prompt_layout() {
        let result = QueryResult::new(vec!["max_high".into()], vec![vec![json!(555.77)]]);
        let messages = followup_prompt("Highest Illumina price?", "SELECT 1;", &result, 5);
        assert!(messages[0].content.contains("The user asked the question: 'Highest Illumina price?'"));
        assert!(messages[0].content.contains("| max_high |"));
        assert!(messages[1].content.starts_with("Generate a list of 5 followup questions"));
    }

    #[test]
    fn test_parse_followups_strips_markers() {
        let response = "1. What was the lowest price?\n2) When did it peak?\n\n- How about 2023?\n* Volume?\n";
        assert_eq!(
            parse_followups(response),
            vec![
                "What was the lowest price?",
                "When did it peak?",
                "How about 2023?",
                "Volume?"
            ]
        );
    }

    #[test]
    fn test_parse_followups_keeps_order_and_plain_lines() {
        let response = "Which day had the highest volume?\nWhat is the average close in 2021?";
        let parsed = parse_followups(response);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], "Which day had the highest volume?");
    }
}
