//! Pipeline orchestrator: one question in, one reply out.
//!
//! Sequence per message:
//! 1. generate SQL
//! 2. execute it
//! 3. generate the chart description and follow-up questions concurrently
//! 4. stage a user turn holding the question and the result table
//! 5. stream the summary over history + staged turn, forwarding each token
//! 6. append the user and assistant turns
//! 7. assemble the reply
//!
//! Any failure aborts the run before step 6, so a failed run never touches
//! the conversation. The events sender is consumed by `run` and dropped on
//! return, which closes the channel for the consumer.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{Instrument, debug, info, info_span};

use tickertalk_types::chat::Turn;
use tickertalk_types::config::PipelineConfig;
use tickertalk_types::error::PipelineError;
use tickertalk_types::llm::StreamEvent;
use tickertalk_types::reply::{FollowUpAction, PipelineEvent, Reply, StepKind, StepRecord};

use crate::assistant::DataAssistant;
use crate::chat::conversation::Conversation;

/// Hard ceiling on follow-up actions per reply, whatever the config says.
pub const MAX_FOLLOWUPS: usize = 3;

/// Limits applied by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_followups: usize,
    pub dark_mode: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_followups: config.max_followups.min(MAX_FOLLOWUPS),
            dark_mode: config.dark_mode,
        }
    }
}

pub struct Pipeline<A: DataAssistant> {
    assistant: Arc<A>,
    options: PipelineOptions,
}

impl<A: DataAssistant> Pipeline<A> {
    pub fn new(assistant: Arc<A>, options: PipelineOptions) -> Self {
        Self { assistant, options }
    }

    pub fn assistant(&self) -> &Arc<A> {
        &self.assistant
    }

    /// Run the full chain for `question` against `conversation`.
    ///
    /// Follow-up clicks call this with the action's value, exactly like
    /// typed input.
    pub async fn run(
        &self,
        question: &str,
        conversation: &mut Conversation,
        events: UnboundedSender<PipelineEvent>,
    ) -> Result<Reply, PipelineError> {
        let span = info_span!(
            "run_text_to_sql_engine",
            session_id = %conversation.info().id,
            history_turns = conversation.len(),
        );
        self.run_inner(question, conversation, events)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        question: &str,
        conversation: &mut Conversation,
        events: UnboundedSender<PipelineEvent>,
    ) -> Result<Reply, PipelineError> {
        // A closed receiver only means nobody is watching; the run continues.
        let emit = |event: PipelineEvent| {
            let _ = events.send(event);
        };
        let step = |name: StepKind, output: String| {
            emit(PipelineEvent::Step(StepRecord { name, output }));
        };

        let sql = self
            .assistant
            .generate_sql(question)
            .instrument(info_span!("write_sql"))
            .await?;
        step(StepKind::WriteSql, sql.clone());

        let result = self
            .assistant
            .run_sql(&sql)
            .instrument(info_span!("execute_sql"))
            .await?;
        let table = result.to_markdown(result.row_count());
        step(StepKind::ExecuteSql, table.clone());

        let (spec, followups) = tokio::try_join!(
            self.assistant
                .generate_chart_spec(question, &sql, &result)
                .instrument(info_span!("plot")),
            self.assistant
                .generate_followup_questions(question, &sql, &result)
                .instrument(info_span!("follow_up")),
        )?;

        let chart = self
            .assistant
            .get_figure(spec.as_ref(), &result, self.options.dark_mode);
        let plot_output = match &spec {
            Some(spec) => serde_json::to_string_pretty(spec),
            None => serde_json::to_string_pretty(&chart),
        }
        .map_err(|e| PipelineError::Rendering(format!("failed to serialize chart: {e}")))?;
        step(StepKind::Plot, plot_output);

        let followups: Vec<String> = followups
            .into_iter()
            .take(self.options.max_followups)
            .collect();
        step(StepKind::FollowUp, followups.join(", "));

        let pending = Turn::user(format!("{question}\n\nData:\n\n{table}"));
        let mut stream = conversation.stream_reply(&pending);
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text: delta } if !delta.is_empty() => {
                    text.push_str(&delta);
                    emit(PipelineEvent::Token { text: delta });
                }
                StreamEvent::Done => break,
                _ => {}
            }
        }
        drop(stream);

        conversation.append(pending);
        conversation.append(Turn::assistant(text.clone()));
        debug!(turns = conversation.len(), "Conversation updated");

        info!(
            rows = result.row_count(),
            followups = followups.len(),
            summary_chars = text.len(),
            "Pipeline run complete"
        );

        Ok(Reply {
            text,
            sql,
            chart,
            table: result,
            actions: followups.into_iter().map(FollowUpAction::question).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tokio::sync::mpsc;

    use tickertalk_types::chart::{ChartKind, ChartSpec, Figure};
    use tickertalk_types::llm::{LlmError, MessageRole};
    use tickertalk_types::query::QueryResult;

    use super::*;
    use crate::chart;
    use crate::llm::CompletionSettings;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::llm::fake::ScriptedProvider;

    #[derive(Clone, Copy, PartialEq)]
    enum Stage {
        Sql,
        Execute,
        Chart,
        FollowUp,
    }

    struct FakeAssistant {
        fail_at: Option<Stage>,
        result: QueryResult,
        followups: Vec<String>,
        chart_spec: Option<ChartSpec>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeAssistant {
        fn new() -> Self {
            Self {
                fail_at: None,
                result: QueryResult::new(vec!["max_high".into()], vec![vec![json!(555.77)]]),
                followups: vec![
                    "When did Illumina hit its lowest price?".into(),
                    "What was Illumina's average close in 2021?".into(),
                ],
                chart_spec: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_at(mut self, stage: Stage) -> Self {
            self.fail_at = Some(stage);
            self
        }

        fn with_followups(mut self, followups: &[&str]) -> Self {
            self.followups = followups.iter().map(|s| s.to_string()).collect();
            self
        }

        fn fails(&self, stage: Stage) -> bool {
            self.fail_at == Some(stage)
        }
    }

    impl DataAssistant for FakeAssistant {
        async fn generate_sql(&self, question: &str) -> Result<String, PipelineError> {
            self.calls.lock().unwrap().push(format!("sql:{question}"));
            if self.fails(Stage::Sql) {
                return Err(PipelineError::Translation("no context".into()));
            }
            Ok("SELECT MAX(high) AS max_high FROM stock_prices WHERE ticker = 'ILMN';".into())
        }

        async fn run_sql(&self, sql: &str) -> Result<QueryResult, PipelineError> {
            self.calls.lock().unwrap().push(format!("run:{sql}"));
            if self.fails(Stage::Execute) {
                return Err(PipelineError::Execution("no such column: hgh".into()));
            }
            Ok(self.result.clone())
        }

        async fn generate_chart_spec(
            &self,
            _question: &str,
            _sql: &str,
            _result: &QueryResult,
        ) -> Result<Option<ChartSpec>, PipelineError> {
            if self.fails(Stage::Chart) {
                return Err(PipelineError::Rendering("chart failed".into()));
            }
            Ok(self.chart_spec.clone())
        }

        fn get_figure(&self, spec: Option<&ChartSpec>, result: &QueryResult, dark_mode: bool) -> Figure {
            chart::build_figure(spec, result, dark_mode)
        }

        async fn generate_followup_questions(
            &self,
            _question: &str,
            _sql: &str,
            _result: &QueryResult,
        ) -> Result<Vec<String>, PipelineError> {
            if self.fails(Stage::FollowUp) {
                return Err(PipelineError::Rendering("follow-ups failed".into()));
            }
            Ok(self.followups.clone())
        }
    }

    fn conversation(provider: ScriptedProvider) -> Conversation {
        Conversation::new(
            Arc::new(BoxLlmProvider::new(provider)),
            CompletionSettings::default(),
        )
    }

    fn pipeline(assistant: FakeAssistant) -> Pipeline<FakeAssistant> {
        Pipeline::new(Arc::new(assistant), PipelineOptions::default())
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    fn tokens(events: &[PipelineEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Token { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_illumina() {
        let pipeline = pipeline(FakeAssistant::new());
        let mut conv = conversation(
            ScriptedProvider::new().with_stream_text(&["Illumina's highest ", "price was ", "$555.77."]),
        );
        let (tx, rx) = mpsc::unbounded_channel();

        let reply = pipeline
            .run("What is the highest ever stock price for Illumina?", &mut conv, tx)
            .await
            .unwrap();
        let events = drain(rx).await;

        assert_eq!(reply.text, "Illumina's highest price was $555.77.");
        assert!(reply.sql.contains("'ILMN'"));
        assert_eq!(reply.table.row_count(), 1);
        assert_eq!(reply.chart.first_trace_type(), Some("indicator"));
        assert!(!reply.actions.is_empty() && reply.actions.len() <= 3);
        assert_eq!(reply.actions[0].name, "question");

        let steps: Vec<StepKind> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Step(s) => Some(s.name),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                StepKind::WriteSql,
                StepKind::ExecuteSql,
                StepKind::Plot,
                StepKind::FollowUp
            ]
        );
        assert!(matches!(events.last(), Some(PipelineEvent::Token { .. })));
    }

    #[tokio::test]
    async fn test_history_alternates_over_n_runs() {
        let pipeline = pipeline(FakeAssistant::new());
        let mut provider = ScriptedProvider::new();
        for i in 0..4 {
            let answer = format!("answer {i}");
            provider = provider.with_stream_text(&[answer.as_str()]);
        }
        let mut conv = conversation(provider);

        for i in 0..4 {
            let (tx, _rx) = mpsc::unbounded_channel();
            pipeline
                .run(&format!("question {i}"), &mut conv, tx)
                .await
                .unwrap();
        }

        let history = conv.history();
        assert_eq!(history.len(), 8);
        for (i, pair) in history.chunks(2).enumerate() {
            assert_eq!(pair[0].role, MessageRole::User);
            assert!(pair[0].content.starts_with(&format!("question {i}\n\nData:\n\n")));
            assert!(pair[0].content.contains("| max_high |"));
            assert_eq!(pair[1].role, MessageRole::Assistant);
            assert_eq!(pair[1].content, format!("answer {i}"));
        }
    }

    #[tokio::test]
    async fn test_followups_truncated_in_order() {
        let assistant = FakeAssistant::new().with_followups(&["a?", "b?", "c?", "d?", "e?"]);
        let pipeline = pipeline(assistant);
        let mut conv = conversation(ScriptedProvider::new().with_stream_text(&["ok"]));
        let (tx, rx) = mpsc::unbounded_channel();

        let reply = pipeline.run("q", &mut conv, tx).await.unwrap();
        let values: Vec<&str> = reply.actions.iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, vec!["a?", "b?", "c?"]);

        let events = drain(rx).await;
        assert!(events.contains(&PipelineEvent::Step(StepRecord {
            name: StepKind::FollowUp,
            output: "a?, b?, c?".into(),
        })));
    }

    #[test]
    fn test_configured_followups_capped_at_three() {
        let config = PipelineConfig {
            max_followups: 10,
            ..PipelineConfig::default()
        };
        assert_eq!(PipelineOptions::from(&config).max_followups, MAX_FOLLOWUPS);

        let config = PipelineConfig {
            max_followups: 2,
            ..PipelineConfig::default()
        };
        assert_eq!(PipelineOptions::from(&config).max_followups, 2);
    }

    #[tokio::test]
    async fn test_raised_followup_limit_still_yields_three() {
        let assistant = FakeAssistant::new().with_followups(&["a?", "b?", "c?", "d?", "e?"]);
        let options = PipelineOptions::from(&PipelineConfig {
            max_followups: 10,
            ..PipelineConfig::default()
        });
        let pipeline = Pipeline::new(Arc::new(assistant), options);
        let mut conv = conversation(ScriptedProvider::new().with_stream_text(&["ok"]));
        let (tx, _rx) = mpsc::unbounded_channel();

        let reply = pipeline.run("q", &mut conv, tx).await.unwrap();
        assert_eq!(reply.actions.len(), 3);
    }

    #[tokio::test]
    async fn test_execution_failure_leaves_history_untouched() {
        let pipeline = pipeline(FakeAssistant::new().failing_at(Stage::Execute));
        let mut conv = conversation(ScriptedProvider::new().with_stream_text(&["unused"]));
        conv.append(Turn::user("earlier"));
        conv.append(Turn::assistant("earlier answer"));
        let (tx, rx) = mpsc::unbounded_channel();

        let err = pipeline.run("q", &mut conv, tx).await.unwrap_err();
        assert_eq!(err.code(), "EXECUTION_ERROR");
        assert_eq!(conv.len(), 2);

        let events = drain(rx).await;
        assert_eq!(events.len(), 1);
        assert!(tokens(&events).is_empty());
    }

    #[tokio::test]
    async fn test_each_stage_failure_has_its_category() {
        for (stage, code) in [
            (Stage::Sql, "TRANSLATION_ERROR"),
            (Stage::Execute, "EXECUTION_ERROR"),
            (Stage::Chart, "RENDERING_ERROR"),
            (Stage::FollowUp, "RENDERING_ERROR"),
        ] {
            let pipeline = pipeline(FakeAssistant::new().failing_at(stage));
            let mut conv = conversation(ScriptedProvider::new().with_stream_text(&["x"]));
            let (tx, _rx) = mpsc::unbounded_channel();
            let err = pipeline.run("q", &mut conv, tx).await.unwrap_err();
            assert_eq!(err.code(), code);
            assert!(conv.is_empty());
        }
    }

    #[tokio::test]
    async fn test_stream_failure_is_completion_error() {
        let provider = ScriptedProvider::new().with_stream(vec![
            Ok(StreamEvent::Connected),
            Ok(StreamEvent::TextDelta {
                text: "partial".into(),
            }),
            Err(LlmError::Timeout),
        ]);
        let pipeline = pipeline(FakeAssistant::new());
        let mut conv = conversation(provider);
        let (tx, rx) = mpsc::unbounded_channel();

        let err = pipeline.run("q", &mut conv, tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::Completion(LlmError::Timeout)));
        assert!(conv.is_empty());
        assert_eq!(tokens(&drain(rx).await), "partial");
    }

    #[tokio::test]
    async fn test_streamed_tokens_equal_assistant_turn() {
        let pipeline = pipeline(FakeAssistant::new());
        let mut conv = conversation(ScriptedProvider::new().with_stream(vec![
            Ok(StreamEvent::Connected),
            Ok(StreamEvent::TextDelta { text: "The ".into() }),
            Ok(StreamEvent::TextDelta { text: String::new() }),
            Ok(StreamEvent::TextDelta { text: "peak ".into() }),
            Ok(StreamEvent::TextDelta { text: "was high.".into() }),
            Ok(StreamEvent::Done),
        ]));
        let (tx, rx) = mpsc::unbounded_channel();

        let reply = pipeline.run("q", &mut conv, tx).await.unwrap();
        let events = drain(rx).await;

        let streamed = tokens(&events);
        assert_eq!(streamed, conv.history()[1].content);
        assert_eq!(streamed, reply.text);
        let token_events = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Token { .. }))
            .count();
        assert_eq!(token_events, 3);
    }

    #[tokio::test]
    async fn test_followup_click_matches_typed_input() {
        let pipeline = pipeline(FakeAssistant::new());

        let mut clicked = conversation(
            ScriptedProvider::new()
                .with_stream_text(&["first"])
                .with_stream_text(&["second"]),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let first = pipeline.run("q", &mut clicked, tx).await.unwrap();
        let payload = first.actions[0].value.clone();
        let (tx, _rx) = mpsc::unbounded_channel();
        let via_click = pipeline.run(&payload, &mut clicked, tx).await.unwrap();

        let mut typed = conversation(
            ScriptedProvider::new()
                .with_stream_text(&["first"])
                .with_stream_text(&["second"]),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        pipeline.run("q", &mut typed, tx).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let via_typing = pipeline
            .run("When did Illumina hit its lowest price?", &mut typed, tx)
            .await
            .unwrap();

        assert_eq!(via_click, via_typing);
        assert_eq!(clicked.history(), typed.history());
        let calls = pipeline.assistant().calls.lock().unwrap();
        let payload_runs = calls.iter().filter(|c| c.starts_with("sql:When")).count();
        assert_eq!(payload_runs, 2);
    }

    #[tokio::test]
    async fn test_channel_closes_after_run() {
        let pipeline = pipeline(FakeAssistant::new());
        let mut conv = conversation(ScriptedProvider::new().with_stream_text(&["x"]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        pipeline.run("q", &mut conv, tx).await.unwrap();
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert!(received >= 5);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_valid_chart_spec_drives_figure() {
        let mut assistant = FakeAssistant::new();
        assistant.result = QueryResult::new(
            vec!["date".into(), "close".into()],
            vec![
                vec![json!("2020-01-02"), json!(59.98)],
                vec![json!("2024-01-02"), json!(481.68)],
            ],
        );
        assistant.chart_spec = Some(ChartSpec {
            kind: ChartKind::Line,
            x: Some("date".into()),
            y: vec!["close".into()],
            names: None,
            values: None,
            title: Some("NVIDIA 2020-2024".into()),
        });
        let pipeline = pipeline(assistant);
        let mut conv = conversation(ScriptedProvider::new().with_stream_text(&["x"]));
        let (tx, _rx) = mpsc::unbounded_channel();

        let reply = pipeline
            .run("Give me an overview of NVIDIA's share price from 2020-2024", &mut conv, tx)
            .await
            .unwrap();
        assert_eq!(reply.chart.data[0]["mode"], "lines");
        assert_eq!(reply.chart.layout["title"]["text"], "NVIDIA 2020-2024");
        assert_eq!(reply.chart.layout["template"], "plotly_dark");
    }
}
