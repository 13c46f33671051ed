//! Data assistant: the SQL translator, executor, chart and follow-up
//! generators behind one interface.
//!
//! `Analyst` composes three independent capabilities (retrieval through the
//! knowledge base, chat completion through the provider, execution through
//! the SQL executor) and delegates to each. The pipeline only sees the
//! `DataAssistant` trait.

use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};

use tickertalk_types::chart::{ChartSpec, Figure};
use tickertalk_types::error::{PipelineError, RepositoryError};
use tickertalk_types::knowledge::RetrievedContext;
use tickertalk_types::llm::{LlmError, Message};
use tickertalk_types::query::QueryResult;

use crate::chart;
use crate::knowledge::base::KnowledgeBase;
use crate::knowledge::store::KnowledgeStore;
use crate::llm::CompletionSettings;
use crate::llm::box_provider::BoxLlmProvider;
use crate::prompt;
use crate::sql::SqlExecutor;

/// Default number of follow-up questions requested from the model.
pub const DEFAULT_FOLLOWUP_REQUESTS: usize = 5;

/// Operations the pipeline needs from the translator side.
///
/// Each failure maps to its own [`PipelineError`] category: SQL generation
/// to `Translation`, execution to `Execution`, chart and follow-up
/// generation to `Rendering`.
pub trait DataAssistant: Send + Sync {
    fn generate_sql(
        &self,
        question: &str,
    ) -> impl std::future::Future<Output = Result<String, PipelineError>> + Send;

    fn run_sql(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<QueryResult, PipelineError>> + Send;

    /// Ask for a chart description. `Ok(None)` means the model answered but
    /// the answer was unusable; the figure then falls back to the heuristic.
    fn generate_chart_spec(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> impl std::future::Future<Output = Result<Option<ChartSpec>, PipelineError>> + Send;

    fn get_figure(&self, spec: Option<&ChartSpec>, result: &QueryResult, dark_mode: bool) -> Figure;

    fn generate_followup_questions(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> impl std::future::Future<Output = Result<Vec<String>, PipelineError>> + Send;
}

pub struct Analyst<S: KnowledgeStore, X: SqlExecutor> {
    knowledge: Arc<KnowledgeBase<S>>,
    provider: Arc<BoxLlmProvider>,
    executor: X,
    settings: CompletionSettings,
    max_prompt_tokens: usize,
    followup_requests: usize,
}

impl<S: KnowledgeStore, X: SqlExecutor> Analyst<S, X> {
    pub fn new(
        knowledge: Arc<KnowledgeBase<S>>,
        provider: Arc<BoxLlmProvider>,
        executor: X,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            knowledge,
            provider,
            executor,
            settings,
            max_prompt_tokens: prompt::DEFAULT_MAX_PROMPT_TOKENS,
            followup_requests: DEFAULT_FOLLOWUP_REQUESTS,
        }
    }

    pub fn with_max_prompt_tokens(mut self, tokens: usize) -> Self {
        self.max_prompt_tokens = tokens;
        self
    }

    pub fn with_followup_requests(mut self, n: usize) -> Self {
        self.followup_requests = n;
        self
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase<S>> {
        &self.knowledge
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Retrieval capability: nearest examples, DDL and documentation.
    pub async fn retrieve_examples(&self, question: &str) -> Result<RetrievedContext, RepositoryError> {
        self.knowledge.retrieve_examples(question).await
    }

    /// Completion capability: one non-streaming call, returning the text.
    pub async fn generate_completion(
        &self,
        operation: &'static str,
        messages: Vec<Message>,
    ) -> Result<String, LlmError> {
        let request = self.settings.request(messages, false);
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.operation.name = operation,
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
        );
        let response = self.provider.complete(&request).instrument(span).await?;
        debug!(
            operation,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion finished"
        );
        Ok(response.content)
    }
}

impl<S: KnowledgeStore, X: SqlExecutor> DataAssistant for Analyst<S, X> {
    async fn generate_sql(&self, question: &str) -> Result<String, PipelineError> {
        let ctx = self
            .retrieve_examples(question)
            .await
            .map_err(|e| PipelineError::Translation(format!("retrieval failed: {e}")))?;

        let messages = prompt::sql_prompt(
            &ctx,
            question,
            self.executor.dialect(),
            self.max_prompt_tokens,
        );
        let response = self
            .generate_completion("generate_sql", messages)
            .await
            .map_err(|e| PipelineError::Translation(e.to_string()))?;

        let sql = prompt::extract_sql(&response);
        if sql.is_empty() {
            return Err(PipelineError::Translation(
                "model returned an empty response".to_string(),
            ));
        }
        info!(sql = %sql, "Generated SQL");
        Ok(sql)
    }

    async fn run_sql(&self, sql: &str) -> Result<QueryResult, PipelineError> {
        let result = self.executor.run_sql(sql).await?;
        debug!(
            rows = result.row_count(),
            columns = result.columns.len(),
            "Executed SQL"
        );
        Ok(result)
    }

    async fn generate_chart_spec(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> Result<Option<ChartSpec>, PipelineError> {
        let messages = prompt::chart_prompt(question, sql, result);
        let response = self
            .generate_completion("generate_chart", messages)
            .await
            .map_err(|e| PipelineError::Rendering(format!("chart generation failed: {e}")))?;

        let spec = chart::parse_chart_spec(&response, result);
        if spec.is_none() {
            warn!("Unusable chart description, falling back to heuristic chart");
        }
        Ok(spec)
    }

    fn get_figure(&self, spec: Option<&ChartSpec>, result: &QueryResult, dark_mode: bool) -> Figure {
        chart::build_figure(spec, result, dark_mode)
    }

    async fn generate_followup_questions(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> Result<Vec<String>, PipelineError> {
        let messages = prompt::followup_prompt(question, sql, result, self.followup_requests);
        let response = self
            .generate_completion("generate_followups", messages)
            .await
            .map_err(|e| PipelineError::Rendering(format!("follow-up generation failed: {e}")))?;
        Ok(prompt::parse_followups(&response))
    }
}
