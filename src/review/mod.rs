pub mod summarizer;
pub mod synthesizer;

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::instrumentation::{PaperLog, ReviewLog, ReviewLogger};
use crate::llm::{ChatCompletion, LlmClient, RetryPolicy};
use crate::papers::{ArxivSource, CachedSource, PaperSource, SourceKind, TemplateSource};

use summarizer::Summarizer;
use synthesizer::Synthesizer;

/// Marks a generated value that stands in for a handled failure.
pub const ERROR_GLYPH: &str = "⚠️";

/// Output of one model call: the model's text, or the reason it could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Text(String),
    Failed(String),
}

impl Generated {
    pub fn is_failed(&self) -> bool {
        matches!(self, Generated::Failed(_))
    }

    /// Plain text for display and for downstream prompts.
    pub fn render(&self) -> String {
        match self {
            Generated::Text(text) => text.clone(),
            Generated::Failed(reason) => format!("{} {}", ERROR_GLYPH, reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Idle,
    FetchingPapers,
    Summarizing { index: usize, total: usize },
    Synthesizing,
    Done,
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Idle => write!(f, "idle"),
            ReviewState::FetchingPapers => write!(f, "fetching papers"),
            ReviewState::Summarizing { index, total } => {
                write!(f, "summarizing paper {}/{}", index, total)
            }
            ReviewState::Synthesizing => write!(f, "synthesizing review"),
            ReviewState::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub topic: String,
    pub max_results: usize,
    pub summarizer_model: String,
    pub synthesizer_model: String,
}

#[derive(Debug)]
pub enum ReviewOutcome {
    NoPapers,
    SourceFailed { reason: String },
    Completed(Box<ReviewLog>),
}

#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    pub retry: RetryPolicy,
    /// Pause between consecutive summarizer calls.
    pub summary_delay: Duration,
    /// Drop failed summaries from the synthesis prompt instead of passing them through.
    pub exclude_failed_summaries: bool,
}

type StateObserver = Box<dyn Fn(&ReviewState) + Send + Sync>;

pub struct ReviewAgent {
    source: Box<dyn PaperSource>,
    summarizer: Summarizer,
    synthesizer: Synthesizer,
    options: ReviewOptions,
    logger: Option<ReviewLogger>,
    observer: Option<StateObserver>,
}

impl ReviewAgent {
    pub fn new(
        source: Box<dyn PaperSource>,
        llm: Arc<dyn ChatCompletion>,
        options: ReviewOptions,
    ) -> Self {
        Self {
            source,
            summarizer: Summarizer::new(llm.clone(), options.retry.clone()),
            synthesizer: Synthesizer::new(llm, options.retry.clone()),
            options,
            logger: None,
            observer: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let llm: Arc<dyn ChatCompletion> =
            Arc::new(LlmClient::new(&config.llm_api_key, &config.llm_base_url));

        let source: Box<dyn PaperSource> = match config.paper_source {
            SourceKind::Template => Box::new(CachedSource::new(
                TemplateSource,
                config.cache_capacity,
            )),
            SourceKind::Arxiv => Box::new(CachedSource::new(
                ArxivSource::new(config.arxiv_sort)?,
                config.cache_capacity,
            )),
        };

        let options = ReviewOptions {
            retry: config.retry.clone(),
            summary_delay: config.summary_delay,
            exclude_failed_summaries: config.exclude_failed_summaries,
        };

        let logger = ReviewLogger::new(&config.log_dir)?;

        Ok(Self::new(source, llm, options).with_logger(logger))
    }

    pub fn with_logger(mut self, logger: ReviewLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Called on every state transition, after it is logged.
    pub fn with_state_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ReviewState) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    fn enter(&self, state: &ReviewState) {
        info!(%state, "review state");
        if let Some(observer) = &self.observer {
            observer(state);
        }
    }

    pub async fn review(&self, request: &ReviewRequest) -> Result<ReviewOutcome> {
        if request.topic.trim().is_empty() {
            anyhow::bail!("Topic must not be empty");
        }
        // Passed on verbatim; only the emptiness check ignores surrounding whitespace.
        let topic = request.topic.as_str();

        let run_start = Instant::now();

        // Step 1: Fetch papers
        self.enter(&ReviewState::FetchingPapers);
        let fetch_start = Instant::now();
        let papers = match self.source.fetch(topic, request.max_results).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!("Paper source failed for {:?}: {}", topic, e);
                self.enter(&ReviewState::Idle);
                return Ok(ReviewOutcome::SourceFailed {
                    reason: e.to_string(),
                });
            }
        };
        let fetch_latency = fetch_start.elapsed().as_millis() as u64;

        if papers.is_empty() {
            warn!("No papers found for {:?}", topic);
            self.enter(&ReviewState::Idle);
            return Ok(ReviewOutcome::NoPapers);
        }

        // Step 2: Summarize each paper, one at a time, in source order
        let total = papers.len();
        let mut paper_logs: Vec<PaperLog> = Vec::with_capacity(total);

        for (i, paper) in papers.iter().enumerate() {
            if i > 0 && !self.options.summary_delay.is_zero() {
                tokio::time::sleep(self.options.summary_delay).await;
            }

            self.enter(&ReviewState::Summarizing {
                index: i + 1,
                total,
            });

            let summary_start = Instant::now();
            let (summary, response) = self
                .summarizer
                .summarize(paper, &request.summarizer_model)
                .await;
            let latency = summary_start.elapsed().as_millis() as u64;

            if summary.is_failed() {
                warn!("Summary {}/{} failed: {}", i + 1, total, summary.render());
            }

            paper_logs.push(PaperLog::new(paper, &summary, response.as_ref(), latency));
        }

        // Step 3: Synthesize the review
        let synthesis_input: Vec<String> = paper_logs
            .iter()
            .filter(|p| !(self.options.exclude_failed_summaries && p.failed))
            .map(|p| p.summary.clone())
            .collect();

        self.enter(&ReviewState::Synthesizing);
        let synth_start = Instant::now();
        let (review, synth_response) = if synthesis_input.is_empty() {
            (
                Generated::Failed("No summaries were available to synthesize".to_string()),
                None,
            )
        } else {
            self.synthesizer
                .synthesize(&synthesis_input, topic, &request.synthesizer_model)
                .await
        };
        let synth_latency = synth_start.elapsed().as_millis() as u64;

        if review.is_failed() {
            warn!("Synthesis failed: {}", review.render());
        }

        let synth_response = synth_response.unwrap_or_default();
        let total_llm_input_tokens = synth_response.input_tokens
            + paper_logs.iter().map(|p| p.input_tokens).sum::<u32>();
        let total_llm_output_tokens = synth_response.output_tokens
            + paper_logs.iter().map(|p| p.output_tokens).sum::<u32>();
        let total_cost = synth_response.cost + paper_logs.iter().map(|p| p.cost).sum::<f64>();

        let review_log = ReviewLog {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            topic: topic.to_string(),
            papers: paper_logs,
            fetch_latency_ms: fetch_latency,
            synthesis_latency_ms: synth_latency,
            synthesis_input_tokens: synth_response.input_tokens,
            synthesis_output_tokens: synth_response.output_tokens,
            synthesis_failed: review.is_failed(),
            total_latency_ms: run_start.elapsed().as_millis() as u64,
            total_llm_input_tokens,
            total_llm_output_tokens,
            total_cost,
            review: review.render(),
        };

        // The review is already produced; a broken log must not discard it.
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.write(&review_log) {
                warn!("Failed to write review log: {:#}", e);
            }
        }

        self.enter(&ReviewState::Done);
        self.enter(&ReviewState::Idle);
        Ok(ReviewOutcome::Completed(Box::new(review_log)))
    }
}
