use anyhow::{Context, Result};
use std::time::Duration;

use crate::llm::{Backoff, RetryPolicy};
use crate::papers::{ArxivSort, SourceKind};

#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub summarizer_model: String,
    pub synthesizer_model: String,
    pub paper_source: SourceKind,
    pub arxiv_sort: ArxivSort,
    pub max_results: usize,
    pub summary_delay: Duration,
    pub retry: RetryPolicy,
    pub cache_capacity: usize,
    pub exclude_failed_summaries: bool,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let retry = RetryPolicy::new(
            std::env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "1".into())
                .parse()
                .context("RETRY_MAX_ATTEMPTS must be a number")?,
            Duration::from_millis(
                std::env::var("RETRY_DELAY_MS")
                    .unwrap_or_else(|_| "5000".into())
                    .parse()
                    .context("RETRY_DELAY_MS must be a number")?,
            ),
            std::env::var("RETRY_BACKOFF")
                .unwrap_or_else(|_| "fixed".into())
                .parse::<Backoff>()?,
        );

        Ok(Self {
            llm_api_key: std::env::var("OPENROUTER_API_KEY")
                .context("OPENROUTER_API_KEY must be set")?,
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".into()),
            summarizer_model: std::env::var("SUMMARIZER_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4o".into()),
            synthesizer_model: std::env::var("SYNTHESIZER_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4o".into()),
            paper_source: std::env::var("PAPER_SOURCE")
                .unwrap_or_else(|_| "template".into())
                .parse()?,
            arxiv_sort: std::env::var("ARXIV_SORT")
                .unwrap_or_else(|_| "relevance".into())
                .parse()?,
            max_results: std::env::var("MAX_RESULTS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .context("MAX_RESULTS must be a number")?,
            summary_delay: Duration::from_millis(
                std::env::var("SUMMARY_DELAY_MS")
                    .unwrap_or_else(|_| "2000".into())
                    .parse()
                    .context("SUMMARY_DELAY_MS must be a number")?,
            ),
            retry,
            cache_capacity: std::env::var("CACHE_CAPACITY")
                .unwrap_or_else(|_| "32".into())
                .parse()
                .context("CACHE_CAPACITY must be a number")?,
            exclude_failed_summaries: std::env::var("EXCLUDE_FAILED_SUMMARIES")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .context("EXCLUDE_FAILED_SUMMARIES must be true or false")?,
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".into()),
        })
    }
}
