use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::llm::LlmResponse;
use crate::papers::Paper;
use crate::review::Generated;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperLog {
    pub title: String,
    pub link: String,
    /// Model text, or the error-tagged placeholder when summarizing failed.
    pub summary: String,
    pub failed: bool,
    pub latency_ms: u64,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
}

impl PaperLog {
    pub fn new(
        paper: &Paper,
        summary: &Generated,
        response: Option<&LlmResponse>,
        latency_ms: u64,
    ) -> Self {
        Self {
            title: paper.title.clone(),
            link: paper.link.clone(),
            summary: summary.render(),
            failed: summary.is_failed(),
            latency_ms,
            input_tokens: response.map_or(0, |r| r.input_tokens),
            output_tokens: response.map_or(0, |r| r.output_tokens),
            cost: response.map_or(0.0, |r| r.cost),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLog {
    pub id: String,
    pub timestamp: String,
    pub topic: String,
    pub papers: Vec<PaperLog>,
    pub fetch_latency_ms: u64,
    pub synthesis_latency_ms: u64,
    pub synthesis_input_tokens: u32,
    pub synthesis_output_tokens: u32,
    pub synthesis_failed: bool,
    pub total_latency_ms: u64,
    pub total_llm_input_tokens: u32,
    pub total_llm_output_tokens: u32,
    pub total_cost: f64,
    pub review: String,
}

impl ReviewLog {
    pub fn total_tokens(&self) -> u32 {
        self.total_llm_input_tokens + self.total_llm_output_tokens
    }

    pub fn failed_summaries(&self) -> usize {
        self.papers.iter().filter(|p| p.failed).count()
    }

    /// Actual cost in USD as reported by the LLM API (e.g. OpenRouter usage.cost).
    pub fn cost(&self) -> f64 {
        self.total_cost
    }

    pub fn summary(&self) -> String {
        format!(
            "Papers: {} (failed summaries: {}) | Total latency: {:.1}s | Tokens used by LLM: {} | Cost: ${:.4}",
            self.papers.len(),
            self.failed_summaries(),
            self.total_latency_ms as f64 / 1000.0,
            self.total_tokens(),
            self.cost(),
        )
    }
}

pub struct ReviewLogger {
    dir: PathBuf,
}

impl ReviewLogger {
    pub fn new(dir: &str) -> Result<Self> {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir).context("Failed to create logs directory")?;
        Ok(Self { dir })
    }

    pub fn write(&self, review_log: &ReviewLog) -> Result<()> {
        let path = self.dir.join("reviews.jsonl");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open log file")?;

        let json = serde_json::to_string(review_log).context("Failed to serialize review log")?;
        writeln!(file, "{}", json).context("Failed to write log")?;

        Ok(())
    }
}
