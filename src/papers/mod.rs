pub mod arxiv;
pub mod cache;
pub mod template;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use arxiv::{ArxivSort, ArxivSource};
pub use cache::CachedSource;
pub use template::TemplateSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    /// Empty when the source has no abstract.
    pub abstract_text: String,
    pub link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse search response: {0}")]
    Parse(String),
}

/// Produces candidate papers for a topic, in the order they should be reviewed.
///
/// An empty result is a valid answer ("no papers found"), not an error.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn fetch(&self, topic: &str, max_results: usize) -> Result<Vec<Paper>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Template,
    Arxiv,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "template" | "dummy" => Ok(SourceKind::Template),
            "arxiv" => Ok(SourceKind::Arxiv),
            other => anyhow::bail!("Unknown paper source: {}", other),
        }
    }
}
