//! arXiv export API search, parsed from its Atom feed.

use anyhow::Context;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{Paper, PaperSource, SourceError};

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = concat!("lit-review/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArxivSort {
    Relevance,
    SubmittedDate,
    LastUpdatedDate,
}

impl ArxivSort {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ArxivSort::Relevance => "relevance",
            ArxivSort::SubmittedDate => "submittedDate",
            ArxivSort::LastUpdatedDate => "lastUpdatedDate",
        }
    }
}

impl FromStr for ArxivSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(ArxivSort::Relevance),
            "submitted" | "submitteddate" | "date" => Ok(ArxivSort::SubmittedDate),
            "updated" | "lastupdateddate" => Ok(ArxivSort::LastUpdatedDate),
            other => anyhow::bail!("Unknown arXiv sort order: {}", other),
        }
    }
}

pub struct ArxivSource {
    client: reqwest::Client,
    sort: ArxivSort,
}

impl ArxivSource {
    pub fn new(sort: ArxivSort) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create arXiv HTTP client")?;

        Ok(Self { client, sort })
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    #[instrument(skip(self))]
    async fn fetch(&self, topic: &str, max_results: usize) -> Result<Vec<Paper>, SourceError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let params = [
            ("search_query", format!("all:{}", topic)),
            ("start", "0".to_string()),
            ("max_results", max_results.to_string()),
            ("sortBy", self.sort.as_api_str().to_string()),
            ("sortOrder", "descending".to_string()),
        ];

        let response = self.client.get(ARXIV_API_URL).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let xml = response.text().await?;
        let papers = parse_feed(&xml)?;
        debug!(count = papers.len(), "arXiv search returned papers");
        Ok(papers)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
}

/// Parse an arXiv Atom feed into papers, preserving feed order.
fn parse_feed(xml: &str) -> Result<Vec<Paper>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut in_entry = false;
    let mut field: Option<Field> = None;
    let (mut id, mut title, mut summary) = (String::new(), String::new(), String::new());

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    id.clear();
                    title.clear();
                    summary.clear();
                }
                b"id" if in_entry => field = Some(Field::Id),
                b"title" if in_entry => field = Some(Field::Title),
                b"summary" if in_entry => field = Some(Field::Summary),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(current) = field {
                    let text = e
                        .unescape()
                        .map_err(|err| SourceError::Parse(err.to_string()))?;
                    let target = match current {
                        Field::Id => &mut id,
                        Field::Title => &mut title,
                        Field::Summary => &mut summary,
                    };
                    target.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"id" | b"title" | b"summary" => field = None,
                b"entry" => {
                    in_entry = false;
                    // The API reports bad queries as a single pseudo-entry.
                    if id.contains("/api/errors") {
                        return Err(SourceError::Parse(normalize_whitespace(&summary)));
                    }
                    if !title.trim().is_empty() {
                        papers.push(Paper {
                            title: normalize_whitespace(&title),
                            abstract_text: normalize_whitespace(&summary),
                            link: id.trim().to_string(),
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(e.to_string())),
            _ => {}
        }
    }

    Ok(papers)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
