use std::sync::Arc;

use crate::llm::{ChatCompletion, LlmResponse, RetryPolicy};
use crate::papers::Paper;

use super::Generated;

pub struct Summarizer {
    llm: Arc<dyn ChatCompletion>,
    retry: RetryPolicy,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn ChatCompletion>, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Digest one paper. Failures come back as [`Generated::Failed`], never as `Err`.
    pub async fn summarize(&self, paper: &Paper, model: &str) -> (Generated, Option<LlmResponse>) {
        let prompt = build_prompt(paper);

        match self
            .retry
            .run("summarize", || self.llm.complete(model, &prompt))
            .await
        {
            Ok(response) => (Generated::Text(response.text.clone()), Some(response)),
            Err(e) => (Generated::Failed(format!("Could not summarize: {:#}", e)), None),
        }
    }
}

pub fn build_prompt(paper: &Paper) -> String {
    let mut prompt = format!(
        "Summarize the following research paper in 3-4 sentences:\nTitle: {}\n",
        paper.title
    );
    if !paper.abstract_text.is_empty() {
        prompt.push_str(&format!("Abstract: {}\n", paper.abstract_text));
    }
    prompt.push_str("Provide a concise summary highlighting methods, results, and relevance.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::parse_completion;
    use crate::llm::fake::ScriptedLlm;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers with raw API bodies, decoded the same way the HTTP client does.
    struct RawBodies(Mutex<VecDeque<&'static str>>);

    #[async_trait]
    impl ChatCompletion for RawBodies {
        async fn complete(&self, _model: &str, _prompt: &str) -> Result<LlmResponse> {
            let body = self.0.lock().unwrap().pop_front().unwrap_or("{}");
            parse_completion(body)
        }
    }

    fn paper(title: &str, abstract_text: &str) -> Paper {
        Paper {
            title: title.into(),
            abstract_text: abstract_text.into(),
            link: String::new(),
        }
    }

    #[test]
    fn prompt_embeds_title_and_abstract() {
        let prompt = build_prompt(&paper("Graph Nets", "We study message passing."));
        assert!(prompt.contains("Title: Graph Nets"));
        assert!(prompt.contains("Abstract: We study message passing."));
    }

    #[test]
    fn prompt_omits_empty_abstract() {
        let prompt = build_prompt(&paper("Graph Nets", ""));
        assert!(!prompt.contains("Abstract:"));
    }

    #[tokio::test]
    async fn returns_model_text_verbatim() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("It studies graphs.")]));
        let summarizer = Summarizer::new(llm.clone(), RetryPolicy::once());

        let (summary, usage) = summarizer.summarize(&paper("Graph Nets", ""), "m1").await;

        assert_eq!(summary, Generated::Text("It studies graphs.".into()));
        assert_eq!(usage.unwrap().input_tokens, 10);
        assert_eq!(llm.models(), vec!["m1"]);
    }

    #[tokio::test]
    async fn transport_error_becomes_tagged_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err("connection reset")]));
        let summarizer = Summarizer::new(llm, RetryPolicy::once());

        let (summary, usage) = summarizer.summarize(&paper("Graph Nets", ""), "m1").await;

        assert!(summary.is_failed());
        assert!(summary.render().starts_with("⚠️"));
        assert!(summary.render().contains("connection reset"));
        assert!(usage.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_is_honoured() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err("429"), Ok("Recovered.")]));
        let retry = RetryPolicy::new(
            3,
            std::time::Duration::from_secs(5),
            crate::llm::Backoff::Fixed,
        );
        let summarizer = Summarizer::new(llm.clone(), retry);

        let (summary, _) = summarizer.summarize(&paper("Graph Nets", ""), "m1").await;

        assert_eq!(summary, Generated::Text("Recovered.".into()));
        assert_eq!(llm.prompts().len(), 2);
    }

    #[tokio::test]
    async fn empty_completion_is_a_failed_summary() {
        let llm = Arc::new(RawBodies(Mutex::new(VecDeque::from([r#"{"choices": []}"#]))));
        let summarizer = Summarizer::new(llm, RetryPolicy::once());

        let (summary, usage) = summarizer.summarize(&paper("Graph Nets", ""), "m1").await;

        assert!(summary.is_failed());
        assert!(summary.render().contains("no content"));
        assert!(usage.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_completion_is_retried() {
        let llm = Arc::new(RawBodies(Mutex::new(VecDeque::from([
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": [{"message": {"content": "Second try."}}]}"#,
        ]))));
        let retry = RetryPolicy::new(
            3,
            std::time::Duration::from_secs(5),
            crate::llm::Backoff::Fixed,
        );
        let summarizer = Summarizer::new(llm, retry);

        let (summary, _) = summarizer.summarize(&paper("Graph Nets", ""), "m1").await;

        assert_eq!(summary, Generated::Text("Second try.".into()));
    }
}
