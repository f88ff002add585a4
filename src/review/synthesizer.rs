use std::sync::Arc;

use crate::llm::{ChatCompletion, LlmResponse, RetryPolicy};

use super::Generated;

pub struct Synthesizer {
    llm: Arc<dyn ChatCompletion>,
    retry: RetryPolicy,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn ChatCompletion>, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    pub async fn synthesize(
        &self,
        summaries: &[String],
        topic: &str,
        model: &str,
    ) -> (Generated, Option<LlmResponse>) {
        let prompt = build_prompt(summaries, topic);

        match self
            .retry
            .run("synthesize", || self.llm.complete(model, &prompt))
            .await
        {
            Ok(response) => (Generated::Text(response.text.clone()), Some(response)),
            Err(e) => (
                Generated::Failed(format!("Could not generate the review: {:#}", e)),
                None,
            ),
        }
    }
}

pub fn build_prompt(summaries: &[String], topic: &str) -> String {
    let joined = summaries.join("\n\n");
    format!(
        "Create a literature review on the topic: {}.\n\
         Use the following paper summaries:\n\
         {}\n\n\
         Write a structured review with Introduction, Thematic Summary, and Conclusion.",
        topic, joined
    )
}
