use async_trait::async_trait;

use super::{Paper, PaperSource, SourceError};

const TEMPLATES: [&str; 5] = [
    "Recent Advances in {topic} Using Deep Learning",
    "A Survey on {topic} Applications",
    "Transformer Models Applied to {topic}",
    "Satellite Data Fusion in {topic}",
    "Challenges in {topic} Forecasting with AI",
];

/// Offline source that fills fixed title templates with the topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSource;

impl TemplateSource {
    pub fn papers(topic: &str, max_results: usize) -> Vec<Paper> {
        TEMPLATES
            .iter()
            .take(max_results)
            .enumerate()
            .map(|(i, template)| Paper {
                title: template.replace("{topic}", topic),
                abstract_text: String::new(),
                link: format!("template:{}", i + 1),
            })
            .collect()
    }
}

#[async_trait]
impl PaperSource for TemplateSource {
    async fn fetch(&self, topic: &str, max_results: usize) -> Result<Vec<Paper>, SourceError> {
        Ok(Self::papers(topic, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn substitutes_topic_into_every_title() {
        let papers = TemplateSource
            .fetch("AI for climate modeling", 5)
            .await
            .unwrap();

        assert_eq!(papers.len(), 5);
        assert_eq!(
            papers[0].title,
            "Recent Advances in AI for climate modeling Using Deep Learning"
        );
        assert_eq!(
            papers[4].title,
            "Challenges in AI for climate modeling Forecasting with AI"
        );
        for paper in &papers {
            assert!(paper.title.contains("AI for climate modeling"));
            assert!(paper.abstract_text.is_empty());
        }
    }

    #[test]
    fn count_is_bounded_by_templates() {
        assert_eq!(TemplateSource::papers("x", 2).len(), 2);
        assert_eq!(TemplateSource::papers("x", 50).len(), 5);
        assert!(TemplateSource::papers("x", 0).is_empty());
    }

    #[test]
    fn topic_is_inserted_verbatim() {
        let topic = "{weird} topic / with symbols";
        let papers = TemplateSource::papers(topic, 3);
        assert_eq!(papers[1].title, format!("A Survey on {} Applications", topic));
        assert_eq!(papers[2].link, "template:3");
    }
}
