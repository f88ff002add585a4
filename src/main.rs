mod config;
mod instrumentation;
mod llm;
mod papers;
mod review;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::time::Duration;

use config::Config;
use instrumentation::ReviewLog;
use llm::LlmClient;
use papers::SourceKind;
use review::{ReviewAgent, ReviewOutcome, ReviewRequest};

#[derive(Parser)]
#[command(name = "lit-review", about = "Generate a short literature review for a research topic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print each step of the review as it runs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Paper source to use (template or arxiv)
    #[arg(long, global = true)]
    source: Option<SourceKind>,

    /// Model for both summaries and the review
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Pause between summary requests, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Review a single topic
    Review {
        /// The research topic
        topic: String,

        /// How many papers to summarize
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },
    /// List chat-capable models from the provider's catalog
    Models,
    /// Review every topic in a JSONL file
    Batch {
        /// Path to JSONL file with topics
        path: String,
    },
}

#[derive(serde::Deserialize)]
struct BatchTopic {
    topic: String,
    max_results: Option<usize>,
}

fn build_request(config: &Config, model: Option<&str>, topic: &str, max_results: Option<usize>) -> ReviewRequest {
    ReviewRequest {
        topic: topic.to_string(),
        max_results: max_results.unwrap_or(config.max_results),
        summarizer_model: model.unwrap_or(&config.summarizer_model).to_string(),
        synthesizer_model: model.unwrap_or(&config.synthesizer_model).to_string(),
    }
}

fn build_agent(config: &Config, verbose: bool) -> Result<ReviewAgent> {
    let agent = ReviewAgent::from_config(config)?;
    if verbose {
        Ok(agent.with_state_observer(|state| eprintln!("[{}]", state)))
    } else {
        Ok(agent)
    }
}

fn print_review(log: &ReviewLog) {
    println!("\n=== Paper Summaries ===");
    for (i, paper) in log.papers.iter().enumerate() {
        println!("\n{}. {}\n{}", i + 1, paper.title, paper.summary);
    }

    println!("\n=== Literature Review ===\n\n{}\n", log.review);

    println!("=== Sources ===");
    for paper in &log.papers {
        println!("- {} ({})", paper.title, paper.link);
    }

    println!("\n{}", log.summary());
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(source) = cli.source {
        config.paper_source = source;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.summary_delay = Duration::from_millis(delay_ms);
    }

    match cli.command {
        Commands::Review { topic, max_results } => {
            let agent = build_agent(&config, cli.verbose)?;
            let request = build_request(&config, cli.model.as_deref(), &topic, max_results);

            match agent.review(&request).await? {
                ReviewOutcome::Completed(log) => print_review(&log),
                ReviewOutcome::NoPapers => {
                    println!("No papers found for \"{}\". Try a broader topic.", request.topic);
                }
                ReviewOutcome::SourceFailed { reason } => {
                    anyhow::bail!("Paper search failed: {}", reason);
                }
            }
        }
        Commands::Models => {
            let client = LlmClient::new(&config.llm_api_key, &config.llm_base_url);
            for model in client.list_models().await? {
                println!("{}", model);
            }
        }
        Commands::Batch { path } => {
            let agent = build_agent(&config, cli.verbose)?;
            let file =
                std::fs::File::open(&path).context(format!("Failed to open batch file: {}", path))?;
            let reader = std::io::BufReader::new(file);

            let mut review_logs: Vec<ReviewLog> = Vec::new();
            let mut empty = 0;
            let mut errors = 0;

            for (i, line) in reader.lines().enumerate() {
                let line = line.context("Failed to read line")?;
                if line.trim().is_empty() {
                    continue;
                }

                let entry: BatchTopic =
                    serde_json::from_str(&line).context(format!("Failed to parse line {}", i + 1))?;

                eprintln!("\n[{}/...] {}", i + 1, entry.topic);

                let request =
                    build_request(&config, cli.model.as_deref(), &entry.topic, entry.max_results);
                match agent.review(&request).await {
                    Ok(ReviewOutcome::Completed(log)) => {
                        println!("  {}", log.summary());
                        review_logs.push(*log);
                    }
                    Ok(ReviewOutcome::NoPapers) => {
                        println!("  no papers found");
                        empty += 1;
                    }
                    Ok(ReviewOutcome::SourceFailed { reason }) => {
                        eprintln!("  ERROR: paper search failed: {}", reason);
                        errors += 1;
                    }
                    Err(e) => {
                        eprintln!("  ERROR: {}", e);
                        errors += 1;
                    }
                }
            }

            println!("\n=== Batch Summary ===");
            println!(
                "Reviews: {} (no papers: {}, errors: {})",
                review_logs.len(),
                empty,
                errors
            );

            if !review_logs.is_empty() {
                let failed_summaries: usize =
                    review_logs.iter().map(|r| r.failed_summaries()).sum();
                let failed_reviews = review_logs.iter().filter(|r| r.synthesis_failed).count();
                let avg_latency = review_logs.iter().map(|r| r.total_latency_ms).sum::<u64>() as f64
                    / review_logs.len() as f64;
                let total_tokens: u32 = review_logs.iter().map(|r| r.total_tokens()).sum();
                let total_cost: f64 = review_logs.iter().map(|r| r.cost()).sum();

                println!("Failed summaries: {}", failed_summaries);
                println!("Failed reviews: {}", failed_reviews);
                println!("Avg latency: {:.1}s", avg_latency / 1000.0);
                println!("Total tokens: {}", total_tokens);
                println!("Total cost: ${:.4}", total_cost);
            }
        }
    }

    Ok(())
}
