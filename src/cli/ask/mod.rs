//! Ask command - answers questions through the semantic cache

use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::domain::llm::LlmRequest;
use crate::infrastructure::services::{CacheOptions, CacheStatus};

const SYSTEM_PROMPT: &str =
    "You are a knowledgeable assistant. Answer the question concisely and factually.";

/// Arguments for the ask command
#[derive(Args, Clone)]
pub struct AskArgs {
    /// Questions to answer, in order
    #[arg(required = true)]
    pub questions: Vec<String>,

    /// Similarity threshold for a cache hit (overrides config)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Lifetime of newly cached answers in seconds (overrides config)
    #[arg(long)]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AnswerLine<'a> {
    question: &'a str,
    answer: String,
    cache: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f32>,
}

/// Run the ask command
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let (config, components) = super::bootstrap().await?;
    let purge_task = components.spawn_purge_task();

    let options = CacheOptions::new(
        args.ttl_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.cache.ttl()),
        args.threshold.unwrap_or(config.cache.similarity_threshold),
    );

    for question in &args.questions {
        let llm = components.llm.clone();

        let outcome = components
            .cache_service
            .get_or_compute_with(question, &options, |query| async move {
                let request = LlmRequest::builder()
                    .system(SYSTEM_PROMPT)
                    .user(query)
                    .build();

                llm.chat(request).await.map(|response| response.content().to_string())
            })
            .await?;

        let (cache, similarity) = match outcome.status {
            CacheStatus::Hit { similarity } => ("hit", Some(similarity)),
            CacheStatus::Miss => ("miss", None),
            CacheStatus::Bypassed => ("bypassed", None),
        };

        super::print_json(&AnswerLine {
            question,
            answer: outcome.value,
            cache,
            similarity,
        })?;
    }

    let stats = components.cache_service.stats().await?;
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "Semantic cache statistics"
    );

    if let Some(task) = purge_task {
        task.shutdown().await;
    }

    Ok(())
}
