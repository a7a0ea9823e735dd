use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use super::{ResearchUpdate, StageContext, WorkflowState};
use crate::llm::{generate_structured, LlmRequest};
use crate::news::NO_VERIFIED_NEWS;

/// Prefixed to the research summary when no news could be found at all
pub const LOW_CONFIDENCE_NOTICE: &str = "LOW CONFIDENCE: no verified news coverage was found for this topic. \
The analysis below relies on background knowledge and may be outdated or incomplete.";

/// Keyword query and analysis angles derived from a free-form topic
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchPlan {
    /// A boolean-style keyword string optimized for news APIs (e.g. 'Nvidia AND AMD AND MI300X')
    pub search_keywords: String,
    /// 3 distinct angles to analyze the found news
    pub angles: Vec<String>,
}

fn search_plan_prompt(topic: &str) -> String {
    format!(
        r#"We are covering '{topic}'.
Generate ONE highly effective KEYWORD search string to find breaking news, plus 3 distinct angles to analyze it.

CRITICAL RULES:
1. Output strictly keywords (e.g. "Stripe IPO valuation", NOT "What is Stripe's IPO valuation?").
2. Use logical operators if needed (e.g. "Nvidia AND (AMD OR Intel)").
3. Target a specific, recent event."#
    )
}

fn synthesis_prompt(topic: &str, keywords: &str, angles: &[String], digest: &str, no_news: bool) -> String {
    let mut prompt = String::from("You are a Lead Tech Analyst. Synthesize this data into a research brief.\n\n");
    prompt.push_str(&format!("TOPIC: {} (Focusing on: {})\n", topic, keywords));
    prompt.push_str("ANGLES:\n");
    for angle in angles {
        prompt.push_str(&format!("- {}\n", angle));
    }
    if no_news {
        prompt.push_str(
            "\nNo verified news was found. State clearly that the brief is low confidence \
             and flag every claim that comes from background knowledge.\n",
        );
    }
    prompt.push_str("\nRAW DATA:\n");
    prompt.push_str(digest);
    prompt
}

fn is_thin(digest: &str, min_chars: usize) -> bool {
    digest == NO_VERIFIED_NEWS || digest.chars().count() < min_chars
}

/// Refine the topic into a keyword query, gather news for it and synthesize a research brief
pub async fn research(ctx: &StageContext, state: &WorkflowState) -> Result<ResearchUpdate> {
    let topic = state.topic.as_str();
    info!(topic, "research: generating targeted search");

    // 1. Keyword query and angles
    let plan: SearchPlan = generate_structured(ctx.fast.as_ref(), LlmRequest::new(search_plan_prompt(topic)))
        .await
        .context("Search plan generation failed")?;

    let keywords = match plan.search_keywords.trim() {
        "" => topic.to_string(),
        k => k.to_string(),
    };
    let mut angles = plan.angles;
    angles.truncate(3);
    info!(topic, keywords = %keywords, "research: pivoting topic to keyword search");

    // 2. Search, with a single fallback to the unrefined topic
    let mut digest = ctx.news.fetch_news(&keywords).await;
    if is_thin(&digest, ctx.settings.min_digest_chars) {
        warn!(keywords = %keywords, "research: specific search came up thin, reverting to broad topic");
        let fallback = ctx.news.fetch_news(topic).await;
        if fallback != NO_VERIFIED_NEWS || digest == NO_VERIFIED_NEWS {
            digest = fallback;
        }
    }
    let no_news = digest == NO_VERIFIED_NEWS;

    // 3. Synthesis
    let response = ctx
        .creative
        .generate(LlmRequest::new(synthesis_prompt(topic, &keywords, &angles, &digest, no_news)))
        .await
        .context("Research synthesis failed")?;

    let research_summary = if no_news {
        format!("{}\n\n{}", LOW_CONFIDENCE_NOTICE, response.content.trim())
    } else {
        response.content.trim().to_string()
    };

    Ok(ResearchUpdate {
        topic: keywords,
        research_summary,
        angles,
    })
}
