use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{PackageUpdate, StageContext, WorkflowState};
use crate::llm::{generate_structured, LlmRequest};

const META_DESCRIPTION_MAX: usize = 155;
const MAX_TAGS: usize = 5;

/// Distribution assets generated for a finished article
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FinalMetadata {
    /// Optimized for Google Search (keyphrase first)
    pub title_seo: String,
    /// High-CTR title for social media
    pub title_viral: String,
    /// URL-friendly slug (e.g. ai-agent-tutorial)
    pub slug: String,
    /// 155 chars max, high urgency
    pub meta_description: String,
    /// 5 relevant tags
    pub tags: Vec<String>,
    /// Estimated reading time in minutes
    pub reading_time: u32,
    /// Professional, emoji-moderate, engagement-focused LinkedIn post
    pub linkedin_post: String,
    /// First tweet of a thread
    pub twitter_thread_hook: String,
    /// Detailed artistic prompt for an image generator
    pub image_prompt: String,
    /// Accessibility text for the image
    pub image_alt_text: String,
}

impl FinalMetadata {
    fn normalized(mut self) -> Self {
        self.meta_description = truncate_chars(self.meta_description.trim(), META_DESCRIPTION_MAX).to_string();
        self.tags.retain(|t| !t.trim().is_empty());
        self.tags.truncate(MAX_TAGS);
        self
    }
}

/// Longest prefix of `text` with at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn package_prompt(excerpt: &str, truncated: bool) -> String {
    let mut prompt = String::from(
        "You are a VP of Marketing. The article is written. Now package it for maximum views.\n\n",
    );
    prompt.push_str("Analyze this draft:\n");
    prompt.push_str(excerpt);
    if truncated {
        prompt.push_str("... (truncated)");
    }
    prompt.push_str(
        r#"

TASKS:
1. **Titles:** Generate an SEO title (boring, accurate) and a Viral title (creates curiosity gap).
2. **Meta:** A meta description of at most 155 characters, 5 tags and an estimated reading time in minutes.
3. **Socials:** Write a LinkedIn post that sounds like a thought leader (not a bot). Write a Twitter hook that makes people stop scrolling.
4. **Visuals:** Describe a header image that is abstract and modern (Cyberpunk/Minimalist/Tech). NO TEXT in the image description."#,
    );
    prompt
}

/// Produce titles, SEO metadata and social assets for the final draft
pub async fn package(ctx: &StageContext, state: &WorkflowState) -> Result<PackageUpdate> {
    info!(topic = %state.topic, "package: preparing distribution assets");

    let excerpt = truncate_chars(&state.draft, ctx.settings.excerpt_chars);
    let truncated = excerpt.len() < state.draft.len();

    let metadata: FinalMetadata =
        generate_structured(ctx.fast.as_ref(), LlmRequest::new(package_prompt(excerpt, truncated)))
            .await
            .context("Distribution package generation failed")?;
    let metadata = metadata.normalized();

    info!(title = %metadata.title_viral, slug = %metadata.slug, "package: done");
    Ok(PackageUpdate {
        final_metadata: metadata,
    })
}
