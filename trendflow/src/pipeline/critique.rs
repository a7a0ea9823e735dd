use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use super::{CritiqueUpdate, FeedbackType, StageContext, WorkflowState};
use crate::llm::{generate_structured, LlmRequest};

/// Ceiling applied when the local banned-phrase policy overrides the model
const OVERRIDE_SCORE: u8 = 75;
const APPROVAL_THRESHOLD: u8 = 80;

/// The editor's structured verdict on a draft
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EditorVerdict {
    /// True only if score > 80
    pub is_approved: bool,
    /// Quality score 0-100
    pub score: u32,
    /// Bullet points of EXACTLY what needs fixing
    pub critique: String,
    /// How much work the draft still needs
    pub feedback_type: FeedbackType,
}

/// Banned phrases present in `draft`, in list order, matched case-insensitively
pub fn find_banned_phrases(draft: &str, banned: &[String]) -> Vec<String> {
    let lower = draft.to_lowercase();
    banned
        .iter()
        .filter(|phrase| lower.contains(&phrase.to_lowercase()))
        .cloned()
        .collect()
}

/// Local lexical policy beats the model: banned phrases plus a passing score means
/// the score drops to 75 and the draft is rejected.
pub fn enforce_banned_phrases(verdict: EditorVerdict, found: &[String]) -> CritiqueUpdate {
    let score = verdict.score.min(100) as u8;
    if !found.is_empty() && score > APPROVAL_THRESHOLD {
        warn!(
            model_score = score,
            banned = ?found,
            "critique: banned phrases found, overriding editor verdict"
        );
        return CritiqueUpdate {
            is_approved: false,
            score: OVERRIDE_SCORE,
            critique: format!(
                "Remove these banned words: [{}]. {}",
                found.join(", "),
                verdict.critique
            ),
            feedback_type: match verdict.feedback_type {
                FeedbackType::Perfect => FeedbackType::MinorPolish,
                other => other,
            },
        };
    }

    CritiqueUpdate {
        is_approved: verdict.is_approved,
        score,
        critique: verdict.critique,
        feedback_type: verdict.feedback_type,
    }
}

fn critique_prompt(topic: &str, draft: &str, found: &[String]) -> String {
    let mut prompt = format!(
        r#"You are the Editor-in-Chief of a top-tier tech publication (like The Verge or Bloomberg).
Your job is to REJECT mediocrity. You do not fix typos; you fix logic and flow.

Review this draft about: {topic}

### RUBRIC FOR GRADING (0-100):
1. **The Hook (20pts):** Does the first sentence grab me? Or is it a generic intro?
2. **Data Density (30pts):** Are there specific numbers, dates, or prices? (e.g. "$5B valuation" vs "a lot of money").
3. **Tone (30pts):** Is it human/punchy? Or does it sound like a robot?
4. **Formatting (20pts):** Are there clear headers and short paragraphs?

### SPECIFIC INSTRUCTIONS:
- If you see phrases like "In today's digital world" -> REJECT immediately.
- If there are no concrete numbers/stats -> REJECT.
- Approve only if the score is above {APPROVAL_THRESHOLD}.
"#
    );
    if !found.is_empty() {
        prompt.push_str(&format!(
            "- FATAL ERROR: Found banned AI-cliche words: [{}]. These MUST be removed.\n",
            found.join(", ")
        ));
    }
    prompt.push_str("\nDraft to Review:\n");
    prompt.push_str(draft);
    prompt
}

/// Grade the current draft: local banned-phrase scan, then a structured model review
pub async fn critique(ctx: &StageContext, state: &WorkflowState) -> Result<CritiqueUpdate> {
    info!(topic = %state.topic, revision = state.revision_count, "critique: grilling the draft");

    // 1. Hard rule check
    let found = find_banned_phrases(&state.draft, &ctx.settings.editor_banned_phrases);

    // 2. Model review
    let prompt = critique_prompt(&state.topic, &state.draft, &found);
    let verdict: EditorVerdict = generate_structured(ctx.fast.as_ref(), LlmRequest::new(prompt))
        .await
        .context("Editor review failed")?;

    let update = enforce_banned_phrases(verdict, &found);
    info!(
        score = update.score,
        approved = update.is_approved,
        feedback = ?update.feedback_type,
        "critique: verdict"
    );
    Ok(update)
}
