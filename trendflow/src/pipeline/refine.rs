use anyhow::{Context, Result};
use tracing::info;

use super::{RefineUpdate, StageContext, WorkflowState};
use crate::llm::LlmRequest;

fn refine_prompt(draft: &str, critique: &str) -> String {
    format!(
        r#"You are a Senior Editor. Your job is to fix specific issues in the draft without ruining the voice.

CRITIQUE TO ADDRESS:
{critique}

INSTRUCTIONS:
1. Read the critique carefully.
2. Only rewrite the sections that triggered the critique.
3. Do NOT rewrite the whole article if the rest is good.
4. Maintain the journalist tone (authoritative, no fluff).
5. If the critique asks for data you do not have, insert a placeholder like [Data: market cap needed] instead of inventing numbers.

Current Draft:
{draft}

Return the FULL, polished final version of the article."#
    )
}

/// Targeted repair pass. Bumps the revision counter by one and clears the critique.
pub async fn refine(ctx: &StageContext, state: &WorkflowState) -> Result<RefineUpdate> {
    let revision = state.revision_count + 1;
    info!(topic = %state.topic, revision, "refine: polishing");

    let response = ctx
        .creative
        .generate(LlmRequest::new(refine_prompt(&state.draft, &state.critique)))
        .await
        .with_context(|| format!("Refine pass {} failed", revision))?;

    Ok(RefineUpdate {
        draft: response.content,
        revision_count: revision,
        critique: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_critique_and_draft() {
        let prompt = refine_prompt("Old draft", "- Add the 2024 revenue figure");
        assert!(prompt.contains("CRITIQUE TO ADDRESS:\n- Add the 2024 revenue figure"));
        assert!(prompt.contains("Current Draft:\nOld draft"));
        assert!(prompt.contains("[Data: market cap needed]"));
    }
}
