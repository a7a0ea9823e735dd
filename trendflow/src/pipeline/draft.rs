use anyhow::{Context, Result};
use tracing::info;

use super::{DraftUpdate, StageContext, WorkflowState};
use crate::llm::LlmRequest;

const FINANCE_TERMS: &[&str] = &["crypto", "market", "stock", "finance", "financial"];
const AI_PHRASES: &[&str] = &["artificial intelligence"];
const AI_TOKENS: &[&str] = &["ai", "llm", "llms", "genai"];

/// Writing voice picked from the topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Financial,
    Futurist,
    Skeptic,
}

impl Tone {
    pub fn for_topic(topic: &str) -> Self {
        let lower = topic.to_lowercase();
        if FINANCE_TERMS.iter().any(|t| lower.contains(t)) {
            return Tone::Financial;
        }
        // "ai" must be a whole word, otherwise "Taiwan" or "maintain" would match
        let is_ai = AI_PHRASES.iter().any(|p| lower.contains(p))
            || lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| AI_TOKENS.contains(&token));
        if is_ai {
            Tone::Futurist
        } else {
            Tone::Skeptic
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Tone::Financial => "sharp, financial, and risk-aware (like a Bloomberg columnist)",
            Tone::Futurist => "futuristic but grounded in reality (like an MIT Tech Review writer)",
            Tone::Skeptic => "authoritative, data-driven, and slightly skeptical",
        }
    }
}

fn draft_prompt(state: &WorkflowState, tone: Tone, banned: &[String]) -> String {
    let angles = if state.angles.is_empty() {
        "General Analysis".to_string()
    } else {
        state.angles.join("; ")
    };
    let banned = banned
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a Senior Tech Columnist. Your goal is to write a viral, high-signal article about: {topic}.

### CONTEXT & ANGLES
Integrate these specific angles into your narrative: {angles}
Use this research data as your source of truth:
{summary}

### STYLE GUIDE ({tone})
1. **The Hook:** Start with a specific fact, a quote, or a contrarian statement. NEVER start with "In today's world" or "Technology is advancing."
2. **Structure:**
   - Headline
   - The Lead
   - **The Case Study:** Describe a specific technical scenario to illustrate the point.
   - The Meat (Hard Numbers)
   - The Pivot (Risks)
   - The Outlook
3. **Formatting:** Use Markdown. Use blockquotes for key stats.

CRITICAL: The final output must be **minimum 1,000 words**. Expand on the technical details.

### NEGATIVE CONSTRAINTS (CRITICAL)
- BANNED WORDS: {banned}.
- No passive voice (e.g., "It was decided"). Use active verbs.
- Do not sound like a PR press release. Be objective.

Write the full article now."#,
        topic = state.topic,
        angles = angles,
        summary = state.research_summary,
        tone = tone.directive(),
        banned = banned,
    )
}

/// Write the first full draft. Always resets the revision counter.
pub async fn draft(ctx: &StageContext, state: &WorkflowState) -> Result<DraftUpdate> {
    let tone = Tone::for_topic(&state.topic);
    info!(topic = %state.topic, ?tone, "draft: writing first version");

    let prompt = draft_prompt(state, tone, &ctx.settings.draft_banned_phrases);
    let response = ctx
        .creative
        .generate(LlmRequest::new(prompt))
        .await
        .context("Draft generation failed")?;

    Ok(DraftUpdate {
        draft: response.content,
        revision_count: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finance_terms_win() {
        assert_eq!(Tone::for_topic("Crypto ETF inflows"), Tone::Financial);
        assert_eq!(Tone::for_topic("AI stock bubble"), Tone::Financial);
        assert_eq!(Tone::for_topic("Stock Market AND Nvidia"), Tone::Financial);
    }

    #[test]
    fn ai_needs_a_whole_word() {
        assert_eq!(Tone::for_topic("OpenAI AND AI agents"), Tone::Futurist);
        assert_eq!(Tone::for_topic("Open-source LLM licensing"), Tone::Futurist);
        assert_eq!(Tone::for_topic("Artificial Intelligence regulation"), Tone::Futurist);
        assert_eq!(Tone::for_topic("Taiwan chip exports"), Tone::Skeptic);
        assert_eq!(Tone::for_topic("Quantum Computing"), Tone::Skeptic);
    }

    #[test]
    fn prompt_carries_contract() {
        let mut state = WorkflowState::new("Quantum Computing");
        state.research_summary = "IBM shipped a 1,121-qubit chip.".to_string();
        let prompt = draft_prompt(&state, Tone::Skeptic, &["Delve".to_string(), "Beacon".to_string()]);
        assert!(prompt.contains("about: Quantum Computing"));
        assert!(prompt.contains("General Analysis"));
        assert!(prompt.contains("1,121-qubit"));
        assert!(prompt.contains("BANNED WORDS: \"Delve\", \"Beacon\""));
        assert!(prompt.contains("slightly skeptical"));
        assert!(prompt.contains("minimum 1,000 words"));
    }
}
