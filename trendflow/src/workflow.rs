//! Workflow controller.
//!
//! Drives one topic through Research, Draft, the bounded Critique/Refine loop, Package and
//! the publish handoff. The controller owns the `WorkflowState`; stages only ever see a
//! shared borrow of it and hand back typed deltas.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use common::Config;

use crate::llm::LlmProvider;
use crate::news::{Aggregator, NewsDigest};
use crate::pipeline::{self, PipelineSettings, StageContext, WorkflowState};
use crate::publish::{self, publisher_from_config, Article, Publisher, DEFAULT_SERIES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Research,
    Draft,
    Critique,
    Refine,
    Package,
    Publish,
    Done,
}

/// Where to go once the editor has spoken
pub fn after_critique(state: &WorkflowState, max_revisions: u32) -> Step {
    if state.is_approved || state.revision_count >= max_revisions {
        Step::Package
    } else {
        Step::Refine
    }
}

pub struct Workflow {
    ctx: StageContext,
    publisher: Option<Box<dyn Publisher>>,
    series: String,
}

impl Workflow {
    pub fn new(ctx: StageContext) -> Self {
        Self {
            ctx,
            publisher: None,
            series: DEFAULT_SERIES.to_string(),
        }
    }

    pub fn with_publisher(mut self, publisher: Option<Box<dyn Publisher>>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = series.into();
        self
    }

    /// Wire the full workflow from configuration and the two model tiers
    pub fn from_config(
        config: &Config,
        fast: Arc<dyn LlmProvider>,
        creative: Arc<dyn LlmProvider>,
        publish: bool,
    ) -> Result<Self> {
        let news: Arc<dyn NewsDigest> = Arc::new(Aggregator::from_config(config)?);
        let ctx = StageContext {
            fast,
            creative,
            news,
            settings: PipelineSettings::from_config(&config.pipeline),
        };
        let publisher = if publish {
            publisher_from_config(&config.publisher)?
        } else {
            None
        };
        Ok(Self::new(ctx)
            .with_publisher(publisher)
            .with_series(
                config
                    .publisher
                    .series
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SERIES.to_string()),
            ))
    }

    /// Run one topic to completion. Model and structured-decode failures abort the run;
    /// news and publish problems never do.
    pub async fn run(&self, topic: &str) -> Result<WorkflowState> {
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow", %run_id, topic);
        let result = self.drive(topic).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| error!(error = %format!("{:#}", e), "workflow: run failed"));
        }
        result
    }

    async fn drive(&self, topic: &str) -> Result<WorkflowState> {
        let ctx = &self.ctx;
        let max_revisions = ctx.settings.max_revisions;
        let mut state = WorkflowState::new(topic);
        let mut step = Step::Research;

        while step != Step::Done {
            step = match step {
                Step::Research => {
                    let update = pipeline::research(ctx, &state)
                        .await
                        .with_context(|| format!("Research stage failed for topic '{}'", topic))?;
                    state.apply(update.into());
                    Step::Draft
                }
                Step::Draft => {
                    let update = pipeline::draft(ctx, &state)
                        .await
                        .with_context(|| format!("Draft stage failed for topic '{}'", topic))?;
                    state.apply(update.into());
                    Step::Critique
                }
                Step::Critique => {
                    let update = pipeline::critique(ctx, &state)
                        .await
                        .with_context(|| format!("Critique stage failed for topic '{}'", topic))?;
                    state.apply(update.into());

                    let next = after_critique(&state, max_revisions);
                    if next == Step::Package {
                        if !state.is_approved {
                            warn!(
                                revisions = state.revision_count,
                                score = ?state.score,
                                "workflow: max revisions reached, packaging anyway"
                            );
                        }
                        state.critique_notes = std::mem::take(&mut state.critique);
                    }
                    next
                }
                Step::Refine => {
                    let update = pipeline::refine(ctx, &state)
                        .await
                        .with_context(|| format!("Refine stage failed for topic '{}'", topic))?;
                    state.apply(update.into());
                    Step::Critique
                }
                Step::Package => {
                    let update = pipeline::package(ctx, &state)
                        .await
                        .with_context(|| format!("Package stage failed for topic '{}'", topic))?;
                    state.apply(update.into());
                    Step::Publish
                }
                Step::Publish => {
                    let article = Article::from_state(&state, &self.series);
                    state.publish = Some(publish::deliver(self.publisher.as_deref(), &article).await);
                    Step::Done
                }
                Step::Done => Step::Done,
            };
        }

        info!(
            revisions = state.revision_count,
            approved = state.is_approved,
            score = ?state.score,
            "workflow: done"
        );
        Ok(state)
    }
}
