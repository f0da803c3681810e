//! External capability contracts and their HTTP implementation.
//!
//! The engine consumes three narrow interfaces: idea generation, multi-aspect
//! evaluation, and literature retrieval. The tree logic only ever sees these
//! traits; [`CapabilityClient`] is the reqwest-backed implementation used in
//! production, and tests substitute scripted fakes.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;

use crate::error::CapabilityResult;

/// Produces new idea text for a given task and context.
///
/// The engine never retries a failed call; retry policy belongs to the
/// implementation or the caller.
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    /// Generate idea text (or, for [`GenerationTask::SearchQuery`], a raw
    /// completion the engine extracts a query from).
    async fn generate(
        &self,
        task: GenerationTask,
        ctx: GenerationContext,
    ) -> CapabilityResult<GeneratedIdea>;
}

/// Scores an idea across review aspects and critiques single aspects.
#[async_trait]
pub trait IdeaEvaluator: Send + Sync {
    /// Review all aspects of an idea in one call.
    async fn evaluate(&self, idea: &str) -> CapabilityResult<Review>;

    /// Produce a detailed critique of one aspect of an idea.
    async fn critique_aspect(&self, idea: &str, aspect: &str) -> CapabilityResult<AspectCritique>;
}

/// Retrieves supporting literature for a search query.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Run a literature search and return the answer sections.
    async fn retrieve(&self, query: &str) -> CapabilityResult<RetrievalRecord>;
}
