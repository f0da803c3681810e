use std::sync::Arc;

use crate::capabilities::{CapabilityClient, IdeaEvaluator, IdeaGenerator, KnowledgeRetriever};

/// Shared capability bundle handed to every engine component.
///
/// Holds trait objects, so tests can wire in scripted fakes and production
/// code can reuse one [`CapabilityClient`] for all three roles.
#[derive(Clone)]
pub struct EngineCore {
    generator: Arc<dyn IdeaGenerator>,
    evaluator: Arc<dyn IdeaEvaluator>,
    retriever: Arc<dyn KnowledgeRetriever>,
}

impl EngineCore {
    pub fn new(
        generator: Arc<dyn IdeaGenerator>,
        evaluator: Arc<dyn IdeaEvaluator>,
        retriever: Arc<dyn KnowledgeRetriever>,
    ) -> Self {
        Self {
            generator,
            evaluator,
            retriever,
        }
    }

    /// Build a core where one HTTP client backs all three capabilities.
    pub fn from_client(client: CapabilityClient) -> Self {
        let client = Arc::new(client);
        Self {
            generator: client.clone(),
            evaluator: client.clone(),
            retriever: client,
        }
    }

    pub fn generator(&self) -> &dyn IdeaGenerator {
        self.generator.as_ref()
    }

    pub fn evaluator(&self) -> &dyn IdeaEvaluator {
        self.evaluator.as_ref()
    }

    pub fn retriever(&self) -> &dyn KnowledgeRetriever {
        self.retriever.as_ref()
    }
}

impl std::fmt::Debug for EngineCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCore").finish_non_exhaustive()
    }
}
