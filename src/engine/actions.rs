use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::{AspectCritique, GenerationContext, GenerationTask};
use crate::error::{EngineError, EngineResult};

use super::{extract_json_from_completion, truncate_chars, EngineCore, IdeaState, IdeaTree, NodeId};

/// How many of the weakest aspects get a detailed critique per refinement.
const CRITIQUE_ASPECT_COUNT: usize = 3;

/// The four refinement strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// First idea from the research goal. Only valid at the root.
    Generate,
    /// Critique the weakest aspects and refine against them.
    ReviewAndRefine,
    /// Search the literature and refine with what came back.
    RetrieveAndRefine,
    /// Restart with an unrelated approach, attached to the root.
    RefreshIdea,
}

impl Action {
    /// Candidates the selector chooses among. `generate` is excluded since
    /// it only applies at a bare root.
    pub const SELECTABLE: [Action; 3] = [
        Action::ReviewAndRefine,
        Action::RetrieveAndRefine,
        Action::RefreshIdea,
    ];

    /// Get the action name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Generate => "generate",
            Action::ReviewAndRefine => "review_and_refine",
            Action::RetrieveAndRefine => "retrieve_and_refine",
            Action::RefreshIdea => "refresh_idea",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(Action::Generate),
            "review_and_refine" => Ok(Action::ReviewAndRefine),
            "retrieve_and_refine" => Ok(Action::RetrieveAndRefine),
            "refresh_idea" => Ok(Action::RefreshIdea),
            other => Err(EngineError::UnknownAction {
                name: other.to_string(),
            }),
        }
    }
}

/// Result of running an action: the state to attach and where to attach it.
#[derive(Debug, Clone)]
pub struct StatePlan {
    pub action: Action,
    pub state: IdeaState,
    /// Restart states attach to the root regardless of the cursor.
    pub attach_to_root: bool,
}

#[derive(Deserialize)]
struct QueryPayload {
    query: String,
}

/// Executes refinement actions against capability backends.
///
/// All capability calls for one action complete before the caller mutates
/// the tree, so a failed action leaves the tree exactly as it was.
#[derive(Clone)]
pub struct ActionRunner {
    core: EngineCore,
}

impl ActionRunner {
    pub fn new(core: EngineCore) -> Self {
        Self { core }
    }

    /// Run `action` against the tree's current node and return the state to
    /// attach. The tree itself is not touched.
    pub async fn run(
        &self,
        tree: &IdeaTree,
        current: NodeId,
        action: Action,
    ) -> EngineResult<StatePlan> {
        let node = tree.node(current);
        debug!(action = %action, node_id = %node.id, depth = node.state.depth, "running action");
        match action {
            Action::Generate => self.run_generate(&node.state).await,
            Action::ReviewAndRefine => self.run_review_and_refine(&node.state).await,
            Action::RetrieveAndRefine => self.run_retrieve_and_refine(&node.state).await,
            Action::RefreshIdea => self.run_refresh_idea(&node.state).await,
        }
    }

    async fn run_generate(&self, current: &IdeaState) -> EngineResult<StatePlan> {
        if current.depth != 0 {
            return Err(EngineError::InvalidState {
                message: format!(
                    "generate only applies at the root, current node is at depth {}",
                    current.depth
                ),
            });
        }
        let ctx = GenerationContext::new().with_goal(&current.research_goal);
        let idea = self
            .core
            .generator()
            .generate(GenerationTask::InitialIdea, ctx)
            .await
            .map_err(EngineError::GenerationFailed)?;

        let review = self
            .core
            .evaluator()
            .evaluate(&idea.content)
            .await
            .map_err(EngineError::EvaluationFailed)?;

        Ok(StatePlan {
            action: Action::Generate,
            state: IdeaState::derived(current, idea.content).with_review(&review),
            attach_to_root: false,
        })
    }

    async fn run_review_and_refine(&self, current: &IdeaState) -> EngineResult<StatePlan> {
        let review = self
            .core
            .evaluator()
            .evaluate(&current.current_idea)
            .await
            .map_err(EngineError::EvaluationFailed)?;

        let mut critiques: Vec<AspectCritique> = Vec::new();
        for weak in review.lowest_aspects(CRITIQUE_ASPECT_COUNT) {
            let critique = self
                .core
                .evaluator()
                .critique_aspect(&current.current_idea, &weak.aspect)
                .await
                .map_err(EngineError::EvaluationFailed)?;
            critiques.push(critique);
        }
        debug!(
            aspects = ?critiques.iter().map(|c| c.aspect.as_str()).collect::<Vec<_>>(),
            "critiquing weakest aspects"
        );

        let ctx = GenerationContext::new()
            .with_idea(&current.current_idea)
            .with_critiques(critiques);
        let idea = self
            .core
            .generator()
            .generate(GenerationTask::ReviewRefine, ctx)
            .await
            .map_err(EngineError::GenerationFailed)?;

        let rescored = self
            .core
            .evaluator()
            .evaluate(&idea.content)
            .await
            .map_err(EngineError::EvaluationFailed)?;

        Ok(StatePlan {
            action: Action::ReviewAndRefine,
            state: IdeaState::derived(current, idea.content).with_review(&rescored),
            attach_to_root: false,
        })
    }

    async fn run_retrieve_and_refine(&self, current: &IdeaState) -> EngineResult<StatePlan> {
        let query = self.derive_query(current).await?;
        let record = self
            .core
            .retriever()
            .retrieve(&query)
            .await
            .map_err(EngineError::RetrievalFailed)?;
        debug!(query = %query, sections = record.sections.len(), "retrieved knowledge");

        let ctx = GenerationContext::new()
            .with_idea(&current.current_idea)
            .with_retrieved(record.clone());
        let idea = self
            .core
            .generator()
            .generate(GenerationTask::RetrieveRefine, ctx)
            .await
            .map_err(EngineError::GenerationFailed)?;

        let review = self
            .core
            .evaluator()
            .evaluate(&idea.content)
            .await
            .map_err(EngineError::EvaluationFailed)?;

        Ok(StatePlan {
            action: Action::RetrieveAndRefine,
            state: IdeaState::derived(current, idea.content)
                .with_knowledge(record)
                .with_review(&review),
            attach_to_root: false,
        })
    }

    async fn run_refresh_idea(&self, current: &IdeaState) -> EngineResult<StatePlan> {
        let ctx = GenerationContext::new()
            .with_goal(&current.research_goal)
            .with_idea(&current.current_idea);
        let idea = self
            .core
            .generator()
            .generate(GenerationTask::FreshPerspective, ctx)
            .await
            .map_err(EngineError::GenerationFailed)?;

        let review = self
            .core
            .evaluator()
            .evaluate(&idea.content)
            .await
            .map_err(EngineError::EvaluationFailed)?;

        Ok(StatePlan {
            action: Action::RefreshIdea,
            state: IdeaState::restarted(&current.research_goal, idea.content)
                .with_review(&review),
            attach_to_root: true,
        })
    }

    /// Ask the generator for a search query, falling back to text heuristics
    /// when the output is not the expected `{"query": ...}` payload.
    async fn derive_query(&self, current: &IdeaState) -> EngineResult<String> {
        let ctx = GenerationContext::new().with_idea(&current.current_idea);
        let completion = self
            .core
            .generator()
            .generate(GenerationTask::SearchQuery, ctx)
            .await
            .map_err(EngineError::GenerationFailed)?;

        if let Ok(json) = extract_json_from_completion(&completion.content) {
            if let Ok(payload) = serde_json::from_str::<QueryPayload>(json) {
                let query = payload.query.trim().to_string();
                if !query.is_empty() {
                    return Ok(query);
                }
            }
        }

        warn!("search query output was not structured, falling back to idea text");
        let first_sentence = current
            .current_idea
            .split('.')
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if !first_sentence.is_empty() {
            return Ok(first_sentence.to_string());
        }
        Ok(truncate_chars(&current.current_idea, 100))
    }
}

impl std::fmt::Debug for ActionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRunner").finish_non_exhaustive()
    }
}
