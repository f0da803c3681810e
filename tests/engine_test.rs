//! Integration tests for the refinement tree engine
//!
//! Drives [`ExplorationSession`] against scripted capability fakes so every
//! action's tree effects can be checked without a network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use iris_ideation::capabilities::{
    AspectCritique, AspectScore, GeneratedIdea, GenerationContext, GenerationTask, IdeaEvaluator,
    IdeaGenerator, KnowledgeRetriever, RetrievalRecord, Review, Section,
};
use iris_ideation::engine::{EngineCore, IdeaTree, TreeView};
use iris_ideation::error::CapabilityError;
use iris_ideation::{CapabilityResult, EngineError, ExplorationOptions, ExplorationSession};

/// Generator that answers each task with a fixed, recognizable payload
struct ScriptedGenerator {
    /// Raw completion returned for the search-query task
    query_completion: String,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self {
            query_completion: r#"{"query": "scripted search query"}"#.to_string(),
        }
    }

    fn with_query_completion(completion: &str) -> Self {
        Self {
            query_completion: completion.to_string(),
        }
    }
}

#[async_trait]
impl IdeaGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        task: GenerationTask,
        _ctx: GenerationContext,
    ) -> CapabilityResult<GeneratedIdea> {
        let content = match task {
            GenerationTask::SearchQuery => self.query_completion.clone(),
            GenerationTask::InitialIdea => {
                "Use retrieval-augmented sparse attention. Evaluate on long-context suites."
                    .to_string()
            }
            task => format!("refined idea from {task}"),
        };
        Ok(GeneratedIdea { content })
    }
}

/// Evaluator with fixed per-aspect scores that records critique requests
struct ScriptedEvaluator {
    aspects: Vec<(&'static str, f64)>,
    critiqued: Mutex<Vec<String>>,
}

impl ScriptedEvaluator {
    fn new(aspects: Vec<(&'static str, f64)>) -> Self {
        Self {
            aspects,
            critiqued: Mutex::new(Vec::new()),
        }
    }

    fn critiqued_aspects(&self) -> Vec<String> {
        self.critiqued.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdeaEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, _idea: &str) -> CapabilityResult<Review> {
        if self.aspects.is_empty() {
            return Ok(Review::default());
        }
        let average =
            self.aspects.iter().map(|(_, s)| s).sum::<f64>() / self.aspects.len() as f64;
        Ok(Review {
            aspects: self
                .aspects
                .iter()
                .map(|(aspect, score)| AspectScore {
                    aspect: aspect.to_string(),
                    score: *score,
                })
                .collect(),
            feedback: Default::default(),
            average_score: Some(average),
        })
    }

    async fn critique_aspect(&self, _idea: &str, aspect: &str) -> CapabilityResult<AspectCritique> {
        self.critiqued.lock().unwrap().push(aspect.to_string());
        Ok(AspectCritique {
            aspect: aspect.to_string(),
            critique: format!("critique of {aspect}"),
            score: None,
        })
    }
}

/// Retriever that records the queries it was asked
struct RecordingRetriever {
    queries: Mutex<Vec<String>>,
}

impl RecordingRetriever {
    fn new() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeRetriever for RecordingRetriever {
    async fn retrieve(&self, query: &str) -> CapabilityResult<RetrievalRecord> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(RetrievalRecord::new(
            query,
            vec![Section {
                title: "Prior work".to_string(),
                text: "A relevant summary.".to_string(),
                citations: vec![],
            }],
        ))
    }
}

/// Retriever that always fails
struct FailingRetriever;

#[async_trait]
impl KnowledgeRetriever for FailingRetriever {
    async fn retrieve(&self, _query: &str) -> CapabilityResult<RetrievalRecord> {
        Err(CapabilityError::Api {
            status: 500,
            message: "index offline".to_string(),
        })
    }
}

fn default_scores() -> Vec<(&'static str, f64)> {
    vec![("novelty", 8.0), ("clarity", 6.0), ("feasibility", 4.0)]
}

fn make_session(
    evaluator: Arc<ScriptedEvaluator>,
    retriever: Arc<dyn KnowledgeRetriever>,
) -> ExplorationSession {
    let core = EngineCore::new(Arc::new(ScriptedGenerator::new()), evaluator, retriever);
    ExplorationSession::new(core, "test research goal", ExplorationOptions::default()).unwrap()
}

fn count_nodes(view: &TreeView) -> usize {
    1 + view.children.iter().map(count_nodes).sum::<usize>()
}

fn collect_ids(view: &TreeView, out: &mut Vec<(String, u32)>) {
    out.push((view.id.clone(), view.depth));
    for child in &view.children {
        collect_ids(child, out);
    }
}

#[tokio::test]
async fn test_generate_creates_depth_one_child() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    let outcome = session.execute("generate").await.unwrap();
    assert_eq!(outcome.depth, 1);
    assert_eq!(outcome.average_score, Some(6.0));
    assert_eq!(outcome.reward, Some(0.6));

    let view = session.tree_view().await;
    assert_eq!(view.children.len(), 1);
    assert_eq!(view.children[0].id, outcome.node_id);
    assert!(view.children[0].is_current);
    assert!(view.children[0].has_reviews);
}

#[tokio::test]
async fn test_generate_rejected_off_root() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    session.execute("generate").await.unwrap();
    // Cursor is now on the depth-1 child.
    let err = session.execute("generate").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
async fn test_unknown_action_rejected() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    let err = session.execute("polish").await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownAction { name } if name == "polish"));
    assert_eq!(count_nodes(&session.tree_view().await), 1);
}

#[tokio::test]
async fn test_review_and_refine_critiques_weakest_aspects_ascending() {
    let evaluator = Arc::new(ScriptedEvaluator::new(default_scores()));
    let session = make_session(evaluator.clone(), Arc::new(RecordingRetriever::new()));

    session.execute("generate").await.unwrap();
    let outcome = session.execute("review_and_refine").await.unwrap();

    assert_eq!(outcome.depth, 2);
    assert_eq!(
        evaluator.critiqued_aspects(),
        vec!["feasibility", "clarity", "novelty"]
    );
}

#[tokio::test]
async fn test_refresh_attaches_to_root_with_reset_provenance() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    session.execute("generate").await.unwrap();
    session.execute("retrieve_and_refine").await.unwrap();
    // Current node is at depth 2 and carries retrieval.
    let outcome = session.execute("refresh_idea").await.unwrap();
    assert_eq!(outcome.depth, 1);

    let view = session.tree_view().await;
    // The refresh node hangs off the root, next to the generated one.
    assert_eq!(view.children.len(), 2);
    let refresh = view
        .children
        .iter()
        .find(|c| c.id == outcome.node_id)
        .expect("refresh node should be a root child");
    assert_eq!(refresh.action, "refresh_idea");
    assert!(!refresh.has_retrieval);
    assert!(!refresh.has_feedback);
}

#[tokio::test]
async fn test_retrieve_and_refine_uses_structured_query() {
    let retriever = Arc::new(RecordingRetriever::new());
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        retriever.clone(),
    );

    session.execute("generate").await.unwrap();
    let outcome = session.execute("retrieve_and_refine").await.unwrap();

    assert_eq!(retriever.queries(), vec!["scripted search query"]);
    let view = session.tree_view().await;
    let node = view.children[0]
        .children
        .iter()
        .find(|c| c.id == outcome.node_id)
        .unwrap();
    assert!(node.has_retrieval);
}

#[tokio::test]
async fn test_search_query_falls_back_to_first_sentence() {
    let generator = ScriptedGenerator::with_query_completion("no structured payload here");
    let retriever = Arc::new(RecordingRetriever::new());
    let core = EngineCore::new(
        Arc::new(generator),
        Arc::new(ScriptedEvaluator::new(default_scores())),
        retriever.clone(),
    );
    let session =
        ExplorationSession::new(core, "test research goal", ExplorationOptions::default()).unwrap();

    session.execute("generate").await.unwrap();
    session.execute("retrieve_and_refine").await.unwrap();

    // The initial idea's first sentence stands in for the missing payload.
    assert_eq!(
        retriever.queries(),
        vec!["Use retrieval-augmented sparse attention"]
    );
}

#[tokio::test]
async fn test_consecutive_retrievals_extend_knowledge_by_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.json");

    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );
    session.execute("generate").await.unwrap();
    session.execute("retrieve_and_refine").await.unwrap();
    session.execute("retrieve_and_refine").await.unwrap();
    session.save_snapshot(&path).await.unwrap();

    // The snapshot exposes the full node states along the chain
    // root -> generated -> first retrieval -> second retrieval.
    let tree = IdeaTree::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let root = tree.node(tree.root());
    let generated = tree.node(root.children[0]);
    let first = tree.node(generated.children[0]);
    let second = tree.node(first.children[0]);

    assert!(generated.state.retrieved_knowledge.is_empty());
    assert_eq!(first.state.retrieved_knowledge.len(), 1);
    assert_eq!(second.state.retrieved_knowledge.len(), 2);
    // The parent's records stay a prefix of the child's.
    assert_eq!(
        second.state.retrieved_knowledge[0],
        first.state.retrieved_knowledge[0]
    );
    assert_eq!(second.state.retrieved_knowledge[1].query, "scripted search query");
}

#[tokio::test]
async fn test_retrieval_failure_leaves_tree_unchanged() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(FailingRetriever),
    );

    session.execute("generate").await.unwrap();
    let before = session.tree_view().await;

    let err = session.execute("retrieve_and_refine").await.unwrap_err();
    assert!(matches!(err, EngineError::RetrievalFailed(_)));

    let after = session.tree_view().await;
    assert_eq!(count_nodes(&after), count_nodes(&before));
    let mut before_ids = Vec::new();
    let mut after_ids = Vec::new();
    collect_ids(&before, &mut before_ids);
    collect_ids(&after, &mut after_ids);
    assert_eq!(after_ids, before_ids);
}

#[tokio::test]
async fn test_unscored_review_leaves_reward_unset() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(vec![])),
        Arc::new(RecordingRetriever::new()),
    );

    let outcome = session.execute("generate").await.unwrap();
    assert!(outcome.average_score.is_none());
    assert!(outcome.reward.is_none());

    let view = session.tree_view().await;
    assert!(!view.children[0].has_reviews);
}

#[tokio::test]
async fn test_select_node_moves_cursor() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    session.execute("generate").await.unwrap();
    let root_id = session.tree_view().await.id.clone();

    session.select_node(&root_id).await.unwrap();
    // Back at the root, generate is valid again and branches sideways.
    session.execute("generate").await.unwrap();

    let view = session.tree_view().await;
    assert_eq!(view.children.len(), 2);

    let err = session.select_node("no-such-node").await.unwrap_err();
    assert!(matches!(err, EngineError::NodeNotFound { .. }));
}

#[tokio::test]
async fn test_current_summary_follows_cursor() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    let root_summary = session.current_summary().await;
    assert_eq!(root_summary.depth, 0);
    assert!(root_summary.action.is_none());
    assert_eq!(root_summary.current_idea, "test research goal");

    let outcome = session.execute("generate").await.unwrap();
    let summary = session.current_summary().await;
    assert_eq!(summary.node_id, outcome.node_id);
    assert_eq!(summary.depth, 1);
    assert_eq!(summary.average_score, Some(6.0));
}

#[tokio::test]
async fn test_trajectory_tracks_actions_in_order() {
    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );

    session.execute("generate").await.unwrap();
    session.execute("review_and_refine").await.unwrap();
    session.execute("retrieve_and_refine").await.unwrap();

    let steps = session.trajectory().await;
    let actions: Vec<&str> = steps.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(
        actions,
        vec!["generate", "review_and_refine", "retrieve_and_refine"]
    );
    let depths: Vec<u32> = steps.iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_snapshot_round_trip_preserves_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let session = make_session(
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );
    session.execute("generate").await.unwrap();
    session.execute("review_and_refine").await.unwrap();
    session.save_snapshot(&path).await.unwrap();

    let core = EngineCore::new(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(ScriptedEvaluator::new(default_scores())),
        Arc::new(RecordingRetriever::new()),
    );
    let resumed = ExplorationSession::resume(core, &path, ExplorationOptions::default())
        .await
        .unwrap();

    let mut original_ids = Vec::new();
    let mut resumed_ids = Vec::new();
    collect_ids(&session.tree_view().await, &mut original_ids);
    collect_ids(&resumed.tree_view().await, &mut resumed_ids);
    assert_eq!(resumed_ids, original_ids);

    // The resumed cursor still points at the last attached node.
    let outcome = resumed.execute("review_and_refine").await.unwrap();
    assert_eq!(outcome.depth, 3);
}
