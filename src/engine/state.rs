use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capabilities::{RetrievalRecord, Review};

/// The content snapshot at one node of the refinement tree.
///
/// Immutable once constructed: actions derive a new state from the current
/// one, they never edit it in place. Fields that only exist after an
/// evaluation are `Option`s; `None` means "not reviewed", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaState {
    /// The research goal, set at the root and inherited unchanged.
    pub research_goal: String,
    /// The refinement text this node represents.
    pub current_idea: String,
    /// Retrieval results accumulated along this trajectory.
    #[serde(default)]
    pub retrieved_knowledge: Vec<RetrievalRecord>,
    /// Free-text feedback keyed by an opaque timestamp string.
    #[serde(default)]
    pub feedback: BTreeMap<String, String>,
    /// Aspect name to score (0-10), once an evaluation has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_scores: Option<BTreeMap<String, f64>>,
    /// Aspect name to critique text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<BTreeMap<String, String>>,
    /// Mean of `review_scores`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    /// `average_score / 10`, the 0-1 signal used by the search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    /// Distance from the root (root = 0).
    pub depth: u32,
}

impl IdeaState {
    /// The root state: only the goal, with the idea text set to the goal as
    /// a placeholder.
    pub fn root(research_goal: impl Into<String>) -> Self {
        let goal = research_goal.into();
        Self {
            current_idea: goal.clone(),
            research_goal: goal,
            retrieved_knowledge: Vec::new(),
            feedback: BTreeMap::new(),
            review_scores: None,
            review_feedback: None,
            average_score: None,
            reward: None,
            depth: 0,
        }
    }

    /// A child state inheriting the parent's knowledge and feedback, one
    /// level deeper.
    pub fn derived(parent: &IdeaState, idea: impl Into<String>) -> Self {
        Self {
            research_goal: parent.research_goal.clone(),
            current_idea: idea.into(),
            retrieved_knowledge: parent.retrieved_knowledge.clone(),
            feedback: parent.feedback.clone(),
            review_scores: None,
            review_feedback: None,
            average_score: None,
            reward: None,
            depth: parent.depth + 1,
        }
    }

    /// A full-restart state: empty knowledge and feedback, fixed at depth 1
    /// since restart nodes attach to the root.
    pub fn restarted(research_goal: impl Into<String>, idea: impl Into<String>) -> Self {
        Self {
            research_goal: research_goal.into(),
            current_idea: idea.into(),
            retrieved_knowledge: Vec::new(),
            feedback: BTreeMap::new(),
            review_scores: None,
            review_feedback: None,
            average_score: None,
            reward: None,
            depth: 1,
        }
    }

    /// Append one retrieval record
    pub fn with_knowledge(mut self, record: RetrievalRecord) -> Self {
        self.retrieved_knowledge.push(record);
        self
    }

    /// Apply an evaluation result.
    ///
    /// An unscored review (no aspects) leaves every review field `None`,
    /// per the "absent means not reviewed" policy. An absent average leaves
    /// `average_score` and `reward` unset even when per-aspect scores exist.
    pub fn with_review(mut self, review: &Review) -> Self {
        if !review.is_scored() {
            return self;
        }
        self.review_scores = Some(review.scores_map());
        if !review.feedback.is_empty() {
            self.review_feedback = Some(review.feedback.clone());
        }
        self.average_score = review.average_score;
        self.reward = review.average_score.map(|avg| (avg / 10.0).clamp(0.0, 1.0));
        self
    }

    /// Whether an evaluation has produced scores for this state
    pub fn is_reviewed(&self) -> bool {
        self.review_scores.is_some()
    }

    /// The recorded novelty score, if this state has been reviewed
    pub fn novelty_score(&self) -> Option<f64> {
        self.review_scores
            .as_ref()
            .and_then(|scores| scores.get("novelty").copied())
    }
}
