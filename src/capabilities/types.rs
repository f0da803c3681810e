use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message in a capability conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// What the generation capability is being asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTask {
    /// A first idea from the research goal alone.
    InitialIdea,
    /// A refinement addressing reviewer critiques.
    ReviewRefine,
    /// A refinement grounded in retrieved literature.
    RetrieveRefine,
    /// An unrelated alternative approach to the same goal.
    FreshPerspective,
    /// A short literature search query for the current idea.
    SearchQuery,
}

impl GenerationTask {
    /// Get the task name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationTask::InitialIdea => "initial_idea",
            GenerationTask::ReviewRefine => "review_refine",
            GenerationTask::RetrieveRefine => "retrieve_refine",
            GenerationTask::FreshPerspective => "fresh_perspective",
            GenerationTask::SearchQuery => "search_query",
        }
    }
}

impl std::fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context bundle handed to the generation capability.
///
/// Only the fields relevant to the task are populated; the rest stay `None`
/// or empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_idea: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub critiques: Vec<AspectCritique>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved: Option<RetrievalRecord>,
}

impl GenerationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the research goal
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.research_goal = Some(goal.into());
        self
    }

    /// Set the current idea text
    pub fn with_idea(mut self, idea: impl Into<String>) -> Self {
        self.current_idea = Some(idea.into());
        self
    }

    /// Attach reviewer critiques
    pub fn with_critiques(mut self, critiques: Vec<AspectCritique>) -> Self {
        self.critiques = critiques;
        self
    }

    /// Attach a retrieval record
    pub fn with_retrieved(mut self, record: RetrievalRecord) -> Self {
        self.retrieved = Some(record);
        self
    }
}

/// Text produced by the generation capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedIdea {
    pub content: String,
}

/// One aspect's numeric score from a review.
///
/// Reviews keep aspects in the order the evaluator reported them; that order
/// is the tie-break when sorting by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectScore {
    pub aspect: String,
    pub score: f64,
}

/// Multi-aspect review of an idea.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    /// Scores in evaluator order (0-10 per aspect).
    pub aspects: Vec<AspectScore>,
    /// Free-text critique per aspect.
    #[serde(default)]
    pub feedback: BTreeMap<String, String>,
    /// Weighted average across aspects. `None` means "not reviewed".
    pub average_score: Option<f64>,
}

impl Review {
    /// Whether the evaluator produced any scores at all
    pub fn is_scored(&self) -> bool {
        !self.aspects.is_empty()
    }

    /// Scores keyed by aspect name
    pub fn scores_map(&self) -> BTreeMap<String, f64> {
        self.aspects
            .iter()
            .map(|a| (a.aspect.clone(), a.score))
            .collect()
    }

    /// The `n` lowest-scoring aspects, ascending by score.
    ///
    /// The sort is stable, so aspects with equal scores keep the order the
    /// evaluator reported them in.
    pub fn lowest_aspects(&self, n: usize) -> Vec<&AspectScore> {
        let mut sorted: Vec<&AspectScore> = self.aspects.iter().collect();
        sorted.sort_by(|a, b| a.score.total_cmp(&b.score));
        sorted.truncate(n);
        sorted
    }
}

/// Detailed critique of one aspect of an idea
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectCritique {
    pub aspect: String,
    pub critique: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// One retrieved document section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

/// Result of one retrieval call, kept verbatim in node states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRecord {
    pub query: String,
    pub sections: Vec<Section>,
    pub retrieved_at: DateTime<Utc>,
}

impl RetrievalRecord {
    /// Create a record for the given query, stamped with the current time
    pub fn new(query: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            query: query.into(),
            sections,
            retrieved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generation_task_as_str() {
        assert_eq!(GenerationTask::InitialIdea.as_str(), "initial_idea");
        assert_eq!(GenerationTask::ReviewRefine.as_str(), "review_refine");
        assert_eq!(GenerationTask::RetrieveRefine.as_str(), "retrieve_refine");
        assert_eq!(
            GenerationTask::FreshPerspective.as_str(),
            "fresh_perspective"
        );
        assert_eq!(GenerationTask::SearchQuery.as_str(), "search_query");
    }

    #[test]
    fn test_generation_context_builder() {
        let record = RetrievalRecord::new("test query", vec![]);
        let ctx = GenerationContext::new()
            .with_goal("goal")
            .with_idea("idea")
            .with_retrieved(record);
        assert_eq!(ctx.research_goal.as_deref(), Some("goal"));
        assert_eq!(ctx.current_idea.as_deref(), Some("idea"));
        assert!(ctx.retrieved.is_some());
        assert!(ctx.critiques.is_empty());
    }

    #[test]
    fn test_generation_context_skips_absent_fields() {
        let ctx = GenerationContext::new().with_idea("only the idea");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["current_idea"], "only the idea");
        assert!(json.get("research_goal").is_none());
        assert!(json.get("critiques").is_none());
        assert!(json.get("retrieved").is_none());
    }

    #[test]
    fn test_review_lowest_aspects_ascending() {
        let review = Review {
            aspects: vec![
                AspectScore {
                    aspect: "novelty".to_string(),
                    score: 8.0,
                },
                AspectScore {
                    aspect: "clarity".to_string(),
                    score: 6.0,
                },
                AspectScore {
                    aspect: "feasibility".to_string(),
                    score: 4.0,
                },
            ],
            feedback: BTreeMap::new(),
            average_score: Some(6.0),
        };

        let lowest = review.lowest_aspects(3);
        let names: Vec<&str> = lowest.iter().map(|a| a.aspect.as_str()).collect();
        assert_eq!(names, vec!["feasibility", "clarity", "novelty"]);
    }

    #[test]
    fn test_review_lowest_aspects_stable_on_ties() {
        let review = Review {
            aspects: vec![
                AspectScore {
                    aspect: "impact".to_string(),
                    score: 5.0,
                },
                AspectScore {
                    aspect: "effectiveness".to_string(),
                    score: 5.0,
                },
                AspectScore {
                    aspect: "clarity".to_string(),
                    score: 9.0,
                },
            ],
            feedback: BTreeMap::new(),
            average_score: Some(6.3),
        };

        let lowest = review.lowest_aspects(2);
        // Equal scores keep evaluator order: impact was reported first.
        assert_eq!(lowest[0].aspect, "impact");
        assert_eq!(lowest[1].aspect, "effectiveness");
    }

    #[test]
    fn test_review_lowest_aspects_fewer_than_requested() {
        let review = Review {
            aspects: vec![AspectScore {
                aspect: "novelty".to_string(),
                score: 7.0,
            }],
            feedback: BTreeMap::new(),
            average_score: Some(7.0),
        };
        assert_eq!(review.lowest_aspects(3).len(), 1);
    }

    #[test]
    fn test_review_not_scored() {
        let review = Review::default();
        assert!(!review.is_scored());
        assert!(review.average_score.is_none());
    }

    #[test]
    fn test_review_deserialize() {
        let json = json!({
            "aspects": [
                {"aspect": "novelty", "score": 7.5},
                {"aspect": "clarity", "score": 8.0}
            ],
            "feedback": {"novelty": "builds on known ideas"},
            "average_score": 7.75
        });
        let review: Review = serde_json::from_value(json).unwrap();
        assert_eq!(review.aspects.len(), 2);
        assert_eq!(review.aspects[0].aspect, "novelty");
        assert_eq!(review.average_score, Some(7.75));
    }

    #[test]
    fn test_retrieval_record_round_trip() {
        let record = RetrievalRecord::new(
            "attention sparsity",
            vec![Section {
                title: "Sparse attention".to_string(),
                text: "Summary of sparse attention methods.".to_string(),
                citations: vec!["doi:10.0/xyz".to_string()],
            }],
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: RetrievalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::system("you are a reviewer");
        assert!(matches!(msg.role, MessageRole::System));
        let msg = Message::user("review this");
        assert!(matches!(msg.role, MessageRole::User));
        assert_eq!(msg.content, "review this");
    }
}
