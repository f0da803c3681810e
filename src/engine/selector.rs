use tracing::debug;

use super::{Action, IdeaTree, NodeId};

/// Extra pull toward retrieval when the current idea scored low on novelty.
const RETRIEVE_NOVELTY_BONUS: f64 = 0.2;
/// Novelty score below which the retrieval bonus applies.
const NOVELTY_THRESHOLD: f64 = 7.0;
/// Extra pull toward a restart once the trajectory runs deep.
const REFRESH_DEPTH_BONUS: f64 = 0.15;
/// Depth beyond which the restart bonus applies.
const REFRESH_DEPTH_THRESHOLD: u32 = 3;

/// UCT action choice over the selectable strategies.
///
/// Untried actions score infinity, so every candidate runs once before any
/// is revisited. Tried actions score exploitation plus exploration plus a
/// domain bonus; ties keep the earlier candidate.
#[derive(Debug, Clone)]
pub struct Selector {
    exploration_constant: f64,
}

impl Selector {
    pub fn new(exploration_constant: f64) -> Self {
        Self {
            exploration_constant,
        }
    }

    /// Pick the next action for the node at `current`.
    pub fn choose(&self, tree: &IdeaTree, current: NodeId) -> Action {
        let node = tree.node(current);
        let parent_visits = node.visits.max(1) as f64;
        let novelty = node.state.novelty_score();
        let depth = node.state.depth;

        let mut best = Action::SELECTABLE[0];
        let mut best_score = f64::NEG_INFINITY;
        for action in Action::SELECTABLE {
            let score = match tree.child_with_action(current, action) {
                None => f64::INFINITY,
                Some(child_id) => {
                    let child = tree.node(child_id);
                    let exploitation = child.value;
                    let exploration = self.exploration_constant
                        * (parent_visits.ln() / child.visits.max(1) as f64).sqrt();
                    exploitation + exploration + self.bonus(action, novelty, depth)
                }
            };
            debug!(action = %action, score, "scored candidate");
            if score > best_score {
                best = action;
                best_score = score;
            }
        }
        best
    }

    fn bonus(&self, action: Action, novelty: Option<f64>, depth: u32) -> f64 {
        match action {
            Action::RetrieveAndRefine
                if novelty.is_some_and(|n| n < NOVELTY_THRESHOLD) =>
            {
                RETRIEVE_NOVELTY_BONUS
            }
            Action::RefreshIdea if depth > REFRESH_DEPTH_THRESHOLD => REFRESH_DEPTH_BONUS,
            _ => 0.0,
        }
    }
}
