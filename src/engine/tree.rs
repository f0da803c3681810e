use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{truncate_chars, Action, IdeaNode, IdeaState, NodeId};

/// Arena-backed refinement tree with a movable cursor.
///
/// Nodes live in a flat `Vec` and refer to each other by [`NodeId`] index.
/// The tree only ever grows; nodes are never removed or mutated in place
/// apart from their visit statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaTree {
    nodes: Vec<IdeaNode>,
    root: NodeId,
    current: NodeId,
}

impl IdeaTree {
    /// Create a tree whose root holds only the research goal.
    pub fn new(research_goal: &str) -> EngineResult<Self> {
        if research_goal.trim().is_empty() {
            return Err(EngineError::InvalidState {
                message: "research goal must not be empty".to_string(),
            });
        }
        let root = IdeaNode::new(IdeaState::root(research_goal), None, None);
        Ok(Self {
            nodes: vec![root],
            root: NodeId::ROOT,
            current: NodeId::ROOT,
        })
    }

    /// The root slot
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The cursor slot
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Borrow a node by slot
    pub fn node(&self, id: NodeId) -> &IdeaNode {
        &self.nodes[id.0]
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach a new node under `parent` and move the cursor onto it.
    pub fn attach_child(&mut self, parent: NodeId, state: IdeaState, action: Action) -> NodeId {
        let child = NodeId(self.nodes.len());
        self.nodes
            .push(IdeaNode::new(state, Some(action), Some(parent)));
        self.nodes[parent.0].children.push(child);
        self.current = child;
        child
    }

    /// Move the cursor to the node with the given external id.
    pub fn set_current(&mut self, node_id: &str) -> EngineResult<NodeId> {
        let slot = self.find_by_id(node_id)?;
        self.current = slot;
        Ok(slot)
    }

    /// Depth-first lookup by external id, parent before children, children
    /// in insertion order.
    pub fn find_by_id(&self, node_id: &str) -> EngineResult<NodeId> {
        let mut stack = vec![self.root];
        while let Some(slot) = stack.pop() {
            let node = &self.nodes[slot.0];
            if node.id == node_id {
                return Ok(slot);
            }
            // Reverse push keeps insertion-order traversal with a stack.
            stack.extend(node.children.iter().rev().copied());
        }
        Err(EngineError::NodeNotFound {
            node_id: node_id.to_string(),
        })
    }

    /// The existing child of `parent` produced by `action`, if any.
    pub fn child_with_action(&self, parent: NodeId, action: Action) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].action == Some(action))
    }

    /// The root-to-`node` path as `{id, action, depth}` steps, excluding the
    /// root itself.
    pub fn trajectory(&self, node: NodeId) -> Vec<TrajectoryStep> {
        let mut steps = Vec::new();
        let mut slot = node;
        while let Some(parent) = self.nodes[slot.0].parent {
            let n = &self.nodes[slot.0];
            steps.push(TrajectoryStep {
                id: n.id.clone(),
                action: n.action.map(|a| a.as_str().to_string()).unwrap_or_default(),
                depth: n.state.depth,
            });
            slot = parent;
        }
        steps.reverse();
        steps
    }

    /// Greedy descent to the leaf reachable through highest-value children.
    ///
    /// Ties keep the earlier child, so only a strictly greater value wins.
    pub fn best_path_leaf(&self) -> NodeId {
        let mut slot = self.root;
        loop {
            let children = &self.nodes[slot.0].children;
            if children.is_empty() {
                return slot;
            }
            let mut best = children[0];
            for &child in &children[1..] {
                if self.nodes[child.0].value > self.nodes[best.0].value {
                    best = child;
                }
            }
            slot = best;
        }
    }

    /// Propagate a reward from `from` up to the root, updating visit counts
    /// and running-mean values. Returns the number of nodes updated.
    pub fn backpropagate(&mut self, from: NodeId, reward: f64) -> usize {
        let mut updated = 0;
        let mut slot = Some(from);
        while let Some(s) = slot {
            self.nodes[s.0].record_visit(reward);
            updated += 1;
            slot = self.nodes[s.0].parent;
        }
        updated
    }

    /// Nested display view of the whole tree.
    pub fn view(&self) -> TreeView {
        self.view_of(self.root)
    }

    fn view_of(&self, slot: NodeId) -> TreeView {
        let node = &self.nodes[slot.0];
        let is_root = node.is_root();
        let idea = if is_root {
            format!(
                "RESEARCH GOAL: {}",
                truncate_chars(&node.state.research_goal, 80)
            )
        } else {
            truncate_chars(&node.state.current_idea, 100)
        };
        TreeView {
            id: node.id.clone(),
            action: node
                .action
                .map(|a| a.as_str().to_string())
                .unwrap_or_else(|| "research_goal".to_string()),
            idea,
            depth: node.state.depth,
            reward: node.state.reward,
            value: node.value,
            visits: node.visits,
            is_current: slot == self.current,
            has_reviews: !is_root && node.state.review_scores.is_some(),
            has_retrieval: !is_root && !node.state.retrieved_knowledge.is_empty(),
            has_feedback: !is_root && !node.state.feedback.is_empty(),
            is_research_goal: is_root,
            children: node
                .children
                .iter()
                .map(|&child| self.view_of(child))
                .collect(),
        }
    }

    /// Serialize the full tree as pretty JSON. The file I/O around snapshots
    /// lives in the session, which writes asynchronously.
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Snapshot {
            message: format!("serialize tree: {e}"),
        })
    }

    /// Rebuild a tree from JSON written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Snapshot {
            message: format!("parse tree snapshot: {e}"),
        })
    }
}

/// One step of a root-to-node trajectory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrajectoryStep {
    pub id: String,
    pub action: String,
    pub depth: u32,
}

/// Nested per-node display record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    pub id: String,
    pub action: String,
    pub idea: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    pub value: f64,
    pub visits: u32,
    pub is_current: bool,
    pub has_reviews: bool,
    pub has_retrieval: bool,
    pub has_feedback: bool,
    pub is_research_goal: bool,
    pub children: Vec<TreeView>,
}
