use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Action, IdeaState};

/// Index of a node inside an [`IdeaTree`](super::IdeaTree) arena.
///
/// Plain index, not a stable handle: valid only for the tree it came from.
/// Nodes are never removed, so an id stays valid for the tree's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root's arena slot.
    pub const ROOT: NodeId = NodeId(0);

    /// The raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the refinement tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaNode {
    /// Stable external identifier, independent of the arena index.
    pub id: String,
    /// Content snapshot for this node.
    pub state: IdeaState,
    /// The action that produced this node. `None` only at the root.
    pub action: Option<Action>,
    /// Parent slot, `None` only at the root.
    pub parent: Option<NodeId>,
    /// Child slots in creation order.
    pub children: Vec<NodeId>,
    /// Number of backpropagated visits.
    pub visits: u32,
    /// Running mean of backpropagated rewards.
    pub value: f64,
}

impl IdeaNode {
    pub(crate) fn new(state: IdeaState, action: Option<Action>, parent: Option<NodeId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state,
            action,
            parent,
            children: Vec::new(),
            visits: 0,
            value: 0.0,
        }
    }

    /// Fold one reward into the running mean.
    pub(crate) fn record_visit(&mut self, reward: f64) {
        self.visits += 1;
        self.value += (reward - self.value) / self.visits as f64;
    }

    /// Whether this node is the tree root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_visit_incremental_mean() {
        let mut node = IdeaNode::new(IdeaState::root("g"), None, None);
        node.record_visit(0.8);
        assert_eq!(node.visits, 1);
        assert!((node.value - 0.8).abs() < 1e-12);

        node.record_visit(0.4);
        assert_eq!(node.visits, 2);
        assert!((node.value - 0.6).abs() < 1e-12);

        node.record_visit(0.6);
        assert_eq!(node.visits, 3);
        assert!((node.value - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_node_ids_are_unique() {
        let a = IdeaNode::new(IdeaState::root("g"), None, None);
        let b = IdeaNode::new(IdeaState::root("g"), None, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_root_detection() {
        let root = IdeaNode::new(IdeaState::root("g"), None, None);
        assert!(root.is_root());
        let child = IdeaNode::new(
            IdeaState::derived(&root.state, "idea"),
            Some(Action::Generate),
            Some(NodeId::ROOT),
        );
        assert!(!child.is_root());
    }
}
