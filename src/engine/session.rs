use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

use super::{
    Action, ActionRunner, EngineCore, IdeaTree, NodeId, Selector, TrajectoryStep, TreeView,
};

/// Tunables for a session's automatic exploration.
#[derive(Debug, Clone)]
pub struct ExplorationOptions {
    pub exploration_constant: f64,
    pub default_iterations: u32,
}

impl Default for ExplorationOptions {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            default_iterations: 5,
        }
    }
}

/// What one executed action produced.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub node_id: String,
    pub action: Action,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
}

/// Where the cursor stands right now.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub current_idea: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    pub visits: u32,
    pub value: f64,
}

/// Per-iteration record of an exploration run.
#[derive(Debug, Clone, Serialize)]
pub struct IterationStat {
    pub iteration: u32,
    pub action: Action,
    pub node_id: String,
    pub reward: f64,
    pub nodes_updated: usize,
}

/// Summary of an exploration run.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationReport {
    pub session_id: String,
    pub iterations_requested: u32,
    pub iterations_run: u32,
    pub stopped_early: bool,
    pub iterations: Vec<IterationStat>,
    pub tree_size: usize,
    pub best_path: Vec<TrajectoryStep>,
}

/// One refinement tree plus everything needed to act on it.
///
/// The tree sits behind a single async mutex; every operation that reads or
/// mutates it takes that lock, including across capability calls, so an
/// action's read-then-attach is atomic with respect to other callers.
/// Autonomous exploration additionally holds an `exploring` flag so a second
/// exploration cannot start while one is running.
pub struct ExplorationSession {
    id: String,
    runner: ActionRunner,
    selector: Selector,
    tree: Mutex<IdeaTree>,
    exploring: AtomicBool,
    stop: AtomicBool,
    default_iterations: u32,
}

impl ExplorationSession {
    /// Start a session with a fresh tree for `research_goal`.
    pub fn new(
        core: EngineCore,
        research_goal: &str,
        options: ExplorationOptions,
    ) -> EngineResult<Self> {
        let tree = IdeaTree::new(research_goal)?;
        Ok(Self::with_tree(core, tree, options))
    }

    /// Resume a session from a snapshot written by [`save_snapshot`](Self::save_snapshot).
    pub async fn resume(
        core: EngineCore,
        snapshot: &Path,
        options: ExplorationOptions,
    ) -> EngineResult<Self> {
        let json = tokio::fs::read_to_string(snapshot)
            .await
            .map_err(|e| EngineError::Snapshot {
                message: format!("read {}: {e}", snapshot.display()),
            })?;
        let tree = IdeaTree::from_json(&json)?;
        info!(nodes = tree.len(), path = %snapshot.display(), "resumed tree from snapshot");
        Ok(Self::with_tree(core, tree, options))
    }

    fn with_tree(core: EngineCore, tree: IdeaTree, options: ExplorationOptions) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            runner: ActionRunner::new(core),
            selector: Selector::new(options.exploration_constant),
            tree: Mutex::new(tree),
            exploring: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            default_iterations: options.default_iterations,
        }
    }

    /// Session identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Execute a named action against the current node.
    ///
    /// Refused while an exploration run holds the session; without the
    /// refusal the call would block on the tree mutex for the whole run and
    /// then act on whatever cursor the loop left behind.
    pub async fn execute(&self, action_name: &str) -> EngineResult<StepOutcome> {
        let action: Action = action_name.parse()?;
        self.ensure_not_exploring()?;
        let mut tree = self.tree.lock().await;
        self.execute_locked(&mut tree, action).await.map(|(_, o)| o)
    }

    /// Pick an action with the selector and execute it.
    pub async fn auto_step(&self) -> EngineResult<StepOutcome> {
        self.ensure_not_exploring()?;
        let mut tree = self.tree.lock().await;
        let action = self.selector.choose(&tree, tree.current());
        self.execute_locked(&mut tree, action).await.map(|(_, o)| o)
    }

    fn ensure_not_exploring(&self) -> EngineResult<()> {
        if self.exploring.load(Ordering::Acquire) {
            return Err(EngineError::ExplorationInProgress);
        }
        Ok(())
    }

    async fn execute_locked(
        &self,
        tree: &mut IdeaTree,
        action: Action,
    ) -> EngineResult<(NodeId, StepOutcome)> {
        // All capability calls finish before the tree changes.
        let plan = self.runner.run(tree, tree.current(), action).await?;
        let parent = if plan.attach_to_root {
            tree.root()
        } else {
            tree.current()
        };
        let slot = tree.attach_child(parent, plan.state, plan.action);
        let node = tree.node(slot);
        info!(
            action = %plan.action,
            node_id = %node.id,
            depth = node.state.depth,
            average_score = ?node.state.average_score,
            "attached refinement"
        );
        let outcome = StepOutcome {
            node_id: node.id.clone(),
            action: plan.action,
            depth: node.state.depth,
            average_score: node.state.average_score,
            reward: node.state.reward,
        };
        Ok((slot, outcome))
    }

    /// Move the cursor to the node with the given id.
    ///
    /// Refused while an exploration run holds the session, since the loop
    /// steps from the cursor.
    pub async fn select_node(&self, node_id: &str) -> EngineResult<()> {
        self.ensure_not_exploring()?;
        let mut tree = self.tree.lock().await;
        tree.set_current(node_id)?;
        Ok(())
    }

    /// Nested display view of the tree.
    pub async fn tree_view(&self) -> TreeView {
        self.tree.lock().await.view()
    }

    /// Summary of the node the cursor stands on.
    pub async fn current_summary(&self) -> NodeSummary {
        let tree = self.tree.lock().await;
        let node = tree.node(tree.current());
        NodeSummary {
            node_id: node.id.clone(),
            action: node.action,
            current_idea: node.state.current_idea.clone(),
            depth: node.state.depth,
            average_score: node.state.average_score,
            reward: node.state.reward,
            visits: node.visits,
            value: node.value,
        }
    }

    /// Root-to-current path, excluding the root.
    pub async fn trajectory(&self) -> Vec<TrajectoryStep> {
        let tree = self.tree.lock().await;
        tree.trajectory(tree.current())
    }

    /// Root-to-best-leaf path by greedy value descent, excluding the root.
    pub async fn best_path(&self) -> Vec<TrajectoryStep> {
        let tree = self.tree.lock().await;
        tree.trajectory(tree.best_path_leaf())
    }

    /// Run selector-driven iterations, backpropagating each reward.
    ///
    /// Rejects with [`EngineError::ExplorationInProgress`] if another
    /// exploration holds the session. Checks the stop flag between
    /// iterations. A capability failure aborts the run and reports which
    /// iteration failed; nodes attached by earlier iterations stay.
    pub async fn explore(&self, iterations: Option<u32>) -> EngineResult<ExplorationReport> {
        let requested = iterations.unwrap_or(self.default_iterations);
        if self
            .exploring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::ExplorationInProgress);
        }
        self.stop.store(false, Ordering::Release);

        let result = self.explore_inner(requested).await;
        self.exploring.store(false, Ordering::Release);
        result
    }

    async fn explore_inner(&self, requested: u32) -> EngineResult<ExplorationReport> {
        let mut tree = self.tree.lock().await;
        let mut stats = Vec::new();
        let mut stopped_early = false;

        info!(session_id = %self.id, iterations = requested, "starting exploration");
        for i in 0..requested {
            if self.stop.load(Ordering::Acquire) {
                warn!(iteration = i, "exploration stopped on request");
                stopped_early = true;
                break;
            }
            let action = self.selector.choose(&tree, tree.current());
            let (slot, outcome) = self
                .execute_locked(&mut tree, action)
                .await
                .map_err(|e| EngineError::Exploration {
                    iteration: (i + 1) as usize,
                    source: Box::new(e),
                })?;
            let reward = outcome.reward.unwrap_or(0.0);
            let nodes_updated = tree.backpropagate(slot, reward);
            stats.push(IterationStat {
                iteration: i + 1,
                action,
                node_id: outcome.node_id,
                reward,
                nodes_updated,
            });
        }

        let report = ExplorationReport {
            session_id: self.id.clone(),
            iterations_requested: requested,
            iterations_run: stats.len() as u32,
            stopped_early,
            iterations: stats,
            tree_size: tree.len(),
            best_path: tree.trajectory(tree.best_path_leaf()),
        };
        info!(
            iterations_run = report.iterations_run,
            tree_size = report.tree_size,
            "exploration finished"
        );
        Ok(report)
    }

    /// Ask a running exploration to stop after its current iteration.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether an exploration run currently holds the session
    pub fn is_exploring(&self) -> bool {
        self.exploring.load(Ordering::Acquire)
    }

    /// Write the tree to `path` as JSON.
    ///
    /// Serializes under the lock and writes after releasing it, so the file
    /// I/O never stalls other session operations.
    pub async fn save_snapshot(&self, path: &Path) -> EngineResult<()> {
        let (json, nodes) = {
            let tree = self.tree.lock().await;
            (tree.to_json()?, tree.len())
        };
        tokio::fs::write(path, json)
            .await
            .map_err(|e| EngineError::Snapshot {
                message: format!("write {}: {e}", path.display()),
            })?;
        info!(nodes, path = %path.display(), "saved tree snapshot");
        Ok(())
    }
}

impl std::fmt::Debug for ExplorationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationSession")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
