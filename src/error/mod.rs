use thiserror::Error;

/// Transport-level failures reported by an external capability endpoint.
///
/// These never carry tree semantics; the engine wraps them into the
/// capability-specific [`EngineError`] variants at the call site.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Engine-level errors surfaced to callers of the refinement tree.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller named an action outside the fixed set. Rejected before
    /// any external call is made.
    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    /// An operation was requested against a tree in a state that cannot
    /// satisfy it (empty research goal, missing precondition).
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// A node id that does not exist in this tree.
    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: String },

    /// The generation capability failed. The tree is left untouched.
    #[error("Idea generation failed: {0}")]
    GenerationFailed(#[source] CapabilityError),

    /// The evaluation capability failed. The tree is left untouched.
    #[error("Idea evaluation failed: {0}")]
    EvaluationFailed(#[source] CapabilityError),

    /// The retrieval capability failed. The tree is left untouched.
    #[error("Knowledge retrieval failed: {0}")]
    RetrievalFailed(#[source] CapabilityError),

    /// A second exploration loop was requested while one is running.
    #[error("Exploration already in progress")]
    ExplorationInProgress,

    /// An autonomous exploration iteration failed. Nodes attached by prior
    /// iterations are retained.
    #[error("Exploration failed at iteration {iteration}: {source}")]
    Exploration {
        iteration: usize,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for capability calls
pub type CapabilityResult<T> = Result<T, CapabilityError>;
