//! # IRIS Ideation Engine
//!
//! A research-idea refinement engine that grows a tree of candidate ideas
//! from a single research goal, steering the search with a UCT-style bandit
//! over four refinement strategies.
//!
//! ## Features
//!
//! - **Generate**: produce a first idea from the research goal
//! - **Review & Refine**: critique the weakest aspects of the current idea
//!   and refine against those critiques
//! - **Retrieve & Refine**: search the literature and refine the idea with
//!   retrieved knowledge
//! - **Refresh Idea**: restart with an unrelated approach to the same goal
//! - **Autonomous Exploration**: selector-driven iterations with reward
//!   backpropagation, interruptible and guarded against concurrent runs
//! - **Snapshots**: save and resume the full tree as JSON
//!
//! ## Architecture
//!
//! ```text
//! Caller → ExplorationSession → ActionRunner → Capability HTTP endpoints
//!                  ↓                                (generate / evaluate /
//!              IdeaTree (in memory)                  retrieve)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use iris_ideation::{Config, ExplorationOptions, ExplorationSession};
//! use iris_ideation::capabilities::CapabilityClient;
//! use iris_ideation::engine::EngineCore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = CapabilityClient::new(&config.capabilities, config.request.clone())?;
//!     let core = EngineCore::from_client(client);
//!     let session = ExplorationSession::new(
//!         core,
//!         "reduce attention memory in long-context transformers",
//!         ExplorationOptions::default(),
//!     )?;
//!     let report = session.explore(Some(5)).await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// External capability contracts and the HTTP client backing them.
pub mod capabilities;
/// Configuration management for the engine.
pub mod config;
/// Engine components: state, tree, actions, selector, session.
pub mod engine;
/// Error types and result aliases.
pub mod error;
/// System and task prompts for the generation capability.
pub mod prompts;

pub use config::Config;
pub use engine::{ExplorationOptions, ExplorationSession};
pub use error::{CapabilityError, CapabilityResult, EngineError, EngineResult};
