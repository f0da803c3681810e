//! Centralized prompt definitions for the generation capability.
//!
//! Each [`GenerationTask`](crate::capabilities::GenerationTask) has one user
//! prompt template; `{placeholders}` are substituted by the capability client
//! before the request is sent. Centralizing prompts makes them easier to
//! maintain, test, and version.

/// System prompt sent with every ideation request.
pub const IDEATION_SYSTEM_PROMPT: &str = r#"You are an expert scientific research ideation assistant. Your goal is to help researchers generate and refine creative, novel research ideas with scientific rigor.

Structure every research idea you produce into clear sections:
1. Title: a concise statement of the main research question.
2. Proposed Method: how the method works, with all essential steps.
3. Experiment Plan: a step-by-step, executable plan covering datasets, models, and metrics."#;

/// User prompt for generating a first idea from the research goal.
pub const INITIAL_IDEA_PROMPT: &str = r#"Given the following research goal:

{research_goal}

Generate one novel, significant research idea that addresses this goal. Be creative but grounded: build on the current state of the art, avoid incremental tweaks, and keep the experiment plan practical with available datasets, models, and metrics."#;

/// User prompt for refining an idea against reviewer critiques.
pub const REVIEW_REFINE_PROMPT: &str = r#"Here is a research idea and reviewer critiques of its weakest aspects:

RESEARCH IDEA:
{current_idea}

CRITIQUES:
{critiques}

Revise the idea to directly address each critique while preserving its core contribution. Return the full revised idea, not a diff."#;

/// User prompt for refining an idea with retrieved literature.
pub const RETRIEVE_REFINE_PROMPT: &str = r#"Here is a research idea and relevant literature retrieved for it:

RESEARCH IDEA:
{current_idea}

RETRIEVED CONTENT:
{retrieved_content}

Refine the idea using this literature: position it against the retrieved work, borrow techniques where they strengthen the method, and sharpen the novelty claim. Return the full refined idea."#;

/// User prompt for producing an unrelated alternative approach.
pub const FRESH_PERSPECTIVE_PROMPT: &str = r#"Given the following research goal:

{research_goal}

and the current idea being explored:

{current_idea}

Propose a fundamentally different approach to the same goal. Do not refine or extend the current idea - take an unrelated angle (different method family, different framing, or different evaluation regime) that could also achieve the goal."#;

/// User prompt for deriving a literature search query from an idea.
pub const SEARCH_QUERY_PROMPT: &str = r#"Given the following research idea, generate a concise and focused search query for retrieving relevant scientific papers:

RESEARCH IDEA:
{current_idea}

The query should focus on the core concepts and techniques in the idea, be specific enough to retrieve targeted results, and include key technical terms that would appear in relevant papers.

Return your response as a JSON object with the following structure:
{"query": "Your search query here"}

Keep the query to one or two sentences and do not add text outside the JSON."#;
