use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{
    AspectCritique, GeneratedIdea, GenerationContext, GenerationTask, Message, RetrievalRecord,
    Review, Section,
};
use super::{IdeaGenerator, IdeaEvaluator, KnowledgeRetriever};
use crate::config::{CapabilityConfig, RequestConfig};
use crate::error::{CapabilityError, CapabilityResult};
use crate::prompts::{
    FRESH_PERSPECTIVE_PROMPT, IDEATION_SYSTEM_PROMPT, INITIAL_IDEA_PROMPT, RETRIEVE_REFINE_PROMPT,
    REVIEW_REFINE_PROMPT, SEARCH_QUERY_PROMPT,
};
use async_trait::async_trait;

/// HTTP client implementing the three capability contracts.
///
/// One reqwest client with a shared timeout; each capability has its own
/// base URL. Calls are never retried here: a transport failure surfaces to
/// the engine, which leaves the tree untouched.
#[derive(Clone)]
pub struct CapabilityClient {
    client: Client,
    api_key: String,
    generation_url: String,
    evaluation_url: String,
    retrieval_url: String,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct IdeationRequest<'a> {
    task: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct IdeationResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct ReviewRequest<'a> {
    idea: &'a str,
}

#[derive(Debug, Serialize)]
struct AspectRequest<'a> {
    idea: &'a str,
    aspect: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    sections: Vec<Section>,
}

impl CapabilityClient {
    /// Create a new capability client
    pub fn new(
        config: &CapabilityConfig,
        request_config: RequestConfig,
    ) -> CapabilityResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(CapabilityError::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            generation_url: config.generation_url.trim_end_matches('/').to_string(),
            evaluation_url: config.evaluation_url.trim_end_matches('/').to_string(),
            retrieval_url: config.retrieval_url.trim_end_matches('/').to_string(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Get the generation base URL (for testing)
    pub fn generation_url(&self) -> &str {
        &self.generation_url
    }

    /// Execute a single POST and deserialize the JSON response body.
    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> CapabilityResult<R> {
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    CapabilityError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let parsed: R = response
            .json()
            .await
            .map_err(|e| CapabilityError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        debug!(url = %url, latency_ms = start.elapsed().as_millis() as u64, "Capability call succeeded");

        Ok(parsed)
    }
}

/// Build the user prompt for a generation task from its context.
fn build_user_prompt(task: GenerationTask, ctx: &GenerationContext) -> String {
    let goal = ctx.research_goal.as_deref().unwrap_or_default();
    let idea = ctx.current_idea.as_deref().unwrap_or_default();

    match task {
        GenerationTask::InitialIdea => INITIAL_IDEA_PROMPT.replace("{research_goal}", goal),
        GenerationTask::ReviewRefine => REVIEW_REFINE_PROMPT
            .replace("{current_idea}", idea)
            .replace("{critiques}", &format_critiques(&ctx.critiques)),
        GenerationTask::RetrieveRefine => RETRIEVE_REFINE_PROMPT
            .replace("{current_idea}", idea)
            .replace(
                "{retrieved_content}",
                &ctx.retrieved
                    .as_ref()
                    .map(format_retrieved)
                    .unwrap_or_default(),
            ),
        GenerationTask::FreshPerspective => FRESH_PERSPECTIVE_PROMPT
            .replace("{research_goal}", goal)
            .replace("{current_idea}", idea),
        GenerationTask::SearchQuery => SEARCH_QUERY_PROMPT.replace("{current_idea}", idea),
    }
}

fn format_critiques(critiques: &[AspectCritique]) -> String {
    critiques
        .iter()
        .map(|c| format!("- [{}] {}", c.aspect, c.critique))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_retrieved(record: &RetrievalRecord) -> String {
    record
        .sections
        .iter()
        .map(|s| format!("## {}\n{}", s.title, s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl IdeaGenerator for CapabilityClient {
    async fn generate(
        &self,
        task: GenerationTask,
        ctx: GenerationContext,
    ) -> CapabilityResult<GeneratedIdea> {
        let url = format!("{}/v1/ideation/run", self.generation_url);
        let request = IdeationRequest {
            task: task.as_str(),
            messages: vec![
                Message::system(IDEATION_SYSTEM_PROMPT),
                Message::user(build_user_prompt(task, &ctx)),
            ],
        };

        let response: IdeationResponse = self.post_json(&url, &request).await?;
        info!(task = %task, chars = response.content.len(), "Idea generation completed");

        Ok(GeneratedIdea {
            content: response.content,
        })
    }
}

#[async_trait]
impl IdeaEvaluator for CapabilityClient {
    async fn evaluate(&self, idea: &str) -> CapabilityResult<Review> {
        let url = format!("{}/v1/review/run", self.evaluation_url);
        let review: Review = self.post_json(&url, &ReviewRequest { idea }).await?;
        info!(
            aspects = review.aspects.len(),
            average = review.average_score,
            "Unified review completed"
        );
        Ok(review)
    }

    async fn critique_aspect(&self, idea: &str, aspect: &str) -> CapabilityResult<AspectCritique> {
        let url = format!("{}/v1/review/aspect", self.evaluation_url);
        let critique: AspectCritique = self.post_json(&url, &AspectRequest { idea, aspect }).await?;
        debug!(aspect = %aspect, "Aspect critique completed");
        Ok(critique)
    }
}

#[async_trait]
impl KnowledgeRetriever for CapabilityClient {
    async fn retrieve(&self, query: &str) -> CapabilityResult<RetrievalRecord> {
        let url = format!("{}/v1/retrieval/search", self.retrieval_url);
        let response: SearchResponse = self.post_json(&url, &SearchRequest { query }).await?;
        info!(
            query = %query,
            sections = response.sections.len(),
            "Retrieval completed"
        );
        Ok(RetrievalRecord::new(query, response.sections))
    }
}
