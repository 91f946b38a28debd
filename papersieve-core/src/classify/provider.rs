//! Labeling collaborators — the external capability that proposes a
//! taxonomy assignment for one accepted paper.

use crate::error::SieveError;
use crate::paper::Paper;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default OpenAI-compatible chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.cerebras.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b";

/// Default classification system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../configs/classification_prompt.md");

const ABSTRACT_PROMPT_LIMIT: usize = 2500;

/// External labeling capability. Returns the provider's raw response text;
/// parsing and normalization stay in this crate.
#[async_trait]
pub trait Labeler: Send + Sync {
    async fn label(&self, paper: &Paper) -> Result<String, SieveError>;

    fn model_name(&self) -> &str;
}

/// Labeler backed by any OpenAI-compatible chat-completions API.
pub struct ChatCompletionsLabeler {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl ChatCompletionsLabeler {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// User message carrying the paper; the abstract is truncated to keep
    /// the request small, and its absence is stated explicitly.
    fn build_user_message(paper: &Paper) -> String {
        let mut parts = vec![format!("Title: {}", paper.title)];

        match paper.abstract_text.as_deref().filter(|a| !a.trim().is_empty()) {
            Some(abstract_text) => {
                let mut cut = ABSTRACT_PROMPT_LIMIT.min(abstract_text.len());
                while cut < abstract_text.len() && !abstract_text.is_char_boundary(cut) {
                    cut += 1;
                }
                parts.push(format!("\nAbstract: {}", &abstract_text[..cut]));
            }
            None => {
                parts.push("\n(No abstract available - classify based on title only)".to_string());
            }
        }

        if let Some(venue) = &paper.venue {
            parts.push(format!("\nVenue: {venue}"));
        }
        if let Some(year) = paper.year {
            parts.push(format!("\nYear: {year}"));
        }

        parts.push(
            "\n\nRespond with a JSON object containing: labels, paper_type, domains, \
             model_types, tags, confidence, and reasoning."
                .to_string(),
        );
        parts.concat()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl Labeler for ChatCompletionsLabeler {
    async fn label(&self, paper: &Paper) -> Result<String, SieveError> {
        let user_message = Self::build_user_message(paper);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            temperature: 0.1,
            max_tokens: 500,
        };

        tracing::debug!(paper_id = %paper.paper_id, model = %self.model, "labeling paper");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| SieveError::labeling("completion response contained no choices"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_with_abstract() {
        let mut paper = Paper::new("p1", "Stealing Models", Some("We steal models.".into()));
        paper.venue = Some("USENIX Security".into());
        paper.year = Some(2016);
        let message = ChatCompletionsLabeler::build_user_message(&paper);
        assert!(message.starts_with("Title: Stealing Models"));
        assert!(message.contains("Abstract: We steal models."));
        assert!(message.contains("Venue: USENIX Security"));
        assert!(message.contains("Year: 2016"));
    }

    #[test]
    fn test_user_message_without_abstract() {
        let paper = Paper::new("p1", "Stealing Models", None);
        let message = ChatCompletionsLabeler::build_user_message(&paper);
        assert!(message.contains("No abstract available"));
    }

    #[test]
    fn test_long_abstract_is_truncated() {
        let paper = Paper::new("p1", "T", Some("x".repeat(5000)));
        let message = ChatCompletionsLabeler::build_user_message(&paper);
        assert!(message.len() < 3000);
    }
}
