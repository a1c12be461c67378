//! Text generation backed by an external language model, with
//! deterministic fallbacks so document operations never fail on an
//! upstream outage. One outbound call per invocation; no retries.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

const SUMMARY_FALLBACK_CHARS: usize = 200;
const MAX_TAGS: usize = 5;
pub const DEFAULT_TAGS: [&str; 2] = ["general", "document"];
pub const NO_DOCUMENTS_ANSWER: &str = "No documents available to answer your question.";
pub const ANSWER_UNAVAILABLE: &str =
    "Sorry, I was unable to answer your question. Please try again later.";

#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for the Google Generative Language API.
pub struct GeminiModel {
    client: reqwest::Client,
    url: String,
}

impl GeminiModel {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{GEMINI_ENDPOINT}/{GEMINI_MODEL}:generateContent?key={api_key}"),
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TextModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });
        let response: GenerateContentResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow!("completion response contained no candidates"))
    }
}

/// A document made available to the model as answering context.
pub struct ContextDocument {
    pub title: String,
    pub content: String,
}

/// Summaries, tags, and answers with fallback behavior. Without a model
/// (missing credential) every call takes the fallback path directly.
pub struct TextService {
    model: Option<Arc<dyn TextModel>>,
}

impl TextService {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn fallback_only() -> Self {
        Self { model: None }
    }

    pub fn is_fallback_only(&self) -> bool {
        self.model.is_none()
    }

    pub async fn summarize(&self, content: &str) -> String {
        let Some(model) = &self.model else {
            return truncated_summary(content);
        };
        let prompt = format!("Summarize this document in 2-3 sentences:\n{content}");
        match model.complete(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                tracing::warn!("summary generation failed: {err:#}");
                truncated_summary(content)
            }
        }
    }

    pub async fn generate_tags(&self, content: &str) -> Vec<String> {
        let Some(model) = &self.model else {
            return default_tags();
        };
        let prompt =
            format!("Generate 5 relevant tags for this content separated by commas:\n{content}");
        match model.complete(&prompt).await {
            Ok(text) => {
                let tags: Vec<String> = text
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .take(MAX_TAGS)
                    .map(String::from)
                    .collect();
                if tags.is_empty() {
                    default_tags()
                } else {
                    tags
                }
            }
            Err(err) => {
                tracing::warn!("tag generation failed: {err:#}");
                default_tags()
            }
        }
    }

    /// Answer a question over the given documents. An empty context
    /// short-circuits without any outbound call.
    pub async fn answer(&self, question: &str, docs: &[ContextDocument]) -> String {
        if docs.is_empty() {
            return NO_DOCUMENTS_ANSWER.to_string();
        }
        let Some(model) = &self.model else {
            return ANSWER_UNAVAILABLE.to_string();
        };
        let context = docs
            .iter()
            .map(|d| format!("Title: {}\nContent: {}", d.title, d.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let prompt = format!(
            "Based on the following documents, answer this question: \"{question}\"\n\n\
             Documents:\n{context}\n\n\
             Provide a helpful answer based on the information above."
        );
        match model.complete(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                tracing::warn!("question answering failed: {err:#}");
                ANSWER_UNAVAILABLE.to_string()
            }
        }
    }
}

/// First 200 characters of the content plus an ellipsis marker.
pub fn truncated_summary(content: &str) -> String {
    let cut: String = content.chars().take(SUMMARY_FALLBACK_CHARS).collect();
    format!("{cut}...")
}

pub fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedModel {
        reply: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn ok(reply: &'static str) -> Self {
            Self {
                reply: Ok(reply),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextModel for FixedModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(anyhow!("model unavailable")),
            }
        }
    }

    fn ctx(title: &str, content: &str) -> ContextDocument {
        ContextDocument {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn summarize_without_model_truncates() {
        let service = TextService::fallback_only();
        let long = "x".repeat(500);
        let summary = service.summarize(&long).await;
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.ends_with("..."));
    }

    #[tokio::test]
    async fn summarize_of_empty_content_never_panics() {
        let service = TextService::fallback_only();
        assert_eq!(service.summarize("").await, "...");
        assert_eq!(service.generate_tags("").await, default_tags());
    }

    #[tokio::test]
    async fn summarize_falls_back_on_model_failure() {
        let service = TextService::new(Arc::new(FixedModel::failing()));
        assert_eq!(service.summarize("short content").await, "short content...");
    }

    #[tokio::test]
    async fn tags_are_trimmed_and_capped_at_five() {
        let model = Arc::new(FixedModel::ok(" rust ,  web , api,, search, docs , extra "));
        let service = TextService::new(model);
        let tags = service.generate_tags("whatever").await;
        assert_eq!(tags, vec!["rust", "web", "api", "search", "docs"]);
    }

    #[tokio::test]
    async fn tags_fall_back_on_model_failure() {
        let service = TextService::new(Arc::new(FixedModel::failing()));
        assert_eq!(service.generate_tags("whatever").await, default_tags());
    }

    #[tokio::test]
    async fn answer_with_no_documents_makes_no_call() {
        let model = Arc::new(FixedModel::ok("an answer"));
        let service = TextService::new(model.clone());
        let answer = service.answer("what is this?", &[]).await;
        assert_eq!(answer, NO_DOCUMENTS_ANSWER);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn answer_uses_model_when_context_present() {
        let model = Arc::new(FixedModel::ok("the roadmap ships in june"));
        let service = TextService::new(model.clone());
        let answer = service
            .answer("when does it ship?", &[ctx("roadmap", "ships in june")])
            .await;
        assert_eq!(answer, "the roadmap ships in june");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn answer_masks_model_failure_with_apology() {
        let service = TextService::new(Arc::new(FixedModel::failing()));
        let answer = service.answer("anything?", &[ctx("t", "c")]).await;
        assert_eq!(answer, ANSWER_UNAVAILABLE);
    }
}
