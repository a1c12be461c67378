//! Document lifecycle operations: the service checks access policy,
//! persists through the store, keeps the search index in step, and
//! delegates text generation to the AI service.

use crate::ai::{self, ContextDocument, TextService};
use crate::model::{Actor, Document};
use crate::policy;
use crate::search::SearchIndex;
use crate::store::DocumentStore;
use crate::users::{UserDirectory, UserProfile};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("document not found")]
    NotFound,
    #[error("access denied")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    Text,
    Semantic,
}

impl SearchMode {
    pub fn from_str(s: &str) -> Self {
        match s {
            "semantic" => SearchMode::Semantic,
            _ => SearchMode::Text,
        }
    }
}

/// A document together with its resolved owner, ready for display.
pub struct DocumentView {
    pub document: Document,
    pub owner: UserProfile,
}

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

pub struct DocumentService {
    store: Arc<RwLock<DocumentStore>>,
    index: Arc<SearchIndex>,
    ai: Arc<TextService>,
    users: Arc<UserDirectory>,
}

impl DocumentService {
    pub fn new(
        store: Arc<RwLock<DocumentStore>>,
        index: Arc<SearchIndex>,
        ai: Arc<TextService>,
        users: Arc<UserDirectory>,
    ) -> Self {
        Self {
            store,
            index,
            ai,
            users,
        }
    }

    fn resolve(&self, document: Document) -> DocumentView {
        let owner = self
            .users
            .lookup(&document.created_by)
            .unwrap_or_else(|| UserProfile::unknown(document.created_by.clone()));
        DocumentView { document, owner }
    }

    /// Documents visible to the actor, newest first.
    pub async fn list(&self, actor: &Actor) -> ServiceResult<Vec<DocumentView>> {
        let filter = policy::list_filter(actor);
        let store = self.store.read().await;
        let mut docs: Vec<Document> = store.find(&filter).into_iter().cloned().collect();
        drop(store);
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs.into_iter().map(|d| self.resolve(d)).collect())
    }

    /// Create a document owned by the actor. The initial summary is the
    /// deterministic truncation and the tags are the default set; AI
    /// enrichment happens only through the explicit AI operations.
    pub async fn create(
        &self,
        actor: &Actor,
        title: &str,
        content: &str,
        is_public: bool,
    ) -> ServiceResult<DocumentView> {
        let (title, content) = validate(title, content)?;
        let summary = ai::truncated_summary(content);
        let mut store = self.store.write().await;
        let doc = store.create(
            title.to_string(),
            content.to_string(),
            Some(summary),
            ai::default_tags(),
            is_public,
            actor.id.clone(),
        )?;
        drop(store);
        self.index.index_document(&doc)?;
        Ok(self.resolve(doc))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> ServiceResult<DocumentView> {
        let store = self.store.read().await;
        let doc = store.get(id).ok_or(ServiceError::NotFound)?;
        if !policy::can_read(actor, doc) {
            return Err(ServiceError::Forbidden);
        }
        let doc = doc.clone();
        drop(store);
        Ok(self.resolve(doc))
    }

    /// Rewrite title and content, recomputing the summary from the new
    /// content. An omitted `is_public` leaves the stored flag unchanged;
    /// tags are kept as they are.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        title: &str,
        content: &str,
        is_public: Option<bool>,
    ) -> ServiceResult<DocumentView> {
        let (title, content) = validate(title, content)?;
        let mut store = self.store.write().await;
        let existing = store.get(id).ok_or(ServiceError::NotFound)?;
        if !policy::can_write(actor, existing) {
            return Err(ServiceError::Forbidden);
        }
        let is_public = is_public.unwrap_or(existing.is_public);
        let summary = ai::truncated_summary(content);
        let doc = store.update(
            id,
            title.to_string(),
            content.to_string(),
            Some(summary),
            is_public,
        )?;
        drop(store);
        self.index.index_document(&doc)?;
        Ok(self.resolve(doc))
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let mut store = self.store.write().await;
        let doc = store.get(id).ok_or(ServiceError::NotFound)?;
        if !policy::can_delete(actor, doc) {
            return Err(ServiceError::Forbidden);
        }
        store.delete(id)?;
        drop(store);
        self.index.remove_document(id)?;
        Ok(())
    }

    /// Full-text search restricted to documents the actor may read.
    /// Semantic mode has no vector backend and falls back to text search.
    pub async fn search(
        &self,
        actor: &Actor,
        query: &str,
        mode: SearchMode,
        limit: usize,
    ) -> ServiceResult<Vec<DocumentView>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::Validation(
                "Search query is required".to_string(),
            ));
        }
        if mode == SearchMode::Semantic {
            tracing::debug!("no vector backend configured, using text search");
        }
        // TopDocs rejects a zero limit
        let ids = self.index.search(query, limit.max(1))?;
        let store = self.store.read().await;
        let docs: Vec<Document> = ids
            .into_iter()
            .filter_map(|id| store.get(id))
            .filter(|d| policy::can_read(actor, d))
            .cloned()
            .collect();
        drop(store);
        Ok(docs.into_iter().map(|d| self.resolve(d)).collect())
    }

    /// Answer a question over every document visible to the actor. The
    /// AI service owns the empty-set short circuit and all fallbacks, so
    /// this never fails on an upstream outage.
    pub async fn answer_question(&self, actor: &Actor, question: &str) -> ServiceResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::Validation("Question is required".to_string()));
        }
        let filter = policy::list_filter(actor);
        let store = self.store.read().await;
        let context: Vec<ContextDocument> = store
            .find(&filter)
            .into_iter()
            .map(|d| ContextDocument {
                title: d.title.clone(),
                content: d.content.clone(),
            })
            .collect();
        drop(store);
        Ok(self.ai.answer(question, &context).await)
    }

    pub async fn summarize(&self, content: &str) -> ServiceResult<String> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("Content is required".to_string()));
        }
        Ok(self.ai.summarize(content).await)
    }

    pub async fn generate_tags(&self, content: &str) -> ServiceResult<Vec<String>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("Content is required".to_string()));
        }
        Ok(self.ai.generate_tags(content).await)
    }
}

fn validate<'a>(title: &'a str, content: &'a str) -> Result<(&'a str, &'a str), ServiceError> {
    let title = title.trim();
    let content = content.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("Title is required".to_string()));
    }
    if content.is_empty() {
        return Err(ServiceError::Validation("Content is required".to_string()));
    }
    Ok((title, content))
}
