//! HTTP API layer exposing document CRUD, search, and AI endpoints.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use knowledge_hub_core::auth::TokenVerifier;
use knowledge_hub_core::model::{Actor, Role, UserId};
use knowledge_hub_core::service::{
    DocumentService, DocumentView, SearchMode, ServiceError, DEFAULT_SEARCH_LIMIT,
};
use knowledge_hub_core::users::UserDirectory;

/// Authenticated actor extracted from request headers: a Bearer token
/// when configured, with `X-User-*` headers as the local fallback.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub actor: Actor,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        if let Some(auth) = headers.get("Authorization").and_then(|v| v.to_str().ok()) {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if let Some(claims) = state.verifier.verify(token).await {
                    let actor = Actor {
                        id: UserId::new(claims.sub),
                        name: claims.name.unwrap_or_default(),
                        email: claims.email.unwrap_or_default(),
                        role: Role::from_str(claims.role.as_deref().unwrap_or("user")),
                    };
                    state.users.remember(&actor);
                    return Ok(Self { actor });
                }
            }
        }
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        if let Some(user_id) = header("X-User-Id") {
            let actor = Actor {
                id: UserId::new(user_id),
                name: header("X-User-Name").unwrap_or_default(),
                email: header("X-User-Email").unwrap_or_default(),
                role: Role::from_str(header("X-User-Role").as_deref().unwrap_or("user")),
            };
            state.users.remember(&actor);
            Ok(Self { actor })
        } else {
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DocumentService>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub users: Arc<UserDirectory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRequest {
    title: String,
    content: String,
    #[serde(default)]
    is_public: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnerResponse {
    id: String,
    name: String,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentResponse {
    id: Uuid,
    title: String,
    content: String,
    summary: Option<String>,
    tags: Vec<String>,
    is_public: bool,
    created_by: OwnerResponse,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentView> for DocumentResponse {
    fn from(view: DocumentView) -> Self {
        let doc = view.document;
        Self {
            id: doc.id,
            title: doc.title,
            content: doc.content,
            summary: doc.summary,
            tags: doc.tags,
            is_public: doc.is_public,
            created_by: OwnerResponse {
                id: view.owner.id.to_string(),
                name: view.owner.name,
                email: view.owner.email,
            },
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    #[serde(rename = "type")]
    mode: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct ContentRequest {
    content: String,
}

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Serialize)]
struct TagsResponse {
    tags: Vec<String>,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Maps service error kinds to client-visible statuses. Internal detail
/// goes to the log only.
struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            ServiceError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::NotFound => {
                (StatusCode::NOT_FOUND, "Document not found".to_string())
            }
            ServiceError::Forbidden => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            ServiceError::Internal(err) => {
                tracing::error!("operation failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Operation failed".to_string(),
                )
            }
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}

pub fn router(
    service: Arc<DocumentService>,
    verifier: Arc<dyn TokenVerifier>,
    users: Arc<UserDirectory>,
) -> Router {
    let app_state = AppState {
        service,
        verifier,
        users,
    };
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route("/documents/search", get(search_documents))
        .route(
            "/documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/ai/summarize", post(summarize))
        .route("/ai/generate-tags", post(generate_tags))
        .route("/ai/question", post(answer_question))
        .with_state(app_state)
}

async fn list_documents(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let views = state.service.list(&auth.actor).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

async fn create_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<DocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let view = state
        .service
        .create(
            &auth.actor,
            &req.title,
            &req.content,
            req.is_public.unwrap_or(false),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

async fn get_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let view = state.service.get(&auth.actor, id).await?;
    Ok(Json(view.into()))
}

async fn update_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<DocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let view = state
        .service
        .update(&auth.actor, id, &req.title, &req.content, req.is_public)
        .await?;
    Ok(Json(view.into()))
}

async fn delete_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.delete(&auth.actor, id).await?;
    Ok(Json(MessageResponse {
        message: "Document deleted successfully".to_string(),
    }))
}

async fn search_documents(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let mode = SearchMode::from_str(params.mode.as_deref().unwrap_or("text"));
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let views = state
        .service
        .search(&auth.actor, &params.q, mode, limit)
        .await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

async fn summarize(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<ContentRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = state.service.summarize(&req.content).await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn generate_tags(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<ContentRequest>,
) -> Result<Json<TagsResponse>, ApiError> {
    let tags = state.service.generate_tags(&req.content).await?;
    Ok(Json(TagsResponse { tags }))
}

async fn answer_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let answer = state
        .service
        .answer_question(&auth.actor, &req.question)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}
