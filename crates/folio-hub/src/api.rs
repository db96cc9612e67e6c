//! # API Handlers
//!
//! Axum handlers for collection queries, mail, seeding, the questionnaire
//! and the map proxy. Failures go through [`ApiError`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use folio_core::dispatch::dedupe;
use folio_core::mail::AttachmentInput;
use folio_core::query::apply;
use folio_core::{
    Attachment, DeliveryMetrics, DispatchReport, Envelope, Error, Message, QueryParams,
    QueryResult, RecipientSpec, Recipients, RecordSource,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::maps::{GeocodeParams, RouteParams};
use crate::questionnaire::{self, Assessment};
use crate::seed;
use crate::AppState;

// =============================================================================
// Status
// =============================================================================

#[derive(Serialize)]
pub struct Status {
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub mail_provider: String,
    pub mail_delivery: Option<DeliveryMetrics>,
    pub collections: BTreeMap<String, usize>,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<Status> {
    Json(Status {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        mail_provider: state.transport.name().to_string(),
        mail_delivery: state.transport.metrics(),
        collections: state.store.summary().await.into_iter().collect(),
    })
}

// =============================================================================
// Collections
// =============================================================================

fn searchable(state: &AppState, collection: &str) -> Result<(), ApiError> {
    if state.config.is_searchable(collection) {
        Ok(())
    } else {
        tracing::warn!("Rejected query for unknown collection '{}'", collection);
        Err(Error::NotFound(state.config.unknown_resource_message()).into())
    }
}

/// `GET /api/:collection?q=&sortBy=&sortDir=&page=&pageSize=&filters[f]=`
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<QueryResult> {
    searchable(&state, &collection)?;

    let params = QueryParams::from_pairs(pairs);
    if params.require_search && !params.has_search() {
        return Ok(Json(QueryResult::empty(params.effective_page_size())));
    }

    let records = state.store.fetch_all(&collection).await.map_err(Error::from)?;
    Ok(Json(apply(&records, &params.to_query())))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Count {
    pub count: usize,
}

pub async fn count_records(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> ApiResult<Count> {
    searchable(&state, &collection)?;
    let count = state.store.count(&collection).await.map_err(Error::from)?;
    Ok(Json(Count { count }))
}

/// `GET /countBooks`
pub async fn count_books(State(state): State<Arc<AppState>>) -> ApiResult<Count> {
    let count = state.store.count(seed::BOOKS).await.map_err(Error::from)?;
    Ok(Json(Count { count }))
}

// =============================================================================
// Mail
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SendEmailRequest {
    pub to: Option<Recipients>,
    #[serde(default)]
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

fn sender(state: &AppState) -> Result<&str, ApiError> {
    state
        .config
        .mail
        .from
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| Error::Configuration("MAIL_FROM is not set on server".into()).into())
}

/// `POST /sendEmail`: one message, every recipient on the same envelope.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(req) = payload?;

    let to = dedupe(req.to.as_ref().map(Recipients::addresses).unwrap_or_default());
    let message = Message {
        subject: req.subject,
        text: req.text,
        html: req.html,
    };
    if to.is_empty() || message.validate().is_err() {
        return Err(Error::invalid("Missing required fields: to, subject, and text or html").into());
    }

    let from = sender(&state)?;
    let envelope = Envelope {
        attachments: req.attachments.into_iter().map(Attachment::from).collect(),
        ..message.envelope(from).addressed_to(to)
    };

    state.transport.send(&envelope).await.map_err(|err| {
        tracing::error!("sendEmail via {} failed: {}", state.transport.name(), err);
        Error::from(err)
    })?;

    tracing::info!("Sent '{}' to {} recipients", envelope.subject, envelope.to.len());
    Ok(Json(json!({ "ok": true, "message": "Email sent successfully!" })))
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkEmailRequest {
    pub to: Option<Recipients>,
    pub search: Option<QueryParams>,
    #[serde(flatten)]
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct BulkEmailResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: DispatchReport,
}

/// `POST /sendBulkEmail`: explicit or search-derived recipients, batched.
pub async fn send_bulk_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BulkEmailRequest>, JsonRejection>,
) -> ApiResult<BulkEmailResponse> {
    let Json(req) = payload?;

    req.message.validate()?;
    sender(&state)?;
    let spec = RecipientSpec::from_request(req.to, req.search)?;
    let report = state.dispatcher.dispatch(&spec, &req.message).await?;

    Ok(Json(BulkEmailResponse { ok: true, report }))
}

// =============================================================================
// Seeding
// =============================================================================

pub async fn seed_books(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = seed::seed_books(&state.store, usize::MAX).await;
    Json(json!({ "ok": true, "inserted": report.books, "created": report.created }))
}

pub async fn seed_users(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = seed::seed_users(&state.store, usize::MAX).await;
    Json(json!({ "ok": true, "inserted": report.users, "created": report.created }))
}

pub async fn seed_all(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = seed::seed_all(&state.store).await;
    Json(json!({
        "ok": true,
        "message": "Seeded books & users",
        "books": report.books,
        "users": report.users,
        "created": report.created,
    }))
}

// =============================================================================
// Questionnaire
// =============================================================================

pub async fn submit_questionnaire(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Assessment> {
    let Json(body) = payload?;
    let assessment = questionnaire::submit(&state.store, &body).await?;
    Ok(Json(assessment))
}

// =============================================================================
// Maps
// =============================================================================

pub async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeParams>,
) -> ApiResult<Value> {
    Ok(Json(state.maps.geocode(&params).await?))
}

pub async fn route(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RouteParams>,
) -> ApiResult<Value> {
    Ok(Json(state.maps.route(&params).await?))
}
