//! # FOLIO Hub
//!
//! HTTP service over the `folio-core` engine: collection search, single and
//! bulk email, demo seeding, the wellbeing questionnaire and a map proxy.

pub mod api;
pub mod config;
pub mod error;
pub mod mail;
pub mod maps;
pub mod questionnaire;
pub mod seed;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use folio_core::{Dispatcher, MailTransport, RecordSource};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::maps::MapClient;
use crate::store::MemoryStore;

// =============================================================================
// Application State
// =============================================================================

pub struct AppState {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<dyn MailTransport>,
    pub dispatcher: Dispatcher,
    pub maps: MapClient,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, store: Arc<MemoryStore>, transport: Arc<dyn MailTransport>) -> Self {
        let source: Arc<dyn RecordSource> = store.clone();
        let dispatcher = Dispatcher::new(source, transport.clone(), config.dispatch_config());
        let maps = MapClient::new(config.maps.base_url.clone(), config.maps.token.clone());
        Self {
            config,
            store,
            transport,
            dispatcher,
            maps,
            start_time: Instant::now(),
        }
    }
}

/// Collections that always exist, searchable or not.
pub fn store_collections(config: &Config) -> Vec<String> {
    let mut names = config.search.collections.clone();
    for name in [
        seed::BOOKS,
        seed::USERS,
        seed::AUDIT_LOGS,
        questionnaire::LOG_COLLECTION,
    ] {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

// =============================================================================
// Router
// =============================================================================

pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/status", get(api::status))
        // Collections
        .route("/api/:collection", get(api::list_records))
        .route("/api/:collection/count", get(api::count_records))
        .route("/countBooks", get(api::count_books))
        // Mail
        .route("/sendEmail", post(api::send_email))
        .route("/sendBulkEmail", post(api::send_bulk_email))
        // Seeding
        .route("/seedBooks", post(api::seed_books))
        .route("/seedUsers", post(api::seed_users))
        .route("/seedAll", post(api::seed_all))
        // Questionnaire
        .route("/questionnaire", post(api::submit_questionnaire))
        // Maps
        .route("/map/geocode", get(api::geocode))
        .route("/map/route", get(api::route));

    let router = match &state.config.server.ui_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(CorsLayer::permissive()).with_state(state)
}
