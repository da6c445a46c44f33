mod error;
mod extract;
mod handlers;

pub use error::{ApiError, ErrorEnvelope, ValidationErrorBody};
pub use extract::{CallerId, FeatureId, PageQuery, ValidJson, USER_ID_HEADER};

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::Database;
use crate::service::{RankingReader, VoteService};

/// Shared handler state. Clones share the same database and vote gates.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub votes: VoteService,
    pub ranking: RankingReader,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            votes: VoteService::with_max_attempts(db.clone(), config.vote_attempts),
            ranking: RankingReader::new(db.clone()),
            db,
        }
    }
}

pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, &Config::default())
}

pub fn create_router_with_config(db: Database, config: &Config) -> Router {
    let state = AppState::new(db, config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Features
        .route(
            "/features",
            get(handlers::list_features).post(handlers::create_feature),
        )
        .route(
            "/features/{id}",
            get(handlers::get_feature).put(handlers::update_feature),
        )
        // Votes
        .route(
            "/features/{id}/vote",
            post(handlers::cast_vote).delete(handlers::retract_vote),
        )
        .route("/features/{id}/votes", get(handlers::list_feature_votes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origins) = &config.cors_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
