use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::error::ApiError;
use super::extract::{CallerId, FeatureId, PageQuery, ValidJson};
use super::AppState;
use crate::models::*;

// ============================================================
// Service
// ============================================================

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Feature Voting System API" }))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ============================================================
// Features
// ============================================================

pub async fn list_features(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    query: PageQuery,
) -> Result<Json<Page<Feature>>, ApiError> {
    state
        .ranking
        .list(query.page, query.page_size)
        .map(Json)
        .map_err(ApiError::at(&uri))
}

pub async fn create_feature(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CallerId(author_id): CallerId,
    ValidJson(input): ValidJson<CreateFeatureInput>,
) -> Result<(StatusCode, Json<Feature>), ApiError> {
    let feature = state
        .db
        .create_feature(author_id, input)
        .map_err(ApiError::at(&uri))?;

    tracing::info!(feature_id = feature.id, author_id, "feature created");
    Ok((StatusCode::CREATED, Json(feature)))
}

pub async fn get_feature(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    FeatureId(id): FeatureId,
) -> Result<Json<Feature>, ApiError> {
    state.db.get_feature(id).map(Json).map_err(ApiError::at(&uri))
}

pub async fn update_feature(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    FeatureId(id): FeatureId,
    ValidJson(input): ValidJson<UpdateFeatureInput>,
) -> Result<Json<Feature>, ApiError> {
    state
        .db
        .update_feature(id, input)
        .map(Json)
        .map_err(ApiError::at(&uri))
}

// ============================================================
// Votes
// ============================================================

pub async fn cast_vote(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CallerId(user_id): CallerId,
    FeatureId(feature_id): FeatureId,
) -> Result<(StatusCode, Json<VoteResponse>), ApiError> {
    let vote_count = state
        .votes
        .cast_vote(user_id, feature_id)
        .await
        .map_err(ApiError::at(&uri))?;

    Ok((StatusCode::CREATED, Json(VoteResponse::added(vote_count))))
}

pub async fn retract_vote(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CallerId(user_id): CallerId,
    FeatureId(feature_id): FeatureId,
) -> Result<Json<VoteResponse>, ApiError> {
    let vote_count = state
        .votes
        .retract_vote(user_id, feature_id)
        .await
        .map_err(ApiError::at(&uri))?;

    Ok(Json(VoteResponse::removed(vote_count)))
}

pub async fn list_feature_votes(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    FeatureId(feature_id): FeatureId,
) -> Result<Json<Vec<Vote>>, ApiError> {
    // Distinguish "no votes" from "no feature".
    state
        .db
        .get_feature(feature_id)
        .map_err(ApiError::at(&uri))?;

    state
        .db
        .votes_for_feature(feature_id)
        .map(Json)
        .map_err(ApiError::at(&uri))
}
