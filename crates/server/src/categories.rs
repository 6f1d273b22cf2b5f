//! Categories API endpoints.

use api_types::category::{CategoryName, CategoryView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::Principal;

use crate::{
    ServerError,
    extract::{ApiJson, IdPath},
    server::ServerState,
};

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
    }
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state
        .engine
        .list_categories(&principal)
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(Json(categories))
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<CategoryName>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(&principal, payload.name.as_deref().unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(category_id): IdPath,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state.engine.category(&principal, category_id).await?;
    Ok(Json(map_category(category)))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(category_id): IdPath,
    ApiJson(payload): ApiJson<CategoryName>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .update_category(
            &principal,
            category_id,
            payload.name.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(map_category(category)))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    IdPath(category_id): IdPath,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(&principal, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
