//! The five resource operations, shared by all collections.
//!
//! Every handler follows one template: authenticate (done by middleware) ->
//! load -> not-found normalization -> ownership check -> sanitize -> persist
//! -> respond. Any failure short-circuits through `?` into [`ApiError`],
//! which owns all status-code decisions.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::access::{require_found, require_owner, sanitize_create, sanitize_patch};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::ApiResponse;
use crate::routes::AppState;
use crate::store::{Kind, Resource};

fn parse_kind(collection: &str) -> Result<Kind, ApiError> {
    // An unknown collection segment is indistinguishable from a missing
    // resource, same as an unknown id.
    Kind::from_collection(collection)
        .ok_or_else(|| ApiError::not_found(format!("no such collection: {collection}")))
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::bad_request(format!("malformed identifier: {id}")))
}

fn into_object(payload: Value) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

/// GET /:collection - list every document in the collection
pub async fn list(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(collection): Path<String>,
) -> Result<ApiResponse<Vec<Resource>>, ApiError> {
    let kind = parse_kind(&collection)?;
    let resources = state.store.find_all(kind).await?;
    Ok(ApiResponse::success(resources))
}

/// GET /:collection/:id - show a single document
pub async fn show(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<ApiResponse<Resource>, ApiError> {
    let kind = parse_kind(&collection)?;
    let id = parse_id(&id)?;

    let resource = require_found(state.store.find_by_id(kind, id).await?)?;
    Ok(ApiResponse::success(resource))
}

/// POST /:collection - create a document, stamping the owner server-side
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(collection): Path<String>,
    Json(payload): Json<Value>,
) -> Result<ApiResponse<Resource>, ApiError> {
    let kind = parse_kind(&collection)?;

    // Server-managed keys (identity, ownership, timestamps) are never
    // trusted from the client
    let mut fields = sanitize_create(into_object(payload)?);

    // Projects may be created under an organization; the reference is
    // consumed here, not persisted as a domain field.
    let owner = match kind {
        Kind::Project => match fields.remove("organization") {
            Some(Value::String(org)) => parse_id(&org)?,
            Some(_) => return Err(ApiError::bad_request("organization must be an identifier")),
            None => user.user_id,
        },
        _ => user.user_id,
    };

    let resource = state.store.create(kind, owner, fields).await?;
    Ok(ApiResponse::created(resource))
}

/// PATCH /:collection/:id - partial update by the owner
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((collection, id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<ApiResponse<()>, ApiError> {
    let kind = parse_kind(&collection)?;
    let id = parse_id(&id)?;

    let resource = require_found(state.store.find_by_id(kind, id).await?)?;
    require_owner(&user, &resource)?;

    // May legitimately leave nothing to change; an empty patch is a
    // valid idempotent no-op, not an error.
    let patch = sanitize_patch(into_object(payload)?);
    state.store.apply_update(kind, resource, patch).await?;

    Ok(ApiResponse::<()>::no_content())
}

/// DELETE /:collection/:id - delete by the owner
pub async fn destroy(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<ApiResponse<()>, ApiError> {
    let kind = parse_kind(&collection)?;
    let id = parse_id(&id)?;

    let resource = require_found(state.store.find_by_id(kind, id).await?)?;
    require_owner(&user, &resource)?;

    state.store.delete(kind, resource).await?;
    Ok(ApiResponse::<()>::no_content())
}
