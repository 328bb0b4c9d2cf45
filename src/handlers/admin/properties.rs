// handlers/admin/properties.rs - listing management
//
// GET    /api/admin/properties        paged, newest first
// POST   /api/admin/properties        create
// GET    /api/admin/properties/:id    one listing
// PUT    /api/admin/properties/:id    partial update
// DELETE /api/admin/properties/:id    delete

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::{Deserialize, Serialize};

use crate::api::{ApiJson, RecordId};
use crate::auth::Principal;
use crate::database::models::{missing_required, Listing, ListingInput};
use crate::database::ListingStore;
use crate::error::ApiError;
use crate::filter::{ListingFilter, ListingOrder, PageRequest};
use crate::handlers::public::properties::{ListingBody, ListingPageBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
    pub message: &'static str,
    pub data: Listing,
}

#[derive(Debug, Serialize)]
pub struct Updated {
    pub message: &'static str,
    pub data: Listing,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: &'static str,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<AdminListQuery>) -> ApiResult<ListingPageBody> {
    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        DEFAULT_PAGE_SIZE,
        state.max_page_size,
    );
    let result = state
        .store
        .search_listings(&ListingFilter::default(), ListingOrder::Newest, Some(page))
        .await?;

    Ok(ApiResponse::success(ListingPageBody {
        data: result.items,
        page: page.page,
        limit: page.limit,
        total: result.total,
    }))
}

pub async fn show(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<ListingBody> {
    let listing = find(&state, id).await?;
    Ok(ApiResponse::success(ListingBody { data: listing }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(input): ApiJson<ListingInput>,
) -> ApiResult<Created> {
    let listing = input.into_new_listing().map_err(|fields| {
        let message = if missing_required(&fields) {
            "Title, price and location are required"
        } else {
            "Invalid property data"
        };
        ApiError::validation_error(message, Some(fields))
    })?;

    let created = state.store.create_listing(&listing).await?;
    tracing::info!("Subject {} created property {}", principal.subject_id, created.id);

    Ok(ApiResponse::created(Created {
        id: created.id,
        message: "Property created",
        data: created,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RecordId(id): RecordId,
    ApiJson(input): ApiJson<ListingInput>,
) -> ApiResult<Updated> {
    let existing = find(&state, id).await?;
    let merged = input
        .merge_into(&existing)
        .map_err(|fields| ApiError::validation_error("Invalid property data", Some(fields)))?;

    // The row can disappear between the read and the write
    let updated = state
        .store
        .update_listing(id, &merged)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    tracing::info!("Subject {} updated property {}", principal.subject_id, id);

    Ok(ApiResponse::success(Updated {
        message: "Property updated",
        data: updated,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RecordId(id): RecordId,
) -> ApiResult<Deleted> {
    if !state.store.delete_listing(id).await? {
        return Err(ApiError::not_found("Property not found"));
    }
    tracing::info!("Subject {} deleted property {}", principal.subject_id, id);
    Ok(ApiResponse::success(Deleted {
        message: "Property deleted",
    }))
}

async fn find(state: &AppState, id: i64) -> Result<Listing, ApiError> {
    state
        .store
        .get_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))
}
