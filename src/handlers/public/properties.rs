// handlers/public/properties.rs - public catalog reads
//
// GET  /api/properties        paged, filtered catalog (featured first)
// GET  /api/properties/:id    one listing
// POST /api/search-rumah      unpaged search over listed statuses

use axum::{
    body::Bytes,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::api::RecordId;
use crate::database::models::{Listing, ListingStatus};
use crate::database::ListingStore;
use crate::error::ApiError;
use crate::filter::{ListingFilter, ListingOrder, PageRequest};
use crate::middleware::{ApiResponse, ApiResult};
use crate::server::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Raw query values; parsing is lenient so bad numbers fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub tipe: Option<String>,
    pub lokasi: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub lokasi: Option<String>,
    pub tipe: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingPageBody {
    pub data: Vec<Listing>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ListingBody {
    pub data: Listing,
}

#[derive(Debug, Serialize)]
pub struct ListingsBody {
    pub data: Vec<Listing>,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<CatalogQuery>) -> ApiResult<ListingPageBody> {
    let filter = ListingFilter::from_params(query.tipe.as_deref(), query.lokasi.as_deref());
    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        DEFAULT_PAGE_SIZE,
        state.max_page_size,
    );

    let result = state
        .store
        .search_listings(&filter, ListingOrder::FeaturedFirst, Some(page))
        .await?;

    Ok(ApiResponse::success(ListingPageBody {
        data: result.items,
        page: page.page,
        limit: page.limit,
        total: result.total,
    }))
}

pub async fn show(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<ListingBody> {
    let listing = state
        .store
        .get_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    Ok(ApiResponse::success(ListingBody { data: listing }))
}

/// An empty body searches everything.
pub async fn search(State(state): State<AppState>, body: Bytes) -> ApiResult<ListingsBody> {
    let request: SearchRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SearchRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))?
    };

    let filter = ListingFilter::from_params(request.tipe.as_deref(), request.lokasi.as_deref())
        .with_statuses(&ListingStatus::ALL);
    let result = state
        .store
        .search_listings(&filter, ListingOrder::FeaturedFirst, None)
        .await?;

    Ok(ApiResponse::success(ListingsBody { data: result.items }))
}
