//! Persistence: storage traits, the Postgres repository and the in-memory store.

pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{DatabaseConfig, StorageBackend};
use crate::filter::{ListingFilter, ListingOrder, PageRequest};
use models::{Listing, NewListing, NewUser, UserAccount};

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use repository::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One page of listings plus the full filtered count.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub items: Vec<Listing>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub users: i64,
    pub properties: i64,
    pub featured: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// First account whose username or email equals `login`.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Insert a user; a taken username or email is a `StoreError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<i64, StoreError>;

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// `page = None` returns every match.
    async fn search_listings(
        &self,
        filter: &ListingFilter,
        order: ListingOrder,
        page: Option<PageRequest>,
    ) -> Result<ListingPage, StoreError>;

    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError>;

    async fn create_listing(&self, listing: &NewListing) -> Result<Listing, StoreError>;

    /// Overwrite every column; `None` when the row does not exist.
    async fn update_listing(&self, id: i64, listing: &NewListing) -> Result<Option<Listing>, StoreError>;

    /// `false` when the row does not exist.
    async fn delete_listing(&self, id: i64) -> Result<bool, StoreError>;

    /// `(total, featured)` listing counts.
    async fn count_listings(&self) -> Result<(i64, i64), StoreError>;
}

#[async_trait]
pub trait Store: UserStore + ListingStore {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<CatalogStats, StoreError> {
        let users = self.count_users().await?;
        let (properties, featured) = self.count_listings().await?;
        Ok(CatalogStats {
            users,
            properties,
            featured,
        })
    }
}

/// Build the configured backend. Postgres tables are created if missing.
pub async fn open_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage with sample data");
            Ok(Arc::new(MemoryStore::seeded()?))
        }
        StorageBackend::Postgres => {
            let manager = DatabaseManager::new(config)?;
            tracing::info!("Using Postgres storage at {}", manager.redacted_url());
            let pool = manager.pool().await?;
            schema::create_tables(&pool).await?;
            Ok(Arc::new(PgStore::new(Arc::new(manager))))
        }
    }
}
