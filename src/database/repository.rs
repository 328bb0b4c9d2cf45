use async_trait::async_trait;
use sqlx::{postgres::PgArguments, PgPool, Postgres};
use std::sync::Arc;

use crate::filter::{ListingFilter, ListingOrder, PageRequest};

use super::manager::DatabaseManager;
use super::models::listing::serialize_images;
use super::models::{Listing, ListingRow, NewListing, NewUser, UserAccount};
use super::{ListingPage, ListingStore, Store, StoreError, UserStore};

const USER_COLUMNS: &str = "id, username, email, password, role, is_active, email_verified, last_login, created_at, updated_at";

const LISTING_COLUMNS: &str = "id, title, description, price, price_formatted, location, address, \
    bedrooms, bathrooms, land_area, building_area, property_type, status, featured, image_url, images, \
    created_at, updated_at";

/// Postgres-backed store; every call borrows the shared pool from the manager.
#[derive(Clone)]
pub struct PgStore {
    db: Arc<DatabaseManager>,
}

impl PgStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub fn manager(&self) -> &DatabaseManager {
        &self.db
    }

    async fn pool(&self) -> Result<PgPool, StoreError> {
        self.db.pool().await
    }
}

/// Statements behind one catalog search. When paged, `select` takes two extra
/// bindings after `params` (limit, then offset) and `count` gives the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListingSearchSql {
    select: String,
    count: Option<String>,
    params: Vec<String>,
}

fn listing_search_sql(filter: &ListingFilter, order: ListingOrder, paged: bool) -> ListingSearchSql {
    let where_sql = filter.to_where_sql();

    let mut select = format!(
        "SELECT {} FROM properties WHERE {} ORDER BY {}",
        LISTING_COLUMNS,
        where_sql.query,
        order.to_sql()
    );
    let count = if paged {
        let next = where_sql.params.len();
        select.push_str(&format!(" LIMIT ${} OFFSET ${}", next + 1, next + 2));
        Some(format!("SELECT COUNT(*) FROM properties WHERE {}", where_sql.query))
    } else {
        None
    };

    ListingSearchSql {
        select,
        count,
        params: where_sql.params,
    }
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict(message.to_string()),
        _ => StoreError::Sqlx(err),
    }
}

fn bind_listing<'q>(
    q: sqlx::query::QueryAs<'q, Postgres, ListingRow, PgArguments>,
    listing: &'q NewListing,
) -> sqlx::query::QueryAs<'q, Postgres, ListingRow, PgArguments> {
    q.bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.price_formatted)
        .bind(&listing.location)
        .bind(&listing.address)
        .bind(listing.bedrooms)
        .bind(listing.bathrooms)
        .bind(listing.land_area)
        .bind(listing.building_area)
        .bind(&listing.property_type)
        .bind(listing.status.as_str())
        .bind(listing.featured)
        .bind(&listing.image_url)
        .bind(serialize_images(&listing.images))
}

pub(crate) async fn insert_listing(pool: &PgPool, listing: &NewListing) -> Result<Listing, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO properties (title, description, price, price_formatted, location, address,
            bedrooms, bathrooms, land_area, building_area, property_type, status, featured,
            image_url, images, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW(), NOW())
        RETURNING {}
        "#,
        LISTING_COLUMNS
    );

    let row = bind_listing(sqlx::query_as::<_, ListingRow>(&sql), listing)
        .fetch_one(pool)
        .await?;
    Ok(row.into())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1 ORDER BY id ASC LIMIT 1",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, UserAccount>(&sql)
            .bind(login)
            .fetch_optional(&pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<i64, StoreError> {
        let pool = self.pool().await?;
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password, role, is_active, email_verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.email_verified)
        .fetch_one(&pool)
        .await
        .map_err(|e| map_unique_violation(e, "Username or email already registered"))?;
        Ok(id)
    }

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        let pool = self.pool().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&pool).await?;
        Ok(count)
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn search_listings(
        &self,
        filter: &ListingFilter,
        order: ListingOrder,
        page: Option<PageRequest>,
    ) -> Result<ListingPage, StoreError> {
        let pool = self.pool().await?;
        let sql = listing_search_sql(filter, order, page.is_some());

        let mut q = sqlx::query_as::<_, ListingRow>(&sql.select);
        for p in sql.params.iter() {
            q = q.bind(p);
        }
        if let Some(page) = page {
            let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
            q = q.bind(i64::from(page.limit)).bind(offset);
        }
        let rows = q.fetch_all(&pool).await?;

        let total = match &sql.count {
            None => rows.len() as i64,
            Some(count_sql) => {
                let mut count_q = sqlx::query_as::<_, (i64,)>(count_sql);
                for p in sql.params.iter() {
                    count_q = count_q.bind(p);
                }
                count_q.fetch_one(&pool).await?.0
            }
        };

        Ok(ListingPage {
            items: rows.into_iter().map(Listing::from).collect(),
            total,
        })
    }

    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        let pool = self.pool().await?;
        let sql = format!("SELECT {} FROM properties WHERE id = $1", LISTING_COLUMNS);
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(&pool)
            .await?;
        Ok(row.map(Listing::from))
    }

    async fn create_listing(&self, listing: &NewListing) -> Result<Listing, StoreError> {
        let pool = self.pool().await?;
        insert_listing(&pool, listing).await
    }

    async fn update_listing(&self, id: i64, listing: &NewListing) -> Result<Option<Listing>, StoreError> {
        let pool = self.pool().await?;
        let sql = format!(
            r#"
            UPDATE properties SET
                title = $1, description = $2, price = $3, price_formatted = $4, location = $5,
                address = $6, bedrooms = $7, bathrooms = $8, land_area = $9, building_area = $10,
                property_type = $11, status = $12, featured = $13, image_url = $14, images = $15,
                updated_at = NOW()
            WHERE id = $16
            RETURNING {}
            "#,
            LISTING_COLUMNS
        );
        let row = bind_listing(sqlx::query_as::<_, ListingRow>(&sql), listing)
            .bind(id)
            .fetch_optional(&pool)
            .await?;
        Ok(row.map(Listing::from))
    }

    async fn delete_listing(&self, id: i64) -> Result<bool, StoreError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_listings(&self) -> Result<(i64, i64), StoreError> {
        let pool = self.pool().await?;
        let counts: (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(*) FILTER (WHERE featured) FROM properties")
                .fetch_one(&pool)
                .await?;
        Ok(counts)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ListingStatus;

    #[test]
    fn paging_placeholders_follow_filter_params() {
        let filter = ListingFilter::from_params(Some("house"), Some("Bandung"));
        let sql = listing_search_sql(&filter, ListingOrder::FeaturedFirst, true);

        assert_eq!(sql.params, vec!["house", "%Bandung%"]);
        assert!(sql.select.ends_with("ORDER BY \"featured\" DESC, \"id\" DESC LIMIT $3 OFFSET $4"));
        assert_eq!(
            sql.count.as_deref(),
            Some("SELECT COUNT(*) FROM properties WHERE \"property_type\" = $1 AND \"location\" ILIKE $2 ESCAPE '\\'")
        );
    }

    #[test]
    fn unfiltered_page_starts_at_first_placeholder() {
        let sql = listing_search_sql(&ListingFilter::default(), ListingOrder::Newest, true);
        assert!(sql.params.is_empty());
        assert!(sql.select.contains("WHERE 1=1 ORDER BY \"id\" DESC LIMIT $1 OFFSET $2"));
        assert_eq!(sql.count.as_deref(), Some("SELECT COUNT(*) FROM properties WHERE 1=1"));
    }

    #[test]
    fn unpaged_search_has_no_limit_or_count() {
        let filter = ListingFilter::default().with_statuses(&ListingStatus::ALL);
        let sql = listing_search_sql(&filter, ListingOrder::FeaturedFirst, false);
        assert!(!sql.select.contains("LIMIT"));
        assert!(sql.count.is_none());
        assert_eq!(sql.params, vec!["Dijual", "Disewa", "Terjual"]);
        assert!(sql.select.contains("\"status\" IN ($1, $2, $3)"));
    }
}
