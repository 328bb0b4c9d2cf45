use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::filter::{ListingFilter, ListingOrder, PageRequest};

use super::models::{Listing, NewListing, NewUser, UserAccount};
use super::schema::{sample_listings, sample_user};
use super::{ListingPage, ListingStore, Store, StoreError, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserAccount>,
    listings: Vec<Listing>,
    next_user_id: i64,
    next_listing_id: i64,
}

/// Process-local store used when no database is configured, and by the test suite.
///
/// Ids start at 1 and are never reused, matching a `BIGSERIAL` column.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the sample account and listings from [`super::schema`].
    pub fn seeded() -> anyhow::Result<Self> {
        let mut tables = Tables::default();
        insert_user(&mut tables, sample_user()?)?;
        for listing in sample_listings() {
            insert_listing(&mut tables, &listing);
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }
}

fn insert_user(tables: &mut Tables, user: NewUser) -> Result<i64, StoreError> {
    let taken = tables
        .users
        .iter()
        .any(|u| u.username == user.username || u.email == user.email);
    if taken {
        return Err(StoreError::Conflict("Username or email already registered".to_string()));
    }

    tables.next_user_id += 1;
    let now = Utc::now();
    let id = tables.next_user_id;
    tables.users.push(UserAccount {
        id,
        username: user.username,
        email: user.email,
        password: user.password_hash,
        role: Some(user.role.as_str().to_string()),
        is_active: user.is_active,
        email_verified: user.email_verified,
        last_login: None,
        created_at: now,
        updated_at: now,
    });
    Ok(id)
}

fn insert_listing(tables: &mut Tables, listing: &NewListing) -> Listing {
    tables.next_listing_id += 1;
    let now = Utc::now();
    let stored = build_listing(tables.next_listing_id, listing, now, now);
    tables.listings.push(stored.clone());
    stored
}

fn build_listing(
    id: i64,
    listing: &NewListing,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
) -> Listing {
    Listing {
        id,
        title: listing.title.clone(),
        description: listing.description.clone(),
        price: listing.price,
        price_formatted: listing.price_formatted.clone(),
        location: listing.location.clone(),
        address: listing.address.clone(),
        bedrooms: listing.bedrooms,
        bathrooms: listing.bathrooms,
        land_area: listing.land_area,
        building_area: listing.building_area,
        property_type: listing.property_type.clone(),
        status: listing.status,
        featured: listing.featured,
        image_url: listing.image_url.clone(),
        images: listing.images.clone(),
        created_at,
        updated_at,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.matches_login(login)).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        insert_user(&mut tables, user)
    }

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.users.len() as i64)
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn search_listings(
        &self,
        filter: &ListingFilter,
        order: ListingOrder,
        page: Option<PageRequest>,
    ) -> Result<ListingPage, StoreError> {
        let tables = self.tables.read().await;
        let mut matched: Vec<Listing> = tables.listings.iter().filter(|l| filter.matches(l)).cloned().collect();

        match order {
            ListingOrder::FeaturedFirst => matched.sort_by(|a, b| (b.featured, b.id).cmp(&(a.featured, a.id))),
            ListingOrder::Newest => matched.sort_by(|a, b| b.id.cmp(&a.id)),
        }

        let total = matched.len() as i64;
        let items = match page {
            None => matched,
            Some(page) => {
                let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
                matched.into_iter().skip(offset).take(page.limit as usize).collect()
            }
        };

        Ok(ListingPage { items, total })
    }

    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn create_listing(&self, listing: &NewListing) -> Result<Listing, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(insert_listing(&mut tables, listing))
    }

    async fn update_listing(&self, id: i64, listing: &NewListing) -> Result<Option<Listing>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.listings.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        *slot = build_listing(id, listing, slot.created_at, Utc::now());
        Ok(Some(slot.clone()))
    }

    async fn delete_listing(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.listings.len();
        tables.listings.retain(|l| l.id != id);
        Ok(tables.listings.len() != before)
    }

    async fn count_listings(&self) -> Result<(i64, i64), StoreError> {
        let tables = self.tables.read().await;
        let featured = tables.listings.iter().filter(|l| l.featured).count();
        Ok((tables.listings.len() as i64, featured as i64))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ListingStatus;

    fn listing(title: &str, location: &str, property_type: &str, featured: bool) -> NewListing {
        let mut listing = sample_listings().remove(0);
        listing.title = title.to_string();
        listing.location = location.to_string();
        listing.property_type = property_type.to_string();
        listing.featured = featured;
        listing
    }

    #[tokio::test]
    async fn seeded_store_has_sample_data() {
        let store = MemoryStore::seeded().unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.properties, 2);
        assert_eq!(stats.featured, 1);
        assert!(store.find_user_by_login("test@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = MemoryStore::new();
        let id = store
            .create_user(NewUser::regular("alice".into(), "alice@x.io".into(), "hash".into()))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let dup_email = store
            .create_user(NewUser::regular("alice2".into(), "alice@x.io".into(), "hash".into()))
            .await;
        assert!(matches!(dup_email, Err(StoreError::Conflict(_))));
        let dup_name = store
            .create_user(NewUser::regular("alice".into(), "other@x.io".into(), "hash".into()))
            .await;
        assert!(matches!(dup_name, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn search_orders_filters_and_pages() {
        let store = MemoryStore::new();
        store.create_listing(&listing("A", "Jakarta Selatan", "house", false)).await.unwrap();
        store.create_listing(&listing("B", "Bandung", "house", true)).await.unwrap();
        store.create_listing(&listing("C", "jakarta barat", "apartment", false)).await.unwrap();
        store.create_listing(&listing("D", "Jakarta Pusat", "house", false)).await.unwrap();

        let all = store
            .search_listings(&ListingFilter::default(), ListingOrder::FeaturedFirst, None)
            .await
            .unwrap();
        let titles: Vec<&str> = all.items.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "D", "C", "A"]);

        let jakarta_houses = store
            .search_listings(
                &ListingFilter::from_params(Some("house"), Some("JAKARTA")),
                ListingOrder::FeaturedFirst,
                Some(PageRequest { page: 1, limit: 1 }),
            )
            .await
            .unwrap();
        assert_eq!(jakarta_houses.total, 2);
        assert_eq!(jakarta_houses.items.len(), 1);
        assert_eq!(jakarta_houses.items[0].title, "D");

        let past_end = store
            .search_listings(
                &ListingFilter::default(),
                ListingOrder::Newest,
                Some(PageRequest { page: 9, limit: 10 }),
            )
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 4);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = MemoryStore::new();
        let created = store.create_listing(&listing("A", "Bali", "villa", false)).await.unwrap();

        let mut changed = NewListing::from(&created);
        changed.status = ListingStatus::Terjual;
        let updated = store.update_listing(created.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.status, ListingStatus::Terjual);
        assert_eq!(updated.created_at, created.created_at);

        assert!(store.update_listing(999, &changed).await.unwrap().is_none());
        assert!(store.delete_listing(created.id).await.unwrap());
        assert!(!store.delete_listing(created.id).await.unwrap());
        assert!(store.get_listing(created.id).await.unwrap().is_none());
    }
}
