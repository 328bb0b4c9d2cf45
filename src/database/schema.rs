//! Table bootstrap and sample data for the `estate` CLI and the in-memory store.

use sqlx::PgPool;
use tracing::info;

use crate::auth::{hash_password, Role};

use super::models::{ListingStatus, NewListing, NewUser};
use super::StoreError;

const CREATE_USERS: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(50) NOT NULL UNIQUE,
        email VARCHAR(255) NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role VARCHAR(20) DEFAULT 'user',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        email_verified BOOLEAN NOT NULL DEFAULT FALSE,
        last_login TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_PROPERTIES: &str = r#"
    CREATE TABLE IF NOT EXISTS properties (
        id BIGSERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price BIGINT NOT NULL,
        price_formatted VARCHAR(100) NOT NULL DEFAULT '',
        location VARCHAR(255) NOT NULL,
        address TEXT NOT NULL DEFAULT '',
        bedrooms INTEGER NOT NULL DEFAULT 0,
        bathrooms INTEGER NOT NULL DEFAULT 0,
        land_area INTEGER NOT NULL DEFAULT 0,
        building_area INTEGER NOT NULL DEFAULT 0,
        property_type VARCHAR(50) NOT NULL DEFAULT 'house',
        status VARCHAR(20) NOT NULL DEFAULT 'Dijual',
        featured BOOLEAN NOT NULL DEFAULT FALSE,
        image_url TEXT,
        images TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_properties_type ON properties (property_type)",
    "CREATE INDEX IF NOT EXISTS idx_properties_location ON properties (location)",
    "CREATE INDEX IF NOT EXISTS idx_properties_featured ON properties (featured DESC, id DESC)",
];

pub const SAMPLE_USERNAME: &str = "testuser";
pub const SAMPLE_EMAIL: &str = "test@example.com";
pub const SAMPLE_PASSWORD: &str = "password123";

/// Create tables and indexes if they do not exist.
pub async fn create_tables(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(CREATE_USERS).execute(pool).await?;
    sqlx::query(CREATE_PROPERTIES).execute(pool).await?;
    for statement in CREATE_INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Tables users and properties are ready");
    Ok(())
}

/// Drop both tables and recreate them empty.
pub async fn reset(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("DROP TABLE IF EXISTS properties").execute(pool).await?;
    sqlx::query("DROP TABLE IF EXISTS users").execute(pool).await?;
    info!("Dropped tables users and properties");
    create_tables(pool).await
}

/// What [`seed`] inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: u64,
    pub listings: u64,
}

/// Insert the sample user and listings when they are missing.
pub async fn seed(pool: &PgPool) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    let sample = sample_user()?;
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password, role, is_active, email_verified)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&sample.username)
    .bind(&sample.email)
    .bind(&sample.password_hash)
    .bind(sample.role.as_str())
    .bind(sample.is_active)
    .bind(sample.email_verified)
    .execute(pool)
    .await?;
    report.users = result.rows_affected();

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM properties")
        .fetch_one(pool)
        .await?;
    if existing == 0 {
        for listing in sample_listings() {
            super::repository::insert_listing(pool, &listing).await?;
            report.listings += 1;
        }
    }

    info!("Seeded {} user(s) and {} listing(s)", report.users, report.listings);
    Ok(report)
}

/// Store an admin account, replacing password and role when the username exists.
pub async fn upsert_admin(pool: &PgPool, username: &str, email: &str, password: &str) -> anyhow::Result<i64> {
    let password_hash = hash_password(password)?;
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (username, email, password, role, is_active, email_verified)
        VALUES ($1, $2, $3, 'admin', TRUE, TRUE)
        ON CONFLICT (username) DO UPDATE SET
            password = EXCLUDED.password,
            role = EXCLUDED.role,
            is_active = EXCLUDED.is_active,
            email_verified = EXCLUDED.email_verified,
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .fetch_one(pool)
    .await?;

    info!("Admin account '{}' stored with id {}", username, id);
    Ok(id)
}

pub fn sample_user() -> anyhow::Result<NewUser> {
    Ok(NewUser {
        username: SAMPLE_USERNAME.to_string(),
        email: SAMPLE_EMAIL.to_string(),
        password_hash: hash_password(SAMPLE_PASSWORD)?,
        role: Role::User,
        is_active: true,
        email_verified: false,
    })
}

pub fn sample_listings() -> Vec<NewListing> {
    vec![
        NewListing {
            title: "Rumah Contoh 1".to_string(),
            description: "Deskripsi rumah contoh 1".to_string(),
            price: 1_500_000_000,
            price_formatted: "Rp 1.500.000.000".to_string(),
            location: "Jakarta".to_string(),
            address: "Jl. Contoh No.1".to_string(),
            bedrooms: 3,
            bathrooms: 2,
            land_area: 120,
            building_area: 90,
            property_type: "house".to_string(),
            status: ListingStatus::Dijual,
            featured: true,
            image_url: None,
            images: Vec::new(),
        },
        NewListing {
            title: "Rumah Contoh 2".to_string(),
            description: "Deskripsi rumah contoh 2".to_string(),
            price: 850_000_000,
            price_formatted: "Rp 850.000.000".to_string(),
            location: "Bandung".to_string(),
            address: "Jl. Contoh No.2".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            land_area: 80,
            building_area: 60,
            property_type: "apartment".to_string(),
            status: ListingStatus::Dijual,
            featured: false,
            image_url: None,
            images: Vec::new(),
        },
    ]
}
