use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::HashMap;

/// Sale state of a listing. The wire values are the Indonesian labels the catalog uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    /// For sale
    #[default]
    Dijual,
    /// For rent
    Disewa,
    /// Sold
    Terjual,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 3] = [ListingStatus::Dijual, ListingStatus::Disewa, ListingStatus::Terjual];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Dijual => "Dijual",
            ListingStatus::Disewa => "Disewa",
            ListingStatus::Terjual => "Terjual",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown listing status: {}", s))
    }
}

/// A property listing as exposed by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub price_formatted: String,
    pub location: String,
    pub address: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub land_area: i32,
    pub building_area: i32,
    pub property_type: String,
    pub status: ListingStatus,
    pub featured: bool,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `properties` row; `images` is JSON text and `status` free text.
#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub price_formatted: String,
    pub location: String,
    pub address: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub land_area: i32,
    pub building_area: i32,
    pub property_type: String,
    pub status: String,
    pub featured: bool,
    pub image_url: Option<String>,
    pub images: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|_| {
            tracing::warn!("Listing {} has unknown status '{}'", row.id, row.status);
            ListingStatus::default()
        });

        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            price_formatted: row.price_formatted,
            location: row.location,
            address: row.address,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            land_area: row.land_area,
            building_area: row.building_area,
            property_type: row.property_type,
            status,
            featured: row.featured,
            image_url: row.image_url,
            images: parse_stored_images(row.images.as_deref()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Stored image text is a JSON array; anything else reads back as no images.
pub fn parse_stored_images(stored: Option<&str>) -> Vec<String> {
    match stored.map(str::trim) {
        None | Some("") => Vec::new(),
        Some(text) => serde_json::from_str::<Vec<String>>(text).unwrap_or_default(),
    }
}

pub fn serialize_images(images: &[String]) -> String {
    serde_json::to_string(images).unwrap_or_else(|_| "[]".to_string())
}

/// Complete column set for an insert or a full-row update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub price_formatted: String,
    pub location: String,
    pub address: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub land_area: i32,
    pub building_area: i32,
    pub property_type: String,
    pub status: ListingStatus,
    pub featured: bool,
    pub image_url: Option<String>,
    pub images: Vec<String>,
}

impl From<&Listing> for NewListing {
    fn from(listing: &Listing) -> Self {
        Self {
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
        }
    }
}

/// Image list input: an array, a single reference, or a JSON-encoded array string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImagesInput {
    Many(Vec<String>),
    One(String),
}

impl ImagesInput {
    pub fn into_vec(self) -> Vec<String> {
        let images = match self {
            ImagesInput::Many(images) => images,
            ImagesInput::One(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Vec::new()
                } else if text.starts_with('[') {
                    serde_json::from_str(text).unwrap_or_else(|_| vec![text.to_string()])
                } else {
                    vec![text.to_string()]
                }
            }
        };
        images
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Admin create/update body. Every field is optional so one type serves both
/// a create (required fields checked) and a partial update (absent = keep).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub price: Option<i64>,
    pub price_formatted: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub bedrooms: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub bathrooms: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub land_area: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub building_area: Option<i64>,
    pub property_type: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub featured: Option<bool>,
    pub image_url: Option<String>,
    pub images: Option<ImagesInput>,
}

pub type FieldErrors = HashMap<String, String>;

const REQUIRED: &str = "This field is required";

/// True when a create failed because title, price or location was missing.
pub fn missing_required(errors: &FieldErrors) -> bool {
    errors.values().any(|message| message == REQUIRED)
}

/// `VARCHAR` widths of the properties table, in characters.
pub const TITLE_MAX_CHARS: usize = 255;
pub const PRICE_FORMATTED_MAX_CHARS: usize = 100;
pub const LOCATION_MAX_CHARS: usize = 255;
pub const PROPERTY_TYPE_MAX_CHARS: usize = 50;

impl ListingInput {
    /// Build a full listing for insertion; title, price and location are required.
    pub fn into_new_listing(self) -> Result<NewListing, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = non_empty(self.title.clone());
        let location = non_empty(self.location.clone());
        if title.is_none() {
            errors.insert("title".to_string(), REQUIRED.to_string());
        }
        if self.price.map_or(true, |p| p <= 0) {
            errors.insert("price".to_string(), REQUIRED.to_string());
        }
        if location.is_none() {
            errors.insert("location".to_string(), REQUIRED.to_string());
        }
        if !errors.is_empty() {
            // Still report numeric/status problems alongside missing fields
            self.apply(&mut NewListing::blank(), &mut errors);
            return Err(errors);
        }

        let mut listing = NewListing::blank();
        self.apply(&mut listing, &mut errors);
        if listing.price_formatted.is_empty() {
            listing.price_formatted = listing.price.to_string();
        }
        if errors.is_empty() {
            Ok(listing)
        } else {
            Err(errors)
        }
    }

    /// Merge into an existing listing; absent fields keep their stored values.
    pub fn merge_into(self, existing: &Listing) -> Result<NewListing, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut listing = NewListing::from(existing);
        if matches!(self.title.as_deref().map(str::trim), Some("")) {
            errors.insert("title".to_string(), "Must not be empty".to_string());
        }
        if matches!(self.location.as_deref().map(str::trim), Some("")) {
            errors.insert("location".to_string(), "Must not be empty".to_string());
        }
        if matches!(self.price, Some(p) if p <= 0) {
            errors.insert("price".to_string(), "Must be greater than zero".to_string());
        }
        self.apply(&mut listing, &mut errors);
        if errors.is_empty() {
            Ok(listing)
        } else {
            Err(errors)
        }
    }

    fn apply(self, listing: &mut NewListing, errors: &mut FieldErrors) {
        if let Some(title) = non_empty(self.title) {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price.filter(|p| *p > 0) {
            listing.price = price;
        }
        if let Some(price_formatted) = self.price_formatted {
            listing.price_formatted = price_formatted;
        }
        if let Some(location) = non_empty(self.location) {
            listing.location = location;
        }
        if let Some(address) = self.address {
            listing.address = address;
        }

        for (field, value, slot) in [
            ("bedrooms", self.bedrooms, &mut listing.bedrooms),
            ("bathrooms", self.bathrooms, &mut listing.bathrooms),
            ("land_area", self.land_area, &mut listing.land_area),
            ("building_area", self.building_area, &mut listing.building_area),
        ] {
            if let Some(value) = value {
                match i32::try_from(value) {
                    Ok(v) if v >= 0 => *slot = v,
                    _ => {
                        errors.insert(field.to_string(), "Must be a non-negative integer".to_string());
                    }
                }
            }
        }

        if let Some(property_type) = non_empty(self.property_type) {
            listing.property_type = property_type;
        }
        if let Some(status) = self.status {
            match status.parse() {
                Ok(status) => listing.status = status,
                Err(_) => {
                    errors.insert("status".to_string(), "Must be one of Dijual, Disewa, Terjual".to_string());
                }
            }
        }
        if let Some(featured) = self.featured {
            listing.featured = featured;
        }
        if let Some(image_url) = self.image_url {
            listing.image_url = non_empty(Some(image_url));
        }
        if let Some(images) = self.images {
            listing.images = images.into_vec();
        }

        for (field, value, max) in [
            ("title", &listing.title, TITLE_MAX_CHARS),
            ("price_formatted", &listing.price_formatted, PRICE_FORMATTED_MAX_CHARS),
            ("location", &listing.location, LOCATION_MAX_CHARS),
            ("property_type", &listing.property_type, PROPERTY_TYPE_MAX_CHARS),
        ] {
            if value.chars().count() > max {
                errors.insert(field.to_string(), format!("Must be at most {} characters", max));
            }
        }
    }
}

impl NewListing {
    fn blank() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: 0,
            price_formatted: String::new(),
            location: String::new(),
            address: String::new(),
            bedrooms: 0,
            bathrooms: 0,
            land_area: 0,
            building_area: 0,
            property_type: "house".to_string(),
            status: ListingStatus::default(),
            featured: false,
            image_url: None,
            images: Vec::new(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Accepts numbers, numeric strings, null and empty strings.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Some)
            .ok_or_else(|| D::Error::custom("number out of range")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got '{}'", s))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {}", other))),
    }
}

/// Accepts booleans, 0/1 and "true"/"false".
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_f64().unwrap_or(0.0) != 0.0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(Some(true)),
            "false" | "0" | "off" | "no" | "" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("expected a boolean, got '{}'", s))),
        },
        Some(other) => Err(D::Error::custom(format!("expected a boolean, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> ListingInput {
        serde_json::from_value(value).unwrap()
    }

    fn stored_listing() -> Listing {
        Listing {
            id: 7,
            title: "Rumah Contoh".to_string(),
            description: "Dekat stasiun".to_string(),
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
            images: vec!["a.jpg".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_requires_title_price_location() {
        let errors = input(json!({ "description": "no basics" })).into_new_listing().unwrap_err();
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("price"));
        assert!(errors.contains_key("location"));
    }

    #[test]
    fn create_applies_defaults() {
        let listing = input(json!({ "title": "Villa", "price": "1500000000", "location": "Bali" }))
            .into_new_listing()
            .unwrap();
        assert_eq!(listing.price, 1_500_000_000);
        assert_eq!(listing.price_formatted, "1500000000");
        assert_eq!(listing.property_type, "house");
        assert_eq!(listing.status, ListingStatus::Dijual);
        assert!(!listing.featured);
        assert!(listing.images.is_empty());
    }

    #[test]
    fn create_rejects_bad_status_and_negative_rooms() {
        let errors = input(json!({
            "title": "Villa", "price": 10, "location": "Bali",
            "status": "Dilelang", "bedrooms": -1
        }))
        .into_new_listing()
        .unwrap_err();
        assert!(errors.contains_key("status"));
        assert!(errors.contains_key("bedrooms"));
    }

    #[test]
    fn create_rejects_values_wider_than_their_columns() {
        let errors = input(json!({
            "title": "a".repeat(TITLE_MAX_CHARS + 1),
            "price": 10,
            "location": "Bali",
            "price_formatted": "9".repeat(PRICE_FORMATTED_MAX_CHARS + 1),
            "property_type": "v".repeat(PROPERTY_TYPE_MAX_CHARS + 1)
        }))
        .into_new_listing()
        .unwrap_err();
        assert_eq!(errors["title"], "Must be at most 255 characters");
        assert!(errors.contains_key("price_formatted"));
        assert!(errors.contains_key("property_type"));
        assert!(!errors.contains_key("location"));

        // Width is counted in characters, not bytes
        let listing = input(json!({ "title": "é".repeat(TITLE_MAX_CHARS), "price": 10, "location": "Bali" }))
            .into_new_listing()
            .unwrap();
        assert_eq!(listing.title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn merge_rejects_overlong_location() {
        let errors = input(json!({ "location": "x".repeat(LOCATION_MAX_CHARS + 1) }))
            .merge_into(&stored_listing())
            .unwrap_err();
        assert!(errors.contains_key("location"));
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let existing = stored_listing();
        let merged = input(json!({ "price": 900000000, "featured": 1 })).merge_into(&existing).unwrap();
        assert_eq!(merged.price, 900_000_000);
        assert!(merged.featured);
        assert_eq!(merged.title, existing.title);
        assert_eq!(merged.images, existing.images);
    }

    #[test]
    fn merge_rejects_blanking_required_fields() {
        let errors = input(json!({ "title": "  " })).merge_into(&stored_listing()).unwrap_err();
        assert!(errors.contains_key("title"));
    }

    #[test]
    fn images_input_normalizes() {
        assert_eq!(ImagesInput::One("cover.jpg".into()).into_vec(), vec!["cover.jpg"]);
        assert_eq!(ImagesInput::One("[\"a.jpg\",\"b.jpg\"]".into()).into_vec(), vec!["a.jpg", "b.jpg"]);
        assert!(ImagesInput::One("   ".into()).into_vec().is_empty());
        assert_eq!(ImagesInput::Many(vec!["x".into(), "".into()]).into_vec(), vec!["x"]);
    }

    #[test]
    fn stored_images_parse_leniently() {
        assert_eq!(parse_stored_images(Some("[\"a.jpg\"]")), vec!["a.jpg"]);
        assert!(parse_stored_images(Some("not json")).is_empty());
        assert!(parse_stored_images(None).is_empty());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("disewa".parse::<ListingStatus>().unwrap(), ListingStatus::Disewa);
        assert!("Dilelang".parse::<ListingStatus>().is_err());
    }
}
