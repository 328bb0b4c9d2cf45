use crate::database::models::{Listing, ListingStatus};

use super::types::SqlResult;

/// Catalog value meaning "no type filter".
pub const ALL_TYPES: &str = "Semua Tipe";

/// Catalog filters: exact property type, location substring, allowed statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub property_type: Option<String>,
    pub location: Option<String>,
    pub statuses: Option<Vec<ListingStatus>>,
}

impl ListingFilter {
    /// Build from the catalog's `tipe`/`lokasi` parameters.
    pub fn from_params(tipe: Option<&str>, lokasi: Option<&str>) -> Self {
        let property_type = tipe
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != ALL_TYPES)
            .map(str::to_string);
        let location = lokasi
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        Self {
            property_type,
            location,
            statuses: None,
        }
    }

    pub fn with_statuses(mut self, statuses: &[ListingStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    /// In-process evaluation, same semantics as the SQL form.
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(property_type) = &self.property_type {
            if &listing.property_type != property_type {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !listing.location.to_lowercase().contains(&location.to_lowercase()) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&listing.status) {
                return false;
            }
        }
        true
    }

    /// WHERE clause (without the keyword) with `$n` placeholders starting at `$1`.
    pub fn to_where_sql(&self) -> SqlResult {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(property_type) = &self.property_type {
            params.push(property_type.clone());
            conditions.push(format!("\"property_type\" = ${}", params.len()));
        }
        if let Some(location) = &self.location {
            params.push(format!("%{}%", escape_like(location)));
            conditions.push(format!("\"location\" ILIKE ${} ESCAPE '\\'", params.len()));
        }
        if let Some(statuses) = &self.statuses {
            if statuses.is_empty() {
                conditions.push("FALSE".to_string());
            } else {
                let placeholders: Vec<String> = statuses
                    .iter()
                    .map(|status| {
                        params.push(status.as_str().to_string());
                        format!("${}", params.len())
                    })
                    .collect();
                conditions.push(format!("\"status\" IN ({})", placeholders.join(", ")));
            }
        }

        let query = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };

        SqlResult { query, params }
    }
}

/// Make `%`, `_` and `\` match literally inside a LIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
