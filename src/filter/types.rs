use serde::Serialize;

/// Parameterized SQL fragment with its `$n` bindings in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<String>,
}

/// Page selection, already clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Parse raw `page`/`limit` query values; anything unparseable falls back to the defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, default_limit: u32, max_limit: u32) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<u32>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(max_limit.max(1));

        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Sort order for listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    /// `featured DESC, id DESC` - public catalog
    FeaturedFirst,
    /// `id DESC` - admin back-office
    Newest,
}

impl ListingOrder {
    pub fn to_sql(self) -> &'static str {
        match self {
            ListingOrder::FeaturedFirst => "\"featured\" DESC, \"id\" DESC",
            ListingOrder::Newest => "\"id\" DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(PageRequest::from_query(None, None, 10, 100), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::from_query(Some("0"), Some("abc"), 10, 100), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::from_query(Some("3"), Some("500"), 10, 100), PageRequest { page: 3, limit: 100 });
        assert_eq!(PageRequest::from_query(Some("-2"), Some("0"), 20, 100), PageRequest { page: 1, limit: 20 });
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageRequest { page: 1, limit: 10 }.offset(), 0);
        assert_eq!(PageRequest { page: 4, limit: 25 }.offset(), 75);
    }
}
