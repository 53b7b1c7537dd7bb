//! `?ordering=` support for list endpoints.
//!
//! Clients name a public field, optionally prefixed with `-` for descending
//! order. Only whitelisted fields map to SQL columns; anything else falls back
//! to the endpoint default.

/// A resolved ORDER BY clause. `column` always comes from a whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            descending: true,
        }
    }

    /// Resolve a raw `ordering` parameter against `(public name, column)` pairs.
    pub fn parse(raw: Option<&str>, allowed: &[(&str, &'static str)], default: OrderBy) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return default;
        };

        let (name, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };

        allowed
            .iter()
            .find(|(public, _)| *public == name)
            .map(|(_, column)| OrderBy {
                column,
                descending,
            })
            .unwrap_or(default)
    }

    /// Render as SQL, with the primary key as a stable tiebreaker.
    pub fn to_sql(&self, tiebreaker: &str) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {}, {} {}", self.column, direction, tiebreaker, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[(&str, &str)] = &[("price_per_night", "l.price_per_night"), ("name", "l.name")];

    #[test]
    fn test_parse_descending() {
        let order = OrderBy::parse(Some("-price_per_night"), FIELDS, OrderBy::desc("l.created_at"));
        assert_eq!(order, OrderBy::desc("l.price_per_night"));
    }

    #[test]
    fn test_unknown_field_falls_back() {
        let default = OrderBy::desc("l.created_at");
        assert_eq!(OrderBy::parse(Some("password"), FIELDS, default), default);
        assert_eq!(OrderBy::parse(Some(""), FIELDS, default), default);
        assert_eq!(OrderBy::parse(None, FIELDS, default), default);
    }

    #[test]
    fn test_to_sql() {
        assert_eq!(
            OrderBy::asc("l.name").to_sql("l.property_id"),
            "l.name ASC, l.property_id ASC"
        );
    }
}
