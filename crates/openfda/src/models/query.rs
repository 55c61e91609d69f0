//! Event search queries and the fields users filter on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::FdaError;

/// Upstream cap on `limit` for both search and count queries.
pub const MAX_LIMIT: u32 = 1000;

/// Number of events returned when the caller does not ask for more.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Fields enumerated with `count=` queries to populate filter choices.
pub struct FacetField;

impl FacetField {
    pub const MANUFACTURER: &'static str = "manufacturer.name.exact";
    pub const MODEL: &'static str = "device.brand_name.exact";
    pub const MODALITY: &'static str = "device.generic_name.exact";
    /// Regulatory device class (1, 2, 3, ...). Single-token values, so there
    /// is no `.exact` variant.
    pub const DEVICE_CLASS: &'static str = "device.device_class";
}

/// Clamp a requested result count into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIMIT)
}

/// What the user is filtering events by.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Manufacturer,
    Model,
    Modality,
}

impl SearchKind {
    pub const ALL: [SearchKind; 3] = [Self::Manufacturer, Self::Model, Self::Modality];

    /// Field matched by an event search.
    pub fn search_field(self) -> &'static str {
        match self {
            Self::Manufacturer => "manufacturer.name",
            Self::Model => "device.brand_name",
            Self::Modality => "device.generic_name",
        }
    }

    /// Exact-match field used to enumerate selectable values.
    pub fn facet_field(self) -> &'static str {
        match self {
            Self::Manufacturer => FacetField::MANUFACTURER,
            Self::Model => FacetField::MODEL,
            Self::Modality => FacetField::MODALITY,
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manufacturer => write!(f, "manufacturer"),
            Self::Model => write!(f, "model"),
            Self::Modality => write!(f, "modality"),
        }
    }
}

impl FromStr for SearchKind {
    type Err = FdaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manufacturer" => Ok(Self::Manufacturer),
            "model" | "brand" => Ok(Self::Model),
            "modality" | "generic" => Ok(Self::Modality),
            other => Err(FdaError::InvalidConfig(format!(
                "unknown search kind '{}', expected manufacturer, model or modality",
                other
            ))),
        }
    }
}

/// An immutable event search: expression plus result limit.
///
/// The limit is always within `1..=MAX_LIMIT`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EventQuery {
    search_expression: String,
    result_limit: u32,
}

impl EventQuery {
    /// Free-text search expression with a clamped limit.
    pub fn new(search_expression: impl Into<String>, limit: u32) -> Self {
        Self {
            search_expression: search_expression.into(),
            result_limit: clamp_limit(limit),
        }
    }

    /// Free-text search expression, passed upstream unchanged, with the
    /// default limit.
    pub fn raw(search_expression: impl Into<String>) -> Self {
        Self::new(search_expression, DEFAULT_SEARCH_LIMIT)
    }

    /// Match `term` as a phrase in the field behind `kind`.
    ///
    /// ```
    /// use devicewatch_openfda::models::{EventQuery, SearchKind};
    ///
    /// let query = EventQuery::by_kind(SearchKind::Modality, "STENT").and_device_class("2");
    /// assert_eq!(
    ///     query.search_expression(),
    ///     r#"device.generic_name:"STENT" AND device.device_class:2"#
    /// );
    /// assert_eq!(query.result_limit(), 10);
    /// ```
    pub fn by_kind(kind: SearchKind, term: &str) -> Self {
        // Embedded quotes would end the phrase early.
        let term = term.replace('"', "");
        Self::new(
            format!("{}:\"{}\"", kind.search_field(), term.trim()),
            DEFAULT_SEARCH_LIMIT,
        )
    }

    /// Narrow the query to one device class.
    pub fn and_device_class(self, device_class: &str) -> Self {
        let device_class = device_class.trim();
        if device_class.is_empty() {
            return self;
        }
        Self {
            search_expression: format!(
                "{} AND {}:{}",
                self.search_expression,
                FacetField::DEVICE_CLASS,
                device_class
            ),
            ..self
        }
    }

    pub fn with_limit(self, limit: u32) -> Self {
        Self {
            result_limit: clamp_limit(limit),
            ..self
        }
    }

    pub fn search_expression(&self) -> &str {
        &self.search_expression
    }

    pub fn result_limit(&self) -> u32 {
        self.result_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(EventQuery::new("x", 5000).result_limit(), MAX_LIMIT);
        assert_eq!(EventQuery::new("x", 0).result_limit(), 1);
        assert_eq!(EventQuery::new("x", 250).result_limit(), 250);
        assert_eq!(
            EventQuery::new("x", 3).with_limit(2000).result_limit(),
            MAX_LIMIT
        );
    }

    #[test]
    fn test_by_kind_uses_search_field() {
        let query = EventQuery::by_kind(SearchKind::Manufacturer, " ACME CORP ");
        assert_eq!(query.search_expression(), r#"manufacturer.name:"ACME CORP""#);

        let query = EventQuery::by_kind(SearchKind::Model, r#"PUMP "X""#);
        assert_eq!(query.search_expression(), r#"device.brand_name:"PUMP X""#);
    }

    #[test]
    fn test_blank_device_class_is_ignored() {
        let query = EventQuery::by_kind(SearchKind::Modality, "STENT").and_device_class("  ");
        assert_eq!(query.search_expression(), r#"device.generic_name:"STENT""#);
    }

    #[test]
    fn test_search_kind_parsing() {
        assert_eq!("Manufacturer".parse::<SearchKind>(), Ok(SearchKind::Manufacturer));
        assert_eq!("model".parse::<SearchKind>(), Ok(SearchKind::Model));
        assert_eq!("MODALITY".parse::<SearchKind>(), Ok(SearchKind::Modality));
        assert!("colour".parse::<SearchKind>().is_err());
    }

    #[test]
    fn test_facet_fields() {
        for kind in SearchKind::ALL {
            assert_eq!(
                kind.facet_field(),
                format!("{}.exact", kind.search_field())
            );
        }
    }

    #[test]
    fn test_raw_query_keeps_expression() {
        let expression = r#"device.generic_name:"STENT" AND date_received:[20240101 TO 20241231]"#;
        let query = EventQuery::raw(expression);
        assert_eq!(query.search_expression(), expression);
        assert_eq!(query.result_limit(), DEFAULT_SEARCH_LIMIT);
        assert_eq!(EventQuery::raw("x").with_limit(0).result_limit(), 1);
    }

    #[test]
    fn test_device_class_filter_uses_facet_field() {
        let query = EventQuery::raw("manufacturer.name:ACME").and_device_class(" 3 ");
        assert_eq!(
            query.search_expression(),
            format!("manufacturer.name:ACME AND {}:3", FacetField::DEVICE_CLASS)
        );
    }
}
