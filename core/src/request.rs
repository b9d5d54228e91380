//! Legacy request context handed to the dispatcher.
//!
//! A deliberately thin view of the inbound request: a path and a bag of
//! query parameters. The transport layer owns the real HTTP types; the
//! dispatcher only ever needs these two pieces.

use std::collections::HashMap;

/// Inbound legacy OPAC request: path plus decoded query parameters.
///
/// For repeated query parameters the first occurrence wins, matching the
/// legacy catalogue's own behavior.
#[derive(Debug, Clone, Default)]
pub struct LegacyRequest {
    path: String,
    query: HashMap<String, String>,
}

impl LegacyRequest {
    /// Create a builder for `LegacyRequest`.
    #[must_use]
    pub fn builder() -> LegacyRequestBuilder {
        LegacyRequestBuilder::default()
    }

    /// Build from a request path and the raw (still percent-encoded) query
    /// string, as the transport hands them over.
    #[must_use]
    pub fn from_path_and_query(path: &str, raw_query: Option<&str>) -> Self {
        let mut query = HashMap::new();
        if let Some(raw) = raw_query {
            for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                query.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        Self {
            path: path.to_string(),
            query,
        }
    }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A query parameter by name, if present.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// A query parameter by name, treating an empty value as absent.
    ///
    /// Legacy search forms submit every field, filled in or not.
    #[must_use]
    pub fn nonempty_param(&self, name: &str) -> Option<&str> {
        self.query_param(name).filter(|value| !value.is_empty())
    }
}

/// Builder for [`LegacyRequest`].
#[derive(Debug, Default)]
pub struct LegacyRequestBuilder {
    request: LegacyRequest,
}

impl LegacyRequestBuilder {
    /// Set the request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request.path = path.into();
        self
    }

    /// Add a query parameter (first occurrence wins).
    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .query
            .entry(name.into())
            .or_insert_with(|| value.into());
        self
    }

    /// Build the [`LegacyRequest`].
    #[must_use]
    pub fn build(self) -> LegacyRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let request = LegacyRequest::builder()
            .path("/search")
            .query_param("searcharg", "spiders")
            .query_param("searchtype", "t")
            .build();

        assert_eq!(request.path(), "/search");
        assert_eq!(request.query_param("searcharg"), Some("spiders"));
        assert_eq!(request.query_param("searchtype"), Some("t"));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn raw_query_is_percent_decoded() {
        let request =
            LegacyRequest::from_path_and_query("/search", Some("SEARCH=spiders%20and%20snakes"));
        assert_eq!(request.query_param("SEARCH"), Some("spiders and snakes"));
    }

    #[test]
    fn first_occurrence_wins_for_repeated_params() {
        let request = LegacyRequest::from_path_and_query("/search", Some("sortdropdown=t&sortdropdown=a"));
        assert_eq!(request.query_param("sortdropdown"), Some("t"));
    }

    #[test]
    fn empty_values_are_absent_via_nonempty_param() {
        let request = LegacyRequest::from_path_and_query("/search", Some("SEARCH=&searcharg=x"));
        assert_eq!(request.query_param("SEARCH"), Some(""));
        assert_eq!(request.nonempty_param("SEARCH"), None);
        assert_eq!(request.nonempty_param("searcharg"), Some("x"));
    }
}
