//! Dispatcher — classifies legacy requests and builds outbound URLs.
//!
//! One [`Dispatcher`] per deployment, built once at startup from resolved
//! configuration and the loaded [`MappingTable`]. Per request,
//! [`classify`](Dispatcher::classify) walks the rule set, runs the matching
//! builder and returns a fully-qualified [`Redirect`]. Builders are pure
//! functions of the request, the read-only table and the profile — no I/O,
//! no shared mutable state — so one dispatcher serves any number of
//! concurrent requests.
//!
//! Misses never surface as errors: an unmapped record ID, an unknown sort
//! code or a garbled advanced expression all still produce a valid
//! redirect, degraded toward the search landing page.

use crate::search::{decode, SearchField};
use crate::{LegacyRequest, MappingTable, Profile, RedirectRule, RedirectStatus, RuleKind, RuleSet};
use url::Url;

// Paths on the destination discovery service.
const LANDING_PATH: &str = "/discovery/search";
const RECORD_PATH: &str = "/discovery/fulldisplay";
const LOGIN_PATH: &str = "/discovery/login";
const BROWSE_PATH: &str = "/discovery/browse";

/// A classified request: where to send the client, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Fully-qualified outbound URL.
    pub url: Url,
    /// Status policy from the deployment profile.
    pub status: RedirectStatus,
}

/// Translates legacy requests into destination redirects.
///
/// Immutable after construction; see the module docs for the concurrency
/// discipline.
#[derive(Debug)]
pub struct Dispatcher {
    base: Url,
    vid: String,
    table: MappingTable,
    rules: RuleSet,
    profile: Profile,
}

impl Dispatcher {
    /// Create a dispatcher from resolved configuration.
    ///
    /// `base` is the destination instance's origin (scheme + host); its
    /// path and query are ignored. `vid` is the destination-instance
    /// identifier appended to every outbound URL.
    pub fn new(
        base: Url,
        vid: impl Into<String>,
        table: MappingTable,
        rules: RuleSet,
        profile: Profile,
    ) -> Self {
        Self {
            base,
            vid: vid.into(),
            table,
            rules,
            profile,
        }
    }

    /// Number of mappings available for record permalinks.
    #[must_use]
    pub fn mapping_count(&self) -> usize {
        self.table.len()
    }

    /// Classify a request and build its outbound redirect.
    ///
    /// Total: every request, however malformed, receives a redirect. The
    /// destination-instance identifier is appended last so every builder's
    /// URL carries it.
    #[must_use]
    pub fn classify(&self, request: &LegacyRequest) -> Redirect {
        let mut url = self.landing_url();

        match self.rules.first_match(request.path()) {
            Some(rule) => match &rule.kind {
                RuleKind::Record => self.build_record(&mut url, request, rule),
                RuleKind::Login => url.set_path(LOGIN_PATH),
                RuleKind::Browse { scope } => self.build_browse(&mut url, request, scope),
                RuleKind::Search => self.build_search(&mut url, request),
                RuleKind::Advanced => self.build_advanced(&mut url, request),
            },
            // Default rule: the search-form landing page.
            None => {}
        }

        set_param(&mut url, "vid", &self.vid);

        Redirect {
            url,
            status: self.profile.status,
        }
    }

    /// The default search-form landing URL (before `vid` is appended).
    fn landing_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_path(LANDING_PATH);
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    // ── Builders, one per request class ──────────────────────────────────────

    /// Record permalink: resolve the legacy ID via the mapping table.
    ///
    /// Unresolvable or malformed IDs leave the landing URL untouched — a
    /// missing mapping is expected steady-state traffic, not a fault.
    fn build_record(&self, url: &mut Url, request: &LegacyRequest, rule: &RedirectRule) {
        let id_text = match &self.profile.record_id_param {
            Some(param) => request.query_param(param).unwrap_or(""),
            None => request
                .path()
                .strip_prefix(rule.prefix.as_str())
                .unwrap_or(""),
        };

        // A record number is digits only; `parse` alone would also admit
        // a leading `+`.
        if id_text.is_empty() || !id_text.bytes().all(|b| b.is_ascii_digit()) {
            return;
        }

        if let Ok(legacy_id) = id_text.parse::<u32>() {
            if let Some(target_id) = self.table.lookup(legacy_id) {
                url.set_path(RECORD_PATH);
                set_param(
                    url,
                    "docid",
                    &format!("{}{target_id}", self.profile.docid_prefix),
                );
            }
        }
    }

    /// Index browse: fixed scope per rule, caller's text carried through.
    fn build_browse(&self, url: &mut Url, request: &LegacyRequest, scope: &str) {
        url.set_path(BROWSE_PATH);
        set_param(url, "browseScope", scope);
        if let Some(text) = request.nonempty_param("SEARCH") {
            set_param(url, "browseQuery", text);
        }
    }

    /// Simple/canned search: translate sort, scope and searchtype codes
    /// through the profile tables. Unmapped codes are omitted, not errors.
    fn build_search(&self, url: &mut Url, request: &LegacyRequest) {
        if let Some(sortby) = request
            .query_param("sortdropdown")
            .and_then(|code| self.profile.sort_codes.get(code))
        {
            set_param(url, "sortby", sortby);
        }

        if let Some(facets) = request
            .query_param("searchscope")
            .and_then(|code| self.profile.scope_facets.get(code))
        {
            for facet in facets {
                add_param(url, "mfacet", facet);
            }
        }

        for (name, value) in &self.profile.search_params {
            set_param(url, name, value);
        }

        if let Some(text) = request.nonempty_param("searcharg") {
            match request.query_param("searchtype") {
                Some("t") => set_param(url, "query", &field_query(SearchField::Title, text)),
                Some("a") => set_param(url, "query", &field_query(SearchField::Creator, text)),
                Some("d") => set_param(url, "query", &field_query(SearchField::Subject, text)),
                // Call-number searches have no field query downstream; they
                // become a browse.
                Some("c") => {
                    url.set_path(BROWSE_PATH);
                    set_param(url, "browseScope", "callnumber.0");
                    set_param(url, "browseQuery", text);
                }
                Some("X") => {
                    set_param(url, "mode", "advanced");
                    set_param(url, "query", &field_query(SearchField::Any, text));
                }
                _ => set_param(url, "query", &field_query(SearchField::Any, text)),
            }
        } else if let Some(text) = request.nonempty_param("SEARCH") {
            set_param(url, "mode", "advanced");
            set_param(url, "query", &field_query(SearchField::Any, text));
        }
    }

    /// Advanced search: decode the raw expression into ordered terms, one
    /// repeated `query` parameter per term.
    fn build_advanced(&self, url: &mut Url, request: &LegacyRequest) {
        set_param(url, "mode", "advanced");

        let expression = request
            .nonempty_param("SEARCH")
            .or_else(|| request.nonempty_param("searcharg"))
            .unwrap_or("");

        for term in decode(expression) {
            add_param(url, "query", &term.query_value());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Query helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Build a `field,contains,text` query value. Simple searches carry a
/// single query, so there is no trailing connective here — that suffix
/// belongs to the advanced serialization only.
fn field_query(field: SearchField, text: &str) -> String {
    format!("{field},contains,{text}")
}

/// Set a query parameter, replacing any existing values under that name.
fn set_param(url: &mut Url, name: &str, value: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, val)| (key.into_owned(), val.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (key, val) in &kept {
        pairs.append_pair(key, val);
    }
    pairs.append_pair(name, value);
}

/// Append a query parameter, keeping existing values under that name.
fn add_param(url: &mut Url, name: &str, value: &str) {
    url.query_pairs_mut().append_pair(name, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn dispatcher() -> Dispatcher {
        let table = MappingTable::load(vec![(
            "test.csv".to_string(),
            Cursor::new("991018705459705153,b2405380-01cat\n42,b7\n"),
        )])
        .expect("test table loads");

        Dispatcher::new(
            Url::parse("https://inst.discovery.test").unwrap(),
            "01INST:VU1",
            table,
            RuleSet::default(),
            Profile::default(),
        )
    }

    fn query_values<'a>(url: &'a Url, name: &str) -> Vec<String> {
        url.query_pairs()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .collect()
    }

    #[test]
    fn every_redirect_carries_the_vid() {
        let d = dispatcher();
        for path in ["/record=b2405380", "/record=b999", "/patroninfo", "/", "/nonsense"] {
            let redirect = d.classify(&LegacyRequest::from_path_and_query(path, None));
            assert_eq!(
                query_values(&redirect.url, "vid"),
                vec!["01INST:VU1"],
                "{path}"
            );
        }
    }

    #[test]
    fn mapped_record_goes_to_record_detail() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query("/record=b2405380", None));
        assert_eq!(redirect.url.path(), "/discovery/fulldisplay");
        assert_eq!(
            query_values(&redirect.url, "docid"),
            vec!["alma991018705459705153"]
        );
        assert_eq!(redirect.status, RedirectStatus::Permanent);
    }

    #[test]
    fn unmapped_record_falls_back_to_landing() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query("/record=b999", None));
        assert_eq!(redirect.url.path(), "/discovery/search");
        assert!(query_values(&redirect.url, "docid").is_empty());
    }

    #[test]
    fn malformed_record_id_falls_back_to_landing() {
        let d = dispatcher();
        for path in ["/record=b", "/record=bnot-a-number", "/record=b-1"] {
            let redirect = d.classify(&LegacyRequest::from_path_and_query(path, None));
            assert_eq!(redirect.url.path(), "/discovery/search", "{path}");
        }
    }

    #[test]
    fn signed_record_id_falls_back_to_landing() {
        let d = dispatcher();
        // b2405380 is mapped; a sign in front of the digits must not
        // resolve to it.
        for path in ["/record=b+2405380", "/record=b-2405380", "/record=b 2405380"] {
            let redirect = d.classify(&LegacyRequest::from_path_and_query(path, None));
            assert_eq!(redirect.url.path(), "/discovery/search", "{path}");
            assert!(query_values(&redirect.url, "docid").is_empty(), "{path}");
        }
    }

    #[test]
    fn record_id_from_query_param_when_configured() {
        let table = MappingTable::load(vec![(
            "test.csv".to_string(),
            Cursor::new("42,b7\n"),
        )])
        .unwrap();
        let profile = Profile {
            record_id_param: Some("id".to_string()),
            ..Profile::default()
        };
        let rules = RuleSet::new(vec![RedirectRule {
            prefix: "/record".to_string(),
            kind: RuleKind::Record,
        }]);
        let d = Dispatcher::new(
            Url::parse("https://inst.discovery.test").unwrap(),
            "01INST:VU1",
            table,
            rules,
            profile,
        );

        let redirect = d.classify(&LegacyRequest::from_path_and_query("/record", Some("id=7")));
        assert_eq!(redirect.url.path(), "/discovery/fulldisplay");
        assert_eq!(query_values(&redirect.url, "docid"), vec!["alma42"]);
    }

    #[test]
    fn patron_login_is_unconditional() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/patroninfo~S3/1234/top",
            Some("whatever=ignored"),
        ));
        assert_eq!(redirect.url.path(), "/discovery/login");
    }

    #[test]
    fn author_browse_carries_search_text() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search/a",
            Some("SEARCH=le+carre"),
        ));
        assert_eq!(redirect.url.path(), "/discovery/browse");
        assert_eq!(query_values(&redirect.url, "browseScope"), vec!["author"]);
        assert_eq!(query_values(&redirect.url, "browseQuery"), vec!["le carre"]);
    }

    #[test]
    fn browse_without_text_omits_browse_query() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query("/search/c", None));
        assert_eq!(
            query_values(&redirect.url, "browseScope"),
            vec!["callnumber.0"]
        );
        assert!(query_values(&redirect.url, "browseQuery").is_empty());
    }

    #[test]
    fn simple_search_translates_sort_and_scope() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search",
            Some("sortdropdown=t&searchscope=3&searchtype=a&searcharg=tolkien"),
        ));
        assert_eq!(query_values(&redirect.url, "sortby"), vec!["title"]);
        assert_eq!(
            query_values(&redirect.url, "mfacet"),
            vec![
                "rtype,include,books,1",
                "rtype,include,online_resources,2"
            ]
        );
        assert_eq!(query_values(&redirect.url, "tab"), vec!["Everything"]);
        assert_eq!(
            query_values(&redirect.url, "query"),
            vec!["creator,contains,tolkien"]
        );
    }

    #[test]
    fn unmapped_sort_and_scope_codes_are_omitted() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search",
            Some("sortdropdown=zz&searchscope=99&searcharg=maps"),
        ));
        assert!(query_values(&redirect.url, "sortby").is_empty());
        assert!(query_values(&redirect.url, "mfacet").is_empty());
        assert_eq!(
            query_values(&redirect.url, "query"),
            vec!["any,contains,maps"]
        );
    }

    #[test]
    fn call_number_searchtype_becomes_browse() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search",
            Some("searchtype=c&searcharg=QA76"),
        ));
        assert_eq!(redirect.url.path(), "/discovery/browse");
        assert_eq!(
            query_values(&redirect.url, "browseScope"),
            vec!["callnumber.0"]
        );
        assert_eq!(query_values(&redirect.url, "browseQuery"), vec!["QA76"]);
    }

    #[test]
    fn bare_search_param_becomes_advanced_any_query() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search",
            Some("SEARCH=spiders"),
        ));
        assert_eq!(query_values(&redirect.url, "mode"), vec!["advanced"]);
        assert_eq!(
            query_values(&redirect.url, "query"),
            vec!["any,contains,spiders"]
        );
    }

    #[test]
    fn advanced_search_serializes_terms_in_order() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search/X",
            Some("SEARCH=(t:(spiders)+and+not+d:(biology))"),
        ));
        assert_eq!(query_values(&redirect.url, "mode"), vec!["advanced"]);
        assert_eq!(
            query_values(&redirect.url, "query"),
            vec![
                "title,contains,spiders,NOT",
                "sub,contains,biology,AND"
            ]
        );
    }

    #[test]
    fn advanced_search_with_garbage_still_redirects() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/search/X",
            Some("SEARCH=%29%29"),
        ));
        assert_eq!(query_values(&redirect.url, "mode"), vec!["advanced"]);
        assert!(query_values(&redirect.url, "query").is_empty());
        assert_eq!(query_values(&redirect.url, "vid"), vec!["01INST:VU1"]);
    }

    #[test]
    fn unmatched_path_lands_on_search_form() {
        let d = dispatcher();
        let redirect = d.classify(&LegacyRequest::from_path_and_query(
            "/some/other/page",
            Some("a=b"),
        ));
        assert_eq!(redirect.url.path(), "/discovery/search");
        assert_eq!(redirect.url.host_str(), Some("inst.discovery.test"));
    }

    #[test]
    fn temporary_status_profile_is_honored() {
        let profile = Profile {
            status: RedirectStatus::Temporary,
            ..Profile::default()
        };
        let d = Dispatcher::new(
            Url::parse("https://inst.discovery.test").unwrap(),
            "01INST:VU1",
            MappingTable::empty(),
            RuleSet::default(),
            profile,
        );
        let redirect = d.classify(&LegacyRequest::from_path_and_query("/patroninfo", None));
        assert_eq!(redirect.status, RedirectStatus::Temporary);
    }

    #[test]
    fn set_param_replaces_existing_values() {
        let mut url = Url::parse("https://x.test/?a=1&b=2&a=3").unwrap();
        set_param(&mut url, "a", "9");
        assert_eq!(query_values(&url, "a"), vec!["9"]);
        assert_eq!(query_values(&url, "b"), vec!["2"]);
    }
}
