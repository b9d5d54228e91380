//! Deployment profiles — per-institution translation tables as data.
//!
//! Each migrated institution used its own sort codes, search scopes and
//! destination conventions. Those differences live here as configuration
//! rather than as per-institution forks of the dispatcher: a deployment
//! either runs the built-in defaults or loads a YAML [`Deployment`] file
//! overriding them.

use crate::RuleSet;
use serde::Deserialize;
use std::collections::HashMap;

/// HTTP status policy for outbound redirects.
///
/// Permalinks deserve a permanent redirect so crawlers and bookmarks learn
/// the new URL; one deployment variant prefers temporary redirects while
/// its mapping exports are still settling. Policy, not a core invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectStatus {
    /// `301 Moved Permanently`.
    #[default]
    Permanent,
    /// `302 Found`.
    Temporary,
}

/// Per-deployment translation tables consulted by the dispatcher.
///
/// Unmapped codes are simply omitted from the outbound URL, never errors:
/// legacy traffic is full of stale and hand-edited query strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    /// Legacy `sortdropdown` code → destination `sortby` value.
    pub sort_codes: HashMap<String, String>,

    /// Legacy `searchscope` code → destination `mfacet` values (repeated).
    pub scope_facets: HashMap<String, Vec<String>>,

    /// Fixed parameters appended to every simple-search redirect.
    pub search_params: Vec<(String, String)>,

    /// Take the record ID from this query parameter instead of the path
    /// remainder. Some legacy deployments linked records as
    /// `/record?id=1234` rather than `/record=b1234`.
    pub record_id_param: Option<String>,

    /// Prefix glued onto the mapped target ID in the `docid` parameter.
    pub docid_prefix: String,

    /// Redirect status policy.
    pub status: RedirectStatus,
}

impl Default for Profile {
    /// The reference deployment's tables.
    fn default() -> Self {
        let sort_codes = [
            ("t", "title"),
            ("a", "author"),
            ("c", "date_a"),
            ("r", "date_d"),
        ]
        .into_iter()
        .map(|(code, sortby)| (code.to_string(), sortby.to_string()))
        .collect();

        let scope_facets: HashMap<String, Vec<String>> = [
            ("1", vec!["rtype,include,books,1"]),
            ("2", vec!["rtype,include,journals,1"]),
            (
                "3",
                vec!["rtype,include,books,1", "rtype,include,online_resources,2"],
            ),
            (
                "4",
                vec![
                    "rtype,include,journals,1",
                    "rtype,include,online_resources,2",
                ],
            ),
            ("5", vec!["rtype,include,online_resources,1"]),
            ("6", vec!["rtype,include,government_documents,1"]),
            ("7", vec!["rtype,include,audios,1"]),
            ("8", vec!["rtype,include,videos,1"]),
        ]
        .into_iter()
        .map(|(code, facets)| {
            (
                code.to_string(),
                facets.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            sort_codes,
            scope_facets,
            search_params: vec![
                ("tab".to_string(), "Everything".to_string()),
                ("search_scope".to_string(), "MyInst_and_CI".to_string()),
            ],
            record_id_param: None,
            docid_prefix: "alma".to_string(),
            status: RedirectStatus::Permanent,
        }
    }
}

/// One deployment: a profile plus its ordered rule set.
///
/// This is the whole declarative surface a YAML deployment file can set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Deployment {
    /// Translation tables.
    pub profile: Profile,
    /// Ordered prefix→builder bindings.
    pub rules: RuleSet,
}
