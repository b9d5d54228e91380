//! Redirect rules — the ordered prefix dispatch table.
//!
//! Every legacy request class the gateway understands is one tagged
//! variant of [`RuleKind`], bound to a path prefix in a [`RedirectRule`].
//! A [`RuleSet`] is the ordered list of those bindings: plain string-prefix
//! tests evaluated in declaration order, first match wins, no fallthrough.
//! When no prefix matches, the dispatcher's default landing redirect fires
//! (the search form) — that fallback is implicit and always present, so a
//! rule set never has to spell it out.

use serde::Deserialize;

/// What to build for a matched request class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Record permalink: resolve the legacy record ID through the mapping
    /// table and target the record-detail page. Unresolvable or malformed
    /// IDs fall back to the landing page.
    Record,
    /// Patron login form: unconditional redirect to the destination login
    /// page, query parameters ignored.
    Login,
    /// Index browse (author, call number, title): a browse redirect with
    /// this fixed `browseScope`, carrying the caller's text through.
    Browse {
        /// Destination browse scope, e.g. `author` or `callnumber.0`.
        scope: String,
    },
    /// Simple or canned search: sort/scope/searchtype codes translated via
    /// the deployment profile's tables.
    Search,
    /// Advanced search: the raw boolean expression is decoded into ordered
    /// terms and serialized as repeated `query` parameters.
    Advanced,
}

/// One ordered binding of a path prefix to a request class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectRule {
    /// Path prefix matched with a plain `starts_with` test.
    pub prefix: String,
    /// What to build on a match.
    #[serde(flatten)]
    pub kind: RuleKind,
}

/// Ordered redirect rules with first-match-wins semantics.
///
/// Order matters: `/search/X` must be declared before `/search`, or the
/// simple-search rule swallows every advanced search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<RedirectRule>);

impl RuleSet {
    /// Create a rule set from ordered rules.
    #[must_use]
    pub fn new(rules: Vec<RedirectRule>) -> Self {
        Self(rules)
    }

    /// The first rule whose prefix matches the path, in declaration order.
    #[must_use]
    pub fn first_match(&self, path: &str) -> Option<&RedirectRule> {
        self.0.iter().find(|rule| path.starts_with(&rule.prefix))
    }

    /// The rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[RedirectRule] {
        &self.0
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no rules (everything lands on the
    /// default search-form redirect).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RuleSet {
    /// The reference deployment's rule order for a III Sierra web OPAC.
    fn default() -> Self {
        fn rule(prefix: &str, kind: RuleKind) -> RedirectRule {
            RedirectRule {
                prefix: prefix.to_string(),
                kind,
            }
        }

        Self(vec![
            rule("/record=b", RuleKind::Record),
            rule("/patroninfo", RuleKind::Login),
            rule(
                "/search/a",
                RuleKind::Browse {
                    scope: "author".to_string(),
                },
            ),
            rule(
                "/search/c",
                RuleKind::Browse {
                    scope: "callnumber.0".to_string(),
                },
            ),
            rule(
                "/search/t",
                RuleKind::Browse {
                    scope: "title".to_string(),
                },
            ),
            rule("/search/X", RuleKind::Advanced),
            rule("/search", RuleKind::Search),
        ])
    }
}
