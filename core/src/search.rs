//! Advanced search decoding — legacy boolean expressions to ordered terms.
//!
//! The legacy OPAC serializes its advanced search form as a parenthesized
//! boolean expression:
//!
//! ```text
//! (t:(spiders and snakes) and not d:(biology) or a:(lee))
//! ```
//!
//! [`decode`] turns that into an ordered sequence of [`SearchTerm`]s. It
//! deliberately parses only the top-level boolean structure: text inside a
//! field's inner parentheses is carried verbatim, because the vendor never
//! documented the field-internal sub-grammar. Decoding is total — the OPAC
//! receives malformed and adversarial query strings constantly, and every
//! one of them must still produce *some* valid redirect, so garbage
//! degrades to literal `any`-field terms or to an empty sequence, never to
//! an error.

use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Terms
// ═══════════════════════════════════════════════════════════════════════════════

/// Search scope of one term.
///
/// Single-character field codes in the legacy grammar: `t` → [`Title`],
/// `a` → [`Creator`], `d` → [`Subject`]. Everything else stays [`Any`].
///
/// [`Title`]: Self::Title
/// [`Creator`]: Self::Creator
/// [`Subject`]: Self::Subject
/// [`Any`]: Self::Any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    /// Unscoped search across all fields.
    #[default]
    Any,
    /// Title search (`t`).
    Title,
    /// Author/creator search (`a`).
    Creator,
    /// Subject search (`d`).
    Subject,
}

impl SearchField {
    /// Map a legacy single-character field code.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            't' => Some(Self::Title),
            'a' => Some(Self::Creator),
            'd' => Some(Self::Subject),
            _ => None,
        }
    }

    /// The destination system's field name for query serialization.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Title => "title",
            Self::Creator => "creator",
            Self::Subject => "sub",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean combinator linking a term to the NEXT term in sequence.
///
/// The connective on the last term is always [`And`](Self::And) and carries
/// no meaning — it is a formatting artifact of the serialization, and
/// consumers must ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connective {
    /// `and` — both terms must match.
    #[default]
    And,
    /// `or` — either term may match.
    Or,
    /// `and not` — the next term is excluded.
    Not,
}

impl Connective {
    /// The destination system's spelling for query serialization.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded search term.
///
/// The match operator is always `contains` — the legacy form offers no
/// other operator, so it is fixed in the serialization rather than stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    /// Field scope.
    pub field: SearchField,
    /// Search text, verbatim from the expression.
    pub text: String,
    /// How this term combines with the next one.
    pub connective: Connective,
}

impl SearchTerm {
    /// Serialize as the destination system's repeated `query` value:
    /// `field,contains,text,CONNECTIVE`.
    #[must_use]
    pub fn query_value(&self) -> String {
        format!("{},contains,{},{}", self.field, self.text, self.connective)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════════════════

/// Decode a legacy advanced-search expression into ordered terms.
///
/// Never fails: unbalanced parentheses are tolerated, unknown shapes
/// degrade to literal `any` terms, and expressions with no content decode
/// to an empty vector.
///
/// # Example
///
/// ```
/// use detour::{decode, Connective, SearchField};
///
/// let terms = decode("(t:(spiders) and not d:(biology))");
/// assert_eq!(terms.len(), 2);
/// assert_eq!(terms[0].field, SearchField::Title);
/// assert_eq!(terms[0].text, "spiders");
/// assert_eq!(terms[0].connective, Connective::Not);
/// assert_eq!(terms[1].query_value(), "sub,contains,biology,AND");
/// ```
#[must_use]
pub fn decode(expression: &str) -> Vec<SearchTerm> {
    // Peel off enclosing paren pairs that span the whole expression.
    let mut rest = expression.trim();
    while let Some(inner) = strip_spanning_parens(rest) {
        rest = inner;
    }
    if parens_only(rest) {
        return Vec::new();
    }

    let mut terms: Vec<SearchTerm> = split_top_level(rest)
        .into_iter()
        .filter_map(|(segment, connective)| segment_term(segment, connective))
        .collect();

    // The last term's connective is a formatting artifact and must always
    // read `And`, even when the expression trails off in a connective word.
    if let Some(last) = terms.last_mut() {
        last.connective = Connective::And;
    }
    terms
}

/// Strip one enclosing paren pair if the pair spans the entire string:
/// the `(` at position 0 must close exactly at the last character.
fn strip_spanning_parens(s: &str) -> Option<&str> {
    if !s.starts_with('(') {
        return None;
    }
    match matching_close(s, 0) {
        Some(close) if close == s.len() - 1 => Some(s[1..close].trim()),
        _ => None,
    }
}

/// Byte index of the `)` closing the `(` at `open`, or `None` if the group
/// never closes. The caller guarantees `s[open..]` starts with `(`.
fn matching_close(s: &str, open: usize) -> Option<usize> {
    let mut depth: usize = 0;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether the string holds nothing but parentheses and whitespace.
fn parens_only(s: &str) -> bool {
    s.chars().all(|c| c == '(' || c == ')' || c.is_whitespace())
}

/// Split on the connective words `and not` / `and` / `or` occurring as
/// whitespace-delimited tokens at paren depth 0. Each connective becomes
/// the trailing connective of the segment before it.
///
/// Segments are sliced out of the original string by byte offset, so the
/// text between a segment's first and last token — interior whitespace
/// included — is carried verbatim.
fn split_top_level(s: &str) -> Vec<(&str, Connective)> {
    // split_whitespace yields subslices of s, so pointer arithmetic
    // recovers each token's byte offset.
    let tokens: Vec<(usize, &str)> = s
        .split_whitespace()
        .map(|token| (token.as_ptr() as usize - s.as_ptr() as usize, token))
        .collect();

    let mut segments = Vec::new();
    // Byte range of the segment under construction.
    let mut span: Option<(usize, usize)> = None;
    // Signed: stray closing parens drive the depth negative, which still
    // shields following connective words from splitting.
    let mut depth: i32 = 0;

    let mut i = 0;
    while i < tokens.len() {
        let (start, token) = tokens[i];

        if depth == 0 {
            if token.eq_ignore_ascii_case("and") {
                let connective = if tokens
                    .get(i + 1)
                    .is_some_and(|(_, next)| next.eq_ignore_ascii_case("not"))
                {
                    i += 1; // consume the "not"
                    Connective::Not
                } else {
                    Connective::And
                };
                if let Some((from, to)) = span.take() {
                    segments.push((&s[from..to], connective));
                }
                i += 1;
                continue;
            }
            if token.eq_ignore_ascii_case("or") {
                if let Some((from, to)) = span.take() {
                    segments.push((&s[from..to], Connective::Or));
                }
                i += 1;
                continue;
            }
        }

        depth += paren_delta(token);
        let end = start + token.len();
        span = Some(match span {
            Some((from, _)) => (from, end),
            None => (start, end),
        });
        i += 1;
    }

    if let Some((from, to)) = span {
        segments.push((&s[from..to], Connective::And));
    }
    segments
}

fn paren_delta(token: &str) -> i32 {
    let mut delta = 0;
    for c in token.chars() {
        match c {
            '(' => delta += 1,
            ')' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Turn one segment into a term, or `None` when the segment has no content.
///
/// A segment is field-extracted only when it matches `<code>:(<text>)`
/// exactly, with the trailing `)` closing at the end of the segment and
/// `<code>` one of the recognized field letters. Anything else — including
/// an unrecognized code in that shape — becomes a literal `any` term, field
/// prefix intact.
fn segment_term(segment: &str, connective: Connective) -> Option<SearchTerm> {
    let segment = strip_spanning_parens(segment).unwrap_or(segment).trim();
    if parens_only(segment) {
        return None;
    }

    if let Some((field, text)) = extract_field(segment) {
        return Some(SearchTerm {
            field,
            text: text.to_string(),
            connective,
        });
    }

    Some(SearchTerm {
        field: SearchField::Any,
        text: segment.to_string(),
        connective,
    })
}

/// Match the `<code>:(<text>)` shape. The inner text is taken verbatim —
/// never re-split, even when it contains connective words.
fn extract_field(segment: &str) -> Option<(SearchField, &str)> {
    let mut chars = segment.char_indices();
    let (_, code) = chars.next()?;
    let field = SearchField::from_code(code)?;

    let (colon_at, colon) = chars.next()?;
    if colon != ':' {
        return None;
    }

    let open = colon_at + colon.len_utf8();
    if !segment[open..].starts_with('(') {
        return None;
    }
    let close = matching_close(segment, open)?;
    if close != segment.len() - 1 {
        return None;
    }

    Some((field, &segment[open + 1..close]))
}
