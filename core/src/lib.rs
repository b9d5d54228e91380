//! detour — translation engine for legacy catalogue permalinks
//!
//! A library catalogue migration breaks every durable link into the old
//! web OPAC. This crate rewrites those requests into equivalent URLs on
//! the destination discovery service, so published permalinks and saved
//! searches keep working.
//!
//! # Architecture
//!
//! ```text
//! mapping files ──load()──▶ MappingTable (read-only after load)
//!                                │
//! inbound path+query ──▶ LegacyRequest ──▶ Dispatcher::classify()
//!                                │               │
//!                          RuleSet (ordered      ├─▶ decode() for advanced
//!                          prefix rules,         │   search expressions
//!                          first match wins)     ▼
//!                                          Redirect { url, status }
//! ```
//!
//! - [`MappingTable`] — legacy numeric record IDs to destination IDs,
//!   built once at startup, immutable afterwards
//! - [`decode`] — the advanced-search expression decoder
//! - [`RuleSet`] / [`RuleKind`] — declarative, ordered prefix→builder
//!   bindings; per-institution variants are configuration, not code forks
//! - [`Dispatcher`] — classifies a [`LegacyRequest`] and builds the
//!   outbound URL; every miss degrades to the search landing page
//!
//! # Example
//!
//! ```
//! use detour::{Dispatcher, LegacyRequest, MappingTable, Profile, RuleSet};
//! use std::io::Cursor;
//!
//! let table = MappingTable::load(vec![(
//!     "bibs.csv".to_string(),
//!     Cursor::new("991018705459705153,b2405380-01cat\n"),
//! )])
//! .unwrap();
//!
//! let dispatcher = Dispatcher::new(
//!     url::Url::parse("https://example.discovery.test").unwrap(),
//!     "01CAT_INST:CAT",
//!     table,
//!     RuleSet::default(),
//!     Profile::default(),
//! );
//!
//! let request = LegacyRequest::from_path_and_query("/record=b2405380", None);
//! let redirect = dispatcher.classify(&request);
//! assert_eq!(redirect.url.path(), "/discovery/fulldisplay");
//! ```
//!
//! Everything here is a pure, bounded-time computation: the crate performs
//! no I/O beyond draining the already-open mapping sources handed to
//! [`MappingTable::load`]. Listener, signals and configuration live in the
//! `detour-server` binary crate.

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod dispatch;
mod mapping;
mod profile;
mod request;
mod rules;
mod search;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use dispatch::{Dispatcher, Redirect};
pub use mapping::{parse_line, LoadError, MappingRecord, MappingTable, ParseError};
pub use profile::{Deployment, Profile, RedirectStatus};
pub use request::{LegacyRequest, LegacyRequestBuilder};
pub use rules::{RedirectRule, RuleKind, RuleSet};
pub use search::{decode, Connective, SearchField, SearchTerm};

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Estimated maximum number of lines in one mapping file.
///
/// Used to pre-size the [`MappingTable`] so a full batch export loads
/// without rehashing.
pub const MAPPING_FILE_LINE_ESTIMATE: usize = 1_000_000;
