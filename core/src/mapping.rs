//! Identifier mapping — legacy record IDs to destination record IDs.
//!
//! Mapping sources are newline-delimited exports, one record per line:
//!
//! ```text
//! <targetID>,<flag><legacyID>[-<suffix>][,ignored fields...]
//! ```
//!
//! The second field carries the legacy ID wrapped in a one-character type
//! flag and an optional `-suffix` (an institution tag in batch exports).
//! Legacy IDs fit 32 bits because the source catalogue's record-number
//! space is bounded; destination IDs are wide 64-bit surrogate keys.
//!
//! Loading is all-or-nothing: the first malformed line or duplicate legacy
//! ID aborts the whole load, so a partially-built table can never serve
//! traffic.

use crate::MAPPING_FILE_LINE_ESTIMATE;
use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::num::ParseIntError;

/// One legacy-to-destination identifier pair, parsed from a mapping line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRecord {
    /// Record number in the source catalogue.
    pub legacy_id: u32,
    /// Record identifier in the destination discovery service.
    pub target_id: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from parsing a single mapping line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line has fewer than two comma-separated fields.
    FieldCount {
        /// Number of fields found.
        found: usize,
    },
    /// The legacy-ID field has a dash before any digits (offset 0 or 1),
    /// or is too short to hold a type flag.
    MissingLegacyDigits,
    /// The digits of the legacy-ID field do not parse as a `u32`.
    ///
    /// This doubles as the overflow guard: legacy IDs must fit 32 bits.
    InvalidLegacyId {
        /// The offending field text.
        field: String,
        /// The underlying integer parse error.
        source: ParseIntError,
    },
    /// The first field does not parse as a `u64` destination ID.
    InvalidTargetId {
        /// The offending field text.
        field: String,
        /// The underlying integer parse error.
        source: ParseIntError,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount { found } => {
                write!(f, "expected at least 2 comma-separated fields, found {found}")
            }
            Self::MissingLegacyDigits => {
                write!(f, "no legacy ID digits before the dash in the legacy-ID field")
            }
            Self::InvalidLegacyId { field, source } => {
                write!(f, "invalid legacy ID \"{field}\": {source}")
            }
            Self::InvalidTargetId { field, source } => {
                write!(f, "invalid target ID \"{field}\": {source}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidLegacyId { source, .. } | Self::InvalidTargetId { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Errors from building a [`MappingTable`].
///
/// All variants are load-fatal: the service must not start serving with a
/// partially-built table.
#[derive(Debug)]
pub enum LoadError {
    /// A line failed to parse. Line numbers are 1-based.
    Parse {
        /// Name of the mapping source (usually a file path).
        source_name: String,
        /// 1-based line number within the source.
        line: u64,
        /// The parse failure.
        inner: ParseError,
    },
    /// A legacy ID appeared more than once across all sources.
    DuplicateLegacyId {
        /// Name of the source holding the second occurrence.
        source_name: String,
        /// 1-based line number of the second occurrence.
        line: u64,
        /// The duplicated legacy ID.
        id: u32,
    },
    /// Reading from a source failed.
    Io {
        /// Name of the unreadable source.
        source_name: String,
        /// The underlying I/O error.
        inner: std::io::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse {
                source_name,
                line,
                inner,
            } => write!(f, "{source_name}:{line}: {inner}"),
            Self::DuplicateLegacyId {
                source_name,
                line,
                id,
            } => write!(f, "{source_name}:{line}: legacy ID {id} was already mapped"),
            Self::Io { source_name, inner } => {
                write!(f, "error reading {source_name}: {inner}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse { inner, .. } => Some(inner),
            Self::Io { inner, .. } => Some(inner),
            Self::DuplicateLegacyId { .. } => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Line parsing
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse one mapping line into a [`MappingRecord`].
///
/// Only the first two fields are consulted; trailing fields (including
/// empty ones from extra commas) are ignored.
///
/// # Example
///
/// ```
/// use detour::parse_line;
///
/// let record = parse_line("991018705459705153,b2405380-01cat,extra").unwrap();
/// assert_eq!(record.legacy_id, 2405380);
/// assert_eq!(record.target_id, 991018705459705153);
/// ```
///
/// # Errors
///
/// Returns a [`ParseError`] when the field count, the legacy-ID shape, or
/// either integer is invalid.
pub fn parse_line(line: &str) -> Result<MappingRecord, ParseError> {
    let mut fields = line.split(',');
    let target_field = fields.next().unwrap_or("");
    let Some(legacy_field) = fields.next() else {
        return Err(ParseError::FieldCount { found: 1 });
    };

    // The legacy field looks like "b2405380-01cat": one flag character,
    // digits, then an optional dash and suffix to discard.
    let digits = match legacy_field.find('-') {
        Some(dash) if dash <= 1 => return Err(ParseError::MissingLegacyDigits),
        Some(dash) => legacy_field.get(1..dash),
        None => legacy_field.get(1..),
    }
    .ok_or(ParseError::MissingLegacyDigits)?;

    let legacy_id = digits
        .parse::<u32>()
        .map_err(|source| ParseError::InvalidLegacyId {
            field: legacy_field.to_string(),
            source,
        })?;

    let target_id = target_field
        .parse::<u64>()
        .map_err(|source| ParseError::InvalidTargetId {
            field: target_field.to_string(),
            source,
        })?;

    Ok(MappingRecord {
        legacy_id,
        target_id,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// MappingTable
// ═══════════════════════════════════════════════════════════════════════════════

/// Legacy-to-destination ID table, immutable after [`load`](Self::load).
///
/// # Concurrency
///
/// The table exposes no mutation after construction, so it is `Send + Sync`
/// and safe for unlimited concurrent [`lookup`](Self::lookup) callers
/// without locking.
#[derive(Debug, Default)]
pub struct MappingTable {
    map: HashMap<u32, u64>,
}

impl MappingTable {
    /// Create an empty table (no mappings; every lookup misses).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from named line-oriented sources.
    ///
    /// Sources are drained fully, in order. Loading stops at the first
    /// malformed line, the first duplicate legacy ID (across ALL sources),
    /// or the first read failure — whichever comes first — and the partial
    /// table is discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] naming the source and 1-based line.
    pub fn load<R: BufRead>(
        sources: impl IntoIterator<Item = (String, R)>,
    ) -> Result<Self, LoadError> {
        let sources: Vec<(String, R)> = sources.into_iter().collect();
        let mut map: HashMap<u32, u64> =
            HashMap::with_capacity(sources.len().saturating_mul(MAPPING_FILE_LINE_ESTIMATE));

        for (source_name, reader) in sources {
            let mut line_number: u64 = 0;
            for line in reader.lines() {
                line_number += 1;
                let line = line.map_err(|inner| LoadError::Io {
                    source_name: source_name.clone(),
                    inner,
                })?;
                let record = parse_line(&line).map_err(|inner| LoadError::Parse {
                    source_name: source_name.clone(),
                    line: line_number,
                    inner,
                })?;
                if map.contains_key(&record.legacy_id) {
                    return Err(LoadError::DuplicateLegacyId {
                        source_name: source_name.clone(),
                        line: line_number,
                        id: record.legacy_id,
                    });
                }
                map.insert(record.legacy_id, record.target_id);
            }
        }

        Ok(Self { map })
    }

    /// Look up the destination ID for a legacy record ID.
    ///
    /// Side-effect-free; a miss is expected steady-state behavior (the
    /// destination never imported every legacy record).
    #[must_use]
    pub fn lookup(&self, legacy_id: u32) -> Option<u64> {
        self.map.get(&legacy_id).copied()
    }

    /// Number of mappings in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the table holds no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
