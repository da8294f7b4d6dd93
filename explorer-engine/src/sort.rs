//! FILENAME: explorer-engine/src/sort.rs
//! Sort Strategy Resolver - maps a level's declared strategy to a sibling comparator.
//!
//! The strategy is resolved once per pass at the metadata boundary and applied
//! uniformly to every insertion of that pass.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::definition::Level;
use crate::error::ExplorerError;
use crate::view::ExplorerNode;

/// Orders two siblings. Always total: only identical labels compare Equal.
pub type NodeComparator = fn(&ExplorerNode, &ExplorerNode) -> Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortStrategy {
    /// Embedded numbers compare by value ("Visit 2" < "Visit 10").
    Alphanum,
    /// Alphanum over the lower bound of a range label ("10-19" sorts by "10").
    AlphanumRange,
    /// Case-insensitive natural order over the full label.
    Natural,
    /// Keep the order positions arrived in.
    Server,
}

impl Default for SortStrategy {
    fn default() -> Self {
        SortStrategy::Server
    }
}

impl FromStr for SortStrategy {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALPHANUM" => Ok(SortStrategy::Alphanum),
            "ALPHANUM-RANGE" => Ok(SortStrategy::AlphanumRange),
            "NATURAL" => Ok(SortStrategy::Natural),
            "SERVER" => Ok(SortStrategy::Server),
            _ => Err(ExplorerError::UnrecognizedSortStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            SortStrategy::Alphanum => "ALPHANUM",
            SortStrategy::AlphanumRange => "ALPHANUM-RANGE",
            SortStrategy::Natural => "NATURAL",
            SortStrategy::Server => "SERVER",
        };
        f.write_str(id)
    }
}

impl SortStrategy {
    /// Resolves a declared identifier. Absent, empty and unknown identifiers
    /// all fall back to server order; unknown ones are logged.
    pub fn resolve(declared: Option<&str>) -> SortStrategy {
        match declared.map(str::trim) {
            None | Some("") => SortStrategy::Server,
            Some(id) => id.parse().unwrap_or_else(|err: ExplorerError| {
                log::warn!(target: "EXPLORER", "{}; keeping server order", err);
                SortStrategy::Server
            }),
        }
    }

    /// Resolves the strategy declared on a level's metadata.
    pub fn for_level(level: Option<&Level>) -> SortStrategy {
        SortStrategy::resolve(level.and_then(|l| l.sort_strategy.as_deref()))
    }

    /// The sibling comparator, or None to preserve arrival order.
    pub fn comparator(self) -> Option<NodeComparator> {
        match self {
            SortStrategy::Alphanum => Some(compare_alphanum),
            SortStrategy::AlphanumRange => Some(compare_alphanum_range),
            SortStrategy::Natural => Some(compare_natural),
            SortStrategy::Server => None,
        }
    }
}

// ============================================================================
// COMPARATORS
// ============================================================================

fn compare_alphanum(a: &ExplorerNode, b: &ExplorerNode) -> Ordering {
    alphanum_cmp(&a.label, &b.label)
}

fn compare_alphanum_range(a: &ExplorerNode, b: &ExplorerNode) -> Ordering {
    alphanum_cmp(range_lower_bound(&a.label), range_lower_bound(&b.label))
        .then_with(|| alphanum_cmp(&a.label, &b.label))
}

fn compare_natural(a: &ExplorerNode, b: &ExplorerNode) -> Ordering {
    lexical_sort::natural_lexical_cmp(&a.label, &b.label).then_with(|| a.label.cmp(&b.label))
}

/// The part of a range label before its first `-`.
pub fn range_lower_bound(label: &str) -> &str {
    label.split('-').next().unwrap_or(label)
}

/// Splits a string into alternating digit and non-digit runs.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != numeric)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// Compares digit runs by numeric value without parsing, so long runs never overflow.
fn numeric_cmp(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
}

/// Case-insensitive text comparison; a case-only difference is a tie so the
/// digit runs that follow still decide.
fn text_cmp(a: &str, b: &str) -> Ordering {
    lexical_sort::lexical_cmp(&a.to_lowercase(), &b.to_lowercase())
}

/// Alphanumeric ordering: digit runs compare by value, text runs compare
/// lexically with case folded first. Ties fall back to byte order.
pub fn alphanum_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let x_numeric = x.starts_with(|c: char| c.is_ascii_digit());
                let y_numeric = y.starts_with(|c: char| c.is_ascii_digit());
                let ord = if x_numeric && y_numeric {
                    numeric_cmp(x, y)
                } else {
                    text_cmp(x, y)
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
