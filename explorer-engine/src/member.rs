//! FILENAME: explorer-engine/src/member.rs
//! Member names - label extraction and uniqueName structure.
//!
//! A uniqueName is a chain of bracketed segments joined by `.`:
//! `[Subject.Race].[Asian].[Japanese]`. Dots inside brackets belong to the
//! segment, and a literal `]` inside a segment is written `]]`.

use std::ops::Range;

use smallvec::SmallVec;

use crate::config::ExplorerConfig;

/// Separator between two bracketed segments.
pub const SEGMENT_SEPARATOR: &str = "].[";

type Segments = SmallVec<[Range<usize>; 6]>;

/// Splits a bracketed name into the byte ranges of its segments (brackets included).
/// Returns None when the name is not a well-formed bracket chain.
fn split_segments(name: &str) -> Option<Segments> {
    let bytes = name.as_bytes();
    let mut segments = Segments::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'[' {
            return None;
        }
        let start = i;
        i += 1;
        loop {
            match bytes.get(i) {
                None => return None,
                Some(b']') if bytes.get(i + 1) == Some(&b']') => i += 2,
                Some(b']') => {
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
            }
        }
        segments.push(start..i);

        if i < bytes.len() {
            if bytes[i] != b'.' || i + 1 == bytes.len() {
                return None;
            }
            i += 1;
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

/// Structural depth of a member: the number of ancestor separators in its
/// uniqueName. The hierarchy itself (`[Race]`) is depth 0.
pub fn depth(unique_name: &str) -> usize {
    match split_segments(unique_name) {
        Some(segments) => segments.len() - 1,
        None => unique_name.matches(SEGMENT_SEPARATOR).count(),
    }
}

/// The uniqueName of the direct parent, or None at depth 0.
pub fn parent_unique_name(unique_name: &str) -> Option<&str> {
    match split_segments(unique_name) {
        Some(segments) if segments.len() > 1 => {
            let parent_end = segments[segments.len() - 2].end;
            Some(&unique_name[..parent_end])
        }
        Some(_) => None,
        None => unique_name
            .rfind(SEGMENT_SEPARATOR)
            .map(|idx| &unique_name[..idx + 1]),
    }
}

/// True when `candidate` is `ancestor` itself or lies below it.
/// Matching stops at segment boundaries, so `[A].[B]` does not own `[A].[BC]`.
pub fn is_self_or_descendant(candidate: &str, ancestor: &str) -> bool {
    match candidate.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with(".["),
        None => false,
    }
}

/// Extracts the display label from a raw member name.
///
/// Bracketed names yield their last segment without brackets; the null member
/// sentinel yields the configured null label; anything else is returned as is.
pub fn member_label(raw: &str, config: &ExplorerConfig) -> String {
    if raw == config.null_member {
        return config.null_member_label.clone();
    }

    let label = match split_segments(raw) {
        Some(segments) => {
            let last = &segments[segments.len() - 1];
            raw[last.start + 1..last.end - 1].replace("]]", "]")
        }
        None => raw.to_string(),
    };

    if label == config.null_member {
        config.null_member_label.clone()
    } else {
        label
    }
}
