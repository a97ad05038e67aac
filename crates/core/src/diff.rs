//! Semantic diff between an original and a corrected text
//!
//! Character-level Myers diff with adjacent runs of the same operation
//! merged into blocks, fanned out into per-side segment lists for rendering.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// Segment classification for rendering
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Present in both texts
    Same,
    /// Present only in the original
    Deleted,
    /// Present only in the corrected text
    Added,
}

/// One rendered diff segment
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiffSegment {
    /// Segment text
    pub text: String,
    /// Segment classification
    #[serde(rename = "type")]
    pub kind: SegmentKind,
}

/// Two-way segment view of a diff
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiffHighlight {
    /// Equal and deleted spans, in original order
    pub original_segments: Vec<DiffSegment>,
    /// Equal and inserted spans, in corrected order
    pub corrected_segments: Vec<DiffSegment>,
    /// Whether the texts differ beyond whitespace edges
    pub has_changes: bool,
}

/// Character-level diff as `(op, text)` blocks with
/// `op ∈ {-1 delete, 0 equal, 1 insert}`
pub fn compute_diff(original: &str, corrected: &str) -> Vec<(i8, String)> {
    let diff = TextDiff::from_chars(original, corrected);
    let mut ops: Vec<(i8, String)> = Vec::new();

    for change in diff.iter_all_changes() {
        let op: i8 = match change.tag() {
            ChangeTag::Delete => -1,
            ChangeTag::Equal => 0,
            ChangeTag::Insert => 1,
        };
        let value = change.value();
        match ops.last_mut() {
            Some((last_op, text)) if *last_op == op => text.push_str(value),
            _ => ops.push((op, value.to_string())),
        }
    }

    ops
}

/// Fan a diff into per-side segment lists for highlighting
pub fn highlight_diff(original: &str, corrected: &str) -> DiffHighlight {
    let mut original_segments = Vec::new();
    let mut corrected_segments = Vec::new();

    for (op, text) in compute_diff(original, corrected) {
        match op {
            0 => {
                original_segments.push(DiffSegment {
                    text: text.clone(),
                    kind: SegmentKind::Same,
                });
                corrected_segments.push(DiffSegment {
                    text,
                    kind: SegmentKind::Same,
                });
            }
            -1 => original_segments.push(DiffSegment {
                text,
                kind: SegmentKind::Deleted,
            }),
            _ => corrected_segments.push(DiffSegment {
                text,
                kind: SegmentKind::Added,
            }),
        }
    }

    DiffHighlight {
        original_segments,
        corrected_segments,
        has_changes: has_meaningful_changes(original, corrected),
    }
}

/// Whether two texts differ once leading/trailing whitespace is ignored
pub fn has_meaningful_changes(original: &str, corrected: &str) -> bool {
    original.trim() != corrected.trim()
}
