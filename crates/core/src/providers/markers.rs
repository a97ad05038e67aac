//! Response cleanup for chat models that echo instruction markers
//!
//! Smaller models tend to prefix their answer with labels like `校对结果：`
//! or repeat the task text before the actual correction. Both the leading
//! marker and a marker appearing later in the body are stripped when the
//! text after it looks like the real answer.

use crate::split::char_len;

/// Markers stripped from model responses, in match order
pub const MARKERS: [&str; 6] = [
    "待校对文本：",
    "校对后的文本：",
    "校对后：",
    "精校后：",
    "结果：",
    "校对结果：",
];

/// When a marker splits the body, the tail is kept if it is more than this
/// fraction of the head's length. Empirical; adjust with care.
pub const TAIL_KEEP_RATIO: f64 = 0.8;

/// A head shorter than this is assumed to be marker noise, not content
pub const SHORT_HEAD_CHARS: usize = 50;

/// Strip leading and embedded markers from a model response
pub fn strip_markers(text: &str) -> String {
    let mut out = text.trim().to_string();

    for marker in MARKERS {
        if let Some(rest) = out.strip_prefix(marker) {
            out = rest.trim().to_string();
            break;
        }
    }

    for marker in MARKERS {
        if let Some(idx) = out.rfind(marker) {
            let head = out[..idx].trim();
            let tail = out[idx + marker.len()..].trim();
            if char_len(tail) as f64 > char_len(head) as f64 * TAIL_KEEP_RATIO
                || char_len(head) < SHORT_HEAD_CHARS
            {
                out = tail.to_string();
                break;
            }
        }
    }

    out.trim().to_string()
}
