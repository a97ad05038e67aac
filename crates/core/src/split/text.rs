//! Recursive paragraph/sentence splitter with overlap-aware reassembly
//!
//! Splitting walks paragraph boundaries first, recursing into sentences on
//! `。` when a single paragraph exceeds the chunk budget and force-splitting
//! by character count as the last resort. Reassembly tolerates model
//! rewrites: the overlap between adjacent chunks is located with a ladder of
//! increasingly loose strategies before falling back to plain concatenation.

use super::{char_len, prefix_chars, skip_chars, suffix_chars};
use crate::error::{ProofError, Result};
use tracing::debug;

/// Fraction of the overlap window a `。`/newline cut must clear to be used
const OVERLAP_CUT_RATIO: f64 = 0.3;

/// Longest prefix of the next chunk searched for inside the previous one
const BOUNDARY_SEARCH_CHARS: usize = 200;

/// Minimum boundary match accepted as a real overlap
const BOUNDARY_MIN_CHARS: usize = 10;

/// Recursive text splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter; `chunk_overlap` must stay below `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ProofError::validation("chunk_size must be greater than 0"));
        }
        if chunk_overlap >= chunk_size {
            return Err(ProofError::validation(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Configured chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Configured chunk overlap in characters
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a text into ordered chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for para in text.split("\n\n") {
            if char_len(para) > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                    current.clear();
                }
                chunks.extend(self.split_long_paragraph(para));
                continue;
            }

            let candidate = if current.is_empty() {
                para.to_string()
            } else {
                format!("{}\n\n{}", current, para)
            };

            if char_len(&candidate) <= self.chunk_size {
                current = candidate;
            } else {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                }
                if let Some(last) = chunks.last().filter(|_| self.chunk_overlap > 0) {
                    current = format!("{}\n\n{}", self.overlap_text(last), para);
                } else {
                    current = para.to_string();
                }
            }
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks.retain(|c| !c.is_empty());
        chunks
    }

    /// Split a paragraph that alone exceeds the budget, recursing on `。`
    fn split_long_paragraph(&self, para: &str) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let sentences: Vec<&str> = para.split('。').collect();
        let last = sentences.len() - 1;

        let mut current = String::new();
        for (i, raw) in sentences.iter().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut sentence = trimmed.to_string();
            if i < last {
                sentence.push('。');
            }

            if char_len(&sentence) > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                chunks.extend(self.force_split(&sentence));
                continue;
            }

            if current.is_empty() {
                current = sentence;
            } else if char_len(&current) + char_len(&sentence) <= self.chunk_size {
                current.push_str(&sentence);
            } else if self.chunk_overlap > 0 {
                let overlap = self.overlap_text(&current).to_string();
                chunks.push(std::mem::take(&mut current));
                current = overlap;
                current.push_str(&sentence);
            } else {
                chunks.push(std::mem::take(&mut current));
                current = sentence;
            }
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Split by raw character count when no sentence boundary is available
    fn force_split(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let head = prefix_chars(rest, self.chunk_size);
            pieces.push(head.to_string());
            rest = skip_chars(rest, self.chunk_size);
        }
        pieces
    }

    /// The trailing overlap window of a flushed chunk, cut after a `。` or a
    /// newline when one sits past the early part of the window
    fn overlap_text<'a>(&self, text: &'a str) -> &'a str {
        if char_len(text) <= self.chunk_overlap {
            return text;
        }
        let window = suffix_chars(text, self.chunk_overlap);
        let threshold = (self.chunk_overlap as f64 * OVERLAP_CUT_RATIO) as usize;

        for target in ['。', '\n'] {
            if let Some((char_pos, byte_pos)) = first_occurrence(window, target) {
                if char_pos > threshold {
                    return &window[byte_pos + target.len_utf8()..];
                }
            }
        }
        window
    }

    /// Merge corrected chunks back into one document, collapsing overlaps
    pub fn merge(&self, chunks: &[String]) -> String {
        if chunks.is_empty() {
            return String::new();
        }
        if chunks.len() == 1 {
            return chunks[0].clone();
        }

        let mut merged = chunks[0].clone();
        for i in 1..chunks.len() {
            let prev = &chunks[i - 1];
            let curr = &chunks[i];
            match self.remove_overlap(prev, curr) {
                Some(rest) => {
                    debug!(
                        "chunk {}: removed {} overlapping chars",
                        i + 1,
                        char_len(curr) - char_len(&rest)
                    );
                    merged.push_str(&rest);
                }
                None => {
                    debug!("chunk {}: no overlap found, appending full chunk", i + 1);
                    merged.push_str("\n\n");
                    merged.push_str(curr);
                }
            }
        }
        merged
    }

    /// Locate the overlap between two adjacent chunks and return what is left
    /// of `curr` once it is removed. `None` means no overlap was recognized.
    fn remove_overlap(&self, prev: &str, curr: &str) -> Option<String> {
        if prev.is_empty() || curr.is_empty() {
            return None;
        }

        let prev_len = char_len(prev);
        let curr_len = char_len(curr);
        // The model may have rewritten the overlap region, so search well
        // past the configured size.
        let max_overlap = prev_len.min(curr_len).min(self.chunk_overlap * 3);

        // Strategy 1: exact suffix/prefix match
        let floor = self.chunk_overlap.saturating_sub(50);
        let mut k = max_overlap;
        while k > floor {
            if suffix_chars(prev, k) == prefix_chars(curr, k) {
                return Some(skip_chars(curr, k).to_string());
            }
            k -= 1;
        }

        // Strategy 2: cut after the last 。 in prev, raw then space-stripped
        if let Some(byte_pos) = prev.rfind('。') {
            let after = &prev[byte_pos + '。'.len_utf8()..];
            if char_len(after) + 1 <= max_overlap {
                let matched = after.trim();
                if !matched.is_empty() {
                    if curr.starts_with(matched) {
                        return Some(curr[matched.len()..].to_string());
                    }
                    let matched_ns = strip_spacing(matched);
                    let span = prefix_chars(curr, char_len(matched));
                    if !matched_ns.is_empty() && strip_spacing(span).starts_with(&matched_ns) {
                        return Some(skip_chars(curr, char_len(matched)).to_string());
                    }
                }
            }
        }

        // Strategy 3: same cut at the last newline
        if let Some(byte_pos) = prev.rfind('\n') {
            let after = &prev[byte_pos + 1..];
            if char_len(after) + 1 <= max_overlap {
                let matched = after.trim();
                if !matched.is_empty() && curr.starts_with(matched) {
                    return Some(curr[matched.len()..].to_string());
                }
            }
        }

        // Strategy 4: longest boundary where prev ends with a prefix of curr
        let search_len = BOUNDARY_SEARCH_CHARS.min(curr_len).min(prev_len);
        let mut t = search_len;
        while t >= BOUNDARY_MIN_CHARS {
            if prev.ends_with(prefix_chars(curr, t)) {
                return Some(skip_chars(curr, t).to_string());
            }
            t -= 1;
        }

        // Strategy 5: a short chunk fully contained in prev is a duplicate
        if curr_len * 2 < prev_len && prev.contains(curr) {
            return Some(String::new());
        }

        None
    }
}

fn first_occurrence(s: &str, target: char) -> Option<(usize, usize)> {
    s.char_indices()
        .enumerate()
        .find(|(_, (_, c))| *c == target)
        .map(|(char_pos, (byte_pos, _))| (char_pos, byte_pos))
}

fn strip_spacing(s: &str) -> String {
    s.chars().filter(|c| *c != ' ' && *c != '\n').collect()
}
