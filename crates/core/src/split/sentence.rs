//! Line-preserving sentence units for the per-sentence strategy
//!
//! The Ollama path corrects one sentence at a time. Lines are the primary
//! unit; a line longer than the budget is split on sentence terminators,
//! then on clause separators, then by raw character count. Every unit
//! remembers whether a newline followed it, so reassembling unchanged units
//! reproduces the input byte for byte. Blank lines travel through untouched
//! and are not counted as work.

use super::{char_len, prefix_chars, skip_chars};

/// Sentence-ending punctuation tried first on long lines
const TERMINATORS: [char; 3] = ['。', '！', '？'];

/// Clause separators tried when a sentence is still too long
const SEPARATORS: [char; 2] = ['，', '；'];

/// One unit of per-sentence work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceUnit {
    /// Unit text, possibly empty for a blank line
    pub text: String,
    /// Whether a `\n` followed this unit in the source
    pub newline: bool,
    /// Blank lines are carried through without a provider call
    pub blank: bool,
}

/// Split a text into sentence units, preserving the line structure.
///
/// Concatenating `text` + (`"\n"` when `newline`) over all units yields the
/// input exactly.
pub fn split_with_line_endings(text: &str, max_len: usize) -> Vec<SentenceUnit> {
    let mut units = Vec::new();
    let lines: Vec<&str> = text.split('\n').collect();
    let last_line = lines.len() - 1;

    for (li, line) in lines.iter().enumerate() {
        let has_newline = li < last_line;

        if line.trim().is_empty() {
            units.push(SentenceUnit {
                text: (*line).to_string(),
                newline: has_newline,
                blank: true,
            });
            continue;
        }

        if char_len(line) <= max_len {
            units.push(SentenceUnit {
                text: (*line).to_string(),
                newline: has_newline,
                blank: false,
            });
            continue;
        }

        let pieces = split_long_line(line, max_len);
        let last_piece = pieces.len() - 1;
        for (pi, piece) in pieces.into_iter().enumerate() {
            units.push(SentenceUnit {
                text: piece,
                newline: has_newline && pi == last_piece,
                blank: false,
            });
        }
    }

    units
}

/// Rebuild the document from units, substituting `corrected` texts for the
/// non-blank units in order. Corrected texts beyond the provided slice fall
/// back to the unit originals.
pub fn reassemble_units(units: &[SentenceUnit], corrected: &[String]) -> String {
    let mut out = String::new();
    let mut idx = 0usize;
    for unit in units {
        if unit.blank {
            out.push_str(&unit.text);
        } else {
            match corrected.get(idx) {
                Some(text) => out.push_str(text),
                None => out.push_str(&unit.text),
            }
            idx += 1;
        }
        if unit.newline {
            out.push('\n');
        }
    }
    out
}

fn split_long_line(line: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for sentence in split_keeping(line, &TERMINATORS) {
        if char_len(&sentence) <= max_len {
            pieces.push(sentence);
            continue;
        }
        for clause in split_keeping(&sentence, &SEPARATORS) {
            if char_len(&clause) <= max_len {
                pieces.push(clause);
            } else {
                pieces.extend(force_split(&clause, max_len));
            }
        }
    }
    pieces
}

/// Split on delimiter characters, keeping each delimiter attached to the
/// text before it so no character is lost
fn split_keeping(text: &str, delimiters: &[char]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if delimiters.contains(&ch) {
            parts.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn force_split(text: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        pieces.push(prefix_chars(rest, max_len).to_string());
        rest = skip_chars(rest, max_len);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn originals(units: &[SentenceUnit]) -> Vec<String> {
        units
            .iter()
            .filter(|u| !u.blank)
            .map(|u| u.text.clone())
            .collect()
    }

    #[test]
    fn test_round_trip_simple_lines() {
        let text = "第一句。\n第二句。\n第三句。";
        let units = split_with_line_endings(text, 100);
        assert_eq!(units.len(), 3);
        assert_eq!(reassemble_units(&units, &originals(&units)), text);
    }

    #[test]
    fn test_round_trip_with_blank_lines_and_trailing_newline() {
        let text = "第一段。\n\n第二段。\n";
        let units = split_with_line_endings(text, 100);
        // Trailing newline produces a final empty blank unit
        assert!(units.last().unwrap().blank);
        assert_eq!(units.iter().filter(|u| u.blank).count(), 2);
        assert_eq!(reassemble_units(&units, &originals(&units)), text);
    }

    #[test]
    fn test_blank_lines_not_counted_as_work() {
        let text = "句子一。\n\n\n句子二。";
        let units = split_with_line_endings(text, 100);
        assert_eq!(units.iter().filter(|u| !u.blank).count(), 2);
    }

    #[test]
    fn test_long_line_split_on_terminators() {
        let line = "这是第一句话。这是第二句话！这是第三句话？";
        let units = split_with_line_endings(line, 8);
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["这是第一句话。", "这是第二句话！", "这是第三句话？"]
        );
        assert_eq!(reassemble_units(&units, &originals(&units)), line);
    }

    #[test]
    fn test_long_sentence_split_on_separators() {
        let line = format!("{}，{}；{}", "甲".repeat(6), "乙".repeat(6), "丙".repeat(6));
        let units = split_with_line_endings(&line, 8);
        assert_eq!(units.len(), 3);
        assert_eq!(reassemble_units(&units, &originals(&units)), line);
    }

    #[test]
    fn test_unbreakable_run_force_split() {
        let line = "字".repeat(25);
        let units = split_with_line_endings(&line, 10);
        assert_eq!(units.len(), 3);
        assert_eq!(char_len(&units[0].text), 10);
        assert_eq!(char_len(&units[2].text), 5);
        assert_eq!(reassemble_units(&units, &originals(&units)), line);
    }

    #[test]
    fn test_newline_assigned_to_last_piece_of_line() {
        let text = format!("{}。{}。\n短句。", "长".repeat(9), "更长".repeat(5));
        let units = split_with_line_endings(&text, 10);
        let split_units: Vec<&SentenceUnit> = units.iter().filter(|u| !u.blank).collect();
        assert!(split_units.len() >= 3);
        // Only the final piece of the first line carries the newline
        let first_line_units = &split_units[..split_units.len() - 1];
        assert!(first_line_units[..first_line_units.len() - 1]
            .iter()
            .all(|u| !u.newline));
        assert!(first_line_units.last().unwrap().newline);
        assert_eq!(reassemble_units(&units, &originals(&units)), text);
    }

    #[test]
    fn test_whitespace_only_line_is_blank() {
        let text = "正文。\n   \n继续。";
        let units = split_with_line_endings(text, 100);
        assert!(units[1].blank);
        assert_eq!(units[1].text, "   ");
        assert_eq!(reassemble_units(&units, &originals(&units)), text);
    }

    #[test]
    fn test_corrections_substituted() {
        let text = "有错de句子。\n没错的句子。";
        let units = split_with_line_endings(text, 100);
        let corrected = vec!["有错的句子。".to_string(), "没错的句子。".to_string()];
        assert_eq!(
            reassemble_units(&units, &corrected),
            "有错的句子。\n没错的句子。"
        );
    }
}
