//! Chapter-header detection and chapter-wise splitting
//!
//! Headers are recognized line-by-line against an ordered pattern table plus
//! a looser keyword heuristic for short lines. Front matter before the first
//! real chapter header (rulers, author lines, tables of contents) is
//! discarded. A text with no recognizable header at all becomes one
//! synthetic chapter titled `全文`.

use super::char_len;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Ordered chapter title patterns, most specific first
static CHAPTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Bracketed volume + chapter (e.g. 【第一卷 少年热血】 第1章)
        r"^【[^】]+】\s*第[一二三四五六七八九十百千万\d]+章",
        // 第X章 / 第X节
        r"^第[一二三四五六七八九十百千万\d]+章",
        r"^第[一二三四五六七八九十百千万\d]+节",
        // Chapter X / Ch. X
        r"^[Cc]hapter\s*\d+",
        r"^[Cc]h\.\s*\d+",
        // Digit-prefixed titles (e.g. 1. 第一章标题)
        r"^\d+[\.、]\s*",
        // Chinese-numeral-prefixed titles (e.g. 一、第一章标题)
        r"^[一二三四五六七八九十]+[\.、]\s*",
        // Decorative markers (e.g. *** 第一章 ***)
        r"^[*\-_=]{3,}",
        // 第X卷 / 部 / 篇
        r"^第[一二三四五六七八九十百千万\d]+[卷部篇]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("chapter pattern must compile"))
    .collect()
});

/// A header that marks a real chapter (ends the front-matter skip)
static TRUE_CHAPTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"第[一二三四五六七八九十百千万\d]+章|(?i)chapter\s*\d+")
        .expect("true chapter pattern must compile")
});

/// Decorative ruler line made only of separators
static RULER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[=\-*_]{10,}$").expect("ruler pattern must compile"));

/// Line made only of digits, dots, dashes and spaces
static NUMERIC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\.\-]+$").expect("numeric pattern must compile"));

/// Digit or Chinese numeral in a candidate title
static TITLE_NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[第\d一二三四五六七八九十]").expect("numeral pattern must compile"));

/// Sentence-internal punctuation that disqualifies a heuristic title
static BODY_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[，。！？；：、]").expect("punctuation pattern must compile"));

const FRONT_MATTER_KEYWORDS: [&str; 6] = ["作者", "简介", "内容简介", "目录", "序言", "前言"];
const TITLE_KEYWORDS: [&str; 6] = ["章", "节", "Chapter", "chapter", "Ch.", "ch."];

/// One detected chapter with its content
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Chapter {
    /// 1-based chapter index
    pub chapter_index: usize,
    /// Raw header line
    pub chapter_title: String,
    /// Body text, header excluded
    pub chapter_content: String,
    /// Character offset of the header line in the source text
    pub start_pos: usize,
    /// Character offset just past the chapter body
    pub end_pos: usize,
}

/// Chapter summary without the content, as reported by detection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChapterSummary {
    pub index: usize,
    pub title: String,
    pub length: usize,
}

/// Result of a detection pass
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChapterDetection {
    pub has_chapters: bool,
    pub chapter_count: usize,
    pub chapters: Vec<ChapterSummary>,
}

/// Chapter splitter
#[derive(Debug, Clone, Default)]
pub struct ChapterSplitter;

impl ChapterSplitter {
    /// Create a splitter
    pub fn new() -> Self {
        Self
    }

    /// Split a text into chapters
    pub fn split_by_chapters(&self, text: &str) -> Vec<Chapter> {
        if text.is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = text.split('\n').collect();
        // Character offset of each line start
        let mut offsets = Vec::with_capacity(lines.len());
        let mut acc = 0usize;
        for line in &lines {
            offsets.push(acc);
            acc += char_len(line) + 1;
        }

        let mut chapters: Vec<Chapter> = Vec::new();
        let mut current: Option<(usize, String, usize)> = None; // (index, title, start)
        let mut content: Vec<&str> = Vec::new();
        let mut chapter_index = 0usize;
        let mut skip_prefix = true;

        let mut i = 0usize;
        while i < lines.len() {
            let line = lines[i].trim();

            let mut title: Option<String> = None;
            if !line.is_empty() {
                if RULER.is_match(line) {
                    i += 1;
                    continue;
                }
                if NUMERIC_LINE.is_match(line) && char_len(line) < 20 {
                    i += 1;
                    continue;
                }
                if i < 20 && FRONT_MATTER_KEYWORDS.iter().any(|k| line.contains(k)) {
                    i += 1;
                    continue;
                }

                if CHAPTER_PATTERNS.iter().any(|p| p.is_match(line)) {
                    title = Some(line.to_string());
                } else if char_len(line) < 50
                    && TITLE_KEYWORDS.iter().any(|k| line.contains(k))
                    && TITLE_NUMERAL.is_match(line)
                    && (!BODY_PUNCTUATION.is_match(line) || line.contains('【'))
                {
                    title = Some(line.to_string());
                }
            }

            if let Some(title) = title {
                if skip_prefix && chapter_index == 0 {
                    if TRUE_CHAPTER.is_match(&title) || title.contains('【') {
                        skip_prefix = false;
                        content.clear();
                    } else {
                        // Not a real chapter yet, keep skipping front matter
                        i += 1;
                        continue;
                    }
                }

                if let Some((index, prev_title, start)) = current.take() {
                    push_chapter(&mut chapters, index, prev_title, &content, start);
                }

                chapter_index += 1;
                current = Some((chapter_index, title, offsets[i]));
                content.clear();
                i += 1;
                // Skip blank lines right after the header
                while i < lines.len() && lines[i].trim().is_empty() {
                    i += 1;
                }
            } else {
                if skip_prefix {
                    i += 1;
                    continue;
                }
                if current.is_none() {
                    chapter_index += 1;
                    current = Some((chapter_index, format!("第{}章", chapter_index), offsets[i]));
                }
                content.push(lines[i]);
                i += 1;
            }
        }

        if let Some((index, title, start)) = current {
            push_chapter(&mut chapters, index, title, &content, start);
        }

        if chapters.is_empty() {
            chapters.push(Chapter {
                chapter_index: 1,
                chapter_title: "全文".to_string(),
                chapter_content: text.to_string(),
                start_pos: 0,
                end_pos: char_len(text),
            });
        }

        chapters
    }

    /// Detect chapter structure without returning content
    pub fn detect_chapters(&self, text: &str) -> ChapterDetection {
        let chapters = self.split_by_chapters(text);
        ChapterDetection {
            has_chapters: chapters.len() > 1,
            chapter_count: chapters.len(),
            chapters: chapters
                .iter()
                .map(|ch| ChapterSummary {
                    index: ch.chapter_index,
                    title: ch.chapter_title.clone(),
                    length: char_len(&ch.chapter_content),
                })
                .collect(),
        }
    }
}

fn push_chapter(
    chapters: &mut Vec<Chapter>,
    index: usize,
    title: String,
    content: &[&str],
    start: usize,
) {
    let body = content.join("\n").trim().to_string();
    if body.is_empty() {
        return;
    }
    let body_len = char_len(&body);
    chapters.push(Chapter {
        chapter_index: index,
        chapter_title: title,
        chapter_content: body,
        start_pos: start,
        end_pos: start + body_len,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIX_CHAPTER_NOVEL: &str = "第一章 初入江湖\n\n少年背着行囊离开了山村。\n\n第二章 风雨欲来\n\n城里的消息一天比一天紧。\n\n第三章 暗流涌动\n\n他在茶馆里听到了那个名字。\n\n第四章 狭路相逢\n\n对手比传闻中还要难缠。\n\n第五章 绝处逢生\n\n山穷水尽时有人递来一只手。\n\n第六章 尘埃落定\n\n一切结束得比开始还要突然。";

    #[test]
    fn test_six_chapter_novel() {
        let splitter = ChapterSplitter::new();
        let chapters = splitter.split_by_chapters(SIX_CHAPTER_NOVEL);
        assert_eq!(chapters.len(), 6);
        assert_eq!(chapters[0].chapter_title, "第一章 初入江湖");
        assert_eq!(chapters[0].chapter_content, "少年背着行囊离开了山村。");
        assert_eq!(chapters[5].chapter_index, 6);
        assert_eq!(chapters[5].chapter_title, "第六章 尘埃落定");
    }

    #[test]
    fn test_indices_are_contiguous_one_based() {
        let splitter = ChapterSplitter::new();
        let chapters = splitter.split_by_chapters(SIX_CHAPTER_NOVEL);
        for (i, ch) in chapters.iter().enumerate() {
            assert_eq!(ch.chapter_index, i + 1);
        }
    }

    #[test]
    fn test_no_headers_yields_full_text_chapter() {
        let splitter = ChapterSplitter::new();
        let text = "这只是普通的一段话。\n\n还有另外一段话。";
        let chapters = splitter.split_by_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].chapter_title, "全文");
        assert_eq!(chapters[0].chapter_content, text);
    }

    #[test]
    fn test_front_matter_is_skipped() {
        let splitter = ChapterSplitter::new();
        let text = "书名：某某传\n作者：无名氏\n内容简介：一个故事。\n==========\n\n第一章 开端\n\n正文从这里开始。\n\n第二章 发展\n\n故事继续。";
        let chapters = splitter.split_by_chapters(text);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].chapter_title, "第一章 开端");
        assert_eq!(chapters[0].chapter_content, "正文从这里开始。");
        assert!(!chapters[0].chapter_content.contains("作者"));
    }

    #[test]
    fn test_bracketed_volume_title() {
        let splitter = ChapterSplitter::new();
        let text = "【第一卷 少年热血】 第1章 出发\n\n他出发了。\n\n第2章 到达\n\n他到了。";
        let chapters = splitter.split_by_chapters(text);
        assert_eq!(chapters.len(), 2);
        assert!(chapters[0].chapter_title.starts_with("【第一卷"));
    }

    #[test]
    fn test_english_chapter_headers() {
        let splitter = ChapterSplitter::new();
        let text = "Chapter 1 Beginnings\n\n第一段正文。\n\nChapter 2 Endings\n\n第二段正文。";
        let chapters = splitter.split_by_chapters(text);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].chapter_title, "Chapter 1 Beginnings");
    }

    #[test]
    fn test_short_keyword_line_heuristic() {
        let splitter = ChapterSplitter::new();
        let text = "第一章 序幕\n\n开场的内容。\n\n终章 第十回合\n\n收尾的内容。";
        let chapters = splitter.split_by_chapters(text);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].chapter_title, "终章 第十回合");
    }

    #[test]
    fn test_detect_chapters_summary() {
        let splitter = ChapterSplitter::new();
        let detection = splitter.detect_chapters(SIX_CHAPTER_NOVEL);
        assert!(detection.has_chapters);
        assert_eq!(detection.chapter_count, 6);
        assert_eq!(detection.chapters[0].index, 1);
        assert_eq!(detection.chapters[0].title, "第一章 初入江湖");
        assert_eq!(detection.chapters[0].length, char_len("少年背着行囊离开了山村。"));
    }

    #[test]
    fn test_detect_no_chapters() {
        let splitter = ChapterSplitter::new();
        let detection = splitter.detect_chapters("没有章节标题的一段文字。");
        assert!(!detection.has_chapters);
        assert_eq!(detection.chapter_count, 1);
    }

    #[test]
    fn test_empty_text() {
        let splitter = ChapterSplitter::new();
        assert!(splitter.split_by_chapters("").is_empty());
    }
}
