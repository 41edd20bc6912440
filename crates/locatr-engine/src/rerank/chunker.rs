//! Recursive HTML splitter.
//!
//! Splits serialized DOM text on the coarsest separator present, keeps the
//! separator attached to the segment that follows it, packs small segments
//! into size-bounded chunks with a sliding overlap window, and recurses into
//! oversized segments with the strictly finer separators that remain.
//!
//! All sizes are measured in characters.

use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 4000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Tag openers from coarse to fine; the trailing `""` is the verbatim fallback.
pub const HTML_SEPARATORS: &[&str] = &[
    "<body", "<div", "<p", "<br", "<li", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6", "<span",
    "<table", "<tr", "<td", "<th", "<ul", "<ol", "<header", "<footer", "<nav", "<head", "<style",
    "<script", "<meta", "<title", "",
];

pub fn default_separators() -> Vec<String> {
    HTML_SEPARATORS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct HtmlChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for HtmlChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP, default_separators())
    }
}

impl HtmlChunker {
    /// `chunk_size` is clamped to at least 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for segment in split_keeping_separator(text, separator) {
            if char_len(segment) < self.chunk_size {
                pending.push(segment);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, ""));
                pending.clear();
            }

            if finer.is_empty() {
                if !segment.trim().is_empty() {
                    chunks.push(segment.to_string());
                }
            } else {
                chunks.extend(self.split_with(segment, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, ""));
        }
        chunks
    }

    /// Greedily pack segments into chunks of at most `chunk_size`.
    ///
    /// After each emitted chunk the window is shrunk from the front until it
    /// holds at most `chunk_overlap` characters (and leaves room for the next
    /// segment), so consecutive chunks share a tail/head of context.
    fn merge(&self, segments: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut merged = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut size = 0usize;

        for &segment in segments {
            let len = char_len(segment);

            if size + len + overhead(&window, sep_len) > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window, separator) {
                    merged.push(chunk);
                }

                while size > self.chunk_overlap
                    || (size > 0 && size + len + overhead(&window, sep_len) > self.chunk_size)
                {
                    let Some((_, front_len)) = window.pop_front() else {
                        break;
                    };
                    size -= front_len + overhead(&window, sep_len);
                }
            }

            size += len + overhead(&window, sep_len);
            window.push_back((segment, len));
        }

        if let Some(chunk) = join_window(&window, separator) {
            merged.push(chunk);
        }
        merged
    }
}

/// First separator present in `text`, plus the finer separators after it.
/// Reaching the empty separator (or exhausting the list) selects verbatim mode.
fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return if text.is_empty() { vec![] } else { vec![text] };
    }

    let mut segments = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            segments.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

fn overhead<T>(window: &VecDeque<T>, sep_len: usize) -> usize {
    if window.is_empty() { 0 } else { sep_len }
}

fn join_window(window: &VecDeque<(&str, usize)>, separator: &str) -> Option<String> {
    let joined = window
        .iter()
        .map(|(s, _)| *s)
        .collect::<Vec<_>>()
        .join(separator);
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
