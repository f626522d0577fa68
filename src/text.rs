//! Markdown text helpers shared by providers and metadata generation.
//!
//! All functions here are pure and total: degenerate input (empty content,
//! empty path, extension-only path) produces a best-effort value rather than
//! an error.

const MAX_HEADING_LEVEL: usize = 6;
const PREVIEW_CHARS: usize = 500;
const SUMMARY_CHARS: usize = 300;
const SUMMARY_MIN_CHARS: usize = 100;
const SEO_DESCRIPTION_CHARS: usize = 155;
const SEO_SENTENCE_MIN_CHARS: usize = 100;

/// Returns the heading text if `line` is a `#` through `######` heading.
fn heading_text(line: &str) -> Option<&str> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }

    let rest = &line[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let text = rest.trim();
    if text.is_empty() { None } else { Some(text) }
}

/// The first `n` characters of `s` (not bytes).
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn strip_markdown_extension(path: &str) -> &str {
    path.strip_suffix(".mdx")
        .or_else(|| path.strip_suffix(".md"))
        .unwrap_or(path)
}

pub fn is_markdown_file(path: &str) -> bool {
    path.ends_with(".md") || path.ends_with(".mdx")
}

/// Public URL slug for an article path. Only `.md` is stripped.
pub fn slug_for_path(path: &str) -> &str {
    path.strip_suffix(".md").unwrap_or(path)
}

/// Title derived from a file path: extension dropped, `-`/`_` as spaces,
/// last segment only. Falls back to the raw path when that is empty.
pub fn title_from_path(path: &str) -> String {
    let formatted = strip_markdown_extension(path).replace(['-', '_'], " ");
    match formatted.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => path.to_string(),
    }
}

/// Title from the first-line heading, or from the path.
pub fn extract_title(content: &str, path: &str) -> String {
    let first_line = content.split('\n').next().unwrap_or("").trim();
    match heading_text(first_line) {
        Some(title) => title.to_string(),
        None => title_from_path(path),
    }
}

/// Removes a leading heading line plus the blank lines right after it.
pub fn strip_title(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let first_line = lines.first().map(|l| l.trim()).unwrap_or("");

    if heading_text(first_line).is_none() {
        return content.to_string();
    }

    let body_start = lines[1..]
        .iter()
        .position(|l| !l.trim().is_empty())
        .map(|idx| idx + 1)
        .unwrap_or(lines.len());

    lines[body_start..].join("\n")
}

/// First paragraph (up to 300 chars), extended with the second paragraph
/// when the first is shorter than 100 chars.
pub fn extract_summary(content: &str) -> String {
    let body = match content.split_once('\n') {
        Some((first, rest)) if first.starts_with('#') => rest,
        _ => content,
    };

    let paragraphs: Vec<&str> = body
        .split("\n\n")
        .filter(|p| !p.trim().is_empty() && !p.starts_with('#'))
        .collect();

    let first = paragraphs.first().copied().unwrap_or("");
    let summary = take_chars(first, SUMMARY_CHARS).trim();
    if summary.chars().count() >= SUMMARY_MIN_CHARS {
        return summary.to_string();
    }

    let second = paragraphs.get(1).copied().unwrap_or("");
    let joined = format!("{} {}", first, second);
    take_chars(&joined, SUMMARY_CHARS).trim().to_string()
}

/// Shortens a description to ~155 chars, cutting at the last sentence end
/// past char 100 when there is one.
pub fn truncate_for_seo(description: &str) -> String {
    if description.chars().count() <= SEO_DESCRIPTION_CHARS {
        return description.to_string();
    }

    let head = take_chars(description, SEO_DESCRIPTION_CHARS);
    match head.rfind('.') {
        Some(idx) if head[..idx].chars().count() > SEO_SENTENCE_MIN_CHARS => head[..=idx].to_string(),
        _ => format!("{}...", head),
    }
}

/// Description suitable for page metadata, JSON-LD and feeds.
pub fn extract_description(content: &str) -> String {
    truncate_for_seo(&extract_summary(content))
}

/// Listing preview: the first 500 chars, with an ellipsis when cut.
pub fn preview(content: &str) -> String {
    let head = take_chars(content, PREVIEW_CHARS);
    if head.len() < content.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}
