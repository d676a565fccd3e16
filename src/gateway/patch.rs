//! Patch application - turns an action payload into final file content
//!
//! A payload is either full file content or a unified diff. Diffs are applied
//! forward against the file's current lines: each hunk's old side must be
//! found in the current file and is replaced by its new side. Nothing here
//! touches the filesystem.

use crate::error::{GatewayError, Result};

const NO_NEWLINE_MARKER: char = '\\';

/// Final content for a payload. `existing` is None for WRITE_FILE, where the
/// payload is always the whole file.
pub fn apply(existing: Option<&str>, payload: &str) -> Result<String> {
    match existing {
        Some(current) if is_diff_shaped(payload) => apply_unified_diff(current, payload),
        _ => Ok(payload.to_string()),
    }
}

/// Whether the payload's first non-empty line is a unified-diff header.
pub fn is_diff_shaped(payload: &str) -> bool {
    payload
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| {
            line.starts_with("--- ")
                || line.starts_with("+++ ")
                || line.starts_with("@@ ")
                || line.starts_with("diff --git ")
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

#[derive(Debug, Default)]
struct Hunk {
    old_start: usize,
    old_count: usize,
    lines: Vec<HunkLine>,
    old_missing_newline: bool,
    new_missing_newline: bool,
}

impl Hunk {
    fn old_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
                HunkLine::Add(_) => None,
            })
            .collect()
    }

    fn new_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Add(s) => Some(s.as_str()),
                HunkLine::Remove(_) => None,
            })
            .collect()
    }

    /// Zero-based line index where the old side is expected to start
    fn position_hint(&self) -> usize {
        if self.old_count == 0 {
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }
}

/// Apply a single-file unified diff to `original`.
pub fn apply_unified_diff(original: &str, diff: &str) -> Result<String> {
    let hunks = parse_hunks(diff)?;
    let current = split_lines(original);

    let mut output: Vec<&str> = Vec::with_capacity(current.len());
    let mut cursor = 0;

    for (index, hunk) in hunks.iter().enumerate() {
        let old = hunk.old_lines();
        let position = locate(&current, &old, hunk.position_hint(), cursor).ok_or_else(|| {
            GatewayError::Patch(format!(
                "hunk {} (old line {}) does not match the current file",
                index + 1,
                hunk.old_start
            ))
        })?;

        output.extend_from_slice(&current[cursor..position]);
        output.extend(hunk.new_lines());
        cursor = position + old.len();
    }
    output.extend_from_slice(&current[cursor..]);

    let trailing_newline = if hunks.iter().any(|h| h.new_missing_newline) {
        false
    } else if hunks.iter().any(|h| h.old_missing_newline) || original.is_empty() {
        true
    } else {
        original.ends_with('\n')
    };

    let mut patched = output.join("\n");
    if trailing_newline && !output.is_empty() {
        patched.push('\n');
    }
    Ok(patched)
}

/// Split into lines without losing `\r` or the distinction of a final newline.
fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    content
        .strip_suffix('\n')
        .unwrap_or(content)
        .split('\n')
        .collect()
}

/// Find where `old` occurs in `lines` at or after `cursor`, preferring the
/// position closest to `hint`. Exact matches win over whitespace-tolerant ones.
fn locate(lines: &[&str], old: &[&str], hint: usize, cursor: usize) -> Option<usize> {
    if old.is_empty() {
        return Some(hint.clamp(cursor, lines.len()));
    }
    if lines.len() < old.len() {
        return None;
    }
    let last_start = lines.len() - old.len();
    if cursor > last_start {
        return None;
    }

    let exact = |start: usize| lines[start..start + old.len()] == *old;
    let loose = |start: usize| {
        lines[start..start + old.len()]
            .iter()
            .zip(old)
            .all(|(a, b)| a.trim_end() == b.trim_end())
    };

    nearest(cursor, last_start, hint, exact).or_else(|| nearest(cursor, last_start, hint, loose))
}

fn nearest(low: usize, high: usize, hint: usize, matches: impl Fn(usize) -> bool) -> Option<usize> {
    let hint = hint.clamp(low, high);
    let span = (hint - low).max(high - hint);
    for distance in 0..=span {
        if hint + distance <= high && matches(hint + distance) {
            return Some(hint + distance);
        }
        if distance > 0 && hint >= low + distance && matches(hint - distance) {
            return Some(hint - distance);
        }
    }
    None
}

fn parse_hunks(diff: &str) -> Result<Vec<Hunk>> {
    let mut lines: Vec<&str> = diff.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let mut hunks: Vec<Hunk> = Vec::new();
    let mut current: Option<Hunk> = None;
    let mut file_headers = 0;

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("@@") {
            if let Some(done) = current.take() {
                hunks.push(done);
            }
            current = Some(parse_hunk_header(line)?);
            continue;
        }

        let starts_file = line.starts_with("diff --git ")
            || (line.starts_with("--- ")
                && lines.get(i + 1).is_some_and(|next| next.starts_with("+++ ")));

        let Some(hunk) = current.as_mut() else {
            if line.starts_with("--- ") {
                file_headers += 1;
            }
            if file_headers > 1 {
                return Err(multi_file());
            }
            // Preamble: diff --git, index, ---/+++ headers
            continue;
        };

        if starts_file {
            return Err(multi_file());
        }

        match line.chars().next() {
            None => hunk.lines.push(HunkLine::Context(String::new())),
            Some(' ') => hunk.lines.push(HunkLine::Context(line[1..].to_string())),
            Some('-') => hunk.lines.push(HunkLine::Remove(line[1..].to_string())),
            Some('+') => hunk.lines.push(HunkLine::Add(line[1..].to_string())),
            Some(NO_NEWLINE_MARKER) => match hunk.lines.last() {
                Some(HunkLine::Remove(_)) => hunk.old_missing_newline = true,
                Some(HunkLine::Add(_)) => hunk.new_missing_newline = true,
                Some(HunkLine::Context(_)) => {
                    hunk.old_missing_newline = true;
                    hunk.new_missing_newline = true;
                }
                None => {}
            },
            Some(_) => {
                return Err(GatewayError::Patch(format!(
                    "unexpected line in hunk: {:?}",
                    line
                )));
            }
        }
    }

    if let Some(done) = current.take() {
        hunks.push(done);
    }
    if hunks.is_empty() {
        return Err(GatewayError::Patch("diff contains no hunks".to_string()));
    }
    Ok(hunks)
}

fn multi_file() -> GatewayError {
    GatewayError::Patch("diff touches more than one file".to_string())
}

/// Parse `@@ -l[,s] +l[,s] @@ ...`, keeping only the old side.
fn parse_hunk_header(line: &str) -> Result<Hunk> {
    let malformed = || GatewayError::Patch(format!("malformed hunk header: {:?}", line));

    let old_range = line
        .trim_start_matches('@')
        .split_whitespace()
        .next()
        .and_then(|token| token.strip_prefix('-'))
        .ok_or_else(malformed)?;

    let (start, count) = match old_range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (old_range, "1"),
    };

    Ok(Hunk {
        old_start: start.parse().map_err(|_| malformed())?,
        old_count: count.parse().map_err(|_| malformed())?,
        ..Default::default()
    })
}
