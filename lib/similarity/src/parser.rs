//! Line parser for numbered re-ranking responses.
//!
//! The expected shape is
//!
//! ```text
//! 1. 이름: 콩이
//!    이유: 작고 활발해서 아파트 생활에 잘 맞습니다.
//! 2. 이름: 보리 / 이유: 차분하고 사람을 좋아합니다.
//! ```
//!
//! A line beginning with an ordinal opens a new entry and flushes the open
//! one. Name and reason markers set the fields of the open entry; unmarked
//! lines directly after a reason continue it. The last entry is flushed at
//! end of input.

use serde::{Deserialize, Serialize};

/// One entry recovered from a response. Either field may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub ordinal: Option<usize>,
    pub name: Option<String>,
    pub reason: Option<String>,
}

impl ParsedEntry {
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.reason.is_some()
    }
}

/// Field markers recognized in a response, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseFormat {
    pub name_markers: Vec<String>,
    pub reason_markers: Vec<String>,
}

impl Default for ResponseFormat {
    fn default() -> Self {
        Self {
            name_markers: vec!["이름".into(), "name".into()],
            reason_markers: vec!["이유".into(), "추천 이유".into(), "reason".into()],
        }
    }
}

#[derive(Debug, Default)]
struct Draft {
    ordinal: Option<usize>,
    name: Option<String>,
    reason: Option<String>,
}

impl Draft {
    fn opened(ordinal: Option<usize>) -> Self {
        Self {
            ordinal,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    format: ResponseFormat,
}

impl ResponseParser {
    pub fn new(format: ResponseFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &ResponseFormat {
        &self.format
    }

    /// Parse every entry in `response`, in order of appearance.
    pub fn parse(&self, response: &str) -> Vec<ParsedEntry> {
        let mut entries = Vec::new();
        let mut current = Draft::default();
        let mut continuing = false;

        for raw in response.lines() {
            let line = clean_line(raw);
            if line.is_empty() {
                continuing = false;
                continue;
            }

            let (body, from_ordinal) = match split_ordinal(&line) {
                Some((ordinal, rest)) => {
                    flush(&mut entries, std::mem::replace(&mut current, Draft::opened(Some(ordinal))));
                    (rest.trim(), true)
                }
                None => (line.as_str(), false),
            };
            if body.is_empty() {
                continuing = false;
                continue;
            }

            if let Some(value) = self.strip_name(body) {
                continuing = self.set_name_and_reason(&mut entries, &mut current, value);
            } else if let Some(reason) = self.strip_reason(body) {
                continuing = self.set_reason(&mut entries, &mut current, reason);
            } else if from_ordinal {
                // "3. 콩이" or "3. 콩이 / 이유: ..." without a name marker
                continuing = self.set_name_and_reason(&mut entries, &mut current, body);
            } else if continuing {
                if let Some(reason) = current.reason.as_mut() {
                    reason.push(' ');
                    reason.push_str(body);
                }
            }
        }

        flush(&mut entries, current);
        entries
    }

    /// `value` is a name, optionally followed by an inline reason label.
    fn set_name_and_reason(&self, entries: &mut Vec<ParsedEntry>, current: &mut Draft, value: &str) -> bool {
        let (name, reason) = match self.find_reason(value) {
            Some((at, reason)) => (&value[..at], Some(reason)),
            None => (value, None),
        };
        self.set_name(entries, current, trim_separator(name));
        match reason {
            Some(reason) => self.set_reason(entries, current, reason),
            None => false,
        }
    }

    fn set_name(&self, entries: &mut Vec<ParsedEntry>, current: &mut Draft, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if current.name.is_some() {
            flush(entries, std::mem::take(current));
        }
        current.name = Some(name.to_string());
    }

    /// Returns whether unmarked lines may continue the reason.
    fn set_reason(&self, entries: &mut Vec<ParsedEntry>, current: &mut Draft, reason: &str) -> bool {
        let reason = reason.trim();
        if reason.is_empty() {
            return false;
        }
        if current.reason.is_some() {
            flush(entries, std::mem::take(current));
        }
        current.reason = Some(reason.to_string());
        true
    }

    fn strip_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.format
            .name_markers
            .iter()
            .find_map(|marker| strip_label(line, marker))
    }

    fn strip_reason<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.format
            .reason_markers
            .iter()
            .find_map(|marker| strip_label(line, marker))
    }

    /// First reason label inside `text`, as (byte offset, value).
    fn find_reason<'a>(&self, text: &'a str) -> Option<(usize, &'a str)> {
        let mut previous: Option<char> = None;
        for (at, c) in text.char_indices() {
            if !previous.is_some_and(char::is_alphanumeric) {
                if let Some(value) = self.strip_reason(&text[at..]) {
                    return Some((at, value));
                }
            }
            previous = Some(c);
        }
        None
    }
}

fn flush(entries: &mut Vec<ParsedEntry>, draft: Draft) {
    if draft.name.is_none() && draft.reason.is_none() {
        return;
    }
    entries.push(ParsedEntry {
        ordinal: draft.ordinal,
        name: draft.name,
        reason: draft.reason,
    });
}

/// Remove markdown emphasis and list/heading prefixes.
fn clean_line(raw: &str) -> String {
    raw.replace("**", "")
        .trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '•' | '#' | '*' | '>') || c.is_whitespace())
        .trim_end()
        .to_string()
}

fn trim_separator(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '/' | '|' | ',' | '-') || c.is_whitespace())
}

/// `"12. rest"` or `"12) rest"` to `(12, "rest")`. At most three digits, and
/// the punctuation must not start a decimal such as `1.5`.
pub fn split_ordinal(line: &str) -> Option<(usize, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 3 {
        return None;
    }

    let rest = &line[digits..];
    let mut chars = rest.chars();
    if !matches!(chars.next(), Some('.') | Some(')')) {
        return None;
    }
    if chars.clone().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }

    let ordinal = line[..digits].parse().ok()?;
    Some((ordinal, chars.as_str()))
}

/// Value after `marker` when `line` starts with `marker` followed by `:`.
fn strip_label<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let head = line.get(..marker.len())?;
    if !head.eq_ignore_ascii_case(marker) {
        return None;
    }
    let rest = line[marker.len()..].trim_start();
    let value = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('：'))?;
    Some(value.trim())
}
