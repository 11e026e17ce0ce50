//! Flat key-value configuration text
//!
//! The accepted syntax is the classic `.properties` format:
//! `key=value`, `key: value` or `key value`; lines starting with `#` or `!`
//! are comments; a line ending in an odd number of backslashes continues on
//! the next line; `\t \n \r \f \\ \uXXXX` are unescaped in keys and values.

use crate::core::error::{LoggerError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties text. `resource` names the source in error messages.
    pub fn parse(text: &str, resource: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (line_no, line) in logical_lines(text) {
            let (raw_key, raw_value) = split_key_value(&line);
            let key = unescape(raw_key).map_err(|message| {
                LoggerError::configuration(resource, format!("line {}: {}", line_no, message))
            })?;
            let value = unescape(raw_value).map_err(|message| {
                LoggerError::configuration(resource, format!("line {}: {}", line_no, message))
            })?;
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let resource = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|e| LoggerError::configuration(resource.as_str(), e.to_string()))?;
        Self::parse(&text, &resource)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Trimmed value parsed as `T`; `None` when absent or unparsable
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|value| value.trim().parse().ok())
    }

    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get_parsed(key).unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for Properties {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, "<inline>")
    }
}

/// Split a comma separated list, dropping blanks
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Join continuation lines and drop blanks and comments.
/// Yields the 1-based number of the first physical line of each entry.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        match pending.as_mut() {
            Some((_, buffer)) => buffer.push_str(trimmed),
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                pending = Some((index + 1, trimmed.to_string()));
            }
        }

        if let Some((line_no, mut buffer)) = pending.take() {
            if ends_with_continuation(&buffer) {
                buffer.pop();
                pending = Some((line_no, buffer));
            } else {
                out.push((line_no, buffer));
            }
        }
    }
    if let Some(entry) = pending {
        out.push(entry);
    }
    out
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);
    (key, rest.trim_start_matches([' ', '\t', '\x0c']))
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\u escape '\\u{}'", hex))?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}
