//! Ordered key/value property sets.
//!
//! A `None` value marks a key that was present without a value, e.g. a bare
//! `strict` line in a file or an empty environment variable. Bare items in
//! the inline argument string read as `true`.

use crate::config::keys;

/// Separator between items of the inline argument string.
#[cfg(windows)]
pub const ARG_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const ARG_SEPARATOR: char = ':';

/// Insertion-ordered property set with last-write-wins on duplicate keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, Option<String>)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert) with a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Builder-style [`insert`](Self::insert) of a bare key.
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.insert(key, None);
        self
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collect the process-level keys from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Collect the process-level keys through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut props = Self::new();
        for key in keys::PROCESS_KEYS {
            if let Some(value) = lookup(&keys::env_var_name(key)) {
                let value = if value.is_empty() { None } else { Some(value) };
                props.insert(key, value);
            }
        }
        props
    }

    /// Parse the properties file format.
    ///
    /// The key ends at the first unescaped `=`, `:` or whitespace; one
    /// separator and the whitespace around it are skipped. A line ending in
    /// an odd number of backslashes continues on the next one. Backslash
    /// escapes (`\t`, `\n`, `\r`, `\f`, `\uXXXX`, any other char taken
    /// literally) apply to keys and values. Trailing whitespace is dropped.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line);
            props.insert(key, value);
        }
        props
    }

    /// Parse the inline argument string: items separated by [`ARG_SEPARATOR`].
    ///
    /// An item without `=` is a flag and reads as `"true"`.
    pub fn parse_args(args: &str) -> Self {
        let mut props = Self::new();
        for item in args.split(ARG_SEPARATOR).filter(|item| !item.is_empty()) {
            match item.split_once('=') {
                Some((key, value)) => props.insert(key, Some(value.to_string())),
                None => props.insert(item, Some("true".to_string())),
            }
        }
        props
    }
}

/// Join continued lines, skipping blanks and comments.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;
    for natural in text.lines() {
        let natural = natural.trim_start();
        let mut line = match pending.take() {
            Some(mut joined) => {
                joined.push_str(natural);
                joined
            }
            None if natural.is_empty() || natural.starts_with(['#', '!']) => continue,
            None => natural.to_string(),
        };
        let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
        if trailing % 2 == 1 {
            line.pop();
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }
    lines.extend(pending);
    lines
}

fn split_entry(line: &str) -> (String, Option<String>) {
    let mut key_end = line.len();
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            key_end = idx;
            break;
        }
    }

    let key = unescape(&line[..key_end]);
    let rest = line[key_end..].trim_start();
    let (separated, rest) = match rest.strip_prefix(['=', ':']) {
        Some(rest) => (true, rest.trim_start()),
        None => (false, rest),
    };
    let value = rest.trim_end();
    if !separated && value.is_empty() {
        (key, None)
    } else {
        (key, Some(unescape(value)))
    }
}

fn unescape(raw: &str) -> String {
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
            Some('f') => out.push('\u{000c}'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                let decoded = Some(&hex)
                    .filter(|h| h.len() == 4 && h.chars().all(|c| c.is_ascii_hexdigit()))
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        chars.nth(3);
                    }
                    None => out.push('u'),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
