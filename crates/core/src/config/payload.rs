// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Properties-style configuration payload
//!
//! The blob kept under the config key is a list of `name=value` lines.
//! Parsing is lenient: blank lines and `#`/`!` comments are skipped, `:`
//! or whitespace is accepted as a separator, a line without a separator is
//! a name with an empty value. Rendering sorts by name and escapes with
//! backslashes so that any payload parses back to itself:
//!
//! | In a name | In a value | Written as |
//! |---|---|---|
//! | `\`, `=`, `:`, `#`, `!` | `\` | `\` + the char |
//! | newline, CR, tab | newline, CR | `\n`, `\r`, `\t` |
//! | other whitespace | leading or trailing whitespace | `\` + the char |

use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPayload {
    properties: BTreeMap<String, String>,
}

impl ConfigPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let properties = text
            .lines()
            .map(str::trim_start)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .map(parse_line)
            .collect();
        Self { properties }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.properties {
            escape_name(name, &mut out);
            out.push('=');
            escape_value(value, &mut out);
            out.push('\n');
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for ConfigPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for ConfigPayload {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn parse_line(line: &str) -> (String, String) {
    let mut chars = line.chars().peekable();

    let mut name = String::new();
    while let Some(c) = chars.next_if(|&c| c != '=' && c != ':' && !c.is_whitespace()) {
        match c {
            '\\' => push_unescaped(&mut chars, &mut name),
            c => name.push(c),
        }
    }

    while chars.next_if(|c| c.is_whitespace()).is_some() {}
    if chars.next_if(|&c| c == '=' || c == ':').is_some() {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    // Trailing whitespace is dropped unless it was escaped
    let mut value = String::new();
    let mut kept = 0;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                push_unescaped(&mut chars, &mut value);
                kept = value.len();
            }
            c => value.push(c),
        }
    }
    let tail = value[kept..].trim_end().len();
    value.truncate(kept + tail);

    (name, value)
}

/// Decode the char after a backslash; a lone trailing backslash is dropped
fn push_unescaped(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    match chars.next() {
        Some('n') => out.push('\n'),
        Some('r') => out.push('\r'),
        Some('t') => out.push('\t'),
        Some(c) => out.push(c),
        None => {}
    }
}

fn push_escaped(c: char, out: &mut String) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c => {
            out.push('\\');
            out.push(c);
        }
    }
}

fn escape_name(name: &str, out: &mut String) {
    for c in name.chars() {
        if matches!(c, '\\' | '=' | ':' | '#' | '!') || c.is_whitespace() {
            push_escaped(c, out);
        } else {
            out.push(c);
        }
    }
}

fn escape_value(value: &str, out: &mut String) {
    let lead = value.len() - value.trim_start().len();
    let tail = value.trim_end().len().max(lead);
    for (at, c) in value.char_indices() {
        let edge = at < lead || at >= tail;
        if matches!(c, '\\' | '\n' | '\r') || (edge && c.is_whitespace()) {
            push_escaped(c, out);
        } else {
            out.push(c);
        }
    }
}
