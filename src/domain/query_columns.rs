// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Query Column Extractor
//!
//! Reads the projection list of a `SELECT` statement and returns the column
//! names it produces, in order. This is what lets us pair each row tuple with
//! the declared fields positionally.
//!
//! It is a heuristic, not a SQL parser:
//! - the projection is the text between `SELECT` and the first top-level `FROM`;
//! - terms are split on top-level commas (commas inside parentheses or quoted
//!   literals do not split);
//! - a term's name is its last top-level `AS` alias, otherwise the raw term.
//!
//! Comments and implicit aliases (`expr alias` without `AS`) are not understood.

use crate::domain::entities::{CanonicalType, SchemaField};
use crate::domain::errors::ValidationError;

/// True when the text starts with the SELECT keyword followed by whitespace.
pub fn is_select_query(query: &str) -> bool {
    let trimmed = query.trim_start();
    match trimmed.get(..6) {
        Some(keyword) if keyword.eq_ignore_ascii_case("select") => trimmed[6..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace),
        _ => false,
    }
}

/// Ordered, lower-cased column names projected by the query.
pub fn extract_columns(query: &str) -> Result<Vec<String>, ValidationError> {
    if !is_select_query(query) {
        return Err(ValidationError::QuerySyntaxError);
    }
    let body = query.trim().trim_end_matches(';');
    // SELECT is ASCII, so byte offset 6 is a char boundary.
    let after_select = body.trim_start()[6..].to_string();
    let projection_end = find_top_level_from(&after_select).unwrap_or(after_select.len());
    let projection = &after_select[..projection_end];

    Ok(split_top_level(projection, ',')
        .into_iter()
        .map(|term| column_name(term.trim()))
        .collect())
}

/// Default field list for a query: one STRING field per column, named after it.
pub fn suggest_fields(query: &str) -> Result<Vec<SchemaField>, ValidationError> {
    let columns = extract_columns(query)?;
    Ok(columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let mut field = SchemaField::new(column, column, CanonicalType::String, false);
            field.sequence = i as i32;
            field
        })
        .collect())
}

fn column_name(term: &str) -> String {
    let name = match find_last_top_level_alias(term) {
        Some(alias_start) => &term[alias_start..],
        None => term,
    };
    strip_quotes(name.trim()).to_lowercase()
}

fn strip_quotes(name: &str) -> &str {
    for quote in ['"', '`', '\''] {
        if name.len() >= 2 && name.starts_with(quote) && name.ends_with(quote) {
            return &name[1..name.len() - 1];
        }
    }
    if name.len() >= 2 && name.starts_with('[') && name.ends_with(']') {
        return &name[1..name.len() - 1];
    }
    name
}

/// Walks the text and reports each byte offset that sits at nesting depth zero
/// outside of any quoted literal.
fn top_level_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len());
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = (depth - 1).max(0),
            _ if depth == 0 => offsets.push(i),
            _ => {}
        }
    }
    offsets
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for i in top_level_offsets(text) {
        if text[i..].starts_with(separator) {
            parts.push(&text[start..i]);
            start = i + separator.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn is_keyword_at(text: &str, offset: usize, keyword: &str) -> bool {
    let Some(candidate) = text.get(offset..offset + keyword.len()) else {
        return false;
    };
    if !candidate.eq_ignore_ascii_case(keyword) {
        return false;
    }
    let before_ok = text[..offset]
        .chars()
        .next_back()
        .is_some_and(char::is_whitespace);
    let after_ok = text[offset + keyword.len()..]
        .chars()
        .next()
        .is_some_and(char::is_whitespace);
    before_ok && after_ok
}

fn find_top_level_from(text: &str) -> Option<usize> {
    top_level_offsets(text)
        .into_iter()
        .find(|&i| is_keyword_at(text, i, "from"))
}

/// Byte offset where the alias following the last top-level ` AS ` starts.
fn find_last_top_level_alias(term: &str) -> Option<usize> {
    top_level_offsets(term)
        .into_iter()
        .filter(|&i| is_keyword_at(term, i, "as"))
        .last()
        .map(|i| i + 2)
}
