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

//! Parsing of hook scripts.
//!
//! Scripts use Python syntax and are parsed with `ruff_python_parser`. The
//! parser, the checker and the interpreter all recurse on nested
//! expressions, so a cheap scan of the raw text bounds nesting first.

use super::{DiagnosticKind, ScriptDiagnostic};
use ruff_python_ast::{Mod, ModModule};
use ruff_python_parser::{parse, Mode};
use ruff_text_size::TextSize;

/// Deepest bracket nesting, and longest run of operators with no operand
/// in between (`not not not x`, `- - - 1`).
pub const MAX_NESTING: usize = 64;
/// Operators allowed in one logical line.
pub const MAX_OPERATORS: usize = 256;

/// 1-based line and column of a byte offset into `source`.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, col)
}

pub fn diagnostic_at(
    kind: DiagnosticKind,
    message: impl Into<String>,
    source: &str,
    at: TextSize,
) -> ScriptDiagnostic {
    let (line, col) = line_col(source, usize::from(at));
    ScriptDiagnostic::new(kind, message, line, col, source)
}

/// Parses `source` as a module, after the nesting scan.
pub fn parse_script(source: &str) -> Result<ModModule, ScriptDiagnostic> {
    check_nesting(source)?;
    let parsed = parse(source, Mode::Module.into()).map_err(|err| {
        diagnostic_at(
            DiagnosticKind::SyntaxError,
            err.error.to_string(),
            source,
            err.location.start(),
        )
    })?;
    match parsed.into_syntax() {
        Mod::Module(module) => Ok(module),
        _ => Err(diagnostic_at(
            DiagnosticKind::SyntaxError,
            "expected statements",
            source,
            TextSize::new(0),
        )),
    }
}

#[derive(Default)]
struct Budget {
    operators: usize,
    run: usize,
}

impl Budget {
    fn operator(&mut self) -> Option<&'static str> {
        self.operators += 1;
        self.run += 1;
        if self.run > MAX_NESTING {
            Some("expression nested too deeply")
        } else if self.operators > MAX_OPERATORS {
            Some("expression too long")
        } else {
            None
        }
    }

    fn operand(&mut self) {
        self.run = 0;
    }
}

/// Byte index just past the string literal opening at `start`.
fn string_end(source: &str, start: usize, quote: char) -> usize {
    let triple: String = std::iter::repeat(quote).take(3).collect();
    let is_triple = source[start..].starts_with(&triple);
    let closing = if is_triple { &triple[..] } else { &triple[..1] };
    let body = start + closing.len();

    let mut escaped = false;
    for (j, c) in source[body..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' if !is_triple => return body + j,
            _ if source[body + j..].starts_with(closing) => return body + j + closing.len(),
            _ => {}
        }
    }
    source.len()
}

/// Rejects scripts whose expressions nest deeper than the parser can take.
pub fn check_nesting(source: &str) -> Result<(), ScriptDiagnostic> {
    let fail = |offset: usize, message: &str| {
        let (line, col) = line_col(source, offset);
        ScriptDiagnostic::new(DiagnosticKind::SyntaxError, message, line, col, source)
    };

    let mut depth = 0usize;
    let mut budget = Budget::default();
    let mut continued = false;
    let mut chars = source.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '#' => while chars.next_if(|&(_, d)| d != '\n').is_some() {},
            '\'' | '"' => {
                let end = string_end(source, i, c);
                while chars.next_if(|&(j, _)| j < end).is_some() {}
                budget.operand();
            }
            '(' | '[' | '{' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(fail(i, "expression nested too deeply"));
                }
                if let Some(message) = budget.operator() {
                    return Err(fail(i, message));
                }
                budget.operand();
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                budget.operand();
            }
            '\n' => {
                if depth == 0 && !continued {
                    budget = Budget::default();
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = i + c.len_utf8();
                while let Some((j, d)) = chars.next_if(|&(_, d)| d.is_alphanumeric() || d == '_') {
                    end = j + d.len_utf8();
                }
                match &source[i..end] {
                    "not" | "and" | "or" | "in" | "is" | "if" | "else" | "lambda" | "await" => {
                        if let Some(message) = budget.operator() {
                            return Err(fail(i, message));
                        }
                    }
                    _ => budget.operand(),
                }
            }
            c if "+-*/%<>=!~&|^@.".contains(c) => {
                if let Some(message) = budget.operator() {
                    return Err(fail(i, message));
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            continued = c == '\\';
        }
    }
    Ok(())
}
