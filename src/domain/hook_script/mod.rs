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

//! # Hook Script Language
//!
//! A backend can carry a short post-run script, for example to refresh a view
//! once all of its tables are loaded:
//!
//! ```text
//! import math
//! print("loaded into", mysql_database)
//! execute("CALL refresh_sales_summary()")
//! ```
//!
//! Scripts are written in a small subset of Python: one statement per line,
//! imports of whitelisted modules, assignments, arithmetic, comparisons,
//! boolean logic and calls to a fixed set of functions. There are no loops,
//! no function definitions and no way to reach the host beyond `print` and
//! `execute`.
//!
//! A script goes through three stages:
//! 1. `syntax` bounds nesting and parses the text with `ruff_python_parser`;
//! 2. `checker` walks the AST and enforces the allow-lists;
//! 3. `interpreter` evaluates the statements against a `HookEnvironment`.

pub mod checker;
pub mod interpreter;
pub mod syntax;

use std::collections::BTreeMap;
use std::fmt;

pub use interpreter::run_script;

/// Category of a script diagnostic, printed the way operators know it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    SyntaxError,
    /// A forbidden word, attribute or call.
    ValueError,
    NameError,
    TypeError,
    ZeroDivisionError,
    RuntimeError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::ValueError => "ValueError",
            DiagnosticKind::NameError => "NameError",
            DiagnosticKind::TypeError => "TypeError",
            DiagnosticKind::ZeroDivisionError => "ZeroDivisionError",
            DiagnosticKind::RuntimeError => "RuntimeError",
        };
        f.write_str(name)
    }
}

/// A problem in a script, pinned to a line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column within the line.
    pub offset: usize,
    /// The offending source line, without its line break.
    pub source_line: String,
}

impl ScriptDiagnostic {
    pub fn new(
        kind: DiagnosticKind,
        message: impl Into<String>,
        line: usize,
        offset: usize,
        source: &str,
    ) -> Self {
        let source_line = source
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .trim_end()
            .to_string();
        Self {
            kind,
            message: message.into(),
            line,
            offset,
            source_line,
        }
    }
}

impl fmt::Display for ScriptDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {} at line {}\n{}",
            self.kind, self.message, self.line, self.source_line
        )
    }
}

impl std::error::Error for ScriptDiagnostic {}

/// Runtime value of the script language.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::None => "NoneType",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Str(_) => "str",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            ScriptValue::None => false,
            ScriptValue::Bool(b) => *b,
            ScriptValue::Int(i) => *i != 0,
            ScriptValue::Float(f) => *f != 0.0,
            ScriptValue::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::None => write!(f, "None"),
            ScriptValue::Bool(true) => write!(f, "True"),
            ScriptValue::Bool(false) => write!(f, "False"),
            ScriptValue::Int(i) => write!(f, "{}", i),
            ScriptValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            ScriptValue::Float(v) => write!(f, "{}", v),
            ScriptValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::Str(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::Str(s)
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        ScriptValue::Int(i)
    }
}

/// The live destination handle behind the script's `execute(sql)`.
pub trait ScriptHost {
    fn execute(&mut self, sql: &str) -> std::result::Result<ScriptValue, String>;

    /// Releases the connection once the script is done.
    fn close(self: Box<Self>) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Everything a script can see: seeded variables plus an optional host.
#[derive(Default)]
pub struct HookEnvironment {
    pub values: BTreeMap<String, ScriptValue>,
    pub host: Option<Box<dyn ScriptHost>>,
    /// Lines written by `print`, in order.
    pub output: Vec<String>,
}

impl HookEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: impl Into<ScriptValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn with_host(mut self, host: Box<dyn ScriptHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Closes the host, if any. Later `execute` calls fail.
    pub fn close_host(&mut self) -> std::result::Result<(), String> {
        match self.host.take() {
            Some(host) => host.close(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HookEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEnvironment")
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("host", &self.host.is_some())
            .finish()
    }
}

/// Runs every save-time check and returns the first problem found.
pub fn validate_script(source: &str) -> std::result::Result<(), ScriptDiagnostic> {
    checker::check_source(source).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_rendering() {
        let source = "x = 1\ndef f(): pass\n";
        let diag = ScriptDiagnostic::new(
            DiagnosticKind::ValueError,
            "forbidden instruction 'def'",
            2,
            1,
            source,
        );
        assert_eq!(
            diag.to_string(),
            "ValueError : forbidden instruction 'def' at line 2\ndef f(): pass"
        );
    }

    #[test]
    fn test_values_print_like_the_language() {
        assert_eq!(ScriptValue::Float(2.0).to_string(), "2.0");
        assert_eq!(ScriptValue::Bool(true).to_string(), "True");
        assert_eq!(ScriptValue::None.to_string(), "None");
        assert!(!ScriptValue::Str(String::new()).is_truthy());
    }
}
