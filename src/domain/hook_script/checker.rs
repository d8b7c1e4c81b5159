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

//! Save-time allow-list checks for hook scripts.
//!
//! The parsed module is walked with a `ruff_python_ast` visitor. The first
//! construct outside the allow-list stops the walk and becomes the
//! diagnostic.

use super::syntax::{diagnostic_at, parse_script};
use super::{DiagnosticKind, ScriptDiagnostic};
use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::{CmpOp, Expr, ExprCall, ModModule, Number, Operator, Stmt, UnaryOp};
use ruff_text_size::{Ranged, TextSize};
use std::collections::HashMap;

/// Words that would mean loops, definitions, exception handling or reflection.
pub const FORBIDDEN_WORDS: &[&str] = &[
    "def", "class", "lambda", "while", "for", "with", "try", "except", "global", "nonlocal",
    "del", "yield", "raise", "return", "exec", "eval", "open", "compile", "getattr", "setattr",
    "__import__", "async", "await", "from",
];

pub const BUILTINS: &[&str] = &[
    "len", "str", "int", "float", "abs", "min", "max", "round", "upper", "lower", "strip",
    "print", "execute",
];

/// Importable modules and the members each one exposes.
pub const MODULES: &[(&str, &[&str])] = &[
    ("math", &["floor", "ceil", "sqrt", "pow", "pi", "e"]),
    ("datetime", &["today", "now"]),
];

pub fn module_members(module: &str) -> Option<&'static [&'static str]> {
    MODULES
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, members)| *members)
}

fn is_dunder(name: &str) -> bool {
    name.starts_with("__")
}

fn forbidden_statement(stmt: &Stmt) -> Option<&'static str> {
    match stmt {
        Stmt::FunctionDef(def) if def.is_async => Some("async"),
        Stmt::FunctionDef(_) => Some("def"),
        Stmt::ClassDef(_) => Some("class"),
        Stmt::While(_) => Some("while"),
        Stmt::For(stmt) if stmt.is_async => Some("async"),
        Stmt::For(_) => Some("for"),
        Stmt::With(stmt) if stmt.is_async => Some("async"),
        Stmt::With(_) => Some("with"),
        Stmt::Try(_) => Some("try"),
        Stmt::Global(_) => Some("global"),
        Stmt::Nonlocal(_) => Some("nonlocal"),
        Stmt::Delete(_) => Some("del"),
        Stmt::Raise(_) => Some("raise"),
        Stmt::Return(_) => Some("return"),
        Stmt::ImportFrom(_) => Some("from"),
        _ => None,
    }
}

fn forbidden_expression(expr: &Expr) -> Option<&'static str> {
    match expr {
        Expr::Lambda(_) => Some("lambda"),
        Expr::Await(_) => Some("await"),
        Expr::Yield(_) | Expr::YieldFrom(_) => Some("yield"),
        Expr::ListComp(_) | Expr::SetComp(_) | Expr::DictComp(_) | Expr::Generator(_) => {
            Some("for")
        }
        _ => None,
    }
}

fn allowed_operator(op: Operator) -> bool {
    matches!(
        op,
        Operator::Add | Operator::Sub | Operator::Mult | Operator::Div | Operator::Mod
    )
}

fn allowed_comparison(op: CmpOp) -> bool {
    matches!(
        op,
        CmpOp::Eq | CmpOp::NotEq | CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE
    )
}

struct Checker<'s> {
    source: &'s str,
    /// alias -> module
    imports: HashMap<String, String>,
    error: Option<ScriptDiagnostic>,
}

impl<'s> Checker<'s> {
    fn fail(&mut self, at: TextSize, message: String) {
        if self.error.is_none() {
            self.error = Some(diagnostic_at(
                DiagnosticKind::ValueError,
                message,
                self.source,
                at,
            ));
        }
    }

    /// False (with the error recorded) for forbidden and dunder names.
    fn name_allowed(&mut self, name: &str, at: TextSize) -> bool {
        if FORBIDDEN_WORDS.contains(&name) {
            self.fail(at, format!("forbidden instruction '{}'", name));
            false
        } else if is_dunder(name) {
            self.fail(at, format!("forbidden name '{}'", name));
            false
        } else {
            true
        }
    }

    fn attribute(&mut self, object: &Expr, attr: &str, at: TextSize) {
        if is_dunder(attr) {
            return self.fail(at, format!("forbidden name '{}'", attr));
        }
        let module = match object {
            Expr::Name(name) => self.imports.get(name.id.as_str()).cloned(),
            _ => None,
        };
        let Some(module) = module else {
            return self.fail(
                at,
                "attribute access is only allowed on imported modules".to_string(),
            );
        };
        let allowed = module_members(&module).unwrap_or_default();
        if !allowed.contains(&attr) {
            self.fail(
                at,
                format!("module '{}' has no allowed member '{}'", module, attr),
            );
        }
    }

    fn call(&mut self, call: &ExprCall) {
        if !call.arguments.keywords.is_empty() {
            return self.fail(
                call.start(),
                "keyword arguments are not allowed".to_string(),
            );
        }
        match call.func.as_ref() {
            Expr::Name(name) => {
                let callee = name.id.as_str();
                if !self.name_allowed(callee, name.start()) {
                    return;
                }
                if !BUILTINS.contains(&callee) || self.imports.contains_key(callee) {
                    self.fail(
                        name.start(),
                        format!("call to '{}' is not allowed", callee),
                    );
                }
            }
            Expr::Attribute(attribute) => self.attribute(
                &attribute.value,
                attribute.attr.id.as_str(),
                attribute.attr.start(),
            ),
            other => self.fail(
                other.start(),
                "only named functions can be called".to_string(),
            ),
        }
    }
}

impl<'a> Visitor<'a> for Checker<'_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        if self.error.is_some() {
            return;
        }
        if let Some(word) = forbidden_statement(stmt) {
            return self.fail(stmt.start(), format!("forbidden instruction '{}'", word));
        }

        match stmt {
            Stmt::Import(import) => {
                for alias in &import.names {
                    let module = alias.name.id.as_str();
                    if module_members(module).is_none() {
                        return self.fail(
                            alias.start(),
                            format!("import of module '{}' is not allowed", module),
                        );
                    }
                    let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                    if !self.name_allowed(bound.id.as_str(), bound.start()) {
                        return;
                    }
                    self.imports
                        .insert(bound.id.to_string(), module.to_string());
                }
            }
            Stmt::Assign(assign) => {
                self.visit_expr(&assign.value);
                match assign.targets.as_slice() {
                    [Expr::Name(target)] => {
                        let name = target.id.as_str();
                        if self.name_allowed(name, target.start())
                            && (self.imports.contains_key(name) || BUILTINS.contains(&name))
                        {
                            self.fail(target.start(), format!("cannot rebind '{}'", name));
                        }
                    }
                    _ => self.fail(
                        stmt.start(),
                        "only a single name can be assigned".to_string(),
                    ),
                }
            }
            Stmt::Expr(expr) => self.visit_expr(&expr.value),
            Stmt::Pass(_) => {}
            _ => self.fail(stmt.start(), "unsupported statement".to_string()),
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        if self.error.is_some() {
            return;
        }
        if let Some(word) = forbidden_expression(expr) {
            return self.fail(expr.start(), format!("forbidden instruction '{}'", word));
        }

        match expr {
            Expr::Name(name) => {
                self.name_allowed(name.id.as_str(), name.start());
                return;
            }
            Expr::Attribute(attribute) => {
                return self.attribute(
                    &attribute.value,
                    attribute.attr.id.as_str(),
                    attribute.attr.start(),
                );
            }
            Expr::Call(call) => {
                self.call(call);
                for arg in call.arguments.args.iter() {
                    self.visit_expr(arg);
                }
                return;
            }
            Expr::BinOp(binary) if !allowed_operator(binary.op) => {
                return self.fail(expr.start(), "unsupported operator".to_string());
            }
            Expr::UnaryOp(unary) if matches!(unary.op, UnaryOp::Invert) => {
                return self.fail(expr.start(), "unsupported operator".to_string());
            }
            Expr::Compare(compare) if !compare.ops.iter().all(|op| allowed_comparison(*op)) => {
                return self.fail(expr.start(), "unsupported operator".to_string());
            }
            Expr::NumberLiteral(number) => match &number.value {
                Number::Int(int) if int.as_i64().is_none() => {
                    return self.fail(expr.start(), "integer literal too large".to_string());
                }
                Number::Complex { .. } => {
                    return self.fail(expr.start(), "unsupported expression".to_string());
                }
                _ => {}
            },
            Expr::BinOp(_)
            | Expr::UnaryOp(_)
            | Expr::BoolOp(_)
            | Expr::Compare(_)
            | Expr::StringLiteral(_)
            | Expr::BooleanLiteral(_)
            | Expr::NoneLiteral(_) => {}
            _ => return self.fail(expr.start(), "unsupported expression".to_string()),
        }
        visitor::walk_expr(self, expr);
    }
}

/// Enforces the statement, import, attribute and call allow-lists on a
/// parsed module.
pub fn check(module: &ModModule, source: &str) -> Result<(), ScriptDiagnostic> {
    let mut checker = Checker {
        source,
        imports: HashMap::new(),
        error: None,
    };
    visitor::walk_body(&mut checker, &module.body);
    checker.error.map_or(Ok(()), Err)
}

/// Parses then checks `source`.
pub fn check_source(source: &str) -> Result<ModModule, ScriptDiagnostic> {
    let module = parse_script(source)?;
    check(&module, source)?;
    Ok(module)
}

#[cfg(test)]
mod tests {
    use crate::domain::hook_script::{validate_script, DiagnosticKind};

    #[test]
    fn test_accepts_allowed_script() {
        let script = r#"
import math
import datetime as dt
# refresh the summary view
rows = math.floor(10 / 3)
label = upper("run ") + str(rows) + " " + dt.today()
print(label)
execute("CALL refresh_sales_summary()")
"#;
        assert!(validate_script(script).is_ok());
    }

    #[test]
    fn test_forbidden_instruction_names_its_line() {
        let script = "x = 1\nfor i in x: print(i)\n";
        let err = validate_script(script).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ValueError);
        assert_eq!(err.line, 2);
        assert_eq!(err.source_line, "for i in x: print(i)");
        assert!(err.to_string().starts_with("ValueError : forbidden instruction 'for' at line 2"));
    }

    #[test]
    fn test_dunder_access_rejected() {
        let err = validate_script("x = ''.__class__").unwrap_err();
        assert_eq!(err.message, "forbidden name '__class__'");
    }

    #[test]
    fn test_unknown_module_rejected() {
        let err = validate_script("import os").unwrap_err();
        assert!(err.message.contains("'os'"));
        assert!(validate_script("from os import path").is_err());
    }

    #[test]
    fn test_non_whitelisted_call_rejected() {
        let err = validate_script("x = 1\nsystem('rm -rf /')").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "call to 'system' is not allowed");
    }

    #[test]
    fn test_python_constructs_outside_the_language_rejected() {
        let err = validate_script("x = [1]").unwrap_err();
        assert_eq!(err.message, "unsupported expression");
        assert_eq!(err.offset, 5);

        let err = validate_script("x = 1\nif x: print(x)").unwrap_err();
        assert_eq!(err.message, "unsupported statement");
        assert_eq!(err.line, 2);

        let err = validate_script("print(sep='-')").unwrap_err();
        assert_eq!(err.message, "keyword arguments are not allowed");

        let err = validate_script("y = [i for i in 'ab']").unwrap_err();
        assert!(err.message.starts_with("forbidden instruction"));

        assert!(validate_script("None = 1").is_err());
        assert!(validate_script("a, b = 1, 2").is_err());
        assert!(validate_script("x = 2 ** 8").is_err());
    }

    #[test]
    fn test_reflection_names_rejected_anywhere() {
        let err = validate_script("f = eval").unwrap_err();
        assert_eq!(err.message, "forbidden instruction 'eval'");
        let err = validate_script("x = 1\nprint(open('/etc/passwd'))").unwrap_err();
        assert_eq!(err.message, "forbidden instruction 'open'");
        assert_eq!(err.line, 2);
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn test_deep_nesting_is_a_diagnostic() {
        let script = format!("x = {}1{}", "(".repeat(5_000), ")".repeat(5_000));
        let err = validate_script(&script).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn test_attribute_on_value_rejected() {
        let err = validate_script("name = 'a'\nname.upper()").unwrap_err();
        assert_eq!(
            err.message,
            "attribute access is only allowed on imported modules"
        );
        assert!(validate_script("import math\nmath.system(1)").is_err());
    }
}
