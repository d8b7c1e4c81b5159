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

//! Tree-walking evaluator for checked hook scripts.
//!
//! Every script runs in a fresh namespace seeded from the `HookEnvironment`;
//! nothing it assigns survives the run.

use super::checker::check_source;
use super::syntax::diagnostic_at;
use super::{DiagnosticKind, HookEnvironment, ScriptDiagnostic, ScriptValue};
use log::info;
use ruff_python_ast::{BoolOp, CmpOp, Expr, Number, Operator, Stmt, UnaryOp};
use ruff_text_size::Ranged;
use std::cmp::Ordering;
use std::collections::HashMap;

type EvalResult = std::result::Result<ScriptValue, (DiagnosticKind, String)>;

/// Validates then runs `source` once against `env`.
pub fn run_script(source: &str, env: &mut HookEnvironment) -> Result<(), ScriptDiagnostic> {
    let module = check_source(source)?;

    let mut interpreter = Interpreter {
        variables: env.values.clone().into_iter().collect(),
        modules: HashMap::new(),
        env,
    };
    for stmt in &module.body {
        interpreter
            .statement(stmt)
            .map_err(|(kind, message)| diagnostic_at(kind, message, source, stmt.start()))?;
    }
    Ok(())
}

struct Interpreter<'e> {
    variables: HashMap<String, ScriptValue>,
    /// alias -> module
    modules: HashMap<String, String>,
    env: &'e mut HookEnvironment,
}

fn type_error(message: String) -> (DiagnosticKind, String) {
    (DiagnosticKind::TypeError, message)
}

fn as_number(value: &ScriptValue) -> Option<f64> {
    match value {
        ScriptValue::Int(i) => Some(*i as f64),
        ScriptValue::Float(f) => Some(*f),
        ScriptValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_int(value: &ScriptValue) -> Option<i64> {
    match value {
        ScriptValue::Int(i) => Some(*i),
        ScriptValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn expect_str<'v>(name: &str, args: &'v [ScriptValue]) -> Result<&'v str, (DiagnosticKind, String)> {
    match args {
        [ScriptValue::Str(s)] => Ok(s.as_str()),
        [other] => Err(type_error(format!(
            "{}() argument must be str, not {}",
            name,
            other.type_name()
        ))),
        _ => Err(type_error(format!(
            "{}() takes exactly one argument ({} given)",
            name,
            args.len()
        ))),
    }
}

fn expect_number(name: &str, args: &[ScriptValue]) -> Result<f64, (DiagnosticKind, String)> {
    match args {
        [value] => as_number(value).ok_or_else(|| {
            type_error(format!(
                "{}() argument must be a number, not {}",
                name,
                value.type_name()
            ))
        }),
        _ => Err(type_error(format!(
            "{}() takes exactly one argument ({} given)",
            name,
            args.len()
        ))),
    }
}

fn float_to_int(name: &str, value: f64) -> EvalResult {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return Err((
            DiagnosticKind::ValueError,
            format!("{}() result out of range", name),
        ));
    }
    Ok(ScriptValue::Int(value as i64))
}

fn compare_values(left: &ScriptValue, right: &ScriptValue) -> Option<Ordering> {
    match (left, right) {
        (ScriptValue::Str(a), ScriptValue::Str(b)) => Some(a.cmp(b)),
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

fn values_equal(left: &ScriptValue, right: &ScriptValue) -> bool {
    match (left, right) {
        (ScriptValue::None, ScriptValue::None) => true,
        (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

impl<'e> Interpreter<'e> {
    fn statement(&mut self, stmt: &Stmt) -> Result<(), (DiagnosticKind, String)> {
        match stmt {
            Stmt::Import(import) => {
                for alias in &import.names {
                    let bound = alias.asname.as_ref().unwrap_or(&alias.name);
                    self.modules
                        .insert(bound.id.to_string(), alias.name.id.to_string());
                }
            }
            Stmt::Assign(assign) => {
                let value = self.eval(&assign.value)?;
                if let [Expr::Name(target)] = assign.targets.as_slice() {
                    self.variables.insert(target.id.to_string(), value);
                }
            }
            Stmt::Expr(expr) => {
                self.eval(&expr.value)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::NoneLiteral(_) => Ok(ScriptValue::None),
            Expr::BooleanLiteral(literal) => Ok(ScriptValue::Bool(literal.value)),
            Expr::StringLiteral(literal) => Ok(ScriptValue::Str(literal.value.to_str().to_string())),
            Expr::NumberLiteral(literal) => match &literal.value {
                Number::Int(int) => int.as_i64().map(ScriptValue::Int).ok_or_else(overflow),
                Number::Float(f) => Ok(ScriptValue::Float(*f)),
                _ => Err(type_error("complex numbers are not supported".to_string())),
            },
            Expr::Name(name) => {
                let name = name.id.as_str();
                self.variables.get(name).cloned().ok_or_else(|| {
                    (
                        DiagnosticKind::NameError,
                        format!("name '{}' is not defined", name),
                    )
                })
            }
            Expr::UnaryOp(unary) => {
                let operand = self.eval(&unary.operand)?;
                match unary.op {
                    UnaryOp::Not => Ok(ScriptValue::Bool(!operand.is_truthy())),
                    UnaryOp::USub => negate(operand),
                    UnaryOp::UAdd if as_number(&operand).is_some() => Ok(operand),
                    _ => Err(type_error(format!(
                        "bad operand type for unary operator: '{}'",
                        operand.type_name()
                    ))),
                }
            }
            Expr::BoolOp(boolean) => {
                let mut last = ScriptValue::None;
                for value in &boolean.values {
                    let value = self.eval(value)?;
                    let decided = match boolean.op {
                        BoolOp::And => !value.is_truthy(),
                        BoolOp::Or => value.is_truthy(),
                    };
                    if decided {
                        return Ok(value);
                    }
                    last = value;
                }
                Ok(last)
            }
            Expr::Compare(compare) => {
                let mut left = self.eval(&compare.left)?;
                for (op, comparator) in compare.ops.iter().zip(compare.comparators.iter()) {
                    let right = self.eval(comparator)?;
                    if !self.compare(*op, &left, &right)? {
                        return Ok(ScriptValue::Bool(false));
                    }
                    left = right;
                }
                Ok(ScriptValue::Bool(true))
            }
            Expr::BinOp(binary_op) => {
                let left = self.eval(&binary_op.left)?;
                let right = self.eval(&binary_op.right)?;
                binary(binary_op.op, left, right)
            }
            Expr::Attribute(attribute) => {
                self.module_constant(&attribute.value, attribute.attr.id.as_str())
            }
            Expr::Call(call) => {
                let mut values = Vec::with_capacity(call.arguments.args.len());
                for arg in call.arguments.args.iter() {
                    values.push(self.eval(arg)?);
                }
                match call.func.as_ref() {
                    Expr::Name(name) => self.call_builtin(name.id.as_str(), &values),
                    Expr::Attribute(attribute) => {
                        let module = self.module_of(&attribute.value)?;
                        call_module(&module, attribute.attr.id.as_str(), &values)
                    }
                    _ => Err(type_error("object is not callable".to_string())),
                }
            }
            _ => Err(type_error("unsupported expression".to_string())),
        }
    }

    fn compare(
        &self,
        op: CmpOp,
        left: &ScriptValue,
        right: &ScriptValue,
    ) -> Result<bool, (DiagnosticKind, String)> {
        match op {
            CmpOp::Eq => return Ok(values_equal(left, right)),
            CmpOp::NotEq => return Ok(!values_equal(left, right)),
            CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {}
            _ => return Err(type_error("unsupported comparison".to_string())),
        }
        let ordering = compare_values(left, right).ok_or_else(|| {
            type_error(format!(
                "'<' not supported between instances of '{}' and '{}'",
                left.type_name(),
                right.type_name()
            ))
        })?;
        Ok(match op {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::LtE => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        })
    }

    fn module_of(&self, object: &Expr) -> Result<String, (DiagnosticKind, String)> {
        match object {
            Expr::Name(name) => self.modules.get(name.id.as_str()).cloned().ok_or_else(|| {
                (
                    DiagnosticKind::NameError,
                    format!("name '{}' is not defined", name.id.as_str()),
                )
            }),
            _ => Err(type_error("attribute access on a value".to_string())),
        }
    }

    fn module_constant(&self, object: &Expr, attr: &str) -> EvalResult {
        let module = self.module_of(object)?;
        match (module.as_str(), attr) {
            ("math", "pi") => Ok(ScriptValue::Float(std::f64::consts::PI)),
            ("math", "e") => Ok(ScriptValue::Float(std::f64::consts::E)),
            _ => Err(type_error(format!(
                "'{}.{}' must be called",
                module, attr
            ))),
        }
    }

    fn call_builtin(&mut self, name: &str, args: &[ScriptValue]) -> EvalResult {
        match name {
            "print" => {
                let line = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                info!("[hook] {}", line);
                self.env.output.push(line);
                Ok(ScriptValue::None)
            }
            "execute" => {
                let sql = expect_str(name, args)?;
                let host = self.env.host.as_mut().ok_or_else(|| {
                    (
                        DiagnosticKind::RuntimeError,
                        "no destination connection available".to_string(),
                    )
                })?;
                host.execute(sql)
                    .map_err(|e| (DiagnosticKind::RuntimeError, e))
            }
            "len" => {
                let s = expect_str(name, args)?;
                Ok(ScriptValue::Int(s.chars().count() as i64))
            }
            "str" => match args {
                [value] => Ok(ScriptValue::Str(value.to_string())),
                _ => Err(type_error("str() takes exactly one argument".to_string())),
            },
            "int" => match args {
                [ScriptValue::Str(s)] => s.trim().parse::<i64>().map(ScriptValue::Int).map_err(|_| {
                    (
                        DiagnosticKind::ValueError,
                        format!("invalid literal for int(): '{}'", s),
                    )
                }),
                [ScriptValue::Float(f)] => float_to_int(name, f.trunc()),
                [value] => as_int(value).map(ScriptValue::Int).ok_or_else(|| {
                    type_error(format!(
                        "int() argument must be a string or a number, not '{}'",
                        value.type_name()
                    ))
                }),
                _ => Err(type_error("int() takes exactly one argument".to_string())),
            },
            "float" => match args {
                [ScriptValue::Str(s)] => s.trim().parse::<f64>().map(ScriptValue::Float).map_err(|_| {
                    (
                        DiagnosticKind::ValueError,
                        format!("could not convert string to float: '{}'", s),
                    )
                }),
                _ => expect_number(name, args).map(ScriptValue::Float),
            },
            "abs" => match args {
                [ScriptValue::Int(i)] => Ok(ScriptValue::Int(i.saturating_abs())),
                _ => expect_number(name, args).map(|f| ScriptValue::Float(f.abs())),
            },
            "min" | "max" => {
                let Some(first) = args.first() else {
                    return Err(type_error(format!("{}() expected at least 1 argument", name)));
                };
                let wanted = if name == "min" {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best = first.clone();
                for candidate in &args[1..] {
                    let ordering = compare_values(candidate, &best).ok_or_else(|| {
                        type_error(format!(
                            "{}() cannot compare '{}' and '{}'",
                            name,
                            candidate.type_name(),
                            best.type_name()
                        ))
                    })?;
                    if ordering == wanted {
                        best = candidate.clone();
                    }
                }
                Ok(best)
            }
            "round" => match args {
                [value] => {
                    let f = expect_number(name, std::slice::from_ref(value))?;
                    float_to_int(name, f.round_ties_even())
                }
                [value, ScriptValue::Int(digits)] => {
                    let f = expect_number(name, std::slice::from_ref(value))?;
                    let factor = 10f64.powi((*digits).clamp(-300, 300) as i32);
                    Ok(ScriptValue::Float((f * factor).round_ties_even() / factor))
                }
                _ => Err(type_error("round() takes a number and optional ndigits".to_string())),
            },
            "upper" => expect_str(name, args).map(|s| ScriptValue::Str(s.to_uppercase())),
            "lower" => expect_str(name, args).map(|s| ScriptValue::Str(s.to_lowercase())),
            "strip" => expect_str(name, args).map(|s| ScriptValue::Str(s.trim().to_string())),
            other => Err((
                DiagnosticKind::NameError,
                format!("name '{}' is not defined", other),
            )),
        }
    }
}

fn call_module(module: &str, function: &str, args: &[ScriptValue]) -> EvalResult {
    match (module, function) {
        ("math", "floor") => float_to_int(function, expect_number(function, args)?.floor()),
        ("math", "ceil") => float_to_int(function, expect_number(function, args)?.ceil()),
        ("math", "sqrt") => {
            let value = expect_number(function, args)?;
            if value < 0.0 {
                return Err((DiagnosticKind::ValueError, "math domain error".to_string()));
            }
            Ok(ScriptValue::Float(value.sqrt()))
        }
        ("math", "pow") => match args {
            [base, exp] => match (as_number(base), as_number(exp)) {
                (Some(b), Some(e)) => Ok(ScriptValue::Float(b.powf(e))),
                _ => Err(type_error("pow() arguments must be numbers".to_string())),
            },
            _ => Err(type_error(format!(
                "pow() takes exactly 2 arguments ({} given)",
                args.len()
            ))),
        },
        ("datetime", "today") => Ok(ScriptValue::Str(
            chrono::Local::now().format("%Y-%m-%d").to_string(),
        )),
        ("datetime", "now") => Ok(ScriptValue::Str(
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        )),
        _ => Err(type_error(format!(
            "'{}.{}' is not callable",
            module, function
        ))),
    }
}

fn overflow() -> (DiagnosticKind, String) {
    (DiagnosticKind::ValueError, "integer overflow".to_string())
}

fn negate(value: ScriptValue) -> EvalResult {
    match value {
        ScriptValue::Int(i) => i.checked_neg().map(ScriptValue::Int).ok_or_else(overflow),
        ScriptValue::Float(f) => Ok(ScriptValue::Float(-f)),
        ScriptValue::Bool(b) => Ok(ScriptValue::Int(-i64::from(b))),
        other => Err(type_error(format!(
            "bad operand type for unary -: '{}'",
            other.type_name()
        ))),
    }
}

fn binary(op: Operator, left: ScriptValue, right: ScriptValue) -> EvalResult {
    if let (Operator::Add, ScriptValue::Str(a), ScriptValue::Str(b)) = (op, &left, &right) {
        return Ok(ScriptValue::Str(format!("{}{}", a, b)));
    }

    let unsupported = || {
        type_error(format!(
            "unsupported operand type(s): '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))
    };

    if let (Some(a), Some(b)) = (as_int(&left), as_int(&right)) {
        return match op {
            Operator::Add => a.checked_add(b).map(ScriptValue::Int).ok_or_else(overflow),
            Operator::Sub => a.checked_sub(b).map(ScriptValue::Int).ok_or_else(overflow),
            Operator::Mult => a.checked_mul(b).map(ScriptValue::Int).ok_or_else(overflow),
            Operator::Div if b == 0 => Err(zero_division()),
            Operator::Div => Ok(ScriptValue::Float(a as f64 / b as f64)),
            Operator::Mod if b == 0 => Err(zero_division()),
            Operator::Mod => a
                .checked_rem(b)
                .map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
                .map(ScriptValue::Int)
                .ok_or_else(overflow),
            _ => Err(unsupported()),
        };
    }

    let (Some(a), Some(b)) = (as_number(&left), as_number(&right)) else {
        return Err(unsupported());
    };
    match op {
        Operator::Add => Ok(ScriptValue::Float(a + b)),
        Operator::Sub => Ok(ScriptValue::Float(a - b)),
        Operator::Mult => Ok(ScriptValue::Float(a * b)),
        Operator::Div if b == 0.0 => Err(zero_division()),
        Operator::Div => Ok(ScriptValue::Float(a / b)),
        Operator::Mod if b == 0.0 => Err(zero_division()),
        Operator::Mod => Ok(ScriptValue::Float(a - b * (a / b).floor())),
        _ => Err(unsupported()),
    }
}

fn zero_division() -> (DiagnosticKind, String) {
    (
        DiagnosticKind::ZeroDivisionError,
        "division by zero".to_string(),
    )
}
