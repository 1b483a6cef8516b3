//! The tree-walking evaluator (spec.md §4.3).
//!
//! Re-architected per spec.md §9: rather than the sentinel
//! `ReturnValue`/try-catch mechanics the source language used, a
//! statement or expression evaluates to a `Flow` (`Value` or
//! `Return`), wrapped in a `Result` whose `Err` side is `EvalError`.
//! `return` threads a `Flow::Return` up through nested blocks and
//! `if`-expressions until a function call (or the top-level program)
//! unwraps it back to a plain value; a `try` expression converts a
//! caught `RuntimeError` back into an ordinary `Object::RuntimeError`
//! value instead of letting it keep propagating as an `Err`.

pub mod builtins;
pub mod error;
pub mod methods;

pub use error::{EvalError, RuntimeError, RuntimeErrorKind};

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expression, Program, Statement};
use crate::environment::{Env, Environment};
use crate::object::{Function, HashKey, Object, TypeTag};

pub type EvalResult = Result<Flow, EvalError>;

#[derive(Debug, Clone)]
pub enum Flow {
    Value(Object),
    Return(Object),
}

impl Flow {
    pub fn into_value(self) -> Object {
        match self {
            Flow::Value(v) | Flow::Return(v) => v,
        }
    }
}

pub struct Evaluator {
    pub globals: Env,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        let globals = Environment::new();
        builtins::install(&globals);
        Evaluator { globals }
    }

    pub fn eval_program(&mut self, program: &Program) -> Result<Object, EvalError> {
        let env = Rc::clone(&self.globals);
        let flow = self.eval_statements(&program.statements, &env)?;
        Ok(flow.into_value())
    }

    fn eval_statements(&mut self, statements: &[Statement], env: &Env) -> EvalResult {
        let mut result = Flow::Value(Object::Null);
        for stmt in statements {
            let flow = self.eval_statement(stmt, env)?;
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
            result = flow;
        }
        Ok(result)
    }

    fn eval_statement(&mut self, stmt: &Statement, env: &Env) -> EvalResult {
        match stmt {
            Statement::Var { name, value, .. } => {
                let val = self.eval_expression(value, env)?.into_value();
                env.borrow_mut().set(name.clone(), val);
                Ok(Flow::Value(Object::Null))
            }
            Statement::Return { value, .. } => {
                let val = match value {
                    Some(expr) => self.eval_expression(expr, env)?.into_value(),
                    None => Object::Null,
                };
                Ok(Flow::Return(val))
            }
            Statement::Block { statements, .. } => self.eval_statements(statements, env),
            Statement::Expr { expr, .. } => self.eval_expression(expr, env),
            Statement::NoOp => Ok(Flow::Value(Object::Null)),
        }
    }

    fn eval_expression(&mut self, expr: &Expression, env: &Env) -> EvalResult {
        match expr {
            Expression::Ident { name, line } => {
                let value = env
                    .borrow()
                    .get(name)
                    .ok_or_else(|| EvalError::static_err(format!("identifier not found: {name}"), *line))?;
                Ok(Flow::Value(value))
            }
            Expression::IntLit { value, .. } => Ok(Flow::Value(Object::Int(*value))),
            Expression::BoolLit { value, .. } => Ok(Flow::Value(Object::Bool(*value))),
            Expression::StrLit { value, .. } => Ok(Flow::Value(Object::new_str(value.clone()))),
            Expression::ArrayLit { items, line } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_value(item, env)?);
                }
                let _ = line;
                Ok(Flow::Value(Object::new_array(values)))
            }
            Expression::MapLit { pairs, line } => {
                let mut entries = HashMap::new();
                for (k, v) in pairs {
                    let key = self.eval_value(k, env)?;
                    let val = self.eval_value(v, env)?;
                    let hash_key = key
                        .hash_key()
                        .ok_or_else(|| EvalError::static_err(format!("unhashable map key of type {}", key.type_tag()), *line))?;
                    entries.insert(hash_key, (key, val));
                }
                Ok(Flow::Value(Object::new_map(entries)))
            }
            Expression::Prefix { op, right, line } => {
                let right = self.eval_value(right, env)?;
                Ok(Flow::Value(eval_prefix(op, right, *line)?))
            }
            Expression::Infix { op, left, right, line } => {
                let left = self.eval_value(left, env)?;
                let right = self.eval_value(right, env)?;
                Ok(Flow::Value(eval_infix(op, left, right, *line)?))
            }
            Expression::If { cond, cons, alt, line } => {
                let _ = line;
                let cond = self.eval_value(cond, env)?;
                if cond.is_truthy() {
                    self.eval_statement(cons, env)
                } else if let Some(alt) = alt {
                    self.eval_statement(alt, env)
                } else {
                    Ok(Flow::Value(Object::Null))
                }
            }
            Expression::FunLit { params, body, .. } => {
                let function = Function {
                    params: params.clone(),
                    body: Rc::new((**body).clone()),
                    env: Rc::clone(env),
                };
                Ok(Flow::Value(Object::Function(Rc::new(function))))
            }
            Expression::Call { func, args, line } => {
                let callee = self.eval_value(func, env)?;
                let arg_values = self.eval_args(args, env)?;
                Ok(Flow::Value(self.call(callee, arg_values, *line)?))
            }
            Expression::MethodCall { receiver, name, args, line } => {
                let receiver = self.eval_value(receiver, env)?;
                let arg_values = self.eval_args(args, env)?;
                Ok(Flow::Value(methods::dispatch(self, receiver, name, arg_values, *line)?))
            }
            Expression::Index { target, index, line } => {
                let target = self.eval_value(target, env)?;
                let index = self.eval_value(index, env)?;
                Ok(Flow::Value(eval_index(target, index, *line)?))
            }
            Expression::Try { expr, .. } => match self.eval_expression(expr, env) {
                Ok(flow) => Ok(flow),
                Err(EvalError::Runtime(e)) => Ok(Flow::Value(Object::RuntimeError(Rc::new(e)))),
                Err(e) => Err(e),
            },
        }
    }

    /// Evaluate an expression down to a plain value, short-circuiting
    /// the caller with `return`'s `Flow::Return` if one surfaces.
    /// Only `If` can yield `Flow::Return` out of `eval_expression`;
    /// every other site only ever produces `Flow::Value`.
    fn eval_value(&mut self, expr: &Expression, env: &Env) -> Result<Object, EvalError> {
        Ok(self.eval_expression(expr, env)?.into_value())
    }

    fn eval_args(&mut self, args: &[Expression], env: &Env) -> Result<Vec<Object>, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_value(arg, env)?);
        }
        Ok(values)
    }

    /// Calls a function, builtin, or method value. `return` inside the
    /// callee only unwinds to here: its `Flow::Return` is unwrapped
    /// into a plain value, never re-propagated to the caller.
    pub fn call(&mut self, callee: Object, args: Vec<Object>, line: usize) -> Result<Object, EvalError> {
        match callee {
            Object::Function(function) => {
                if args.len() != function.params.len() {
                    return Err(EvalError::static_err(
                        format!(
                            "wrong number of arguments: expected {}, got {}",
                            function.params.len(),
                            args.len()
                        ),
                        line,
                    ));
                }
                let call_env = Environment::enclosed(&function.env);
                for (param, arg) in function.params.iter().zip(args) {
                    call_env.borrow_mut().set(param.clone(), arg);
                }
                let flow = self.eval_statement(&function.body, &call_env)?;
                Ok(flow.into_value())
            }
            Object::Builtin(builtin) => {
                builtins::check_schema(&builtin, &args, line)?;
                Ok((builtin.func)(self, args, line)?.into_value())
            }
            Object::Method(method) => {
                builtins::check_schema(&method.builtin, &args, line)?;
                let mut full_args = Vec::with_capacity(args.len() + 1);
                full_args.push((*method.receiver).clone());
                full_args.extend(args);
                Ok((method.builtin.func)(self, full_args, line)?.into_value())
            }
            other => Err(EvalError::static_err(
                format!("{} is not callable", other.type_tag()),
                line,
            )),
        }
    }
}

fn eval_prefix(op: &str, right: Object, line: usize) -> Result<Object, EvalError> {
    match (op, &right) {
        ("!", _) => Ok(Object::Bool(!right.is_truthy())),
        ("-", Object::Int(v)) => Ok(Object::Int(v.wrapping_neg())),
        ("~", Object::Int(v)) => Ok(Object::Int(bitwise_not(*v))),
        ("-", other) | ("~", other) => Err(EvalError::runtime(
            RuntimeErrorKind::Type,
            format!("unsupported operand type for {op}: {}", other.type_tag()),
            line,
        )),
        _ => Err(EvalError::static_err(format!("unknown prefix operator {op}"), line)),
    }
}

fn bit_width(v: i64) -> u32 {
    let mag = v.unsigned_abs();
    let bits_needed = 64 - mag.leading_zeros();
    [8u32, 16, 32, 64].into_iter().find(|&w| bits_needed <= w).unwrap_or(64)
}

fn bitwise_not(v: i64) -> i64 {
    let width = bit_width(v);
    let mask: u64 = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
    ((!(v as u64)) & mask) as i64
}

fn eval_infix(op: &str, left: Object, right: Object, line: usize) -> Result<Object, EvalError> {
    use Object::*;
    match (op, left, right) {
        ("&&", l, r) => Ok(Bool(l.is_truthy() && r.is_truthy())),
        ("||", l, r) => Ok(Bool(l.is_truthy() || r.is_truthy())),

        ("+", Int(l), Int(r)) => Ok(Int(l.wrapping_add(r))),
        ("-", Int(l), Int(r)) => Ok(Int(l.wrapping_sub(r))),
        ("*", Int(l), Int(r)) => Ok(Int(l.wrapping_mul(r))),
        ("/", Int(_), Int(0)) => Err(EvalError::runtime(RuntimeErrorKind::Type, "division by zero", line)),
        ("/", Int(l), Int(r)) => Ok(Int(l.wrapping_div(r))),
        ("%", Int(_), Int(0)) => Err(EvalError::runtime(RuntimeErrorKind::Type, "modulo by zero", line)),
        ("%", Int(l), Int(r)) => Ok(Int(l.wrapping_rem(r))),
        ("&", Int(l), Int(r)) => Ok(Int(l & r)),
        ("|", Int(l), Int(r)) => Ok(Int(l | r)),
        ("^", Int(l), Int(r)) => Ok(Int(l ^ r)),
        ("<<", Int(_), Int(r)) if r < 0 => Err(EvalError::runtime(RuntimeErrorKind::Type, "negative shift amount", line)),
        ("<<", Int(l), Int(r)) => Ok(Int(l.wrapping_shl(r as u32))),
        (">>", Int(_), Int(r)) if r < 0 => Err(EvalError::runtime(RuntimeErrorKind::Type, "negative shift amount", line)),
        (">>", Int(l), Int(r)) => Ok(Int(l.wrapping_shr(r as u32))),
        ("<", Int(l), Int(r)) => Ok(Bool(l < r)),
        ("<=", Int(l), Int(r)) => Ok(Bool(l <= r)),
        (">", Int(l), Int(r)) => Ok(Bool(l > r)),
        (">=", Int(l), Int(r)) => Ok(Bool(l >= r)),

        ("+", Str(l), Str(r)) => Ok(Object::new_str(format!("{}{}", l.as_str(), r.as_str()))),

        ("+", Array(l), Array(r)) => {
            let mut items = (*l).clone();
            items.extend((*r).iter().cloned());
            Ok(Object::new_array(items))
        }

        ("+", Set(l), Set(r)) => {
            let mut entries = l.borrow().clone();
            entries.extend(r.borrow().clone());
            Ok(Object::new_set(entries))
        }
        ("-", Set(l), Set(r)) => {
            let r = r.borrow();
            let entries: HashMap<HashKey, Object> = l
                .borrow()
                .iter()
                .filter(|&(k, _)| !r.contains_key(k))
                .map(|(k, v)| (*k, v.clone()))
                .collect();
            Ok(Object::new_set(entries))
        }
        ("^", Set(l), Set(r)) => {
            let r = r.borrow();
            let entries: HashMap<HashKey, Object> = l
                .borrow()
                .iter()
                .filter(|&(k, _)| r.contains_key(k))
                .map(|(k, v)| (*k, v.clone()))
                .collect();
            Ok(Object::new_set(entries))
        }

        ("==", l, r) => Ok(Bool(values_equal(&l, &r, line)?)),
        ("!=", l, r) => Ok(Bool(!values_equal(&l, &r, line)?)),

        (op, l, r) => Err(EvalError::runtime(
            RuntimeErrorKind::Type,
            format!("unsupported operand types for {op}: {} and {}", l.type_tag(), r.type_tag()),
            line,
        )),
    }
}

/// Structural equality where a cross-type comparison is always an
/// error, never a silent `false` (spec.md §4.3, an explicit deviation
/// from most scripting languages' `==`).
pub fn values_equal(left: &Object, right: &Object, line: usize) -> Result<bool, EvalError> {
    if left.type_tag() != right.type_tag() {
        return Err(EvalError::runtime(
            RuntimeErrorKind::Type,
            format!("cannot compare {} with {}", left.type_tag(), right.type_tag()),
            line,
        ));
    }
    match (left, right) {
        (Object::Null, Object::Null) => Ok(true),
        (Object::Bool(l), Object::Bool(r)) => Ok(l == r),
        (Object::Int(l), Object::Int(r)) => Ok(l == r),
        (Object::Str(l), Object::Str(r)) => Ok(l.as_str() == r.as_str()),
        (Object::Type(l), Object::Type(r)) => Ok(l == r),
        (Object::Array(l), Object::Array(r)) => {
            if l.len() != r.len() {
                return Ok(false);
            }
            for (a, b) in l.iter().zip(r.iter()) {
                if !values_equal(a, b, line)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Object::Map(l), Object::Map(r)) => {
            let l = l.borrow();
            let r = r.borrow();
            if l.len() != r.len() {
                return Ok(false);
            }
            for (key, (_, v)) in l.iter() {
                match r.get(key) {
                    Some((_, rv)) if values_equal(v, rv, line)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        (Object::Set(l), Object::Set(r)) => {
            let l = l.borrow();
            let r = r.borrow();
            Ok(l.len() == r.len() && l.keys().all(|k| r.contains_key(k)))
        }
        _ => Err(EvalError::runtime(
            RuntimeErrorKind::Type,
            format!("values of type {} are not comparable", left.type_tag()),
            line,
        )),
    }
}

fn eval_index(target: Object, index: Object, line: usize) -> Result<Object, EvalError> {
    match (&target, &index) {
        (Object::Array(items), Object::Int(i)) => {
            let len = items.len() as i64;
            if *i < 0 || *i >= len {
                return Err(EvalError::runtime(
                    RuntimeErrorKind::Key,
                    format!("array index {i} out of bounds for length {len}"),
                    line,
                ));
            }
            Ok(items[*i as usize].clone())
        }
        (Object::Array(_), other) => Err(EvalError::runtime(
            RuntimeErrorKind::Type,
            format!("array index must be an int, got {}", other.type_tag()),
            line,
        )),
        (Object::Map(entries), key) => {
            let hash_key = key
                .hash_key()
                .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Type, format!("unhashable key type {}", key.type_tag()), line))?;
            entries
                .borrow()
                .get(&hash_key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| EvalError::runtime(RuntimeErrorKind::Key, format!("key not found: {}", key.inspect()), line))
        }
        (other, _) => Err(EvalError::runtime(
            RuntimeErrorKind::Type,
            format!("{} is not indexable", other.type_tag()),
            line,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn eval_src(src: &str) -> Object {
        let (program, errors) = Parser::new(src).parse_program();
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        let mut evaluator = Evaluator::new();
        evaluator.eval_program(&program).expect("eval error")
    }

    #[test]
    fn evaluates_integer_wraparound_arithmetic() {
        let result = eval_src("9223372036854775807 + 1");
        assert!(matches!(result, Object::Int(i64::MIN)));
    }

    #[test]
    fn division_by_zero_is_runtime_error() {
        let (program, _) = Parser::new("1 / 0").parse_program();
        let mut evaluator = Evaluator::new();
        assert!(evaluator.eval_program(&program).is_err());
    }

    #[test]
    fn booleans_are_not_short_circuited() {
        // `Array.push` returns a fresh array rather than mutating
        // (spec.md §3.3), so the side effect is observed through a
        // `Map`, whose `set` mutates in place.
        let src = "var calls = {}\nvar mark = fun() {\ncalls.set(\"hit\", true)\ntrue\n}\ntrue || mark()\ncalls";
        let result = eval_src(src);
        match result {
            Object::Map(entries) => assert_eq!(entries.borrow().len(), 1),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn if_is_an_expression_with_implicit_value() {
        let result = eval_src("var x = if true { 1 } else { 2 }\nx");
        assert!(matches!(result, Object::Int(1)));
    }

    #[test]
    fn return_only_escapes_the_nearest_function() {
        let src = "var f = fun() {\nif true {\nreturn 1\n}\nreturn 2\n}\nf()";
        let result = eval_src(src);
        assert!(matches!(result, Object::Int(1)));
    }

    #[test]
    fn try_converts_runtime_error_to_a_value() {
        let result = eval_src("try (1 / 0)");
        assert!(matches!(result, Object::RuntimeError(_)));
    }

    #[test]
    fn cross_type_equality_is_always_an_error() {
        let (program, _) = Parser::new("1 == \"1\"").parse_program();
        let mut evaluator = Evaluator::new();
        assert!(evaluator.eval_program(&program).is_err());
    }

    #[test]
    fn array_concat_does_not_mutate_operands() {
        let result = eval_src("var a = [1]\nvar b = [2]\nvar c = a + b\na[0]");
        assert!(matches!(result, Object::Int(1)));
    }
}
