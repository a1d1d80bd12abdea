//! Matcher expression engine with compiled program caching

use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::matcher::{
    context::EvalContext,
    error::{MatcherError, Result},
    parser::{self, BinaryOp, Expr, UnaryOp},
    value::Value,
};

/// Engine for compiling and evaluating matcher expressions
pub struct Engine {
    /// Compiled program cache (thread-safe)
    program_cache: Arc<DashMap<String, Arc<Expr>>>,
}

impl Engine {
    /// Create a new matcher engine
    pub fn new() -> Self {
        Self {
            program_cache: Arc::new(DashMap::new()),
        }
    }

    /// Compile an expression and cache the result
    ///
    /// # Errors
    /// Returns error if expression cannot be parsed
    pub fn compile(&self, expr: &str) -> Result<Arc<Expr>> {
        if let Some(program) = self.program_cache.get(expr) {
            return Ok(program.clone());
        }

        let program = Arc::new(parser::parse(expr)?);
        self.program_cache.insert(expr.to_string(), program.clone());
        Ok(program)
    }

    /// Evaluate a compiled program with the given context
    pub fn evaluate(&self, program: &Expr, ctx: &EvalContext) -> Result<Value> {
        eval(program, ctx)
    }

    /// Evaluate a compiled program and coerce the result to a match
    ///
    /// `true` and any nonzero number match; `false` and zero do not. Any other
    /// result type is an error.
    pub fn evaluate_match(&self, program: &Expr, ctx: &EvalContext) -> Result<bool> {
        let result = eval(program, ctx)?;
        Self::to_match(&result)
    }

    /// Compile and evaluate an expression in one call
    pub fn evaluate_expression(&self, expr: &str, ctx: &EvalContext) -> Result<bool> {
        let program = self.compile(expr)?;
        self.evaluate_match(&program, ctx)
    }

    /// Clear the compiled program cache
    pub fn clear_cache(&self) {
        self.program_cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.program_cache.len(),
        }
    }

    fn to_match(value: &Value) -> Result<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            other => Err(MatcherError::NonBooleanResult(other.type_name().to_string())),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cached programs
    pub size: usize,
}

fn eval(expr: &Expr, ctx: &EvalContext) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => ctx
            .variable(name)
            .cloned()
            .ok_or_else(|| MatcherError::VariableNotFound(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Expr::Index(target, index) => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            index_value(&target, &index)
        }
        Expr::Call(name, args) => {
            let function = ctx
                .function(name)
                .ok_or_else(|| MatcherError::FunctionNotFound(name.clone()))?;
            let args = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>>>()?;
            function(&args)
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&value)?)),
                UnaryOp::Neg => match value {
                    Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(MatcherError::TypeMismatch(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                },
            }
        }
        Expr::Binary(BinaryOp::And, left, right) => {
            if !truthy(&eval(left, ctx)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(right, ctx)?)?))
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            if truthy(&eval(left, ctx)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(right, ctx)?)?))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            binary(*op, &left, &right)
        }
    }
}

fn truthy(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Float(f) => Ok(*f != 0.0),
        other => Err(MatcherError::TypeMismatch(format!(
            "expected boolean operand, got {}",
            other.type_name()
        ))),
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value> {
    match (target, index) {
        (Value::Map(map), Value::Str(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| MatcherError::TypeMismatch(format!("list index {} out of range", i))),
        (target, index) => Err(MatcherError::TypeMismatch(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => compare(left, right).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => compare(left, right).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(left, right).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => compare(left, right).map(|o| Value::Bool(o != Ordering::Less)),
        BinaryOp::In => contains(right, left).map(Value::Bool),
        BinaryOp::Add => match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)
        }
        BinaryOp::And => Ok(Value::Bool(truthy(left)? && truthy(right)?)),
        BinaryOp::Or => Ok(Value::Bool(truthy(left)? || truthy(right)?)),
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                MatcherError::TypeMismatch("cannot order NaN".to_string())
            }),
            _ => Err(MatcherError::TypeMismatch(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn contains(collection: &Value, needle: &Value) -> Result<bool> {
    match collection {
        Value::List(items) => Ok(items.iter().any(|item| item == needle)),
        Value::Map(map) => match needle {
            Value::Str(key) => Ok(map.contains_key(key)),
            _ => Ok(false),
        },
        other => Err(MatcherError::TypeMismatch(format!(
            "`in` needs a list or map, got {}",
            other.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Add => Ok(Value::Int(a.wrapping_add(b))),
            BinaryOp::Sub => Ok(Value::Int(a.wrapping_sub(b))),
            BinaryOp::Mul => Ok(Value::Int(a.wrapping_mul(b))),
            BinaryOp::Div | BinaryOp::Rem if b == 0 => Err(MatcherError::DivisionByZero),
            // i64::MIN / -1 has no i64 quotient, so it goes through f64
            BinaryOp::Div => match (a.checked_rem(b), a.checked_div(b)) {
                (Some(0), Some(q)) => Ok(Value::Int(q)),
                _ => Ok(Value::Float(a as f64 / b as f64)),
            },
            BinaryOp::Rem => Ok(Value::Int(a.checked_rem(b).unwrap_or(0))),
            _ => Err(MatcherError::TypeMismatch(format!("{:?} is not arithmetic", op))),
        };
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(MatcherError::TypeMismatch(format!(
            "cannot apply {:?} to {} and {}",
            op,
            left.type_name(),
            right.type_name()
        )));
    };
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => Err(MatcherError::DivisionByZero),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Rem => Ok(Value::Float(a % b)),
        _ => Err(MatcherError::TypeMismatch(format!("{:?} is not arithmetic", op))),
    }
}
