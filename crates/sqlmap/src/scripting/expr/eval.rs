use super::ExpressionScope;
use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::error::{MapperError, MapperResult};
use crate::reflection::as_any;
use crate::value::Value;
use std::cmp::Ordering;

/// Boolean coercion: booleans as-is, numbers when non-zero, anything else
/// when non-null.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        _ => true,
    }
}

pub(crate) fn eval(expr: &Expr, scope: &dyn ExpressionScope) -> MapperResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => scope.lookup(name),
        Expr::Property(target, name) => {
            let target = eval(target, scope)?;
            property(&target, name, scope)
        }
        Expr::Index(target, index) => {
            let target = eval(target, scope)?;
            let index = eval(index, scope)?;
            element(&target, &index)
        }
        Expr::Call(target, method, args) => {
            let target = eval(target, scope)?;
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<MapperResult<Vec<_>>>()?;
            call(&target, method, &args)
        }
        Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!truthy(&eval(operand, scope)?))),
        Expr::Unary(UnaryOp::Neg, operand) => match eval(operand, scope)? {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| MapperError::binding("integer overflow")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(MapperError::binding(format!(
                "cannot negate a {} value",
                other.type_label()
            ))),
        },
        Expr::Binary(BinaryOp::And, left, right) => {
            Ok(Value::Bool(truthy(&eval(left, scope)?) && truthy(&eval(right, scope)?)))
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            Ok(Value::Bool(truthy(&eval(left, scope)?) || truthy(&eval(right, scope)?)))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            binary(*op, &left, &right)
        }
    }
}

fn property(target: &Value, name: &str, scope: &dyn ExpressionScope) -> MapperResult<Value> {
    if let Some(expanded) = target.expand_json() {
        return property(&expanded, name, scope);
    }
    match target {
        Value::Null => Ok(Value::Null),
        Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
        Value::Bean(bean) => {
            let reflector = scope.reflector_factory().find_for_bean(bean.as_ref());
            reflector.get_getter(name)?.get(as_any(bean.as_ref()))
        }
        Value::List(items) if name == "size" || name == "length" => Ok(Value::Int(items.len() as i64)),
        other => Err(MapperError::binding(format!(
            "There is no property '{}' on a value of type '{}'",
            name,
            other.type_label()
        ))),
    }
}

fn element(target: &Value, index: &Value) -> MapperResult<Value> {
    if let Some(expanded) = target.expand_json() {
        return element(&expanded, index);
    }
    match (target, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .ok_or_else(|| {
                MapperError::binding(format!("index {i} out of range (size {})", items.len()))
            }),
        (Value::Map(map), key) => Ok(map.get(&key.to_string()).cloned().unwrap_or_default()),
        (target, index) => Err(MapperError::binding(format!(
            "cannot index a {} value with a {} value",
            target.type_label(),
            index.type_label()
        ))),
    }
}

fn len(target: &Value) -> Option<usize> {
    match target {
        Value::Text(s) => Some(s.chars().count()),
        Value::Bytes(b) => Some(b.len()),
        Value::List(l) => Some(l.len()),
        Value::Map(m) => Some(m.len()),
        Value::Json(serde_json::Value::Array(a)) => Some(a.len()),
        Value::Json(serde_json::Value::Object(o)) => Some(o.len()),
        _ => None,
    }
}

fn call(target: &Value, method: &str, args: &[Value]) -> MapperResult<Value> {
    if target.is_null() {
        return Err(MapperError::binding(format!(
            "source is null for method '{method}'"
        )));
    }
    let unsupported = || {
        MapperError::binding(format!(
            "method '{}' with {} argument(s) is not available on a {} value",
            method,
            args.len(),
            target.type_label()
        ))
    };

    match (method, args) {
        ("size" | "length", []) => len(target).map(|n| Value::Int(n as i64)).ok_or_else(unsupported),
        ("isEmpty", []) => len(target).map(|n| Value::Bool(n == 0)).ok_or_else(unsupported),
        ("trim", []) => text(target).map(|s| Value::from(s.trim())).ok_or_else(unsupported),
        ("toUpperCase", []) => text(target)
            .map(|s| Value::Text(s.to_uppercase()))
            .ok_or_else(unsupported),
        ("toLowerCase", []) => text(target)
            .map(|s| Value::Text(s.to_lowercase()))
            .ok_or_else(unsupported),
        ("toString", []) => Ok(Value::Text(target.to_string())),
        ("equals", [other]) => Ok(Value::Bool(equals(target, other))),
        ("startsWith", [Value::Text(prefix)]) => text(target)
            .map(|s| Value::Bool(s.starts_with(prefix.as_str())))
            .ok_or_else(unsupported),
        ("endsWith", [Value::Text(suffix)]) => text(target)
            .map(|s| Value::Bool(s.ends_with(suffix.as_str())))
            .ok_or_else(unsupported),
        ("contains", [needle]) => match (target, needle) {
            (Value::Text(s), Value::Text(n)) => Ok(Value::Bool(s.contains(n.as_str()))),
            (Value::List(items), needle) => Ok(Value::Bool(items.iter().any(|i| equals(i, needle)))),
            _ => Err(unsupported()),
        },
        ("containsKey", [key]) => match target {
            Value::Map(map) => Ok(Value::Bool(map.contains_key(&key.to_string()))),
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}

fn text(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Equality with numeric coercion of numeric text.
pub(crate) fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Text(s), n @ (Value::Int(_) | Value::Float(_)))
        | (n @ (Value::Int(_) | Value::Float(_)), Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .zip(n.as_f64())
            .is_some_and(|(a, b)| a == b),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> MapperResult<Option<Ordering>> {
    Ok(match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => {
                return Err(MapperError::binding(format!(
                    "cannot compare a {} value with a {} value",
                    a.type_label(),
                    b.type_label()
                )));
            }
        },
    })
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> MapperResult<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(left, right))),
        BinaryOp::Lt => Ok(Value::Bool(compare(left, right)? == Some(Ordering::Less))),
        BinaryOp::Le => Ok(Value::Bool(matches!(
            compare(left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOp::Gt => Ok(Value::Bool(compare(left, right)? == Some(Ordering::Greater))),
        BinaryOp::Ge => Ok(Value::Bool(matches!(
            compare(left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        BinaryOp::Add if matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)) => {
            Ok(Value::Text(format!("{left}{right}")))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, left, right)
        }
        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(match op {
            BinaryOp::And => truthy(left) && truthy(right),
            _ => truthy(left) || truthy(right),
        })),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> MapperResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
            return Err(MapperError::binding("division by zero"));
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => a.checked_div(b),
            _ => a.checked_rem(b),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| MapperError::binding("integer overflow"));
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(MapperError::binding(format!(
            "arithmetic is not defined for {} and {} values",
            left.type_label(),
            right.type_label()
        )));
    };
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    }))
}
