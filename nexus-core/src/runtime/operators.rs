//! 运算符实现
//!
//! 解释器与 VM 共用同一组函数，保证两种模式的结果一致。
//! `&&` 与 `||` 在调用方短路求值，不经过这里。

use super::error::{RuntimeFault, RuntimeResult};
use super::value::Value;
use crate::compiler::parser::expr::{BinaryOp, UnaryOp};
use nexus_config::LimitConfig;
use std::rc::Rc;

/// 二元运算；拼接与重复的结果受字符串与数组长度上限约束
pub fn binary(op: BinaryOp, a: &Value, b: &Value, limits: &LimitConfig) -> RuntimeResult<Value> {
    match op {
        BinaryOp::Add => add_values(a, b, limits),
        BinaryOp::Sub => numeric(op, a, b, |x, y| Ok(x - y)),
        BinaryOp::Mul => mul_values(a, b, limits.max_string_bytes),
        BinaryOp::Div => numeric(op, a, b, |x, y| {
            if y == 0.0 {
                Err(RuntimeFault::DivisionByZero)
            } else {
                Ok(x / y)
            }
        }),
        BinaryOp::Mod => numeric(op, a, b, |x, y| {
            if y == 0.0 {
                Err(RuntimeFault::DivisionByZero)
            } else {
                Ok(x % y)
            }
        }),
        BinaryOp::Pow => numeric(op, a, b, |x, y| Ok(x.powf(y))),
        BinaryOp::Equal => Ok(Value::Bool(a == b)),
        BinaryOp::NotEqual => Ok(Value::Bool(a != b)),
        BinaryOp::Less => compare(op, a, b).map(|o| Value::Bool(o.is_lt())),
        BinaryOp::LessEqual => compare(op, a, b).map(|o| Value::Bool(o.is_le())),
        BinaryOp::Greater => compare(op, a, b).map(|o| Value::Bool(o.is_gt())),
        BinaryOp::GreaterEqual => compare(op, a, b).map(|o| Value::Bool(o.is_ge())),
        BinaryOp::And | BinaryOp::Or => Err(RuntimeFault::InvalidBytecode(format!(
            "'{}' must be compiled as a jump",
            op.symbol()
        ))),
    }
}

pub fn unary(op: UnaryOp, v: &Value) -> RuntimeResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
        UnaryOp::Negate => match v {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(RuntimeFault::type_error(format!(
                "cannot negate a value of type {}",
                other.type_name()
            ))),
        },
    }
}

fn operand_error(op: BinaryOp, a: &Value, b: &Value) -> RuntimeFault {
    RuntimeFault::type_error(format!(
        "unsupported operand types for '{}': {} and {}",
        op.symbol(),
        a.type_name(),
        b.type_name()
    ))
}

fn numeric(
    op: BinaryOp,
    a: &Value,
    b: &Value,
    f: impl FnOnce(f64, f64) -> RuntimeResult<f64>,
) -> RuntimeResult<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => f(*x, *y).map(Value::Number),
        _ => Err(operand_error(op, a, b)),
    }
}

fn check_string_len(len: usize, max_string_bytes: usize) -> RuntimeResult<()> {
    if len > max_string_bytes {
        Err(RuntimeFault::LimitExceeded(format!(
            "string of {} bytes exceeds the {} byte limit",
            len, max_string_bytes
        )))
    } else {
        Ok(())
    }
}

/// 数组元素个数上限
pub fn check_array_len(len: usize, max_array_len: usize) -> RuntimeResult<()> {
    if len > max_array_len {
        Err(RuntimeFault::LimitExceeded(format!(
            "array of {} elements exceeds the {} element limit",
            len, max_array_len
        )))
    } else {
        Ok(())
    }
}

/// 加法：数字相加、任一侧为字符串时拼接、数组连接
fn add_values(a: &Value, b: &Value, limits: &LimitConfig) -> RuntimeResult<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x + y)),
        (Value::String(_), _) | (_, Value::String(_)) => {
            let concatenated = format!("{}{}", a, b);
            check_string_len(concatenated.len(), limits.max_string_bytes)?;
            Ok(Value::from(concatenated))
        }
        (Value::Array(x), Value::Array(y)) => {
            check_array_len(x.len().saturating_add(y.len()), limits.max_array_len)?;
            let mut items = Vec::with_capacity(x.len() + y.len());
            items.extend(x.iter().cloned());
            items.extend(y.iter().cloned());
            Ok(Value::Array(Rc::new(items)))
        }
        _ => Err(operand_error(BinaryOp::Add, a, b)),
    }
}

/// 把分段构造的集合字面量接到前一段之后：数组追加，映射合并（后出现的键覆盖）
pub fn extend(head: Value, tail: Value, max_array_len: usize) -> RuntimeResult<Value> {
    match (head, tail) {
        (Value::Array(head), Value::Array(tail)) => {
            check_array_len(head.len().saturating_add(tail.len()), max_array_len)?;
            let mut items = Rc::unwrap_or_clone(head);
            items.extend(tail.iter().cloned());
            Ok(Value::Array(Rc::new(items)))
        }
        (Value::Map(head), Value::Map(tail)) => {
            let mut entries = Rc::unwrap_or_clone(head);
            entries.extend(tail.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(Value::Map(Rc::new(entries)))
        }
        (head, tail) => Err(RuntimeFault::InvalidBytecode(format!(
            "cannot extend {} with {}",
            head.type_name(),
            tail.type_name()
        ))),
    }
}

/// 乘法：数字相乘，或 `string * n` 重复
fn mul_values(a: &Value, b: &Value, max_string_bytes: usize) -> RuntimeResult<Value> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x * y)),
        (Value::String(s), n @ Value::Number(_)) | (n @ Value::Number(_), Value::String(s)) => {
            let count = n
                .as_integer()
                .filter(|c| *c >= 0)
                .ok_or_else(|| {
                    RuntimeFault::type_error("string repetition count must be a non-negative integer")
                })? as usize;
            check_string_len(s.len().saturating_mul(count), max_string_bytes)?;
            Ok(Value::from(s.repeat(count)))
        }
        _ => Err(operand_error(BinaryOp::Mul, a, b)),
    }
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> RuntimeResult<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| RuntimeFault::type_error("cannot compare NaN")),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(operand_error(op, a, b)),
    }
}

/// 索引：数组与字符串按整数下标，映射按字符串键（缺失的键得到 null）
pub fn index(object: &Value, key: &Value) -> RuntimeResult<Value> {
    match object {
        Value::Array(items) => {
            let i = checked_index(key, items.len())?;
            Ok(items[i].clone())
        }
        Value::String(s) => {
            let len = s.chars().count();
            let i = checked_index(key, len)?;
            Ok(s.chars()
                .nth(i)
                .map(|c| Value::from(c.to_string()))
                .unwrap_or(Value::Null))
        }
        Value::Map(entries) => match key {
            Value::String(k) => Ok(entries.get(&**k).cloned().unwrap_or(Value::Null)),
            other => Err(RuntimeFault::type_error(format!(
                "map keys are strings, got {}",
                other.type_name()
            ))),
        },
        other => Err(RuntimeFault::type_error(format!(
            "cannot index a value of type {}",
            other.type_name()
        ))),
    }
}

/// `for` 循环的元素序列：数组元素、字符串字符、映射的有序键
pub fn iteration_items(value: &Value) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.as_ref().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Map(entries) => Ok(entries.keys().map(|k| Value::from(k.as_str())).collect()),
        other => Err(RuntimeFault::type_error(format!(
            "cannot iterate over a value of type {}",
            other.type_name()
        ))),
    }
}

fn checked_index(key: &Value, len: usize) -> RuntimeResult<usize> {
    let index = key.as_integer().ok_or_else(|| {
        RuntimeFault::type_error(format!("index must be an integer, got {}", key.type_name()))
    })?;
    if index < 0 || index as usize >= len {
        return Err(RuntimeFault::IndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}
