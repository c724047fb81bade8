//! 内置函数
//!
//! 内置函数固定为一张表，不可被程序修改。人格相关的行为都是
//! 单个特质值的纯函数，在每次调用时求值一次。

pub mod services;

pub use services::{
    KnowledgeEntry, KnowledgeFilters, KnowledgeQueryResult, KnowledgeService, ListenOptions,
    NoKnowledge, ServiceError, Services, SilentVoice, SpeakOptions, StaticKnowledge, VoiceService,
};

use super::context::ExecutionContext;
use super::error::{RuntimeFault, RuntimeResult};
use super::operators::check_array_len;
use super::value::Value;
use crate::personality::{Level, PersonalityError, Trait};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Len,
    Range,
    Push,
    Str,
    Type,
    Keys,
    Trait,
    Describe,
    Knowledge,
    Say,
    Listen,
}

/// (名称, 内置函数, 最少参数, 最多参数)；`print` 不限参数个数
static BUILTIN_TABLE: [(&str, Builtin, usize, usize); 12] = [
    ("print", Builtin::Print, 0, usize::MAX),
    ("len", Builtin::Len, 1, 1),
    ("range", Builtin::Range, 1, 2),
    ("push", Builtin::Push, 2, 2),
    ("str", Builtin::Str, 1, 1),
    ("type", Builtin::Type, 1, 1),
    ("keys", Builtin::Keys, 1, 1),
    ("trait", Builtin::Trait, 1, 1),
    ("describe", Builtin::Describe, 1, 1),
    ("knowledge", Builtin::Knowledge, 1, 2),
    ("say", Builtin::Say, 1, 2),
    ("listen", Builtin::Listen, 0, 1),
];

static BY_NAME: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    BUILTIN_TABLE
        .iter()
        .map(|(name, builtin, _, _)| (*name, *builtin))
        .collect()
});

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BY_NAME.get(name).copied()
    }

    /// 字节码中的内置函数编号
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(id: u8) -> Option<Builtin> {
        BUILTIN_TABLE.get(id as usize).map(|entry| entry.1)
    }

    fn entry(self) -> &'static (&'static str, Builtin, usize, usize) {
        &BUILTIN_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    /// 全部内置函数名
    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILTIN_TABLE.iter().map(|(name, _, _, _)| *name)
    }

    fn check_arity(self, got: usize) -> RuntimeResult<()> {
        let (name, _, min, max) = *self.entry();
        if got >= min && got <= max {
            return Ok(());
        }
        let expected = if max == usize::MAX {
            format!("at least {}", min)
        } else if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        Err(RuntimeFault::ArityMismatch {
            name: name.to_string(),
            expected,
            got,
        })
    }
}

/// verbosity 为 high / moderate / low 时默认返回 5 / 3 / 1 条知识
pub fn knowledge_result_limit(verbosity: f64) -> usize {
    match Level::of(verbosity) {
        Level::High => 5,
        Level::Moderate => 3,
        Level::Low => 1,
    }
}

/// 调用内置函数
pub fn call(builtin: Builtin, args: &[Value], ctx: &mut ExecutionContext<'_>) -> RuntimeResult<Value> {
    builtin.check_arity(args.len())?;
    match builtin {
        Builtin::Print => {
            let line = args
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            ctx.write_output(&line);
            ctx.write_output("\n");
            Ok(Value::Null)
        }
        Builtin::Len => match &args[0] {
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::Array(items) => Ok(Value::Number(items.len() as f64)),
            Value::Map(entries) => Ok(Value::Number(entries.len() as f64)),
            other => Err(RuntimeFault::type_error(format!(
                "len() expects a string, array or map, got {}",
                other.type_name()
            ))),
        },
        Builtin::Range => range(args, ctx.limits().max_array_len),
        Builtin::Push => match &args[0] {
            Value::Array(items) => {
                check_array_len(items.len().saturating_add(1), ctx.limits().max_array_len)?;
                let mut next = Vec::with_capacity(items.len() + 1);
                next.extend(items.iter().cloned());
                next.push(args[1].clone());
                Ok(Value::array(next))
            }
            other => Err(RuntimeFault::type_error(format!(
                "push() expects an array, got {}",
                other.type_name()
            ))),
        },
        Builtin::Str => Ok(Value::from(args[0].to_string())),
        Builtin::Type => Ok(Value::from(args[0].type_name())),
        Builtin::Keys => match &args[0] {
            Value::Map(entries) => Ok(Value::array(
                entries.keys().map(|k| Value::from(k.as_str())).collect(),
            )),
            other => Err(RuntimeFault::type_error(format!(
                "keys() expects a map, got {}",
                other.type_name()
            ))),
        },
        Builtin::Trait => {
            let t = trait_arg(&args[0])?;
            Ok(Value::Number(ctx.profile().get(t)))
        }
        Builtin::Describe => {
            let t = trait_arg(&args[0])?;
            Ok(Value::from(ctx.profile().describe(t).as_str()))
        }
        Builtin::Knowledge => knowledge(args, ctx),
        Builtin::Say => say(args, ctx),
        Builtin::Listen => listen(args, ctx),
    }
}

fn integer_arg(name: &str, value: &Value) -> RuntimeResult<i64> {
    value.as_integer().ok_or_else(|| {
        RuntimeFault::type_error(format!(
            "{}() expects integer arguments, got {}",
            name,
            value.type_name()
        ))
    })
}

fn range(args: &[Value], max_array_len: usize) -> RuntimeResult<Value> {
    let (start, end) = match args {
        [end] => (0, integer_arg("range", end)?),
        [start, end, ..] => (integer_arg("range", start)?, integer_arg("range", end)?),
        [] => (0, 0),
    };
    let len = end.saturating_sub(start).max(0) as usize;
    check_array_len(len, max_array_len)?;
    Ok(Value::array(
        (start..end).map(|i| Value::Number(i as f64)).collect(),
    ))
}

fn trait_arg(value: &Value) -> RuntimeResult<Trait> {
    let name = value.as_str().ok_or_else(|| {
        RuntimeFault::type_error(format!(
            "trait names are strings, got {}",
            value.type_name()
        ))
    })?;
    Trait::from_name(name).ok_or_else(|| PersonalityError::unknown_trait(name).into())
}

/// 可选的选项映射；null 等同于缺省
fn options_arg<'v>(
    name: &str,
    value: Option<&'v Value>,
) -> RuntimeResult<Option<&'v BTreeMap<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Map(entries)) => Ok(Some(entries)),
        Some(other) => Err(RuntimeFault::type_error(format!(
            "{}() options must be a map, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn option_number(
    options: Option<&BTreeMap<String, Value>>,
    key: &str,
) -> RuntimeResult<Option<f64>> {
    match options.and_then(|o| o.get(key)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(*n)),
        Some(other) => Err(RuntimeFault::type_error(format!(
            "option '{}' must be a number, got {}",
            key,
            other.type_name()
        ))),
    }
}

fn option_string(
    options: Option<&BTreeMap<String, Value>>,
    key: &str,
) -> RuntimeResult<Option<String>> {
    match options.and_then(|o| o.get(key)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(RuntimeFault::type_error(format!(
            "option '{}' must be a string, got {}",
            key,
            other.type_name()
        ))),
    }
}

fn string_arg<'v>(name: &str, value: &'v Value) -> RuntimeResult<&'v str> {
    value.as_str().ok_or_else(|| {
        RuntimeFault::type_error(format!(
            "{}() expects a string, got {}",
            name,
            value.type_name()
        ))
    })
}

fn service_fault(error: ServiceError) -> RuntimeFault {
    RuntimeFault::Service(error.0)
}

/// knowledge(topic, {limit, min_confidence, verified_only})
fn knowledge(args: &[Value], ctx: &mut ExecutionContext<'_>) -> RuntimeResult<Value> {
    let topic = string_arg("knowledge", &args[0])?;
    let options = options_arg("knowledge", args.get(1))?;

    let limit = match option_number(options, "limit")? {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => n as usize,
        Some(n) => {
            return Err(RuntimeFault::type_error(format!(
                "option 'limit' must be a non-negative integer, got {}",
                n
            )))
        }
        None => knowledge_result_limit(ctx.profile().get(Trait::Verbosity)),
    };
    let verified_only = match options.and_then(|o| o.get("verified_only")) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(RuntimeFault::type_error(format!(
                "option 'verified_only' must be a bool, got {}",
                other.type_name()
            )))
        }
    };
    let filters = KnowledgeFilters {
        limit,
        min_confidence: option_number(options, "min_confidence")?.unwrap_or(0.0),
        verified_only,
    };

    ctx.check_budget()?;
    debug!(target: "nexus::vm", topic, limit = filters.limit, "Knowledge query");
    let results = ctx
        .services()
        .knowledge
        .search(topic, &filters)
        .map_err(service_fault)?;
    ctx.check_budget()?;

    Ok(Value::array(
        results
            .into_iter()
            .take(filters.limit)
            .map(|r| {
                let mut entry = BTreeMap::new();
                entry.insert("title".to_string(), Value::from(r.title));
                entry.insert("summary".to_string(), Value::from(r.summary));
                entry.insert("confidence".to_string(), Value::Number(r.confidence));
                entry.insert("verified".to_string(), Value::Bool(r.verified));
                Value::map(entry)
            })
            .collect(),
    ))
}

/// say(text, {voice, rate})
fn say(args: &[Value], ctx: &mut ExecutionContext<'_>) -> RuntimeResult<Value> {
    let text = args[0].to_string();
    let options = options_arg("say", args.get(1))?;
    let speak = SpeakOptions {
        voice: option_string(options, "voice")?,
        rate: option_number(options, "rate")?,
    };

    ctx.check_budget()?;
    ctx.services()
        .voice
        .speak(&text, &speak)
        .map_err(service_fault)?;
    ctx.check_budget()?;
    Ok(Value::Bool(true))
}

/// listen({prompt, timeout_ms})；超时不超过剩余预算
fn listen(args: &[Value], ctx: &mut ExecutionContext<'_>) -> RuntimeResult<Value> {
    let options = options_arg("listen", args.first())?;
    let remaining = ctx.remaining();
    let timeout = match option_number(options, "timeout_ms")? {
        Some(ms) if ms >= 0.0 => Duration::from_millis(ms as u64).min(remaining),
        Some(ms) => {
            return Err(RuntimeFault::type_error(format!(
                "option 'timeout_ms' must be non-negative, got {}",
                ms
            )))
        }
        None => remaining,
    };
    let listen = ListenOptions {
        prompt: option_string(options, "prompt")?,
        timeout,
    };

    ctx.check_budget()?;
    let heard = ctx
        .services()
        .voice
        .listen(&listen)
        .map_err(service_fault)?;
    ctx.check_budget()?;
    Ok(Value::from(heard))
}
