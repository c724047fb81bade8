//! 单次运行的执行上下文
//!
//! 解释器与 VM 共用：作用域、调用深度、人格快照、时间预算、输出缓冲
//! 以及借用的协作服务。每次运行创建一个，运行结束即丢弃。

use super::error::{RuntimeFault, RuntimeResult};
use super::stdlib::{Builtin, Services};
use super::value::Value;
use crate::personality::{PersonalityProfile, Trait};
use nexus_config::LimitConfig;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 带硬上限的输出缓冲
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: String,
    cap: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            text: String::new(),
            cap,
            truncated: false,
        }
    }

    /// 超出上限的部分在字符边界处截断，之后的写入全部丢弃
    pub fn write(&mut self, s: &str) {
        if self.truncated {
            return;
        }
        let remaining = self.cap.saturating_sub(self.text.len());
        if s.len() <= remaining {
            self.text.push_str(s);
            return;
        }

        let mut cut = remaining;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        warn!(target: "nexus::vm", cap = self.cap, "Output truncated at the byte cap");
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Ready,
    Running,
    Halted,
    Faulted(RuntimeFault),
    TimedOut,
}

/// 一次运行的结果；超时与故障同样保留已产生的输出
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub state: RunState,
    pub output: String,
    pub output_truncated: bool,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Halted
    }

    pub fn fault(&self) -> Option<&RuntimeFault> {
        match &self.state {
            RunState::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn error_category(&self) -> Option<&'static str> {
        match &self.state {
            RunState::Faulted(fault) => Some(fault.category()),
            RunState::TimedOut => Some("timeout"),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.state {
            RunState::Faulted(fault) => Some(fault.to_string()),
            RunState::TimedOut => Some(format!(
                "Execution timed out after {} ms",
                self.elapsed.as_millis()
            )),
            _ => None,
        }
    }
}

type Scope = HashMap<String, Value>;

pub struct ExecutionContext<'a> {
    /// 下标 0 为全局作用域，其后每个活动调用一个
    scopes: Vec<Scope>,
    limits: LimitConfig,
    profile: PersonalityProfile,
    started: Instant,
    output: OutputBuffer,
    services: Services<'a>,
    state: RunState,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(limits: &LimitConfig, profile: PersonalityProfile, services: Services<'a>) -> Self {
        Self {
            scopes: vec![Scope::new()],
            limits: limits.clone(),
            profile,
            started: Instant::now(),
            output: OutputBuffer::new(limits.max_output_bytes),
            services,
            state: RunState::Ready,
        }
    }

    /// Ready → Running，开始计时
    pub fn start(&mut self) {
        self.state = RunState::Running;
        self.started = Instant::now();
        debug!(
            target: "nexus::vm",
            timeout_ms = self.limits.execution_timeout_ms,
            max_call_depth = self.limits.max_call_depth,
            "Run started"
        );
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn limits(&self) -> &LimitConfig {
        &self.limits
    }

    pub fn profile(&self) -> &PersonalityProfile {
        &self.profile
    }

    pub fn services(&self) -> Services<'a> {
        self.services
    }

    pub fn write_output(&mut self, s: &str) {
        self.output.write(s);
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limits.execution_timeout().saturating_sub(self.elapsed())
    }

    /// 循环迭代、函数调用与服务调用前后检查
    pub fn check_budget(&self) -> RuntimeResult<()> {
        if self.elapsed() > self.limits.execution_timeout() {
            Err(RuntimeFault::Timeout(self.limits.execution_timeout_ms))
        } else {
            Ok(())
        }
    }

    /// 在第一条语句执行前应用 personality 块
    pub fn apply_personality(&mut self, entries: &[(Trait, f64)]) -> RuntimeResult<()> {
        self.profile = self.profile.apply_block(entries)?;
        debug!(target: "nexus::vm", traits = entries.len(), "Applied personality block");
        Ok(())
    }

    // ==================== 变量 ====================

    /// 当前作用域 → 全局 → 内置函数
    pub fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        let current = self.scopes.last().and_then(|scope| scope.get(name));
        let global = || self.scopes.first().and_then(|scope| scope.get(name));
        if let Some(value) = current.or_else(global) {
            return Ok(value.clone());
        }
        Builtin::from_name(name)
            .map(Value::Builtin)
            .ok_or_else(|| RuntimeFault::UndefinedVariable(name.to_string()))
    }

    /// 在当前作用域声明
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// 更新当前作用域，其次全局，否则在当前作用域声明
    pub fn assign(&mut self, name: &str, value: Value) {
        let last = self.scopes.len() - 1;
        let target = if self.scopes[last].contains_key(name) {
            last
        } else if self.scopes[0].contains_key(name) {
            0
        } else {
            last
        };
        self.scopes[target].insert(name.to_string(), value);
    }

    // ==================== 调用 ====================

    pub fn call_depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// 进入调用：检查预算与深度，压入新作用域
    pub fn push_frame(&mut self) -> RuntimeResult<()> {
        self.check_budget()?;
        if self.call_depth() >= self.limits.max_call_depth {
            return Err(RuntimeFault::StackOverflow(self.limits.max_call_depth));
        }
        self.scopes.push(Scope::new());
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// 结束运行，生成结果
    pub fn finish(mut self, result: RuntimeResult<()>) -> ExecutionOutcome {
        let elapsed = self.elapsed();
        self.state = match result {
            Ok(()) => RunState::Halted,
            Err(RuntimeFault::Timeout(ms)) => {
                warn!(target: "nexus::vm", timeout_ms = ms, "Run timed out");
                RunState::TimedOut
            }
            Err(fault) => {
                warn!(target: "nexus::vm", category = fault.category(), "Run faulted: {}", fault);
                RunState::Faulted(fault)
            }
        };
        info!(
            target: "nexus::vm",
            elapsed_ms = elapsed.as_millis() as u64,
            output_bytes = self.output.as_str().len(),
            "Run finished"
        );

        let output_truncated = self.output.is_truncated();
        ExecutionOutcome {
            state: self.state,
            output: self.output.into_string(),
            output_truncated,
            elapsed,
        }
    }
}
