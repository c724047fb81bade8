//! 函数调用与返回

use super::{CallFrame, Vm};
use crate::runtime::error::{RuntimeFault, RuntimeResult};
use crate::runtime::stdlib;
use crate::runtime::value::{Function, Value};

impl Vm<'_> {
    /// 调用栈上 argc 个参数之下的被调用者。
    /// 用户函数返回其入口偏移；内置函数直接把结果压栈并返回 None。
    /// `discard` 为真时返回值被丢弃，不入栈。
    pub(crate) fn call(
        &mut self,
        argc: usize,
        return_ip: usize,
        discard: bool,
    ) -> RuntimeResult<Option<usize>> {
        let args = self.pop_n(argc)?;
        let callee = self.pop()?;

        let function = match callee {
            Value::Builtin(builtin) => {
                let result = stdlib::call(builtin, &args, &mut self.ctx)?;
                if !discard {
                    self.push(result)?;
                }
                return Ok(None);
            }
            Value::Function(function) => function,
            other => return Err(RuntimeFault::NotCallable(other.type_name().to_string())),
        };

        let (name, params, entry) = match &*function {
            Function::Compiled {
                name,
                params,
                entry,
            } => (name, params, *entry),
            Function::Script(decl) => {
                return Err(RuntimeFault::InvalidBytecode(format!(
                    "function '{}' has no compiled body",
                    decl.name
                )))
            }
        };
        if params.len() != args.len() {
            return Err(RuntimeFault::ArityMismatch {
                name: name.clone(),
                expected: params.len().to_string(),
                got: args.len(),
            });
        }

        self.ctx.push_frame()?;
        for (param, arg) in params.iter().zip(args) {
            self.ctx.define(param, arg);
        }
        self.frames.push(CallFrame {
            return_ip,
            base: self.stack.len(),
            discard,
        });
        Ok(Some(entry))
    }

    /// 从当前调用返回：截断到帧基址并压入返回值。
    /// 没有活动帧时返回 None，表示运行结束。
    pub(crate) fn return_from_call(&mut self) -> RuntimeResult<Option<usize>> {
        let value = self.pop()?;
        let Some(frame) = self.frames.pop() else {
            return Ok(None);
        };
        self.stack.truncate(frame.base);
        self.ctx.pop_frame();
        if !frame.discard {
            self.push(value)?;
        }
        Ok(Some(frame.return_ip))
    }
}
