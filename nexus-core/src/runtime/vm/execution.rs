//! run() 主执行循环

use super::Vm;
use crate::runtime::bytecode::{decode, jump_target, BytecodeProgram, Instruction};
use crate::runtime::error::{RuntimeFault, RuntimeResult};
use crate::runtime::operators;
use crate::runtime::value::{Function, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

/// 执行字节码直到 HALT
pub fn run(vm: &mut Vm<'_>, program: &BytecodeProgram) -> RuntimeResult<()> {
    let code = &program.code;
    let mut ip = program.entry;

    loop {
        let (instruction, next) =
            decode(code, ip).map_err(|e| RuntimeFault::InvalidBytecode(e.to_string()))?;

        #[cfg(feature = "trace_execution")]
        tracing::trace!(
            target: "nexus::vm",
            ip,
            stack = vm.stack.len(),
            "{:?}",
            instruction
        );

        ip = next;
        match instruction {
            Instruction::Halt => return Ok(()),

            // ===== 常量与栈 =====
            Instruction::PushConst(idx) => {
                let value = vm.constant(idx)?;
                vm.push(value)?;
            }
            Instruction::PushNull => vm.push(Value::Null)?,
            Instruction::PushTrue => vm.push(Value::Bool(true))?,
            Instruction::PushFalse => vm.push(Value::Bool(false))?,
            Instruction::Pop => {
                vm.pop()?;
            }

            // ===== 变量 =====
            Instruction::LoadVar(idx) => {
                let value = vm.ctx.lookup(&vm.name(idx)?)?;
                vm.push(value)?;
            }
            Instruction::StoreVar(idx) => {
                let name = vm.name(idx)?;
                let value = vm.stack.last().cloned().ok_or_else(|| {
                    RuntimeFault::InvalidBytecode("operand stack underflow".to_string())
                })?;
                vm.ctx.assign(&name, value);
            }
            Instruction::DefineVar(idx) => {
                let name = vm.name(idx)?;
                let value = vm.pop()?;
                vm.ctx.define(&name, value);
            }

            // ===== 调用 =====
            Instruction::LoadBuiltin(builtin) => vm.push(Value::Builtin(builtin))?,
            Instruction::Call { argc, discard } => {
                if let Some(entry) = vm.call(argc as usize, ip, discard)? {
                    ip = entry;
                }
            }
            Instruction::Return => match vm.return_from_call()? {
                Some(return_ip) => ip = return_ip,
                None => return Ok(()),
            },
            Instruction::MakeFunction {
                name,
                params,
                entry,
            } => {
                let name = vm.name(name)?;
                let params = params
                    .into_iter()
                    .map(|p| vm.name(p))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                vm.push(Value::Function(Rc::new(Function::Compiled {
                    name,
                    params,
                    entry,
                })))?;
            }

            // ===== 跳转 =====
            Instruction::Jump(offset) => {
                // 向后跳即一次循环迭代
                if offset < 0 {
                    vm.ctx.check_budget()?;
                }
                ip = target(code, ip, offset)?;
            }
            Instruction::JumpIfFalse(offset) => {
                if !vm.pop()?.is_truthy() {
                    ip = target(code, ip, offset)?;
                }
            }

            // ===== 运算 =====
            Instruction::BinOp(op) => {
                let b = vm.pop()?;
                let a = vm.pop()?;
                let result = operators::binary(op, &a, &b, vm.ctx.limits())?;
                vm.push(result)?;
            }
            Instruction::UnOp(op) => {
                let v = vm.pop()?;
                vm.push(operators::unary(op, &v)?)?;
            }
            Instruction::Index => {
                let key = vm.pop()?;
                let object = vm.pop()?;
                vm.push(operators::index(&object, &key)?)?;
            }

            // ===== 集合 =====
            Instruction::MakeArray(count) => {
                operators::check_array_len(count, vm.ctx.limits().max_array_len)?;
                let items = vm.pop_n(count)?;
                vm.push(Value::array(items))?;
            }
            Instruction::MakeMap(count) => {
                let flat = vm.pop_n(count.saturating_mul(2))?;
                let mut entries = BTreeMap::new();
                let mut pairs = flat.into_iter();
                while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
                    let key = key.as_str().map(str::to_string).ok_or_else(|| {
                        RuntimeFault::type_error(format!(
                            "map keys are strings, got {}",
                            key.type_name()
                        ))
                    })?;
                    entries.insert(key, value);
                }
                vm.push(Value::map(entries))?;
            }

            Instruction::Extend => {
                let tail = vm.pop()?;
                let head = vm.pop()?;
                let extended = operators::extend(head, tail, vm.ctx.limits().max_array_len)?;
                vm.push(extended)?;
            }

            // ===== for 循环 =====
            Instruction::IterInit => {
                let iterable = vm.pop()?;
                let items = operators::iteration_items(&iterable)?;
                vm.push(Value::array(items))?;
                vm.push(Value::Number(0.0))?;
            }
            Instruction::ForNext(offset) => {
                let cursor = match vm.stack.last() {
                    Some(Value::Number(n)) => *n as usize,
                    _ => {
                        return Err(RuntimeFault::InvalidBytecode(
                            "FOR_NEXT without an iterator".to_string(),
                        ))
                    }
                };
                let next_item = match vm.stack.len().checked_sub(2).map(|i| &vm.stack[i]) {
                    Some(Value::Array(items)) => items.get(cursor).cloned(),
                    _ => {
                        return Err(RuntimeFault::InvalidBytecode(
                            "FOR_NEXT without an iterator".to_string(),
                        ))
                    }
                };
                match next_item {
                    Some(item) => {
                        vm.ctx.check_budget()?;
                        if let Some(top) = vm.stack.last_mut() {
                            *top = Value::Number((cursor + 1) as f64);
                        }
                        vm.push(item)?;
                    }
                    None => {
                        vm.pop_n(2)?;
                        ip = target(code, ip, offset)?;
                    }
                }
            }

            Instruction::Personality(entries) => {
                let mut block = Vec::with_capacity(entries.len());
                for (t, idx) in entries {
                    match vm.constant(idx)? {
                        Value::Number(n) => block.push((t, n)),
                        other => {
                            return Err(RuntimeFault::InvalidBytecode(format!(
                                "trait value must be a number, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                vm.ctx.apply_personality(&block)?;
            }
        }
    }
}

fn target(code: &[u8], next: usize, offset: i16) -> RuntimeResult<usize> {
    jump_target(next, offset)
        .filter(|t| *t <= code.len())
        .ok_or_else(|| RuntimeFault::InvalidBytecode("jump target outside the code stream".to_string()))
}
