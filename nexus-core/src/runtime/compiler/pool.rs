//! 去重常量池
//!
//! 键为类型 + 值，数字按位模式比较，因此 `0` 与 `-0` 是两个条目。
//! 程序中从未被绑定的内置函数名不进入常量池，按编号直接加载。

use crate::compiler::parser::expr::{ExprKind, Literal};
use crate::compiler::parser::stmt::{Block, Program, Stmt, StmtKind};
use crate::runtime::bytecode::Constant;
use crate::runtime::stdlib::Builtin;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Number(u64),
    String(String),
}

#[derive(Debug, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: HashMap<ConstKey, usize>,
    /// 程序中任意位置被 let / fn / 参数 / for / 赋值绑定过的名字
    bound: HashSet<String>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集遍历：按源码顺序登记全部字面量与标识符名
    pub fn collect(program: &Program) -> Self {
        let mut pool = Self::new();
        for stmt in &program.statements {
            bind_stmt(stmt, &mut pool.bound);
        }
        for stmt in &program.statements {
            pool.collect_stmt(stmt);
        }
        pool
    }

    /// 名字在任何作用域都解析到内置函数时返回它
    pub fn builtin_ref(&self, name: &str) -> Option<Builtin> {
        if self.bound.contains(name) {
            return None;
        }
        Builtin::from_name(name)
    }

    pub fn number(&mut self, n: f64) -> usize {
        self.intern(ConstKey::Number(n.to_bits()), || Constant::Number(n))
    }

    pub fn string(&mut self, s: &str) -> usize {
        self.intern(ConstKey::String(s.to_string()), || Constant::String(s.to_string()))
    }

    fn intern(&mut self, key: ConstKey, make: impl FnOnce() -> Constant) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.constants.len();
        self.constants.push(make());
        self.index.insert(key, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn into_constants(self) -> Vec<Constant> {
        self.constants
    }

    fn collect_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.collect_stmt(stmt);
        }
    }

    fn collect_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.collect_expr(expr),
            StmtKind::Let(let_stmt) => {
                self.string(&let_stmt.name);
                self.collect_expr(&let_stmt.value);
            }
            StmtKind::Function(decl) => {
                self.string(&decl.name);
                for param in &decl.params {
                    self.string(&param.name);
                }
                self.collect_block(&decl.body);
            }
            StmtKind::If(if_stmt) => {
                self.collect_expr(&if_stmt.condition);
                self.collect_block(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.collect_stmt(else_branch);
                }
            }
            StmtKind::While(while_stmt) => {
                self.collect_expr(&while_stmt.condition);
                self.collect_block(&while_stmt.body);
            }
            StmtKind::For(for_stmt) => {
                self.collect_expr(&for_stmt.iterable);
                self.string(&for_stmt.variable);
                self.collect_block(&for_stmt.body);
            }
            StmtKind::Block(block) => self.collect_block(block),
            StmtKind::Personality(block) => {
                for entry in &block.entries {
                    self.number(entry.value);
                }
            }
            StmtKind::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.collect_expr(value);
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
        }
    }

    fn collect_expr(&mut self, expr: &ExprKind) {
        match expr {
            ExprKind::Literal(Literal::Number(n)) => {
                self.number(*n);
            }
            ExprKind::Literal(Literal::String(s)) => {
                self.string(s);
            }
            ExprKind::Literal(_) => {}
            ExprKind::Identifier(ident) => {
                if self.builtin_ref(&ident.name).is_none() {
                    self.string(&ident.name);
                }
            }
            ExprKind::Binary(binary) => {
                self.collect_expr(&binary.left);
                self.collect_expr(&binary.right);
            }
            ExprKind::Unary(unary) => self.collect_expr(&unary.operand),
            ExprKind::Assign(assign) => {
                self.collect_expr(&assign.value);
                self.string(&assign.target.name);
            }
            ExprKind::Call(call) => {
                self.collect_expr(&call.callee);
                for arg in &call.arguments {
                    self.collect_expr(arg);
                }
            }
            ExprKind::Array(array) => {
                for element in &array.elements {
                    self.collect_expr(element);
                }
            }
            ExprKind::Map(map) => {
                for (key, value) in &map.entries {
                    self.string(key);
                    self.collect_expr(value);
                }
            }
            ExprKind::Index(index) => {
                self.collect_expr(&index.object);
                self.collect_expr(&index.index);
            }
        }
    }
}

fn bind_block(block: &Block, bound: &mut HashSet<String>) {
    for stmt in &block.statements {
        bind_stmt(stmt, bound);
    }
}

fn bind_stmt(stmt: &Stmt, bound: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::Expr(expr) => bind_expr(expr, bound),
        StmtKind::Let(let_stmt) => {
            bound.insert(let_stmt.name.clone());
            bind_expr(&let_stmt.value, bound);
        }
        StmtKind::Function(decl) => {
            bound.insert(decl.name.clone());
            bound.extend(decl.params.iter().map(|p| p.name.clone()));
            bind_block(&decl.body, bound);
        }
        StmtKind::If(if_stmt) => {
            bind_expr(&if_stmt.condition, bound);
            bind_block(&if_stmt.then_branch, bound);
            if let Some(else_branch) = &if_stmt.else_branch {
                bind_stmt(else_branch, bound);
            }
        }
        StmtKind::While(while_stmt) => {
            bind_expr(&while_stmt.condition, bound);
            bind_block(&while_stmt.body, bound);
        }
        StmtKind::For(for_stmt) => {
            bound.insert(for_stmt.variable.clone());
            bind_expr(&for_stmt.iterable, bound);
            bind_block(&for_stmt.body, bound);
        }
        StmtKind::Block(block) => bind_block(block, bound),
        StmtKind::Return(ret) => {
            if let Some(value) = &ret.value {
                bind_expr(value, bound);
            }
        }
        StmtKind::Personality(_) | StmtKind::Break | StmtKind::Continue => {}
    }
}

/// 赋值可以出现在任意表达式内部
fn bind_expr(expr: &ExprKind, bound: &mut HashSet<String>) {
    match expr {
        ExprKind::Assign(assign) => {
            bound.insert(assign.target.name.clone());
            bind_expr(&assign.value, bound);
        }
        ExprKind::Binary(binary) => {
            bind_expr(&binary.left, bound);
            bind_expr(&binary.right, bound);
        }
        ExprKind::Unary(unary) => bind_expr(&unary.operand, bound),
        ExprKind::Call(call) => {
            bind_expr(&call.callee, bound);
            for arg in &call.arguments {
                bind_expr(arg, bound);
            }
        }
        ExprKind::Array(array) => {
            for element in &array.elements {
                bind_expr(element, bound);
            }
        }
        ExprKind::Map(map) => {
            for (_, value) in &map.entries {
                bind_expr(value, bound);
            }
        }
        ExprKind::Index(index) => {
            bind_expr(&index.object, bound);
            bind_expr(&index.index, bound);
        }
        ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;

    #[test]
    fn test_dedup_by_type_and_value() {
        let mut pool = ConstantPool::new();
        let a = pool.number(1.0);
        let b = pool.string("1");
        assert_ne!(a, b);
        assert_eq!(pool.number(1.0), a);
        assert_eq!(pool.string("1"), b);
        assert_ne!(pool.number(0.0), pool.number(-0.0));
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_collect_in_source_order() {
        let program = parse(tokenize(r#"let x = "a" print(x, "a", 2)"#).unwrap()).unwrap();
        let constants = ConstantPool::collect(&program).into_constants();
        assert_eq!(
            constants,
            vec![
                Constant::String("x".into()),
                Constant::String("a".into()),
                Constant::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_shadowed_builtin_names_are_pooled() {
        let program = parse(tokenize("fn f(len) { return len } print(f(1)) str = 2").unwrap()).unwrap();
        let pool = ConstantPool::collect(&program);
        assert_eq!(pool.builtin_ref("print"), Some(Builtin::Print));
        assert_eq!(pool.builtin_ref("len"), None);
        assert_eq!(pool.builtin_ref("str"), None);
        assert_eq!(pool.builtin_ref("f"), None);

        let constants = pool.into_constants();
        assert!(constants.contains(&Constant::String("len".into())));
        assert!(!constants.contains(&Constant::String("print".into())));
    }
}
