//! 静态分析器
//!
//! 只读遍历 AST，产出错误、警告与建议。分析是纯函数：
//! 同一程序重复分析得到相同的报告。

pub mod diagnostic;

pub use diagnostic::{AnalysisReport, Diagnostic, DiagnosticKind, Severity};

use crate::compiler::parser::expr::{format_number, ExprKind, Literal};
use crate::compiler::parser::stmt::{FunctionDecl, Program, Stmt, StmtKind};
use crate::kit::lexer::Coordinate;
use crate::personality::TRAIT_COUNT;
use crate::runtime::stdlib::Builtin;
use std::collections::HashSet;
use tracing::debug;

/// 返回类型标注允许的名称
pub const KNOWN_TYPES: [&str; 8] = ["number", "string", "bool", "array", "map", "null", "any", "fn"];

/// 分析整个程序
pub fn analyze(program: &Program) -> AnalysisReport {
    let mut analyzer = Analyzer::new(program);
    analyzer.run(program);
    debug!(
        target: "nexus::analyzer",
        errors = analyzer.report.errors.len(),
        warnings = analyzer.report.warnings.len(),
        suggestions = analyzer.report.suggestions.len(),
        "Analysis finished"
    );
    analyzer.report
}

struct Analyzer {
    report: AnalysisReport,
    /// 顶层代码中绑定的全部名称
    globals: HashSet<String>,
}

impl Analyzer {
    fn new(program: &Program) -> Self {
        let mut globals = HashSet::new();
        collect_bindings(&program.statements, &mut globals);
        Self {
            report: AnalysisReport::default(),
            globals,
        }
    }

    fn emit(&mut self, kind: DiagnosticKind, message: String, at: Coordinate) {
        self.report
            .push(Diagnostic::new(kind, message, at.line, at.column));
    }

    fn run(&mut self, program: &Program) {
        self.check_personality(program);
        self.check_unreachable(&program.statements);

        let mut functions = Vec::new();
        collect_functions(&program.statements, &mut functions);
        for decl in &functions {
            self.check_function(decl);
        }

        self.check_main_called(program, &functions);
        self.check_infinite_loops(&program.statements);
    }

    // ==================== personality ====================

    fn check_personality(&mut self, program: &Program) {
        // 每个特质最近一次被设置的行号
        let mut previously_set: [Option<usize>; TRAIT_COUNT] = [None; TRAIT_COUNT];

        for block in program.personality_blocks() {
            let mut seen = HashSet::new();
            for entry in &block.entries {
                if !(0.0..=1.0).contains(&entry.value) {
                    self.emit(
                        DiagnosticKind::TraitOutOfRange,
                        format!(
                            "Trait '{}' value {} is outside [0, 1]",
                            entry.key,
                            format_number(entry.value)
                        ),
                        entry.position,
                    );
                }
                if !seen.insert(entry.key) {
                    self.emit(
                        DiagnosticKind::DuplicateTrait,
                        format!(
                            "Trait '{}' appears more than once in the same personality block",
                            entry.key
                        ),
                        entry.position,
                    );
                }
            }

            for key in &seen {
                if let Some(line) = previously_set[key.index()] {
                    let position = block
                        .entries
                        .iter()
                        .find(|e| e.key == *key)
                        .map(|e| e.position)
                        .unwrap_or_default();
                    self.emit(
                        DiagnosticKind::TraitOverridden,
                        format!(
                            "Trait '{}' set by an earlier personality block (line {}) is overridden",
                            key, line
                        ),
                        position,
                    );
                }
            }
            for entry in &block.entries {
                previously_set[entry.key.index()] = Some(entry.position.line);
            }
        }
    }

    // ==================== 控制流 ====================

    /// 每个语句序列中 return/break/continue 之后的第一条语句
    fn check_unreachable(&mut self, stmts: &[Stmt]) {
        if let Some(i) = stmts.iter().position(|s| terminator(s).is_some()) {
            if let (Some(next), Some(keyword)) = (stmts.get(i + 1), terminator(&stmts[i])) {
                self.emit(
                    DiagnosticKind::UnreachableCode,
                    format!("Unreachable code after '{}'", keyword),
                    next.position,
                );
            }
        }

        for stmt in stmts {
            for body in child_blocks(stmt) {
                self.check_unreachable(body);
            }
            if let StmtKind::Function(decl) = &stmt.kind {
                self.check_unreachable(&decl.body.statements);
            }
        }
    }

    /// `while true` 且循环体内没有属于它的 break
    fn check_infinite_loops(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            if let StmtKind::While(w) = &stmt.kind {
                let literal_true = matches!(&*w.condition, ExprKind::Literal(Literal::Bool(true)));
                if literal_true && !contains_break(&w.body.statements) {
                    self.emit(
                        DiagnosticKind::InfiniteLoop,
                        "'while true' loop has no 'break' and only ends by returning or timing out"
                            .to_string(),
                        stmt.position,
                    );
                }
            }
            for body in child_blocks(stmt) {
                self.check_infinite_loops(body);
            }
            if let StmtKind::Function(decl) = &stmt.kind {
                self.check_infinite_loops(&decl.body.statements);
            }
        }
    }

    // ==================== 函数 ====================

    fn check_function(&mut self, decl: &FunctionDecl) {
        let body = &decl.body.statements;

        if body.is_empty() {
            self.emit(
                DiagnosticKind::EmptyFunctionBody,
                format!("Function '{}' has an empty body", decl.name),
                decl.position,
            );
        }

        if let Some(ty) = &decl.return_type {
            if !KNOWN_TYPES.contains(&ty.as_str()) {
                self.emit(
                    DiagnosticKind::UnknownReturnType,
                    format!("Unknown return type '{}' for function '{}'", ty, decl.name),
                    decl.position,
                );
            }
            if ty != "null" && !returns_value(body) {
                self.emit(
                    DiagnosticKind::MissingReturnValue,
                    format!(
                        "Function '{}' declares return type '{}' but never returns a value",
                        decl.name, ty
                    ),
                    decl.position,
                );
            }
        }

        // 参数与函数体内绑定的名称构成局部作用域
        let mut locals: HashSet<String> = decl.params.iter().map(|p| p.name.clone()).collect();
        collect_bindings(body, &mut locals);

        let mut used = HashSet::new();
        let mut unresolved = Vec::new();
        for_each_expr(body, &mut |expr| {
            if let ExprKind::Identifier(id) = expr {
                used.insert(id.name.clone());
                let known = locals.contains(&id.name)
                    || self.globals.contains(&id.name)
                    || Builtin::from_name(&id.name).is_some();
                if !known {
                    unresolved.push((id.name.clone(), id.position));
                }
            }
        });

        for (name, position) in unresolved {
            self.emit(
                DiagnosticKind::UnresolvedIdentifier,
                format!("Unresolved identifier '{}' in function '{}'", name, decl.name),
                position,
            );
        }

        for param in &decl.params {
            if !param.name.starts_with('_') && !used.contains(&param.name) {
                self.emit(
                    DiagnosticKind::UnusedParameter,
                    format!(
                        "Parameter '{}' of function '{}' is never used",
                        param.name, decl.name
                    ),
                    decl.position,
                );
            }
        }
    }

    fn check_main_called(&mut self, program: &Program, functions: &[&FunctionDecl]) {
        let Some(main) = program.statements.iter().find_map(|s| match &s.kind {
            StmtKind::Function(decl) if decl.name == "main" => Some(decl),
            _ => None,
        }) else {
            return;
        };

        let mut called = false;
        let mut find_call = |expr: &ExprKind| {
            if let ExprKind::Call(call) = expr {
                if matches!(&*call.callee, ExprKind::Identifier(id) if id.name == "main") {
                    called = true;
                }
            }
        };
        for_each_expr(&program.statements, &mut find_call);
        for decl in functions {
            for_each_expr(&decl.body.statements, &mut find_call);
        }

        if !called {
            self.emit(
                DiagnosticKind::MainNotCalled,
                "Function 'main' is declared but never called; add 'main()' at the end of the program"
                    .to_string(),
                main.position,
            );
        }
    }
}

// ==================== 遍历辅助 ====================

fn terminator(stmt: &Stmt) -> Option<&'static str> {
    match stmt.kind {
        StmtKind::Return(_) => Some("return"),
        StmtKind::Break => Some("break"),
        StmtKind::Continue => Some("continue"),
        _ => None,
    }
}

/// 语句直接包含的语句序列（不含函数体）
fn child_blocks(stmt: &Stmt) -> Vec<&[Stmt]> {
    match &stmt.kind {
        StmtKind::If(i) => {
            let mut blocks = vec![i.then_branch.statements.as_slice()];
            if let Some(else_branch) = &i.else_branch {
                blocks.push(std::slice::from_ref(else_branch.as_ref()));
            }
            blocks
        }
        StmtKind::While(w) => vec![w.body.statements.as_slice()],
        StmtKind::For(f) => vec![f.body.statements.as_slice()],
        StmtKind::Block(b) => vec![b.statements.as_slice()],
        _ => Vec::new(),
    }
}

/// 语句自身直接持有的表达式
fn direct_exprs(stmt: &Stmt) -> Vec<&ExprKind> {
    match &stmt.kind {
        StmtKind::Expr(e) => vec![&**e],
        StmtKind::Let(l) => vec![&*l.value],
        StmtKind::If(i) => vec![&*i.condition],
        StmtKind::While(w) => vec![&*w.condition],
        StmtKind::For(f) => vec![&*f.iterable],
        StmtKind::Return(r) => r.value.iter().map(|v| &**v).collect(),
        _ => Vec::new(),
    }
}

/// 先序遍历表达式树
fn walk_expr<'a>(expr: &'a ExprKind, f: &mut dyn FnMut(&'a ExprKind)) {
    f(expr);
    match expr {
        ExprKind::Literal(_) | ExprKind::Identifier(_) => {}
        ExprKind::Binary(b) => {
            walk_expr(&b.left, f);
            walk_expr(&b.right, f);
        }
        ExprKind::Unary(u) => walk_expr(&u.operand, f),
        ExprKind::Assign(a) => walk_expr(&a.value, f),
        ExprKind::Call(c) => {
            walk_expr(&c.callee, f);
            for arg in &c.arguments {
                walk_expr(arg, f);
            }
        }
        ExprKind::Array(a) => {
            for element in &a.elements {
                walk_expr(element, f);
            }
        }
        ExprKind::Map(m) => {
            for (_, value) in &m.entries {
                walk_expr(value, f);
            }
        }
        ExprKind::Index(i) => {
            walk_expr(&i.object, f);
            walk_expr(&i.index, f);
        }
    }
}

/// 遍历语句序列中的全部表达式（不进入嵌套函数体）
fn for_each_expr<'a>(stmts: &'a [Stmt], f: &mut dyn FnMut(&'a ExprKind)) {
    for stmt in stmts {
        for expr in direct_exprs(stmt) {
            walk_expr(expr, f);
        }
        for body in child_blocks(stmt) {
            for_each_expr(body, f);
        }
    }
}

/// 收集在该作用域中绑定的名称：let、赋值、for 变量与函数声明
fn collect_bindings(stmts: &[Stmt], names: &mut HashSet<String>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Let(l) => {
                names.insert(l.name.clone());
            }
            StmtKind::Function(decl) => {
                names.insert(decl.name.clone());
            }
            StmtKind::For(f) => {
                names.insert(f.variable.clone());
            }
            _ => {}
        }
        for expr in direct_exprs(stmt) {
            walk_expr(expr, &mut |e| {
                if let ExprKind::Assign(a) = e {
                    names.insert(a.target.name.clone());
                }
            });
        }
        for body in child_blocks(stmt) {
            collect_bindings(body, names);
        }
    }
}

/// 收集全部函数声明，包括嵌套的
fn collect_functions<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a FunctionDecl>) {
    for stmt in stmts {
        if let StmtKind::Function(decl) = &stmt.kind {
            out.push(decl);
            collect_functions(&decl.body.statements, out);
        }
        for body in child_blocks(stmt) {
            collect_functions(body, out);
        }
    }
}

fn returns_value(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(r) => r.value.is_some(),
        _ => child_blocks(stmt).into_iter().any(returns_value),
    })
}

/// 属于当前循环的 break；嵌套循环与函数中的不算
fn contains_break(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::While(_) | StmtKind::For(_) | StmtKind::Function(_) => false,
        _ => child_blocks(stmt).into_iter().any(contains_break),
    })
}
