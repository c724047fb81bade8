use super::error::{ErrorLocation, ParseResult, ParserError, ParserErrorKind};
use super::expr::{
    ArrayLiteral, Assign, Binary, Call, Expr, ExprKind, Identifier, Index, Literal, MapLiteral,
    Unary, UnaryOp,
};
use super::stmt::{
    Block, ForStmt, FunctionDecl, IfStmt, LetStmt, Param, PersonalityBlock, PersonalityEntry,
    Program, ReturnStmt, Stmt, StmtKind, WhileStmt,
};
use super::utils::{binary_op, get_associativity, get_precedence};
use crate::compiler::lexer::{NexusToken, NexusTokenKind};
use crate::kit::lexer::Coordinate;
use crate::personality::Trait;
use std::sync::Arc;
use tracing::debug;

/// 默认嵌套上限，与 `LimitConfig::max_nesting_depth` 的默认值一致
pub const DEFAULT_MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<NexusToken>,
    current: usize,
    max_nesting: usize,
    /// 当前嵌套层数（块与表达式共同计数）
    depth: usize,
    /// 0 表示顶层
    block_depth: usize,
    /// 函数体会重置为 0
    loop_depth: usize,
}

/// 解析 token 序列
pub fn parse(tokens: Vec<NexusToken>) -> ParseResult<Program> {
    Parser::new(tokens).parse()
}

impl Parser {
    pub fn new(tokens: Vec<NexusToken>) -> Self {
        Self {
            tokens,
            current: 0,
            max_nesting: DEFAULT_MAX_NESTING,
            depth: 0,
            block_depth: 0,
            loop_depth: 0,
        }
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// 解析整个程序
    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            // 跳过分号（空语句）
            if self.match_token(NexusTokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        debug!(target: "nexus::parser", statements = statements.len(), "Parsed program");
        Ok(Program { statements })
    }

    // ==================== token 游标 ====================

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&NexusToken> {
        self.tokens.get(self.current)
    }

    fn peek_kind(&self) -> Option<NexusTokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// 消费当前token并读取下一个
    fn consume(&mut self) {
        if self.current < self.tokens.len() {
            self.current += 1;
        }
    }

    fn check(&self, kind: NexusTokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn match_token(&mut self, kind: NexusTokenKind) -> bool {
        if self.check(kind) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn current_location(&self) -> ErrorLocation {
        match self.peek() {
            Some(token) => ErrorLocation::At(token.start().coordinate()),
            None => ErrorLocation::Eof,
        }
    }

    /// 当前 token 的坐标；到达末尾时取最后一个 token
    fn current_coordinate(&self) -> Coordinate {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.start().coordinate())
            .unwrap_or_default()
    }

    /// 获取当前token的文本表示
    fn current_token_text(&self) -> String {
        match self.peek() {
            Some(token) => match token.kind {
                NexusTokenKind::Identifier | NexusTokenKind::LiteralNumber => {
                    format!("'{}'", token.text())
                }
                NexusTokenKind::LiteralString => format!("string \"{}\"", token.text()),
                kind => kind.describe().to_string(),
            },
            None => "EOF".to_string(),
        }
    }

    /// 创建带有当前位置的错误
    fn error_here(&self, kind: ParserErrorKind) -> ParserError {
        ParserError {
            kind,
            location: self.current_location(),
        }
    }

    /// 期望并消费指定类型的token，否则返回错误
    fn expect(&mut self, kind: NexusTokenKind) -> ParseResult<()> {
        if self.match_token(kind) {
            Ok(())
        } else if self.is_at_end() {
            Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput))
        } else {
            Err(self.error_here(ParserErrorKind::UnexpectedToken {
                found: self.current_token_text(),
                expected: vec![kind.describe().to_string()],
            }))
        }
    }

    /// 期望闭合符号，缺失时报告专门的错误类型
    fn expect_closing(&mut self, kind: NexusTokenKind, missing: ParserErrorKind) -> ParseResult<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.error_here(missing))
        }
    }

    /// 期望一个标识符，返回其名称
    fn expect_identifier(&mut self) -> ParseResult<String> {
        let token = self
            .peek()
            .ok_or_else(|| ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput))?;

        if token.kind == NexusTokenKind::Identifier {
            let name = token.text().to_string();
            self.consume();
            Ok(name)
        } else {
            Err(self.error_here(ParserErrorKind::ExpectedIdentifier {
                found: self.current_token_text(),
            }))
        }
    }

    /// 类型标注：标识符，或与关键字同名的 `null` / `fn`
    fn expect_type_name(&mut self) -> ParseResult<String> {
        let keyword = match self.peek_kind() {
            Some(NexusTokenKind::Null) => "null",
            Some(NexusTokenKind::Fn) => "fn",
            _ => return self.expect_identifier(),
        };
        self.consume();
        Ok(keyword.to_string())
    }

    /// 进入一层嵌套
    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_nesting {
            return Err(self.error_here(ParserErrorKind::NestingTooDeep(self.max_nesting)));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ==================== 语句 ====================

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let position = self.current_coordinate();
        let kind = match self.peek_kind() {
            Some(NexusTokenKind::Fn) => self.parse_function()?,
            Some(NexusTokenKind::Let) => self.parse_let()?,
            Some(NexusTokenKind::If) => StmtKind::If(self.parse_if_statement()?),
            Some(NexusTokenKind::While) => self.parse_while_loop()?,
            Some(NexusTokenKind::For) => self.parse_for_loop()?,
            Some(NexusTokenKind::Return) => self.parse_return_statement()?,
            Some(NexusTokenKind::Break) => {
                if self.loop_depth == 0 {
                    return Err(self.error_here(ParserErrorKind::BreakOutsideLoop));
                }
                self.consume(); // 消费 'break'
                StmtKind::Break
            }
            Some(NexusTokenKind::Continue) => {
                if self.loop_depth == 0 {
                    return Err(self.error_here(ParserErrorKind::ContinueOutsideLoop));
                }
                self.consume(); // 消费 'continue'
                StmtKind::Continue
            }
            Some(NexusTokenKind::Personality) => self.parse_personality()?,
            Some(NexusTokenKind::LeftCurlyBrace) => StmtKind::Block(self.parse_block()?),
            Some(_) => StmtKind::Expr(self.parse_expression(0)?),
            None => return Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput)),
        };

        // 消费可选的分号
        self.match_token(NexusTokenKind::Semicolon);
        Ok(Stmt { kind, position })
    }

    /// 解析代码块
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect(NexusTokenKind::LeftCurlyBrace)?;
        self.enter()?;
        self.block_depth += 1;

        let mut statements = Vec::new();
        while !self.is_at_end() && !self.check(NexusTokenKind::RightCurlyBrace) {
            if self.match_token(NexusTokenKind::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        self.expect_closing(NexusTokenKind::RightCurlyBrace, ParserErrorKind::MissingRightCurly)?;
        self.block_depth -= 1;
        self.leave();
        Ok(Block { statements })
    }

    /// fn name(a, b: number) -> string { ... }
    fn parse_function(&mut self) -> ParseResult<StmtKind> {
        let position = self.current_coordinate();
        self.consume(); // 消费 'fn'
        let name = self.expect_identifier()?;

        self.expect(NexusTokenKind::LeftParenthesis)?;
        let mut params = Vec::new();
        while !self.check(NexusTokenKind::RightParenthesis) {
            let param_name = self.expect_identifier()?;
            let type_annotation = if self.match_token(NexusTokenKind::Colon) {
                Some(self.expect_type_name()?)
            } else {
                None
            };
            params.push(Param {
                name: param_name,
                type_annotation,
            });
            if !self.match_token(NexusTokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(NexusTokenKind::RightParenthesis, ParserErrorKind::MissingRightParen)?;

        let return_type = if self.match_token(NexusTokenKind::Arrow) {
            Some(self.expect_type_name()?)
        } else {
            None
        };

        // 函数体内 break/continue 不能跳出到外层循环
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block();
        self.loop_depth = saved_loop_depth;

        Ok(StmtKind::Function(Arc::new(FunctionDecl {
            name,
            params,
            return_type,
            body: body?,
            position,
        })))
    }

    fn parse_let(&mut self) -> ParseResult<StmtKind> {
        self.consume(); // 消费 'let'
        let name = self.expect_identifier()?;
        self.expect(NexusTokenKind::Equal)?;
        let value = self.parse_expression(0)?;
        Ok(StmtKind::Let(LetStmt { name, value }))
    }

    fn parse_if_statement(&mut self) -> ParseResult<IfStmt> {
        self.consume(); // 消费 'if'
        let condition = self.parse_expression(0)?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.match_token(NexusTokenKind::Else) {
            let position = self.current_coordinate();
            let kind = if self.check(NexusTokenKind::If) {
                self.enter()?;
                let nested = self.parse_if_statement();
                self.leave();
                StmtKind::If(nested?)
            } else {
                StmtKind::Block(self.parse_block()?)
            };
            Some(Box::new(Stmt { kind, position }))
        } else {
            None
        };

        Ok(IfStmt {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// 解析循环体，维护循环深度
    fn parse_loop_body(&mut self) -> ParseResult<Block> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    fn parse_while_loop(&mut self) -> ParseResult<StmtKind> {
        self.consume(); // 消费 'while'
        let condition = self.parse_expression(0)?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::While(WhileStmt { condition, body }))
    }

    fn parse_for_loop(&mut self) -> ParseResult<StmtKind> {
        self.consume(); // 消费 'for'
        let variable = self.expect_identifier()?;
        self.expect(NexusTokenKind::In)?;
        let iterable = self.parse_expression(0)?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::For(ForStmt {
            variable,
            iterable,
            body,
        }))
    }

    /// `return` 只在同一行有表达式时才带返回值
    fn parse_return_statement(&mut self) -> ParseResult<StmtKind> {
        let line = self.current_coordinate().line;
        self.consume(); // 消费 'return'

        let has_value = self
            .peek()
            .map(|t| t.kind.starts_expression() && t.start().line == line)
            .unwrap_or(false);
        let value = if has_value {
            Some(self.parse_expression(0)?)
        } else {
            None
        };
        Ok(StmtKind::Return(ReturnStmt { value }))
    }

    /// personality { curiosity: 0.9, humor: 0.2 }
    fn parse_personality(&mut self) -> ParseResult<StmtKind> {
        if self.block_depth > 0 {
            return Err(self.error_here(ParserErrorKind::PersonalityNotTopLevel));
        }
        self.consume(); // 消费 'personality'
        self.expect(NexusTokenKind::LeftCurlyBrace)?;

        let mut entries = Vec::new();
        while !self.check(NexusTokenKind::RightCurlyBrace) {
            let position = self.current_coordinate();
            let name = self.expect_identifier()?;
            let key = Trait::from_name(&name)
                .ok_or_else(|| ParserError::here(ParserErrorKind::UnknownTrait(name), position))?;
            self.expect(NexusTokenKind::Colon)?;
            let value = self.parse_trait_value()?;
            entries.push(PersonalityEntry {
                key,
                value,
                position,
            });
            if !self.match_token(NexusTokenKind::Comma) {
                break;
            }
        }

        self.expect_closing(NexusTokenKind::RightCurlyBrace, ParserErrorKind::MissingRightCurly)?;
        Ok(StmtKind::Personality(PersonalityBlock { entries }))
    }

    /// 可带负号的数字字面量
    fn parse_trait_value(&mut self) -> ParseResult<f64> {
        let negative = self.match_token(NexusTokenKind::Minus);
        match self.peek() {
            Some(token) if token.kind == NexusTokenKind::LiteralNumber => {
                let value = self.parse_number_text()?;
                Ok(if negative { -value } else { value })
            }
            Some(_) => Err(self.error_here(ParserErrorKind::ExpectedTraitValue {
                found: self.current_token_text(),
            })),
            None => Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput)),
        }
    }

    // ==================== 表达式 ====================

    /// 解析表达式（Pratt解析核心）
    fn parse_expression(&mut self, min_precedence: i32) -> ParseResult<Expr> {
        self.enter()?;
        let result = self.parse_binary(min_precedence);
        self.leave();
        result
    }

    fn parse_binary(&mut self, min_precedence: i32) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.peek_kind() {
            let op_precedence = get_precedence(op);

            // 优先级不足，停止解析
            if op_precedence <= min_precedence {
                break;
            }

            let op_position = self.current_coordinate();
            self.consume();

            // 解析右操作数（考虑结合性）
            let next_precedence = if get_associativity(op) {
                op_precedence
            } else {
                op_precedence - 1
            };
            let right = self.parse_expression(next_precedence)?;

            left = if op == NexusTokenKind::Equal {
                match *left {
                    ExprKind::Identifier(target) => {
                        Box::new(ExprKind::Assign(Assign { target, value: right }))
                    }
                    _ => {
                        return Err(ParserError::here(
                            ParserErrorKind::InvalidAssignmentTarget,
                            op_position,
                        ))
                    }
                }
            } else {
                match binary_op(op) {
                    Some(op) => Box::new(ExprKind::Binary(Binary { left, op, right })),
                    None => break,
                }
            };
        }

        Ok(left)
    }

    /// 解析一元表达式
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_kind() {
            Some(NexusTokenKind::Minus) => UnaryOp::Negate,
            Some(NexusTokenKind::Exclamation) => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.consume();

        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        Ok(Box::new(ExprKind::Unary(Unary {
            op,
            operand: operand?,
        })))
    }

    /// 解析基础表达式（带后缀处理）
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let position = self.current_coordinate();
        let base_expr = self.parse_primary_base()?;
        self.parse_postfix(base_expr, position)
    }

    /// 解析基础表达式核心（无后缀）
    fn parse_primary_base(&mut self) -> ParseResult<Expr> {
        let token = self
            .peek()
            .ok_or_else(|| ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput))?;

        match token.kind {
            NexusTokenKind::LiteralNumber => {
                let value = self.parse_number_text()?;
                Ok(Box::new(ExprKind::Literal(Literal::Number(value))))
            }
            NexusTokenKind::LiteralString => {
                let value = token.text().to_string();
                self.consume();
                Ok(Box::new(ExprKind::Literal(Literal::String(value))))
            }
            NexusTokenKind::True => {
                self.consume();
                Ok(Box::new(ExprKind::Literal(Literal::Bool(true))))
            }
            NexusTokenKind::False => {
                self.consume();
                Ok(Box::new(ExprKind::Literal(Literal::Bool(false))))
            }
            NexusTokenKind::Null => {
                self.consume();
                Ok(Box::new(ExprKind::Literal(Literal::Null)))
            }
            NexusTokenKind::Identifier => {
                let identifier = Identifier {
                    name: token.text().to_string(),
                    position: token.start().coordinate(),
                };
                self.consume();
                Ok(Box::new(ExprKind::Identifier(identifier)))
            }
            NexusTokenKind::LeftParenthesis => self.parse_parenthesized(),
            NexusTokenKind::LeftSquareBracket => self.parse_list(),
            NexusTokenKind::LeftCurlyBrace => self.parse_map(),
            _ => Err(self.error_here(ParserErrorKind::UnexpectedToken {
                found: self.current_token_text(),
                expected: vec!["expression".to_string()],
            })),
        }
    }

    /// 解析后缀表达式（函数调用、索引）
    fn parse_postfix(&mut self, mut expr: Expr, position: Coordinate) -> ParseResult<Expr> {
        loop {
            if self.check(NexusTokenKind::LeftParenthesis) {
                self.consume(); // 消费 '('
                let arguments = self.parse_arguments(
                    NexusTokenKind::RightParenthesis,
                    ParserErrorKind::MissingRightParen,
                )?;
                expr = Box::new(ExprKind::Call(Call {
                    callee: expr,
                    arguments,
                    position,
                }));
            } else if self.check(NexusTokenKind::LeftSquareBracket) {
                self.consume(); // 消费 '['
                let index = self.parse_expression(0)?;
                self.expect_closing(
                    NexusTokenKind::RightSquareBracket,
                    ParserErrorKind::MissingRightBracket,
                )?;
                expr = Box::new(ExprKind::Index(Index { object: expr, index }));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// 逗号分隔的表达式列表，允许尾随逗号；起始符号已被消费
    fn parse_arguments(
        &mut self,
        close: NexusTokenKind,
        missing: ParserErrorKind,
    ) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) && !self.is_at_end() {
            items.push(self.parse_expression(0)?);
            if !self.match_token(NexusTokenKind::Comma) {
                break;
            }
        }
        self.expect_closing(close, missing)?;
        Ok(items)
    }

    fn parse_number_text(&mut self) -> ParseResult<f64> {
        let coordinate = self.current_coordinate();
        let text = self.peek().map(|t| t.text().to_string()).unwrap_or_default();
        let value = text
            .parse::<f64>()
            .map_err(|_| ParserError::here(ParserErrorKind::InvalidNumberFormat(text), coordinate))?;
        self.consume();
        Ok(value)
    }

    /// 解析列表字面量
    fn parse_list(&mut self) -> ParseResult<Expr> {
        self.consume(); // 消费 '['
        let elements = self.parse_arguments(
            NexusTokenKind::RightSquareBracket,
            ParserErrorKind::MissingRightBracket,
        )?;
        Ok(Box::new(ExprKind::Array(ArrayLiteral { elements })))
    }

    /// 解析映射字面量，键为标识符或字符串
    fn parse_map(&mut self) -> ParseResult<Expr> {
        self.consume(); // 消费 '{'

        let mut entries = Vec::new();
        while !self.check(NexusTokenKind::RightCurlyBrace) {
            let key = match self.peek() {
                Some(token)
                    if matches!(
                        token.kind,
                        NexusTokenKind::Identifier | NexusTokenKind::LiteralString
                    ) =>
                {
                    let key = token.text().to_string();
                    self.consume();
                    key
                }
                Some(_) => {
                    return Err(self.error_here(ParserErrorKind::UnexpectedToken {
                        found: self.current_token_text(),
                        expected: vec!["identifier".to_string(), "string".to_string()],
                    }))
                }
                None => return Err(self.error_here(ParserErrorKind::MissingRightCurly)),
            };

            self.expect(NexusTokenKind::Colon)?;
            let value = self.parse_expression(0)?;
            entries.push((key, value));

            if !self.match_token(NexusTokenKind::Comma) {
                break;
            }
        }

        self.expect_closing(NexusTokenKind::RightCurlyBrace, ParserErrorKind::MissingRightCurly)?;
        Ok(Box::new(ExprKind::Map(MapLiteral { entries })))
    }

    /// 解析括号表达式
    fn parse_parenthesized(&mut self) -> ParseResult<Expr> {
        self.consume(); // 消费 '('
        let expr = self.parse_expression(0)?;
        self.expect_closing(NexusTokenKind::RightParenthesis, ParserErrorKind::MissingRightParen)?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::expr::BinaryOp;

    fn parse_code(code: &str) -> ParseResult<Program> {
        parse(tokenize(code).unwrap())
    }

    fn parse_expr(code: &str) -> Expr {
        let program = parse_code(code).unwrap();
        match &program.statements[0].kind {
            StmtKind::Expr(expr) => expr.clone(),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_hello_world() {
        let program = parse_code(r#"fn main() { print("Hello!") } main()"#).unwrap();
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StmtKind::Function(decl) => {
                assert_eq!(decl.name, "main");
                assert_eq!(decl.body.statements.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse_expr("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
        assert_eq!(parse_expr("1 - 2 - 3").to_string(), "((1 - 2) - 3)");
        assert_eq!(parse_expr("2 ** 3 ** 2").to_string(), "(2 ** (3 ** 2))");
        assert_eq!(parse_expr("-2 ** 2").to_string(), "((-2) ** 2)");
        assert_eq!(
            parse_expr("a || b && c == d").to_string(),
            "(a || (b && (c == d)))"
        );
        assert_eq!(parse_expr("!a && b").to_string(), "((!a) && b)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b = 1 + 2");
        assert_eq!(expr.to_string(), "a = b = (1 + 2)");
        assert!(matches!(*expr, ExprKind::Assign(_)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_code("1 = 2").unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::InvalidAssignmentTarget);
        assert_eq!(err.column(), Some(3));
        assert!(parse_code("a[0] = 2").is_err());
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse_expr("f(1, 2)[0](x)");
        assert_eq!(expr.to_string(), "f(1, 2)[0](x)");
        match *expr {
            ExprKind::Call(call) => assert_eq!(call.arguments.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_collection_literals() {
        assert_eq!(parse_expr("[1, \"a\", [true],]").to_string(), "[1, \"a\", [true]]");
        let program = parse_code("let m = {name: 1, \"other key\": null}").unwrap();
        match &program.statements[0].kind {
            StmtKind::Let(LetStmt { value, .. }) => match &**value {
                ExprKind::Map(map) => {
                    assert_eq!(map.entries[0].0, "name");
                    assert_eq!(map.entries[1].0, "other key");
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_brace_at_statement_start_is_block() {
        assert!(parse_code("{name: 1}").is_err());
        let program = parse_code("{ let a = 1 }").unwrap();
        assert!(matches!(program.statements[0].kind, StmtKind::Block(_)));
    }

    #[test]
    fn test_statements_without_separator() {
        let program = parse_code("let a = 1 let b = a print(a + b); ;").unwrap();
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn test_if_else_chain() {
        let program =
            parse_code("if a { x = 1 } else if b { x = 2 } else { x = 3 }").unwrap();
        match &program.statements[0].kind {
            StmtKind::If(stmt) => {
                let nested = stmt.else_branch.as_ref().unwrap();
                match &nested.kind {
                    StmtKind::If(inner) => assert!(inner.else_branch.is_some()),
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_function_annotations() {
        let program = parse_code("fn add(a: number, b) -> number { return a + b }").unwrap();
        match &program.statements[0].kind {
            StmtKind::Function(decl) => {
                assert_eq!(decl.params[0].type_annotation.as_deref(), Some("number"));
                assert_eq!(decl.params[1].type_annotation, None);
                assert_eq!(decl.return_type.as_deref(), Some("number"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_keyword_type_annotations() {
        let program = parse_code("fn h(cb: fn, x: null) -> null { cb() }").unwrap();
        match &program.statements[0].kind {
            StmtKind::Function(decl) => {
                assert_eq!(decl.params[0].type_annotation.as_deref(), Some("fn"));
                assert_eq!(decl.params[1].type_annotation.as_deref(), Some("null"));
                assert_eq!(decl.return_type.as_deref(), Some("null"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = parse_code("fn f() -> true { }").unwrap_err();
        assert!(matches!(err.kind, ParserErrorKind::ExpectedIdentifier { .. }));
    }

    #[test]
    fn test_return_value_on_same_line_only() {
        let program = parse_code("fn f() {\n return\n 1\n}").unwrap();
        match &program.statements[0].kind {
            StmtKind::Function(decl) => {
                assert_eq!(decl.body.statements.len(), 2);
                assert!(matches!(
                    decl.body.statements[0].kind,
                    StmtKind::Return(ReturnStmt { value: None })
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_personality_block() {
        let program = parse_code("personality { curiosity: 0.9, humor: -0.5, }").unwrap();
        let blocks: Vec<_> = program.personality_blocks().collect();
        assert_eq!(
            blocks[0].pairs(),
            vec![(Trait::Curiosity, 0.9), (Trait::Humor, -0.5)]
        );
    }

    #[test]
    fn test_personality_errors() {
        let err = parse_code("personality { charisma: 0.5 }").unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::UnknownTrait("charisma".to_string()));
        assert_eq!(err.column(), Some(15));

        let err = parse_code("fn f() { personality { humor: 0.5 } }").unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::PersonalityNotTopLevel);

        let err = parse_code("personality { humor: \"high\" }").unwrap_err();
        assert!(matches!(err.kind, ParserErrorKind::ExpectedTraitValue { .. }));
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            parse_code("break").unwrap_err().kind,
            ParserErrorKind::BreakOutsideLoop
        );
        assert_eq!(
            parse_code("while true { fn f() { continue } }").unwrap_err().kind,
            ParserErrorKind::ContinueOutsideLoop
        );
        assert!(parse_code("for x in [1] { if x { break } continue }").is_ok());
    }

    #[test]
    fn test_missing_delimiters() {
        assert_eq!(
            parse_code("print(1").unwrap_err().kind,
            ParserErrorKind::MissingRightParen
        );
        assert_eq!(
            parse_code("[1, 2").unwrap_err().kind,
            ParserErrorKind::MissingRightBracket
        );
        assert_eq!(
            parse_code("fn f() { print(1)").unwrap_err().kind,
            ParserErrorKind::MissingRightCurly
        );
        assert_eq!(
            parse_code("let x =").unwrap_err().kind,
            ParserErrorKind::UnexpectedEndOfInput
        );
    }

    #[test]
    fn test_unexpected_token_message() {
        let err = parse_code("let 1 = 2").unwrap_err();
        assert_eq!(
            err.kind,
            ParserErrorKind::ExpectedIdentifier {
                found: "'1'".to_string()
            }
        );
        let err = parse_code(")").unwrap_err();
        assert!(err.to_string().contains("expected: expression"));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        let err = parse_code(&deep).unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::NestingTooDeep(DEFAULT_MAX_NESTING));

        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_code(&shallow).is_ok());

        let tokens = tokenize(&"-".repeat(50)).unwrap();
        let err = Parser::new(tokens).with_max_nesting(10).parse().unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::NestingTooDeep(10));
    }

    #[test]
    fn test_canonical_display_reparses() {
        let code = r#"
            personality { curiosity: 0.9 }
            fn fib(n) {
                if n < 2 { return n } else { return fib(n - 1) + fib(n - 2) }
            }
            let items = {a: [1, 2.5], b: "x\ny"}
            for k in keys(items) { print(k, -fib(10)) }
            while false { break }
        "#;
        let program = parse_code(code).unwrap();
        let text = program.to_string();
        let reparsed = parse_code(&text).unwrap();
        assert_eq!(reparsed.to_string(), text);
    }

    #[test]
    fn test_binary_op_mapping() {
        match *parse_expr("a % b") {
            ExprKind::Binary(b) => assert_eq!(b.op, BinaryOp::Mod),
            other => panic!("unexpected {other:?}"),
        }
    }
}
