//! Recursive-descent parser for Ivy.
//!
//! The parser drives the lexer one token at a time with a single token of
//! lookahead (`current`/`previous`). Operator precedence is encoded as a
//! chain of mutually calling grammar levels, from assignment at the bottom
//! to primary at the top.
//!
//! Error handling is panic-mode recovery: `consume` records an "expected
//! X" diagnostic and carries on, a failed `primary` raises a recoverable
//! [`ParseInterrupt`], and the declaration loop catches the interrupt and
//! skips tokens to a synchronization point. While panic mode is active new
//! diagnostics are suppressed so one mistake does not cascade. `parse`
//! always returns whatever declarations were recovered; overall success is
//! queried through the diagnostics collector.

use crate::ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, Expr, ExpressionStmt, FunctionDecl,
    GroupingExpr, IdentifierExpr, IfStmt, LiteralExpr, ReturnStmt, Stmt, TypeKind, UnaryExpr,
    VarDecl, WhileStmt,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::lexer::{Lexer, Token, TokenKind};

/// Marker for an unrecoverable grammar violation inside one declaration.
///
/// It carries no payload: the diagnostic was already recorded when the
/// interrupt was raised, and the declaration loop only needs to know that
/// it must synchronize.
#[derive(Debug)]
pub struct ParseInterrupt;

type ParseResult<T> = Result<T, ParseInterrupt>;

const RECOVERY_TOKENS: [TokenKind; 7] = [
    TokenKind::Func,
    TokenKind::Var,
    TokenKind::Const,
    TokenKind::For,
    TokenKind::If,
    TokenKind::While,
    TokenKind::Return,
];

pub struct Parser<'src, 'diag> {
    lexer: Lexer<'src>,
    diagnostics: &'diag mut Diagnostics,
    current: Token,
    previous: Token,
    panic_mode: bool,
}

impl<'src, 'diag> Parser<'src, 'diag> {
    pub fn new(lexer: Lexer<'src>, diagnostics: &'diag mut Diagnostics) -> Self {
        let mut parser = Parser {
            lexer,
            diagnostics,
            current: Token::new(TokenKind::EndOfFile, "", 0, 0),
            previous: Token::new(TokenKind::EndOfFile, "", 0, 0),
            panic_mode: false,
        };
        parser.advance();
        parser
    }

    /// Parses the whole source unit, recovering at declaration boundaries.
    ///
    /// Never fails: malformed declarations are dropped after recording
    /// diagnostics, and everything that parsed cleanly is returned.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    // -----------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current.clone();
        self.current = self.lexer.scan_token();
        if self.current.kind == TokenKind::Error {
            let token = self.current.clone();
            let message = token.lexeme.clone();
            self.error(&token, message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
            return;
        }
        let token = self.current.clone();
        self.error(&token, message);
    }

    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::EndOfFile
    }

    fn error(&mut self, token: &Token, message: impl Into<String>) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.diagnostics
            .report(Diagnostic::at(token.line, token.column, message));
    }

    /// Skips tokens until just past a `;` or until a declaration or
    /// statement keyword is the current token, then clears panic mode.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.is_at_end() {
            if RECOVERY_TOKENS.iter().any(|&kind| self.check(kind)) {
                return;
            }
            self.advance();
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
        }
    }

    // -----------------------------------------------------------------
    // Declarations and statements
    // -----------------------------------------------------------------

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_token(TokenKind::Func) {
            self.function_decl().map(Stmt::Function)
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration(false).map(Stmt::Var)
        } else if self.match_token(TokenKind::Const) {
            self.var_declaration(true).map(Stmt::Var)
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => {
                // The production completed, so the cursor already sits at
                // a declaration boundary; only the suppression is lifted.
                self.panic_mode = false;
                Some(stmt)
            }
            Err(ParseInterrupt) => {
                self.synchronize();
                None
            }
        }
    }

    fn function_decl(&mut self) -> ParseResult<FunctionDecl> {
        self.consume(TokenKind::Identifier, "Expect function name");
        let name = self.previous.lexeme.clone();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name");
        let params = self.parameter_list()?;
        self.consume(TokenKind::RightParen, "Expect ')' after parameters");

        let mut return_type = TypeKind::Void;
        if self.match_token(TokenKind::Arrow) {
            return_type = self.type_annotation();
        }

        self.consume(TokenKind::LeftBrace, "Expect '{' before function body");
        let body = self.block()?;
        Ok(FunctionDecl {
            name,
            params,
            return_type,
            body,
        })
    }

    fn parameter_list(&mut self) -> ParseResult<Vec<(String, TypeKind)>> {
        let mut params = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                self.consume(TokenKind::Identifier, "Expect parameter name");
                let param_name = self.previous.lexeme.clone();

                self.consume(TokenKind::Colon, "Expect ':' after parameter name");
                let param_type = self.type_annotation();

                params.push((param_name, param_type));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(params)
    }

    /// Reads a type annotation: a primitive type name, or any identifier
    /// as a user-type placeholder accepted without validation.
    fn type_annotation(&mut self) -> TypeKind {
        if let Some(kind) = TypeKind::from_token(self.current.kind) {
            self.advance();
            return kind;
        }
        if self.current.kind == TokenKind::Identifier {
            // No symbol table exists to resolve user type names; they
            // lower with the default kind.
            self.advance();
            return TypeKind::I32;
        }
        let token = self.current.clone();
        self.error(&token, "Expect type name");
        TypeKind::I32
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_token(TokenKind::If) {
            return self.if_statement();
        }
        if self.match_token(TokenKind::While) {
            return self.while_statement();
        }
        if self.match_token(TokenKind::For) {
            return self.for_statement();
        }
        if self.match_token(TokenKind::Return) {
            return self.return_statement();
        }
        if self.match_token(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        Ok(Stmt::Expression(self.expression_statement()?))
    }

    fn block(&mut self) -> ParseResult<BlockStmt> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after block");
        Ok(BlockStmt { statements })
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'");
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition");

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'");
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after while condition");

        let body = Box::new(self.statement()?);
        Ok(Stmt::While(WhileStmt { condition, body }))
    }

    /// Parses a for loop and desugars it at once:
    /// `for (init; cond; incr) body` becomes
    /// `{ init; while (cond) { body; incr; } }`, with the condition
    /// defaulting to `true` when omitted.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'");

        let initializer = if self.match_token(TokenKind::Var) {
            Some(self.var_declaration(false)?)
        } else if self.match_token(TokenKind::Semicolon) {
            None
        } else {
            // Only a `var` declaration may introduce the loop variable.
            let _ = self.expression_statement()?;
            let token = self.previous.clone();
            self.error(&token, "Expect variable declaration in for loop initializer");
            None
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition");

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses");

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(BlockStmt {
                statements: vec![
                    body,
                    Stmt::Expression(ExpressionStmt { expr: increment }),
                ],
            });
        }

        let condition = condition.unwrap_or_else(|| {
            Expr::Literal(LiteralExpr {
                kind: TokenKind::True,
                value: "true".to_string(),
            })
        });

        let while_loop = Stmt::While(WhileStmt {
            condition,
            body: Box::new(body),
        });

        if let Some(initializer) = initializer {
            return Ok(Stmt::Block(BlockStmt {
                statements: vec![Stmt::Var(initializer), while_loop],
            }));
        }
        Ok(while_loop)
    }

    fn var_declaration(&mut self, is_const: bool) -> ParseResult<VarDecl> {
        self.consume(TokenKind::Identifier, "Expect variable name");
        let name = self.previous.lexeme.clone();

        self.consume(TokenKind::Colon, "Expect ':' after variable name");
        let ty = self.type_annotation();

        let initializer = if self.match_token(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            if is_const {
                let token = self.previous.clone();
                self.error(&token, "Constant must be initialized");
            }
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration");
        Ok(VarDecl {
            ty,
            name,
            initializer,
            is_const,
        })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after return value");
        Ok(Stmt::Return(ReturnStmt { value }))
    }

    fn expression_statement(&mut self) -> ParseResult<ExpressionStmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression");
        Ok(ExpressionStmt { expr })
    }

    // -----------------------------------------------------------------
    // Expressions, lowest to highest precedence
    // -----------------------------------------------------------------

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.ternary()?;

        if self.match_any(&[TokenKind::Equal, TokenKind::PlusEqual]) {
            let op = self.previous.kind;
            let value = self.assignment()?;

            if matches!(expr, Expr::Identifier(_)) {
                return Ok(Expr::Assign(AssignExpr {
                    op,
                    target: Box::new(expr),
                    value: Box::new(value),
                }));
            }
            let token = self.previous.clone();
            self.error(&token, "Invalid assignment target");
            // The malformed assignment degenerates into its left-hand
            // side; the evaluated right-hand side is dropped.
        }
        Ok(expr)
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let expr = self.logic_or()?;

        if self.match_token(TokenKind::Question) {
            let then_branch = self.expression()?;
            self.consume(TokenKind::Colon, "Expect ':' in ternary expression");
            let else_branch = self.ternary()?;

            // `cond ? a : b` is encoded as Question over a Colon pair.
            return Ok(Expr::Binary(BinaryExpr {
                op: TokenKind::Question,
                left: Box::new(expr),
                right: Box::new(Expr::Binary(BinaryExpr {
                    op: TokenKind::Colon,
                    left: Box::new(then_branch),
                    right: Box::new(else_branch),
                })),
            }));
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logic_and()?;

        while self.match_token(TokenKind::PipePipe) {
            let op = self.previous.kind;
            let right = self.logic_and()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_token(TokenKind::AmpersandAmp) {
            let op = self.previous.kind;
            let right = self.equality()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while self.match_any(&[TokenKind::EqualEqual, TokenKind::BangEqual]) {
            let op = self.previous.kind;
            let right = self.comparison()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while self.match_any(&[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            let op = self.previous.kind;
            let right = self.term()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous.kind;
            let right = self.factor()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while self.match_any(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent]) {
            let op = self.previous.kind;
            let right = self.unary()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_any(&[TokenKind::Bang, TokenKind::Minus, TokenKind::PlusPlus]) {
            let op = self.previous.kind;
            let operand = self.unary()?;
            return Ok(Expr::Unary(UnaryExpr {
                op,
                operand: Box::new(operand),
            }));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(TokenKind::PlusPlus) {
                // Postfix increment shares the prefix node shape.
                expr = Expr::Unary(UnaryExpr {
                    op: TokenKind::PlusPlus,
                    operand: Box::new(expr),
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let arguments = self.argument_list()?;
        self.consume(TokenKind::RightParen, "Expect ')' after arguments");

        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            arguments,
        }))
    }

    fn argument_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut arguments = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                arguments.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(arguments)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_token(TokenKind::False) {
            return Ok(literal(TokenKind::False, "false"));
        }
        if self.match_token(TokenKind::True) {
            return Ok(literal(TokenKind::True, "true"));
        }
        if self.match_any(&[
            TokenKind::IntLiteral,
            TokenKind::FloatLiteral,
            TokenKind::StringLiteral,
            TokenKind::CharLiteral,
        ]) {
            return Ok(literal(self.previous.kind, self.previous.lexeme.clone()));
        }
        if self.match_token(TokenKind::Identifier) {
            return Ok(Expr::Identifier(IdentifierExpr {
                name: self.previous.lexeme.clone(),
            }));
        }
        if self.match_token(TokenKind::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression");
            return Ok(Expr::Grouping(GroupingExpr {
                expression: Box::new(expr),
            }));
        }

        let token = self.current.clone();
        self.error(&token, "Expect expression");
        Err(ParseInterrupt)
    }
}

fn binary(op: TokenKind, left: Expr, right: Expr) -> Expr {
    Expr::Binary(BinaryExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn literal(kind: TokenKind, value: impl Into<String>) -> Expr {
    Expr::Literal(LiteralExpr {
        kind,
        value: value.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_source(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut parser = Parser::new(Lexer::new(source), &mut diagnostics);
        let statements = parser.parse();
        (statements, diagnostics)
    }

    #[test]
    fn parses_function_declaration() {
        let (statements, diagnostics) = parse_source("func main() -> i32 { return 0; }");
        assert!(!diagnostics.had_error());
        assert_eq!(statements.len(), 1);

        let Stmt::Function(func) = &statements[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(func.name, "main");
        assert!(func.params.is_empty());
        assert_eq!(func.return_type, TypeKind::I32);
        assert_eq!(func.body.statements.len(), 1);

        let Stmt::Return(ret) = &func.body.statements[0] else {
            panic!("expected return statement");
        };
        let Some(Expr::Literal(value)) = &ret.value else {
            panic!("expected literal return value");
        };
        assert_eq!(value.kind, TokenKind::IntLiteral);
        assert_eq!(value.value, "0");
    }

    #[test]
    fn parses_parameters_and_defaults_to_void() {
        let (statements, diagnostics) = parse_source("func add(a: i32, b: f64) { }");
        assert!(!diagnostics.had_error());

        let Stmt::Function(func) = &statements[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(
            func.params,
            vec![
                ("a".to_string(), TypeKind::I32),
                ("b".to_string(), TypeKind::F64)
            ]
        );
        assert_eq!(func.return_type, TypeKind::Void);
    }

    #[test]
    fn desugars_for_into_while() {
        let (statements, diagnostics) =
            parse_source("func f() { for (var i: i32 = 0; i < 10; i++) { } }");
        assert!(!diagnostics.had_error());

        let Stmt::Function(func) = &statements[0] else {
            panic!("expected function declaration");
        };
        let Stmt::Block(outer) = &func.body.statements[0] else {
            panic!("expected desugared block");
        };
        assert_eq!(outer.statements.len(), 2);

        let Stmt::Var(init) = &outer.statements[0] else {
            panic!("expected loop variable declaration");
        };
        assert_eq!(init.name, "i");
        assert_eq!(init.ty, TypeKind::I32);

        let Stmt::While(while_loop) = &outer.statements[1] else {
            panic!("expected while loop");
        };
        let Expr::Binary(cond) = &while_loop.condition else {
            panic!("expected comparison condition");
        };
        assert_eq!(cond.op, TokenKind::Less);

        let Stmt::Block(body) = while_loop.body.as_ref() else {
            panic!("expected block body");
        };
        assert_eq!(body.statements.len(), 2);
        assert!(matches!(&body.statements[0], Stmt::Block(b) if b.statements.is_empty()));

        let Stmt::Expression(incr) = &body.statements[1] else {
            panic!("expected trailing increment statement");
        };
        let Expr::Unary(unary) = &incr.expr else {
            panic!("expected increment expression");
        };
        assert_eq!(unary.op, TokenKind::PlusPlus);
    }

    #[test]
    fn for_condition_defaults_to_true() {
        let (statements, diagnostics) = parse_source("func f() { for (;;) { } }");
        assert!(!diagnostics.had_error());

        let Stmt::Function(func) = &statements[0] else {
            panic!("expected function declaration");
        };
        let Stmt::While(while_loop) = &func.body.statements[0] else {
            panic!("expected while loop");
        };
        let Expr::Literal(cond) = &while_loop.condition else {
            panic!("expected literal condition");
        };
        assert_eq!(cond.kind, TokenKind::True);
    }

    #[test]
    fn recovers_after_malformed_declaration() {
        let (statements, diagnostics) =
            parse_source("var x: i32 = ;\nfunc main() -> i32 { return 0; }");
        assert!(diagnostics.had_error());
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::Function(f) if f.name == "main"));
    }

    #[test]
    fn panic_mode_suppresses_cascading_diagnostics() {
        let (_, diagnostics) = parse_source("var x: i32 = ;");
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn invalid_assignment_target_degenerates_to_lhs() {
        let (statements, diagnostics) = parse_source("func f() { 1 + 2 = 3; }");
        assert!(diagnostics.had_error());
        assert!(
            diagnostics
                .entries()
                .iter()
                .any(|d| d.message == "Invalid assignment target")
        );

        let Stmt::Function(func) = &statements[0] else {
            panic!("expected function declaration");
        };
        let Stmt::Expression(stmt) = &func.body.statements[0] else {
            panic!("expected expression statement");
        };
        // The malformed assignment collapses to its left-hand side.
        let Expr::Binary(expr) = &stmt.expr else {
            panic!("expected the bare addition");
        };
        assert_eq!(expr.op, TokenKind::Plus);
    }

    #[test]
    fn const_requires_initializer() {
        let (_, diagnostics) = parse_source("const x: i32;");
        assert!(
            diagnostics
                .entries()
                .iter()
                .any(|d| d.message == "Constant must be initialized")
        );
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        let (statements, _) = parse_source("var x: i32 = 1 + 2 * 3;");
        let Stmt::Var(decl) = &statements[0] else {
            panic!("expected var declaration");
        };
        let Some(Expr::Binary(sum)) = &decl.initializer else {
            panic!("expected binary initializer");
        };
        assert_eq!(sum.op, TokenKind::Plus);
        let Expr::Binary(product) = sum.right.as_ref() else {
            panic!("expected nested product");
        };
        assert_eq!(product.op, TokenKind::Star);
    }

    #[test]
    fn ternary_encodes_as_question_over_colon() {
        let (statements, diagnostics) = parse_source("var x: i32 = a ? 1 : 2;");
        assert!(!diagnostics.had_error());

        let Stmt::Var(decl) = &statements[0] else {
            panic!("expected var declaration");
        };
        let Some(Expr::Binary(question)) = &decl.initializer else {
            panic!("expected ternary initializer");
        };
        assert_eq!(question.op, TokenKind::Question);
        let Expr::Binary(colon) = question.right.as_ref() else {
            panic!("expected colon pair");
        };
        assert_eq!(colon.op, TokenKind::Colon);
    }

    #[test]
    fn user_type_names_are_accepted_as_placeholders() {
        let (statements, diagnostics) = parse_source("var p: Point;");
        assert!(!diagnostics.had_error());
        assert!(matches!(&statements[0], Stmt::Var(decl) if decl.ty == TypeKind::I32));
    }

    #[test]
    fn lexical_error_is_a_hard_failure_at_that_position() {
        let (statements, diagnostics) = parse_source("var x: i32 = 1.2.3;\nvar y: i32 = 4;");
        assert!(diagnostics.had_error());
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::Var(decl) if decl.name == "y"));
    }

    #[test]
    fn call_arguments_parse_left_to_right() {
        let (statements, diagnostics) = parse_source("func f() { g(1, 2, h(3)); }");
        assert!(!diagnostics.had_error());

        let Stmt::Function(func) = &statements[0] else {
            panic!("expected function declaration");
        };
        let Stmt::Expression(stmt) = &func.body.statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Call(call) = &stmt.expr else {
            panic!("expected call expression");
        };
        assert_eq!(call.arguments.len(), 3);
        assert!(matches!(
            call.callee.as_ref(),
            Expr::Identifier(id) if id.name == "g"
        ));
    }
}
