//! Lowers the AST into a basic-block IR module.
//!
//! The generator is a [`Visitor`] in register-accumulator style: every
//! visited expression leaves its result in `current`, which the caller
//! takes. Errors are recorded per node and lowering continues with an
//! `undef` placeholder so one bad expression does not hide the rest of
//! the unit's problems; a module produced alongside any diagnostic must
//! not be handed to a backend.
//!
//! Lowering runs in two passes over the top level. The prototype pass
//! declares every function signature first, renaming a user `main` to
//! `ivy_main`, so call sites may forward-reference functions whose
//! bodies come later. The body pass then lowers each function with a
//! flat, function-scoped symbol table mapping names to stack slots; a
//! redeclared name overwrites the earlier slot for the rest of the
//! function.

use std::collections::HashMap;

use crate::ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, Expr, ExpressionStmt, FunctionDecl,
    GroupingExpr, IdentifierExpr, IfStmt, LiteralExpr, ReturnStmt, Stmt, TypeKind, UnaryExpr,
    VarDecl, Visitor, WhileStmt,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::ir::{BinOp, Builder, FcmpCond, IcmpCond, IrType, Module, Value};
use crate::lexer::TokenKind;

/// The entry point the platform linker expects, wrapping the renamed
/// user `main`.
pub const USER_MAIN: &str = "ivy_main";

pub struct CodeGenerator<'diag> {
    builder: Builder,
    diagnostics: &'diag mut Diagnostics,
    /// Name → (stack slot, element type). Flat and function-scoped.
    slots: HashMap<String, (Value, IrType)>,
    current: Option<Value>,
    has_main: bool,
}

impl<'diag> CodeGenerator<'diag> {
    pub fn new(diagnostics: &'diag mut Diagnostics) -> Self {
        CodeGenerator {
            builder: Builder::new("main"),
            diagnostics,
            slots: HashMap::new(),
            current: None,
            has_main: false,
        }
    }

    /// Lowers a whole source unit and returns the finished module.
    pub fn generate(mut self, statements: &[Stmt]) -> Module {
        // Prototype pass: every signature must exist before any body is
        // lowered, since calls may forward-reference.
        for stmt in statements {
            if let Stmt::Function(func) = stmt {
                let name = if func.name == "main" {
                    self.has_main = true;
                    USER_MAIN.to_string()
                } else {
                    func.name.clone()
                };
                let params = func
                    .params
                    .iter()
                    .map(|(name, ty)| (name.clone(), ir_type(*ty)))
                    .collect();
                self.builder
                    .declare_function(name, params, ir_type(func.return_type));
            }
        }

        for stmt in statements {
            stmt.accept(&mut self);
        }

        if self.has_main {
            self.generate_main_wrapper();
        }
        self.builder.into_module()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.diagnostics.report(Diagnostic::bare(message));
    }

    /// Evaluates an expression, falling back to `undef` when lowering of
    /// the subtree failed.
    fn eval(&mut self, expr: &Expr) -> Value {
        self.current = None;
        expr.accept(self);
        self.current.take().unwrap_or(Value::Undef(IrType::I32))
    }

    /// Synthesizes the native `main(argc, argv)` that calls the renamed
    /// user function and forwards its result as the exit status.
    fn generate_main_wrapper(&mut self) {
        let ret = match self.builder.module().function(USER_MAIN) {
            Some(func) => func.return_type,
            None => return,
        };

        self.builder.declare_function(
            "main",
            vec![
                ("argc".to_string(), IrType::I32),
                ("argv".to_string(), IrType::Ptr),
            ],
            IrType::I32,
        );
        self.builder.select_function("main");
        let entry = self.builder.create_block("entry");
        self.builder.set_insert_point(entry);

        let result = self.builder.call(USER_MAIN, ret, Vec::new());
        if ret == IrType::Void {
            self.builder.ret(Some(Value::ConstInt {
                ty: IrType::I32,
                value: 0,
            }));
        } else {
            self.builder.ret(Some(result));
        }
    }

    fn lower_arith(&mut self, op: TokenKind, lhs: Value, rhs: Value) -> Value {
        let float = lhs.ty().is_float() || rhs.ty().is_float();
        let op = match (op, float) {
            (TokenKind::Plus, false) => BinOp::Add,
            (TokenKind::Plus, true) => BinOp::FAdd,
            (TokenKind::Minus, false) => BinOp::Sub,
            (TokenKind::Minus, true) => BinOp::FSub,
            (TokenKind::Star, false) => BinOp::Mul,
            (TokenKind::Star, true) => BinOp::FMul,
            (TokenKind::Slash, false) => BinOp::SDiv,
            (TokenKind::Slash, true) => BinOp::FDiv,
            (TokenKind::Percent, false) => BinOp::SRem,
            (TokenKind::Percent, true) => BinOp::FRem,
            _ => return Value::Undef(IrType::I32),
        };
        self.builder.binary(op, lhs, rhs)
    }

    fn lower_comparison(&mut self, op: TokenKind, lhs: Value, rhs: Value) -> Value {
        if lhs.ty().is_float() || rhs.ty().is_float() {
            let cond = match op {
                TokenKind::EqualEqual => FcmpCond::Oeq,
                TokenKind::BangEqual => FcmpCond::One,
                TokenKind::Less => FcmpCond::Olt,
                TokenKind::LessEqual => FcmpCond::Ole,
                TokenKind::Greater => FcmpCond::Ogt,
                TokenKind::GreaterEqual => FcmpCond::Oge,
                _ => return Value::Undef(IrType::I1),
            };
            return self.builder.fcmp(cond, lhs, rhs);
        }
        let cond = match op {
            TokenKind::EqualEqual => IcmpCond::Eq,
            TokenKind::BangEqual => IcmpCond::Ne,
            TokenKind::Less => IcmpCond::Slt,
            TokenKind::LessEqual => IcmpCond::Sle,
            TokenKind::Greater => IcmpCond::Sgt,
            TokenKind::GreaterEqual => IcmpCond::Sge,
            _ => return Value::Undef(IrType::I1),
        };
        self.builder.icmp(cond, lhs, rhs)
    }

    /// `cond ? a : b`, stored as Question over a Colon pair. Both arms
    /// are evaluated and a select picks the result.
    fn lower_ternary(&mut self, node: &BinaryExpr) -> Value {
        let cond = self.eval(&node.left);
        let Expr::Binary(arms) = node.right.as_ref() else {
            self.error("Malformed ternary expression");
            return Value::Undef(IrType::I32);
        };
        let then_value = self.eval(&arms.left);
        let else_value = self.eval(&arms.right);
        self.builder.select(cond, then_value, else_value)
    }

    fn lower_increment(&mut self, node: &UnaryExpr) -> Value {
        let Expr::Identifier(identifier) = node.operand.as_ref() else {
            self.error("Invalid increment target");
            return Value::Undef(IrType::I32);
        };
        let Some(&(slot, ty)) = self.slots.get(&identifier.name) else {
            self.error(format!("Unknown variable: {}", identifier.name));
            return Value::Undef(IrType::I32);
        };

        let loaded = self.builder.load(ty, slot);
        let one = if ty.is_float() {
            Value::ConstFloat { ty, value: 1.0 }
        } else {
            Value::ConstInt { ty, value: 1 }
        };
        let op = if ty.is_float() { BinOp::FAdd } else { BinOp::Add };
        let next = self.builder.binary(op, loaded, one);
        self.builder.store(next, slot);
        next
    }
}

impl Visitor for CodeGenerator<'_> {
    fn visit_block(&mut self, node: &BlockStmt) {
        for stmt in &node.statements {
            stmt.accept(self);
        }
    }

    fn visit_function(&mut self, node: &FunctionDecl) {
        let name = if node.name == "main" {
            USER_MAIN.to_string()
        } else {
            node.name.clone()
        };

        if !self.builder.select_function(&name) {
            self.error(format!("Function not declared: {}", name));
            return;
        }

        let entry = self.builder.create_block("entry");
        self.builder.set_insert_point(entry);
        self.slots.clear();

        for (index, (param_name, param_type)) in node.params.iter().enumerate() {
            let ty = ir_type(*param_type);
            let slot = self.builder.alloca(ty);
            if let Some(arg) = self.builder.param_value(index) {
                self.builder.store(arg, slot);
            }
            self.slots.insert(param_name.clone(), (slot, ty));
        }

        self.visit_block(&node.body);

        if !self.builder.current_block_terminated() {
            if node.return_type == TypeKind::Void {
                self.builder.ret(None);
            } else {
                self.error(format!("Function {} does not return a value", name));
            }
        }
    }

    fn visit_var_decl(&mut self, node: &VarDecl) {
        // Without an initializer the declaration has no observable
        // effect; no slot is created.
        let Some(initializer) = &node.initializer else {
            return;
        };
        let value = self.eval(initializer);
        let ty = ir_type(node.ty);
        let slot = self.builder.alloca(ty);
        self.builder.store(value, slot);
        self.slots.insert(node.name.clone(), (slot, ty));
    }

    fn visit_if(&mut self, node: &IfStmt) {
        let cond = self.eval(&node.condition);

        let then_block = self.builder.create_block("then");
        let else_block = self.builder.create_block("else");
        let merge_block = self.builder.create_block("ifcont");

        self.builder.cond_br(cond, then_block, else_block);

        self.builder.set_insert_point(then_block);
        node.then_branch.accept(self);
        self.builder.br(merge_block);

        // The else block exists even without an else branch and falls
        // through to the merge point.
        self.builder.set_insert_point(else_block);
        if let Some(else_branch) = &node.else_branch {
            else_branch.accept(self);
        }
        self.builder.br(merge_block);

        self.builder.set_insert_point(merge_block);
    }

    fn visit_while(&mut self, node: &WhileStmt) {
        let loop_cond = self.builder.create_block("loop_cond");
        let loop_body = self.builder.create_block("loop_body");
        let after_loop = self.builder.create_block("after_loop");

        self.builder.br(loop_cond);

        self.builder.set_insert_point(loop_cond);
        let cond = self.eval(&node.condition);
        self.builder.cond_br(cond, loop_body, after_loop);

        self.builder.set_insert_point(loop_body);
        node.body.accept(self);
        self.builder.br(loop_cond);

        self.builder.set_insert_point(after_loop);
    }

    fn visit_return(&mut self, node: &ReturnStmt) {
        match &node.value {
            Some(value) => {
                let value = self.eval(value);
                self.builder.ret(Some(value));
            }
            None => self.builder.ret(None),
        }
    }

    fn visit_expression_stmt(&mut self, node: &ExpressionStmt) {
        self.eval(&node.expr);
    }

    fn visit_binary(&mut self, node: &BinaryExpr) {
        if node.op == TokenKind::Question {
            let value = self.lower_ternary(node);
            self.current = Some(value);
            return;
        }

        let lhs = self.eval(&node.left);
        let rhs = self.eval(&node.right);

        let value = match node.op {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent => self.lower_arith(node.op, lhs, rhs),
            TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => self.lower_comparison(node.op, lhs, rhs),
            TokenKind::AmpersandAmp => self.builder.binary(BinOp::And, lhs, rhs),
            TokenKind::PipePipe => self.builder.binary(BinOp::Or, lhs, rhs),
            _ => {
                self.error(format!("Unsupported binary operator: {}", node.op.name()));
                Value::Undef(IrType::I32)
            }
        };
        self.current = Some(value);
    }

    fn visit_unary(&mut self, node: &UnaryExpr) {
        if node.op == TokenKind::PlusPlus {
            let value = self.lower_increment(node);
            self.current = Some(value);
            return;
        }

        let operand = self.eval(&node.operand);
        let value = match node.op {
            TokenKind::Minus => {
                if operand.ty().is_float() {
                    self.builder.fneg(operand)
                } else {
                    self.builder.neg(operand)
                }
            }
            TokenKind::Bang => self.builder.not(operand),
            _ => {
                self.error(format!("Unsupported unary operator: {}", node.op.name()));
                Value::Undef(IrType::I32)
            }
        };
        self.current = Some(value);
    }

    fn visit_assign(&mut self, node: &AssignExpr) {
        let value = self.eval(&node.value);

        let Expr::Identifier(identifier) = node.target.as_ref() else {
            self.error("Invalid assignment target");
            self.current = Some(Value::Undef(value.ty()));
            return;
        };
        let Some(&(slot, ty)) = self.slots.get(&identifier.name) else {
            self.error(format!("Undefined variable: {}", identifier.name));
            self.current = Some(Value::Undef(value.ty()));
            return;
        };

        let stored = if node.op == TokenKind::PlusEqual {
            let loaded = self.builder.load(ty, slot);
            let op = if ty.is_float() { BinOp::FAdd } else { BinOp::Add };
            self.builder.binary(op, loaded, value)
        } else {
            value
        };
        self.builder.store(stored, slot);
        self.current = Some(stored);
    }

    fn visit_call(&mut self, node: &CallExpr) {
        let mut args = Vec::with_capacity(node.arguments.len());
        for argument in &node.arguments {
            args.push(self.eval(argument));
        }

        let Expr::Identifier(callee) = node.callee.as_ref() else {
            self.error("Call to non-function");
            self.current = Some(Value::Undef(IrType::I32));
            return;
        };

        let Some(ret) = self
            .builder
            .module()
            .function(&callee.name)
            .map(|func| func.return_type)
        else {
            self.error(format!("Unknown function: {}", callee.name));
            self.current = Some(Value::Undef(IrType::I32));
            return;
        };

        let value = self.builder.call(callee.name.clone(), ret, args);
        self.current = Some(value);
    }

    fn visit_identifier(&mut self, node: &IdentifierExpr) {
        match self.slots.get(&node.name) {
            Some(&(slot, ty)) => {
                let value = self.builder.load(ty, slot);
                self.current = Some(value);
            }
            None => {
                self.error(format!("Unknown variable: {}", node.name));
                self.current = Some(Value::Undef(IrType::I32));
            }
        }
    }

    fn visit_literal(&mut self, node: &LiteralExpr) {
        let value = match node.kind {
            TokenKind::IntLiteral => Value::ConstInt {
                ty: IrType::I32,
                value: parse_int(&node.value),
            },
            TokenKind::FloatLiteral => Value::ConstFloat {
                ty: IrType::F32,
                // Round through f32 so the printed image matches the
                // constant's width.
                value: node.value.parse::<f64>().unwrap_or(0.0) as f32 as f64,
            },
            TokenKind::True => Value::ConstInt {
                ty: IrType::I1,
                value: 1,
            },
            TokenKind::False => Value::ConstInt {
                ty: IrType::I1,
                value: 0,
            },
            TokenKind::CharLiteral => Value::ConstInt {
                ty: IrType::I8,
                value: decode_char(&node.value),
            },
            _ => Value::ConstInt {
                ty: IrType::I32,
                value: 0,
            },
        };
        self.current = Some(value);
    }

    fn visit_grouping(&mut self, node: &GroupingExpr) {
        node.expression.accept(self);
    }
}

fn ir_type(ty: TypeKind) -> IrType {
    match ty {
        TypeKind::I8 | TypeKind::U8 | TypeKind::Char => IrType::I8,
        TypeKind::I16 | TypeKind::U16 => IrType::I16,
        TypeKind::I64 | TypeKind::U64 => IrType::I64,
        TypeKind::F32 => IrType::F32,
        TypeKind::F64 => IrType::F64,
        TypeKind::Bool => IrType::I1,
        TypeKind::Void => IrType::Void,
        // i32, u32 and the string placeholder.
        _ => IrType::I32,
    }
}

/// Parses an integer lexeme: optional `0x`/`0b` radix prefix, with `_`
/// separators already allowed by the scanner.
fn parse_int(lexeme: &str) -> i64 {
    let digits: String = lexeme.chars().filter(|&c| c != '_').collect();
    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        digits.parse()
    };
    parsed.unwrap_or(0)
}

/// Decodes a character lexeme (quotes included) to its byte value.
fn decode_char(lexeme: &str) -> i64 {
    let inner = lexeme.trim_matches('\'');
    let mut chars = inner.chars();
    let value = match (chars.next(), chars.next()) {
        (Some('\\'), Some(escape)) => match escape {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        },
        (Some(c), _) => c,
        (None, _) => '\0',
    };
    value as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn generate(source: &str) -> (String, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let statements = {
            let mut parser = Parser::new(Lexer::new(source), &mut diagnostics);
            parser.parse()
        };
        assert!(!diagnostics.had_error(), "test source must parse cleanly");
        let module = CodeGenerator::new(&mut diagnostics).generate(&statements);
        (module.to_string(), diagnostics)
    }

    #[test]
    fn lowers_a_constant_return() {
        let (text, diagnostics) = generate("func answer() -> i32 { return 42; }");
        assert!(!diagnostics.had_error());
        assert!(text.contains("define i32 @answer()"));
        assert!(text.contains("ret i32 42"));
    }

    #[test]
    fn renames_user_main_and_synthesizes_entry_point() {
        let (text, diagnostics) = generate("func main() -> i32 { return 0; }");
        assert!(!diagnostics.had_error());
        assert!(text.contains("define i32 @ivy_main()"));
        assert!(text.contains("define i32 @main(i32 %t0, ptr %t1)"));
        assert!(text.contains("call i32 @ivy_main()"));
    }

    #[test]
    fn void_user_main_exits_with_zero() {
        let (text, diagnostics) = generate("func main() { }");
        assert!(!diagnostics.had_error());
        assert!(text.contains("define void @ivy_main()"));
        assert!(text.contains("call void @ivy_main()"));
        assert!(text.contains("ret i32 0"));
    }

    #[test]
    fn parameters_are_spilled_to_slots() {
        let (text, diagnostics) = generate("func add(a: i32, b: i32) -> i32 { return a + b; }");
        assert!(!diagnostics.had_error());
        assert!(text.contains("define i32 @add(i32 %t0, i32 %t1)"));
        assert!(text.contains("%t2 = alloca i32"));
        assert!(text.contains("store i32 %t0, ptr %t2"));
        assert!(text.contains("add i32"));
    }

    #[test]
    fn forward_references_resolve_through_the_prototype_pass() {
        let (text, diagnostics) = generate(
            "func caller() -> i32 { return callee(); }\n\
             func callee() -> i32 { return 7; }",
        );
        assert!(!diagnostics.had_error());
        assert!(text.contains("call i32 @callee()"));
    }

    #[test]
    fn if_creates_then_else_and_merge_blocks() {
        let (text, diagnostics) = generate(
            "func f(x: i32) -> i32 { if (x < 0) { return 0; } return x; }",
        );
        assert!(!diagnostics.had_error());
        assert!(text.contains("icmp slt i32"));
        assert!(text.contains("then:"));
        assert!(text.contains("else:"));
        assert!(text.contains("ifcont:"));
        assert!(text.contains("br label %ifcont"));
    }

    #[test]
    fn return_inside_branch_does_not_double_terminate() {
        let (text, diagnostics) = generate(
            "func f(x: i32) -> i32 { if (x < 0) { return 0; } else { return 1; } return 2; }",
        );
        assert!(!diagnostics.had_error());
        // Each branch keeps its return; no branch to the merge block
        // follows a return.
        assert!(!text.contains("ret i32 0\n  br"));
    }

    #[test]
    fn while_forms_a_back_edge() {
        let (text, diagnostics) = generate(
            "func f() -> i32 { var i: i32 = 0; while (i < 3) { i = i + 1; } return i; }",
        );
        assert!(!diagnostics.had_error());
        assert!(text.contains("loop_cond:"));
        assert!(text.contains("loop_body:"));
        assert!(text.contains("after_loop:"));
        assert!(text.contains("br label %loop_cond"));
    }

    #[test]
    fn desugared_for_loop_lowers_as_while() {
        let (text, diagnostics) = generate(
            "func f() -> i32 { var s: i32 = 0; for (var i: i32 = 0; i < 4; i++) { s += i; } return s; }",
        );
        assert!(!diagnostics.had_error());
        assert!(text.contains("loop_cond:"));
        assert!(text.contains("icmp slt i32"));
        assert!(text.contains("add i32"));
    }

    #[test]
    fn float_operands_select_the_float_instruction_family() {
        let (text, diagnostics) = generate(
            "func f(x: f32) -> f32 { return x * 2.0 - 0.5; }",
        );
        assert!(!diagnostics.had_error());
        assert!(text.contains("fmul float"));
        assert!(text.contains("fsub float"));
    }

    #[test]
    fn ternary_lowers_to_select() {
        let (text, diagnostics) = generate(
            "func f(x: i32) -> i32 { return x < 0 ? 0 : x; }",
        );
        assert!(!diagnostics.had_error());
        assert!(text.contains("select i1"));
    }

    #[test]
    fn unknown_variable_is_reported_and_lowering_continues() {
        let source = "func f() -> i32 { return nope; }";
        let mut diagnostics = Diagnostics::new();
        let statements = {
            let mut parser = Parser::new(Lexer::new(source), &mut diagnostics);
            parser.parse()
        };
        let module = CodeGenerator::new(&mut diagnostics).generate(&statements);
        assert!(diagnostics.had_error());
        assert!(
            diagnostics
                .entries()
                .iter()
                .any(|d| d.message == "Unknown variable: nope")
        );
        assert!(module.to_string().contains("ret i32 undef"));
    }

    #[test]
    fn missing_return_in_non_void_function_is_fatal() {
        let source = "func f() -> i32 { }";
        let mut diagnostics = Diagnostics::new();
        let statements = {
            let mut parser = Parser::new(Lexer::new(source), &mut diagnostics);
            parser.parse()
        };
        let _ = CodeGenerator::new(&mut diagnostics).generate(&statements);
        assert!(
            diagnostics
                .entries()
                .iter()
                .any(|d| d.message == "Function f does not return a value")
        );
    }

    #[test]
    fn void_function_gets_an_implicit_return() {
        let (text, diagnostics) = generate("func f() { var x: i32 = 1; }");
        assert!(!diagnostics.had_error());
        assert!(text.contains("ret void"));
    }

    #[test]
    fn generation_is_deterministic() {
        let source = "func main() -> i32 {\n\
             var a: i32 = 1;\n\
             var b: i32 = 2;\n\
             var c: i32 = 3;\n\
             if (a < b) { c = a; } else { c = b; }\n\
             while (c < 10) { c += a; }\n\
             return helper(a, b) + c;\n\
             }\n\
             func helper(x: i32, y: i32) -> i32 { return x * y % 7; }";
        let mut first_diag = Diagnostics::new();
        let first_stmts = {
            let mut parser = Parser::new(Lexer::new(source), &mut first_diag);
            parser.parse()
        };
        let first = CodeGenerator::new(&mut first_diag).generate(&first_stmts).to_string();

        let mut second_diag = Diagnostics::new();
        let second_stmts = {
            let mut parser = Parser::new(Lexer::new(source), &mut second_diag);
            parser.parse()
        };
        let second = CodeGenerator::new(&mut second_diag)
            .generate(&second_stmts)
            .to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn char_literals_lower_to_their_byte_value() {
        let (text, diagnostics) = generate("func f() { var c: char = 'A'; var n: char = '\\n'; }");
        assert!(!diagnostics.had_error());
        assert!(text.contains("store i8 65"));
        assert!(text.contains("store i8 10"));
    }
}
