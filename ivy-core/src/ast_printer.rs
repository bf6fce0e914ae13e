//! Indented AST dump used by the parser diagnostic mode.

use crate::ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, ExpressionStmt, FunctionDecl, GroupingExpr,
    IdentifierExpr, IfStmt, LiteralExpr, ReturnStmt, Stmt, UnaryExpr, VarDecl, Visitor, WhileStmt,
};

/// Renders one line per node, two-space indented per nesting level, with
/// the node kind and its identifying text where one exists.
pub fn print_ast(statements: &[Stmt]) -> String {
    let mut printer = AstPrinter {
        output: String::new(),
        indent: 0,
    };
    for stmt in statements {
        stmt.accept(&mut printer);
    }
    printer.output
}

struct AstPrinter {
    output: String,
    indent: usize,
}

impl AstPrinter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }
}

impl Visitor for AstPrinter {
    fn visit_block(&mut self, node: &BlockStmt) {
        self.line("Block:");
        self.indent += 1;
        for stmt in &node.statements {
            stmt.accept(self);
        }
        self.indent -= 1;
    }

    fn visit_function(&mut self, node: &FunctionDecl) {
        self.line(&format!("Function: {}", node.name));
        self.indent += 1;
        for (name, _) in &node.params {
            self.line(&format!("Parameter: {}", name));
        }
        self.visit_block(&node.body);
        self.indent -= 1;
    }

    fn visit_var_decl(&mut self, node: &VarDecl) {
        self.line(&format!("VarDecl: {}", node.name));
        self.indent += 1;
        if let Some(initializer) = &node.initializer {
            initializer.accept(self);
        }
        self.indent -= 1;
    }

    fn visit_if(&mut self, node: &IfStmt) {
        self.line("If:");
        self.indent += 1;
        node.condition.accept(self);
        node.then_branch.accept(self);
        if let Some(else_branch) = &node.else_branch {
            else_branch.accept(self);
        }
        self.indent -= 1;
    }

    fn visit_while(&mut self, node: &WhileStmt) {
        self.line("WhileStmt:");
        self.indent += 1;
        node.condition.accept(self);
        node.body.accept(self);
        self.indent -= 1;
    }

    fn visit_return(&mut self, node: &ReturnStmt) {
        self.line("ReturnStmt:");
        self.indent += 1;
        if let Some(value) = &node.value {
            value.accept(self);
        }
        self.indent -= 1;
    }

    fn visit_expression_stmt(&mut self, node: &ExpressionStmt) {
        self.line("ExpressionStmt:");
        self.indent += 1;
        node.expr.accept(self);
        self.indent -= 1;
    }

    fn visit_binary(&mut self, node: &BinaryExpr) {
        self.line(&format!("Binary: {}", node.op.name()));
        self.indent += 1;
        node.left.accept(self);
        node.right.accept(self);
        self.indent -= 1;
    }

    fn visit_unary(&mut self, node: &UnaryExpr) {
        self.line(&format!("UnaryExpr: {}", node.op.name()));
        self.indent += 1;
        node.operand.accept(self);
        self.indent -= 1;
    }

    fn visit_assign(&mut self, node: &AssignExpr) {
        self.line("AssignExpr:");
        self.indent += 1;
        node.target.accept(self);
        node.value.accept(self);
        self.indent -= 1;
    }

    fn visit_call(&mut self, node: &CallExpr) {
        self.line("CallExpr:");
        self.indent += 1;
        node.callee.accept(self);
        for argument in &node.arguments {
            argument.accept(self);
        }
        self.indent -= 1;
    }

    fn visit_identifier(&mut self, node: &IdentifierExpr) {
        self.line(&format!("Identifier: {}", node.name));
    }

    fn visit_literal(&mut self, node: &LiteralExpr) {
        self.line(&format!("Literal: {}", node.value));
    }

    fn visit_grouping(&mut self, node: &GroupingExpr) {
        self.line("GroupingExpr:");
        self.indent += 1;
        node.expression.accept(self);
        self.indent -= 1;
    }
}
