//! Abstract syntax tree for Ivy.
//!
//! Nodes are built bottom-up by the parser, handed whole to the code
//! generator for one read-only traversal, and then dropped. Every child
//! is owned by exactly one parent; the tree is acyclic and nothing is
//! shared, which the `Box`/`Vec` ownership encodes directly.
//!
//! Traversal is double dispatch: `accept` on a statement or expression
//! calls the one [`Visitor`] method matching the concrete node kind.
//! Both the code generator and the AST printer go through this contract.

use crate::lexer::TokenKind;

/// The closed set of primitive type annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
    Char,
    Void,
}

impl TypeKind {
    /// Maps a primitive-type token onto its type kind.
    pub fn from_token(kind: TokenKind) -> Option<TypeKind> {
        match kind {
            TokenKind::I8 => Some(TypeKind::I8),
            TokenKind::I16 => Some(TypeKind::I16),
            TokenKind::I32 => Some(TypeKind::I32),
            TokenKind::I64 => Some(TypeKind::I64),
            TokenKind::U8 => Some(TypeKind::U8),
            TokenKind::U16 => Some(TypeKind::U16),
            TokenKind::U32 => Some(TypeKind::U32),
            TokenKind::U64 => Some(TypeKind::U64),
            TokenKind::F32 => Some(TypeKind::F32),
            TokenKind::F64 => Some(TypeKind::F64),
            TokenKind::Bool => Some(TypeKind::Bool),
            TokenKind::String => Some(TypeKind::String),
            TokenKind::Char => Some(TypeKind::Char),
            TokenKind::Void => Some(TypeKind::Void),
            _ => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeKind::F32 | TypeKind::F64)
    }
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct BlockStmt {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    /// Ordered parameter name/type pairs.
    pub params: Vec<(String, TypeKind)>,
    pub return_type: TypeKind,
    pub body: BlockStmt,
}

#[derive(Debug, PartialEq)]
pub struct VarDecl {
    pub ty: TypeKind,
    pub name: String,
    pub initializer: Option<Expr>,
    pub is_const: bool,
}

#[derive(Debug, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct ExpressionStmt {
    pub expr: Expr,
}

/// Statement node. `for` has no variant: the parser desugars it into a
/// block holding the initializer and a while loop.
#[derive(Debug, PartialEq)]
pub enum Stmt {
    Block(BlockStmt),
    Function(FunctionDecl),
    Var(VarDecl),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
    Expression(ExpressionStmt),
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: TokenKind,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct UnaryExpr {
    pub op: TokenKind,
    pub operand: Box<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct AssignExpr {
    pub op: TokenKind,
    /// Must resolve to an identifier; the parser enforces this.
    pub target: Box<Expr>,
    pub value: Box<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct IdentifierExpr {
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub struct LiteralExpr {
    pub kind: TokenKind,
    pub value: String,
}

#[derive(Debug, PartialEq)]
pub struct GroupingExpr {
    pub expression: Box<Expr>,
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Assign(AssignExpr),
    Call(CallExpr),
    Identifier(IdentifierExpr),
    Literal(LiteralExpr),
    Grouping(GroupingExpr),
}

// ---------------------------------------------------------------------
// Visitor
// ---------------------------------------------------------------------

/// One visit method per concrete node kind; the sole traversal contract.
pub trait Visitor {
    fn visit_block(&mut self, node: &BlockStmt);
    fn visit_function(&mut self, node: &FunctionDecl);
    fn visit_var_decl(&mut self, node: &VarDecl);
    fn visit_if(&mut self, node: &IfStmt);
    fn visit_while(&mut self, node: &WhileStmt);
    fn visit_return(&mut self, node: &ReturnStmt);
    fn visit_expression_stmt(&mut self, node: &ExpressionStmt);

    fn visit_binary(&mut self, node: &BinaryExpr);
    fn visit_unary(&mut self, node: &UnaryExpr);
    fn visit_assign(&mut self, node: &AssignExpr);
    fn visit_call(&mut self, node: &CallExpr);
    fn visit_identifier(&mut self, node: &IdentifierExpr);
    fn visit_literal(&mut self, node: &LiteralExpr);
    fn visit_grouping(&mut self, node: &GroupingExpr);
}

impl Stmt {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Stmt::Block(node) => visitor.visit_block(node),
            Stmt::Function(node) => visitor.visit_function(node),
            Stmt::Var(node) => visitor.visit_var_decl(node),
            Stmt::If(node) => visitor.visit_if(node),
            Stmt::While(node) => visitor.visit_while(node),
            Stmt::Return(node) => visitor.visit_return(node),
            Stmt::Expression(node) => visitor.visit_expression_stmt(node),
        }
    }
}

impl Expr {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Expr::Binary(node) => visitor.visit_binary(node),
            Expr::Unary(node) => visitor.visit_unary(node),
            Expr::Assign(node) => visitor.visit_assign(node),
            Expr::Call(node) => visitor.visit_call(node),
            Expr::Identifier(node) => visitor.visit_identifier(node),
            Expr::Literal(node) => visitor.visit_literal(node),
            Expr::Grouping(node) => visitor.visit_grouping(node),
        }
    }

    /// Shallow numeric-widening heuristic, not type inference.
    ///
    /// Identifiers and calls always report the default integer kind; no
    /// symbol table is consulted. This imprecision is intentional and the
    /// code generator does not rely on it for instruction selection.
    pub fn result_type(&self) -> TypeKind {
        match self {
            Expr::Binary(node) => {
                if node.left.result_type().is_float() || node.right.result_type().is_float() {
                    TypeKind::F64
                } else {
                    TypeKind::I64
                }
            }
            Expr::Unary(node) => node.operand.result_type(),
            Expr::Assign(node) => node.target.result_type(),
            Expr::Call(_) => TypeKind::I32,
            Expr::Identifier(_) => TypeKind::I32,
            Expr::Literal(node) => match node.kind {
                TokenKind::IntLiteral => TypeKind::I32,
                TokenKind::FloatLiteral => TypeKind::F32,
                TokenKind::True | TokenKind::False => TypeKind::Bool,
                TokenKind::StringLiteral => TypeKind::String,
                TokenKind::CharLiteral => TypeKind::Char,
                _ => TypeKind::I32,
            },
            Expr::Grouping(node) => node.expression.result_type(),
        }
    }
}
