use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position of a node (1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl Span {
    /// Creates a span at the given line and column
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Compilation unit: exactly one function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompUnit {
    /// The function definition
    pub func_def: FuncDef,
}

/// Base type named in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BType {
    /// `int`
    Int,
    /// `void`
    Void,
}

impl fmt::Display for BType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BType::Int => write!(f, "int"),
            BType::Void => write!(f, "void"),
        }
    }
}

/// Function definition: `BType IDENT "(" ")" Block`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    /// Declared return type
    pub ret_type: BType,
    /// Function name
    pub ident: String,
    /// Function body
    pub block: Block,
    /// Position of the function name
    pub span: Span,
}

/// Block: `"{" {BlockItem} "}"`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    /// Items in source order
    pub items: Vec<BlockItem>,
}

/// Declaration or statement inside a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockItem {
    /// Constant or variable declaration
    Decl(Decl),
    /// Statement
    Stmt(Stmt),
}

/// Declaration: `["const"] BType Def {"," Def} ";"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    /// `true` for `const` declarations
    pub is_const: bool,
    /// Declared base type
    pub ty: BType,
    /// One or more definitions
    pub defs: Vec<Def>,
    /// Position of the declaration's first token
    pub span: Span,
}

/// Single binding inside a declaration: `IDENT ["=" Exp]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Def {
    /// Bound identifier
    pub ident: String,
    /// Initializer, if any
    pub init: Option<Expr>,
    /// Position of the identifier
    pub span: Span,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `return [Exp];`
    Return {
        /// Returned expression
        value: Option<Expr>,
        /// Position of the `return` keyword
        span: Span,
    },
    /// Nested block
    Block(Block),
    /// `[Exp];` - evaluated and discarded
    Expr(Option<Expr>),
}

/// Expressions
///
/// Grammar layers without an operator are not represented: such a layer is its
/// child. A parenthesised expression is kept as an explicit pass-through node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    Number(i32),
    /// Reference to a declared name
    Ident {
        /// Identifier name
        name: String,
        /// Position of the reference
        span: Span,
    },
    /// `"(" Exp ")"`
    Paren(Box<Expr>),
    /// Prefix operator applied to an operand
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Left-associative binary operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Convenience constructor for binary nodes
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Convenience constructor for unary nodes
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Convenience constructor for parenthesised expressions
    pub fn paren(inner: Expr) -> Self {
        Expr::Paren(Box::new(inner))
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `&&`
    And,
    /// `||`
    Or,
}

/// Grammar layer of a binary operator, lowest binding first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precedence {
    /// `||`
    LOr = 1,
    /// `&&`
    LAnd = 2,
    /// `==` `!=`
    Eq = 3,
    /// `<` `>` `<=` `>=`
    Rel = 4,
    /// `+` `-`
    Add = 5,
    /// `*` `/` `%`
    Mul = 6,
}

impl Precedence {
    /// Next tighter-binding layer, `None` above multiplicative
    pub fn next(self) -> Option<Precedence> {
        match self {
            Precedence::LOr => Some(Precedence::LAnd),
            Precedence::LAnd => Some(Precedence::Eq),
            Precedence::Eq => Some(Precedence::Rel),
            Precedence::Rel => Some(Precedence::Add),
            Precedence::Add => Some(Precedence::Mul),
            Precedence::Mul => None,
        }
    }

    /// Grammar production name of the layer
    pub fn layer_name(self) -> &'static str {
        match self {
            Precedence::LOr => "LOrExp",
            Precedence::LAnd => "LAndExp",
            Precedence::Eq => "EqExp",
            Precedence::Rel => "RelExp",
            Precedence::Add => "AddExp",
            Precedence::Mul => "MulExp",
        }
    }
}

impl BinaryOp {
    /// Layer the operator belongs to
    pub fn precedence(self) -> Precedence {
        match self {
            BinaryOp::Or => Precedence::LOr,
            BinaryOp::And => Precedence::LAnd,
            BinaryOp::Eq | BinaryOp::Ne => Precedence::Eq,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => Precedence::Rel,
            BinaryOp::Add | BinaryOp::Sub => Precedence::Add,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => Precedence::Mul,
        }
    }

    /// Source spelling
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
