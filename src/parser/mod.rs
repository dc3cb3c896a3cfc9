//! SysY parser module
//!
//! Parses the token stream into the syntax tree and renders it for `dump-tree`.

mod ast;
mod dump;
#[allow(clippy::module_inception)]
mod parser;

pub use ast::{
    BType, BinaryOp, Block, BlockItem, CompUnit, Decl, Def, Expr, FuncDef, Precedence, Span,
    Stmt, UnaryOp,
};
pub use dump::dump_tree;
pub use parser::Parser;
