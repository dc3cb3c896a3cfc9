//! Human-readable syntax tree dump (`dump-tree` mode)

use super::ast::{Block, BlockItem, CompUnit, Decl, Expr, FuncDef, Stmt};

/// Render a compilation unit as a single nested line
pub fn dump_tree(unit: &CompUnit) -> String {
    let mut out = String::new();
    out.push_str("CompUnitAST { ");
    dump_func_def(&unit.func_def, &mut out);
    out.push_str(" }");
    out
}

fn dump_func_def(func: &FuncDef, out: &mut String) {
    out.push_str(&format!(
        "FuncDefAST {{ FuncTypeAST {{ {} }}, {}, ",
        func.ret_type, func.ident
    ));
    dump_block(&func.block, out);
    out.push_str(" }");
}

fn dump_block(block: &Block, out: &mut String) {
    out.push_str("BlockAST {");
    for (i, item) in block.items.iter().enumerate() {
        out.push_str(if i == 0 { " " } else { ", " });
        match item {
            BlockItem::Decl(decl) => dump_decl(decl, out),
            BlockItem::Stmt(stmt) => dump_stmt(stmt, out),
        }
    }
    out.push_str(" }");
}

fn dump_decl(decl: &Decl, out: &mut String) {
    let name = if decl.is_const {
        "ConstDeclAST"
    } else {
        "VarDeclAST"
    };
    out.push_str(&format!("{} {{ {} ", name, decl.ty));
    for (i, def) in decl.defs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&def.ident);
        if let Some(init) = &def.init {
            out.push_str(" = ");
            dump_expr(init, out);
        }
    }
    out.push_str(" }");
}

fn dump_stmt(stmt: &Stmt, out: &mut String) {
    match stmt {
        Stmt::Return { value, .. } => {
            out.push_str("StmtAST { return");
            if let Some(value) = value {
                out.push(' ');
                dump_expr(value, out);
            }
            out.push_str("; }");
        }
        Stmt::Block(block) => dump_block(block, out),
        Stmt::Expr(expr) => {
            out.push_str("StmtAST { ");
            if let Some(expr) = expr {
                dump_expr(expr, out);
            }
            out.push_str("; }");
        }
    }
}

fn dump_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Number(n) => out.push_str(&n.to_string()),
        Expr::Ident { name, .. } => out.push_str(name),
        Expr::Paren(inner) => {
            out.push('(');
            dump_expr(inner, out);
            out.push(')');
        }
        Expr::Unary { op, operand } => {
            out.push_str(&format!("UnaryExpAST {{ {}", op));
            dump_expr(operand, out);
            out.push_str(" }");
        }
        Expr::Binary { op, lhs, rhs } => {
            out.push_str(&format!("{}AST {{ ", op.precedence().layer_name()));
            dump_expr(lhs, out);
            out.push_str(&format!(" {} ", op));
            dump_expr(rhs, out);
            out.push_str(" }");
        }
    }
}
