//! IR Generator - lowers the syntax tree to IR
//!
//! Every expression lowers to an [`Operand`]. Layers without an operator cost
//! nothing; each binary operator emits exactly one instruction into the block
//! under construction and consumes exactly one temporary.
//!
//! Logical `&&` and `||` do not short-circuit. Both sides are lowered, each is
//! normalized with `ne x, 0`, and the two truth values are combined with
//! bitwise `and` / `or`.

use super::instruction::{IrInstruction, Opcode, Operand, Temp};
use super::program::{BasicBlock, IrFunction, IrProgram, IrType};
use crate::parser::{
    BType, BinaryOp, Block, BlockItem, CompUnit, Decl, Expr, FuncDef, Span, Stmt, UnaryOp,
};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Name the lowering accepts for the single supported function
pub const ENTRY_FUNCTION: &str = "main";

/// What an identifier is bound to in the current scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    /// Operand of the initializer
    operand: Operand,
    /// Declared with `const`
    is_const: bool,
}

/// IR Generator - per-compilation lowering context
///
/// Owns the temporary counter for the whole compilation unit, so two
/// generators never share numbering and a fresh generator always starts at
/// `%0`.
pub struct IrGenerator {
    /// Next temporary number
    next_temp: u32,
    /// Instructions of the block under construction
    instructions: Vec<IrInstruction>,
    /// Lexical scopes, innermost last
    scopes: Vec<HashMap<String, Binding>>,
    /// Set while lowering a `const` initializer
    in_const_init: bool,
    /// Set once the current function has returned
    terminated: bool,
}

impl IrGenerator {
    /// Create a new IR generator
    pub fn new() -> Self {
        Self {
            next_temp: 0,
            instructions: Vec::new(),
            scopes: Vec::new(),
            in_const_init: false,
            terminated: false,
        }
    }

    /// Number of temporaries emitted so far
    pub fn temps_emitted(&self) -> u32 {
        self.next_temp
    }

    /// Lower a compilation unit
    pub fn generate(&mut self, unit: &CompUnit) -> Result<IrProgram> {
        let func = self.generate_function(&unit.func_def)?;
        Ok(IrProgram {
            functions: vec![func],
        })
    }

    fn generate_function(&mut self, func: &FuncDef) -> Result<IrFunction> {
        if func.ident != ENTRY_FUNCTION {
            return Err(unsupported(
                format!("function '{}' (only '{}' is supported)", func.ident, ENTRY_FUNCTION),
                func.span,
            ));
        }
        if func.ret_type != BType::Int {
            return Err(unsupported(
                format!("return type '{}' of '{}'", func.ret_type, func.ident),
                func.span,
            ));
        }

        debug!("Lowering function '{}'", func.ident);
        self.terminated = false;
        self.instructions.clear();

        self.generate_block(&func.block)?;

        if !self.terminated {
            warn!(
                "Function '{}' does not return on every path, inserting 'ret 0'",
                func.ident
            );
            self.emit(IrInstruction::Return(Some(Operand::Imm(0))));
            self.terminated = true;
        }

        let mut entry = BasicBlock::new("entry");
        entry.instructions = std::mem::take(&mut self.instructions);
        debug!(
            "Lowered '{}': {} instructions, {} temporaries",
            func.ident,
            entry.instructions.len(),
            self.next_temp
        );

        Ok(IrFunction {
            name: func.ident.clone(),
            ret_ty: IrType::I32,
            blocks: vec![entry],
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn generate_block(&mut self, block: &Block) -> Result<()> {
        self.scopes.push(HashMap::new());
        let result = self.generate_items(&block.items);
        self.scopes.pop();
        result
    }

    fn generate_items(&mut self, items: &[BlockItem]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            if self.terminated {
                debug!("Skipping {} unreachable item(s) after return", items.len() - i);
                break;
            }
            match item {
                BlockItem::Decl(decl) => self.generate_decl(decl)?,
                BlockItem::Stmt(stmt) => self.generate_statement(stmt)?,
            }
        }
        Ok(())
    }

    fn generate_decl(&mut self, decl: &Decl) -> Result<()> {
        if decl.ty != BType::Int {
            return Err(unsupported(format!("declaration of type '{}'", decl.ty), decl.span));
        }

        for def in &decl.defs {
            let init = def.init.as_ref().ok_or_else(|| {
                unsupported(format!("variable '{}' without initializer", def.ident), def.span)
            })?;

            if self.current_scope_has(&def.ident) {
                return Err(Error::Redeclaration {
                    name: def.ident.clone(),
                    line: def.span.line,
                    col: def.span.column,
                });
            }

            self.in_const_init = decl.is_const;
            let lowered = self.generate_expr(init);
            self.in_const_init = false;
            let operand = lowered?;

            trace!("bind {} = {}", def.ident, operand);
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(
                    def.ident.clone(),
                    Binding {
                        operand,
                        is_const: decl.is_const,
                    },
                );
            }
        }
        Ok(())
    }

    fn generate_statement(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Return { value, span } => {
                let value = value
                    .as_ref()
                    .ok_or_else(|| unsupported("'return' without a value", *span))?;
                let operand = self.generate_expr(value)?;
                self.emit(IrInstruction::Return(Some(operand)));
                self.terminated = true;
                Ok(())
            }
            Stmt::Block(block) => self.generate_block(block),
            Stmt::Expr(Some(expr)) => {
                // Evaluated for its instructions, value discarded
                self.generate_expr(expr)?;
                Ok(())
            }
            Stmt::Expr(None) => Ok(()),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Lower an expression, returning the operand holding its value
    pub fn generate_expr(&mut self, expr: &Expr) -> Result<Operand> {
        match expr {
            Expr::Number(n) => Ok(Operand::Imm(*n)),

            Expr::Ident { name, span } => self.lookup(name, *span),

            Expr::Paren(inner) => self.generate_expr(inner),

            Expr::Unary { op, operand } => {
                let value = self.generate_expr(operand)?;
                match op {
                    UnaryOp::Plus => Ok(value),
                    UnaryOp::Neg => Ok(self.emit_binary(Opcode::Sub, Operand::Imm(0), value)),
                    UnaryOp::Not => Ok(self.emit_binary(Opcode::Eq, value, Operand::Imm(0))),
                }
            }

            Expr::Binary { op, lhs, rhs } => {
                let left = self.generate_expr(lhs)?;
                let right = self.generate_expr(rhs)?;
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        let l = self.emit_binary(Opcode::Ne, left, Operand::Imm(0));
                        let r = self.emit_binary(Opcode::Ne, right, Operand::Imm(0));
                        let combine = if *op == BinaryOp::And {
                            Opcode::And
                        } else {
                            Opcode::Or
                        };
                        Ok(self.emit_binary(combine, l, r))
                    }
                    _ => Ok(self.emit_binary(opcode_for(*op), left, right)),
                }
            }
        }
    }

    fn lookup(&self, name: &str, span: Span) -> Result<Operand> {
        let binding = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| Error::UndefinedIdentifier {
                name: name.to_string(),
                line: span.line,
                col: span.column,
            })?;

        if self.in_const_init && !binding.is_const {
            return Err(Error::NonConstantInitializer {
                name: name.to_string(),
                line: span.line,
                col: span.column,
            });
        }
        Ok(binding.operand)
    }

    fn current_scope_has(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn alloc_temp(&mut self) -> Temp {
        let temp = Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    fn emit_binary(&mut self, op: Opcode, lhs: Operand, rhs: Operand) -> Operand {
        let dst = self.alloc_temp();
        self.emit(IrInstruction::Binary { dst, op, lhs, rhs });
        Operand::Temp(dst)
    }

    fn emit(&mut self, instr: IrInstruction) {
        trace!("emit {}", instr);
        self.instructions.push(instr);
    }
}

impl Default for IrGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// IR opcode for a non-logical binary operator
fn opcode_for(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}

fn unsupported(construct: impl Into<String>, span: Span) -> Error {
    Error::Unsupported {
        construct: construct.into(),
        line: span.line,
        col: span.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn lower(source: &str) -> Result<IrProgram> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let unit = Parser::new(tokens).parse()?;
        IrGenerator::new().generate(&unit)
    }

    fn lower_text(source: &str) -> String {
        lower(source).unwrap().to_string()
    }

    #[test]
    fn test_literal_costs_nothing() {
        assert_eq!(
            lower_text("int main() { return ((((42)))); }"),
            "fun @main(): i32 {\n%entry:\n  ret 42\n}\n"
        );
    }

    #[test]
    fn test_precedence_order() {
        let text = lower_text("int main() { return 1 + 2 * 3; }");
        assert!(text.contains("  %0 = mul 2, 3\n  %1 = add 1, %0\n  ret %1\n"));
    }

    #[test]
    fn test_left_associative_subtraction() {
        let text = lower_text("int main() { return 2 - 3 - 4; }");
        assert!(text.contains("  %0 = sub 2, 3\n  %1 = sub %0, 4\n"));
    }

    #[test]
    fn test_unary_lowering() {
        let text = lower_text("int main() { return -!+5; }");
        assert!(text.contains("  %0 = eq 5, 0\n  %1 = sub 0, %0\n  ret %1\n"));
    }

    #[test]
    fn test_logical_normalization() {
        let text = lower_text("int main() { return 2 && 0 || 3; }");
        assert!(text.contains(
            "  %0 = ne 2, 0\n  %1 = ne 0, 0\n  %2 = and %0, %1\n  \
             %3 = ne %2, 0\n  %4 = ne 3, 0\n  %5 = or %3, %4\n  ret %5\n"
        ));
    }

    #[test]
    fn test_bindings_and_shadowing() {
        let text = lower_text(
            "int main() { const int a = 1 + 1; int b = a * 3; { int a = 7; b; } return a + b; }",
        );
        assert!(text.contains("  %0 = add 1, 1\n  %1 = mul %0, 3\n  %2 = add %0, %1\n  ret %2\n"));
    }

    #[test]
    fn test_implicit_return_and_unreachable() {
        assert!(lower_text("int main() { 1 + 1; }").ends_with("  %0 = add 1, 1\n  ret 0\n}\n"));
        assert!(lower_text("int main() { return 1; return 2 + 2; }").contains("  ret 1\n}"));
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(matches!(
            lower("int foo() { return 0; }"),
            Err(Error::Unsupported { line: 1, col: 5, .. })
        ));
        assert!(matches!(
            lower("void main() { return 0; }"),
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(
            lower("int main() { return; }"),
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(
            lower("int main() { int x; return 0; }"),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn test_scope_errors() {
        assert!(matches!(
            lower("int main() { return y; }"),
            Err(Error::UndefinedIdentifier { line: 1, col: 21, .. })
        ));
        assert!(matches!(
            lower("int main() { int a = 1, a = 2; return a; }"),
            Err(Error::Redeclaration { .. })
        ));
        assert!(matches!(
            lower("int main() { int v = 1; const int c = v; return c; }"),
            Err(Error::NonConstantInitializer { .. })
        ));
        assert!(matches!(
            lower("int main() { { int a = 1; } return a; }"),
            Err(Error::UndefinedIdentifier { .. })
        ));
    }

    #[test]
    fn test_counter_spans_unit() {
        let mut gen = IrGenerator::new();
        let tokens = Scanner::new("int main() { return 1 < 2 == 3 > 4; }")
            .scan_tokens()
            .unwrap();
        let unit = Parser::new(tokens).parse().unwrap();
        let program = gen.generate(&unit).unwrap();
        assert_eq!(gen.temps_emitted(), 3);
        let defs: Vec<u32> = program.instructions().filter_map(|i| i.def()).map(|t| t.0).collect();
        assert_eq!(defs, vec![0, 1, 2]);
    }

    #[test]
    fn test_every_block_ends_in_return() {
        for source in [
            "int main() { return 1; }",
            "int main() { 1 + 2; }",
            "int main() { { return 3; } 4; }",
        ] {
            let program = lower(source).unwrap();
            assert!(program.functions[0].blocks.iter().all(|b| b.is_terminated()));
        }
    }
}
