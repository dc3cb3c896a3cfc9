//! IR text reader
//!
//! Line-oriented parser for the IR text format. Accepts
//!
//! ```text
//! decl @name(): i32
//! fun @name(): i32 {
//! %label:
//!   %N = <opcode> <operand>, <operand>
//!   ret [<operand>]
//! }
//! ```
//!
//! where an operand is a decimal integer or the name of an earlier value.
//! Blank lines and `//` comments are ignored; indentation is free.

use super::{BlockData, FunctionData, Program, Type, ValueId, ValueKind};
use crate::compiler::ir::Opcode;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

/// Parse IR text into a structured program
pub fn parse(text: &str) -> Result<Program> {
    let mut reader = Reader::default();
    for (index, raw_line) in text.lines().enumerate() {
        reader.line = index + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        reader.parse_line(line)?;
    }
    reader.finish()
}

/// Function under construction
struct OpenFunction {
    data: FunctionData,
    /// Value names defined so far
    names: HashMap<String, ValueId>,
    /// Line of the `fun` header, for the missing-`}` diagnostic
    header_line: usize,
}

#[derive(Default)]
struct Reader {
    program: Program,
    current: Option<OpenFunction>,
    line: usize,
}

impl Reader {
    fn parse_line(&mut self, line: &str) -> Result<()> {
        if let Some(rest) = line.strip_prefix("decl ") {
            return self.parse_decl(rest);
        }
        if let Some(rest) = line.strip_prefix("fun ") {
            return self.parse_fun_header(rest);
        }
        if line == "}" {
            return self.close_function();
        }
        if let Some(label) = line.strip_suffix(':') {
            if !label.contains('=') {
                return self.open_block(label.trim());
            }
        }
        self.parse_instruction(line)
    }

    fn parse_decl(&mut self, rest: &str) -> Result<()> {
        if self.current.is_some() {
            return Err(self.error("'decl' inside a function body"));
        }
        let (name, ret_ty) = self.parse_signature(rest.trim())?;
        debug!("IR reader: declaration @{}", name);
        self.program.funcs.push(FunctionData::new(&name, ret_ty));
        Ok(())
    }

    fn parse_fun_header(&mut self, rest: &str) -> Result<()> {
        if self.current.is_some() {
            return Err(self.error("nested 'fun' (missing '}')"));
        }
        let signature = rest
            .trim()
            .strip_suffix('{')
            .ok_or_else(|| self.error("expected '{' at end of function header"))?;
        let (name, ret_ty) = self.parse_signature(signature.trim())?;
        debug!("IR reader: function @{}", name);
        self.current = Some(OpenFunction {
            data: FunctionData::new(&name, ret_ty),
            names: HashMap::new(),
            header_line: self.line,
        });
        Ok(())
    }

    /// `@name()` optionally followed by `: <type>`
    fn parse_signature(&self, text: &str) -> Result<(String, Type)> {
        let text = text
            .strip_prefix('@')
            .ok_or_else(|| self.error("expected '@' before function name"))?;
        let open = text
            .find('(')
            .ok_or_else(|| self.error("expected '(' after function name"))?;
        let name = &text[..open];
        if !is_identifier(name) {
            return Err(self.error(format!("invalid function name '{}'", name)));
        }
        let after = text[open + 1..]
            .trim_start()
            .strip_prefix(')')
            .ok_or_else(|| self.error("function parameters are not supported"))?
            .trim();

        let ret_ty = if after.is_empty() {
            Type::Unit
        } else {
            let ty = after
                .strip_prefix(':')
                .ok_or_else(|| self.error(format!("unexpected '{}' after parameters", after)))?
                .trim();
            match ty {
                "i32" => Type::I32,
                other => return Err(self.error(format!("unknown type '{}'", other))),
            }
        };
        Ok((name.to_string(), ret_ty))
    }

    fn close_function(&mut self) -> Result<()> {
        let open = self
            .current
            .take()
            .ok_or_else(|| self.error("'}' outside a function"))?;
        if open.data.blocks.is_empty() {
            return Err(self.error(format!("function @{} has no basic block", open.data.name)));
        }
        self.program.funcs.push(open.data);
        Ok(())
    }

    fn open_block(&mut self, label: &str) -> Result<()> {
        let line = self.line;
        let name = label
            .strip_prefix('%')
            .ok_or_else(|| self.error(format!("invalid block label '{}'", label)))?;
        if !is_identifier(name) {
            return Err(self.error(format!("invalid block label '{}'", label)));
        }
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| Error::malformed_ir(line, "block label outside a function"))?;
        if open.data.blocks.iter().any(|b| b.name == name) {
            return Err(Error::malformed_ir(line, format!("duplicate block label '%{}'", name)));
        }
        open.data.blocks.push(BlockData {
            name: name.to_string(),
            insts: Vec::new(),
        });
        Ok(())
    }

    fn parse_instruction(&mut self, line: &str) -> Result<()> {
        let line_no = self.line;
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| Error::malformed_ir(line_no, "instruction outside a function"))?;
        let block_terminated = match open.data.blocks.last() {
            None => return Err(Error::malformed_ir(line_no, "instruction outside a basic block")),
            Some(block) => block.insts.last().is_some_and(|&last| {
                matches!(
                    open.data.value(last).map(|v| v.kind),
                    Some(ValueKind::Return(_))
                )
            }),
        };
        if block_terminated {
            return Err(Error::malformed_ir(line_no, "instruction after 'ret'"));
        }

        let id = if let Some((dst, rhs)) = line.split_once('=') {
            parse_binary(open, line_no, dst.trim(), rhs.trim())?
        } else if line == "ret" {
            open.data.alloc(ValueKind::Return(None), None)
        } else if let Some(value) = line.strip_prefix("ret ") {
            let value = parse_operand(open, line_no, value.trim())?;
            open.data.alloc(ValueKind::Return(Some(value)), None)
        } else {
            return Err(Error::malformed_ir(
                line_no,
                format!("unrecognized line '{}'", line),
            ));
        };

        if let Some(block) = open.data.blocks.last_mut() {
            block.insts.push(id);
        }
        Ok(())
    }

    fn finish(self) -> Result<Program> {
        if let Some(open) = self.current {
            return Err(Error::malformed_ir(
                open.header_line,
                format!("function @{} is missing its closing '}}'", open.data.name),
            ));
        }
        Ok(self.program)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::malformed_ir(self.line, message)
    }
}

fn parse_binary(open: &mut OpenFunction, line: usize, dst: &str, rhs: &str) -> Result<ValueId> {
    if !is_value_name(dst) {
        return Err(Error::malformed_ir(line, format!("invalid value name '{}'", dst)));
    }
    if open.names.contains_key(dst) {
        return Err(Error::malformed_ir(line, format!("redefinition of '{}'", dst)));
    }

    let (opcode, operands) = rhs
        .split_once(char::is_whitespace)
        .ok_or_else(|| Error::malformed_ir(line, format!("expected operands after '{}'", rhs)))?;
    let op: Opcode = opcode.parse().map_err(|e: String| Error::malformed_ir(line, e))?;
    let (lhs, rhs) = operands
        .split_once(',')
        .ok_or_else(|| Error::malformed_ir(line, "expected two comma-separated operands"))?;
    let lhs = parse_operand(open, line, lhs.trim())?;
    let rhs = parse_operand(open, line, rhs.trim())?;

    let id = open
        .data
        .alloc(ValueKind::Binary { op, lhs, rhs }, Some(dst.to_string()));
    open.names.insert(dst.to_string(), id);
    Ok(id)
}

fn parse_operand(open: &mut OpenFunction, line: usize, text: &str) -> Result<ValueId> {
    if text.starts_with('%') {
        return open
            .names
            .get(text)
            .copied()
            .ok_or_else(|| Error::malformed_ir(line, format!("use of undefined value '{}'", text)));
    }
    let n: i32 = text
        .parse()
        .map_err(|_| Error::malformed_ir(line, format!("invalid operand '{}'", text)))?;
    Ok(open.data.alloc(ValueKind::Integer(n), None))
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_value_name(s: &str) -> bool {
    s.strip_prefix('%').is_some_and(is_identifier)
}
