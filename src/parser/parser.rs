use super::ast::{
    BType, BinaryOp, Block, BlockItem, CompUnit, Decl, Def, Expr, FuncDef, Precedence, Span,
    Stmt, UnaryOp,
};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};

/// Recursive-descent parser for the SysY fragment
///
/// Binary expressions are parsed by precedence climbing over the six binary
/// layers; every layer is left-associative.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Creates a new parser over a token stream ending in `Eof`
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parses the tokens into a compilation unit
    pub fn parse(&mut self) -> Result<CompUnit> {
        let func_def = self.parse_func_def()?;
        if !self.is_at_end() {
            return Err(self.expected_error("end of file"));
        }
        Ok(CompUnit { func_def })
    }

    /// Parses a standalone expression (used by tests and tooling)
    pub fn parse_standalone_expr(&mut self) -> Result<Expr> {
        let expr = self.parse_expr()?;
        if !self.is_at_end() {
            return Err(self.expected_error("end of file"));
        }
        Ok(expr)
    }

    fn parse_func_def(&mut self) -> Result<FuncDef> {
        let ret_type = self.parse_btype()?;
        let name_token = self.peek().clone();
        let ident = self.consume_identifier()?;
        self.consume(TokenKind::LeftParen)?;
        self.consume(TokenKind::RightParen)?;
        let block = self.parse_block()?;

        Ok(FuncDef {
            ret_type,
            ident,
            block,
            span: Span::new(name_token.line, name_token.column),
        })
    }

    fn parse_btype(&mut self) -> Result<BType> {
        match self.peek().kind {
            TokenKind::Int => {
                self.advance();
                Ok(BType::Int)
            }
            TokenKind::Void => {
                self.advance();
                Ok(BType::Void)
            }
            _ => Err(self.expected_error("type")),
        }
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.consume(TokenKind::LeftBrace)?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(Error::UnexpectedEof);
            }
            items.push(self.parse_block_item()?);
        }
        self.consume(TokenKind::RightBrace)?;
        Ok(Block { items })
    }

    fn parse_block_item(&mut self) -> Result<BlockItem> {
        match self.peek().kind {
            TokenKind::Const | TokenKind::Int | TokenKind::Void => {
                Ok(BlockItem::Decl(self.parse_decl()?))
            }
            _ => Ok(BlockItem::Stmt(self.parse_stmt()?)),
        }
    }

    fn parse_decl(&mut self) -> Result<Decl> {
        let start = self.peek().clone();
        let is_const = self.match_kind(&TokenKind::Const);
        let ty = self.parse_btype()?;

        let mut defs = vec![self.parse_def()?];
        while self.match_kind(&TokenKind::Comma) {
            defs.push(self.parse_def()?);
        }
        self.consume(TokenKind::Semicolon)?;

        Ok(Decl {
            is_const,
            ty,
            defs,
            span: Span::new(start.line, start.column),
        })
    }

    fn parse_def(&mut self) -> Result<Def> {
        let token = self.peek().clone();
        let ident = self.consume_identifier()?;
        let init = if self.match_kind(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Def {
            ident,
            init,
            span: Span::new(token.line, token.column),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::Return => {
                let token = self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.consume(TokenKind::Semicolon)?;
                Ok(Stmt::Return {
                    value,
                    span: Span::new(token.line, token.column),
                })
            }
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Expr(None))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(Some(expr)))
            }
        }
    }

    /// `Exp ::= LOrExp`
    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_binary(Precedence::LOr)
    }

    /// Precedence climbing: parse operators binding at least as tight as `min`
    fn parse_binary(&mut self, min: Precedence) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = Self::binary_op(&self.peek().kind) {
            let prec = op.precedence();
            if prec < min {
                break;
            }
            self.advance();

            // Right operand only absorbs strictly tighter operators: left associativity
            let rhs = match prec.next() {
                Some(next) => self.parse_binary(next)?,
                None => self.parse_unary()?,
            };
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(op, operand))
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Ident {
                    name,
                    span: Span::new(token.line, token.column),
                })
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume(TokenKind::RightParen)?;
                Ok(Expr::paren(inner))
            }
            TokenKind::Eof => Err(Error::UnexpectedEof),
            _ => Err(self.expected_error("expression")),
        }
    }

    fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::LtEq => Some(BinaryOp::Le),
            TokenKind::GtEq => Some(BinaryOp::Ge),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::Ne),
            TokenKind::AndAnd => Some(BinaryOp::And),
            TokenKind::OrOr => Some(BinaryOp::Or),
            _ => None,
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current - 1].clone()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.expected_error(&format!("`{}`", kind)))
        }
    }

    fn consume_identifier(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.expected_error("identifier")),
        }
    }

    fn expected_error(&self, expected: &str) -> Error {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            return Error::UnexpectedEof;
        }
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: format!("`{}`", token.lexeme),
            line: token.line,
            col: token.column,
        }
    }
}
