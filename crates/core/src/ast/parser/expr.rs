use std::rc::Rc;

use crate::ast::error::{SyntaxError, SyntaxResult};
use crate::ast::node::{ArrayItem, BinaryOp, ClassRef, Expr, ExprKind, MagicConstant, UnaryOp};
use crate::ast::token::Token;

use super::Parser;

const TERNARY_BP: u8 = 5;
const NOT_BP: u8 = 18;
const PREFIX_BP: u8 = 20;

const CASTS: &[(&str, &str)] = &[
    ("int", "int"),
    ("integer", "int"),
    ("bool", "bool"),
    ("boolean", "bool"),
    ("float", "float"),
    ("double", "float"),
    ("real", "float"),
    ("string", "string"),
    ("binary", "string"),
    ("array", "array"),
    ("object", "object"),
    ("unset", "unset"),
];

const UNSUPPORTED: &[&str] = &[
    "match", "throw", "clone", "print", "yield", "include", "include_once", "require",
    "require_once", "list", "eval",
];

/// Binding power and associativity of an infix operator token.
fn infix(token: &Token) -> Option<(BinaryOp, u8, bool)> {
    let entry = match token {
        Token::Name(name) => match name.to_ascii_lowercase().as_str() {
            "or" => (BinaryOp::LogicalOr, 1, false),
            "xor" => (BinaryOp::LogicalXor, 2, false),
            "and" => (BinaryOp::LogicalAnd, 3, false),
            "instanceof" => (BinaryOp::Instanceof, 19, false),
            _ => return None,
        },
        Token::QuestionQuestion => (BinaryOp::Coalesce, 6, true),
        Token::PipePipe => (BinaryOp::BooleanOr, 7, false),
        Token::AmpAmp => (BinaryOp::BooleanAnd, 8, false),
        Token::Pipe => (BinaryOp::BitOr, 9, false),
        Token::Caret => (BinaryOp::BitXor, 10, false),
        Token::Amp => (BinaryOp::BitAnd, 11, false),
        Token::Equal => (BinaryOp::Equal, 12, false),
        Token::NotEqual => (BinaryOp::NotEqual, 12, false),
        Token::Identical => (BinaryOp::Identical, 12, false),
        Token::NotIdentical => (BinaryOp::NotIdentical, 12, false),
        Token::Spaceship => (BinaryOp::Spaceship, 12, false),
        Token::Less => (BinaryOp::Less, 13, false),
        Token::LessEqual => (BinaryOp::LessEqual, 13, false),
        Token::Greater => (BinaryOp::Greater, 13, false),
        Token::GreaterEqual => (BinaryOp::GreaterEqual, 13, false),
        Token::Dot => (BinaryOp::Concat, 14, false),
        Token::ShiftLeft => (BinaryOp::ShiftLeft, 15, false),
        Token::ShiftRight => (BinaryOp::ShiftRight, 15, false),
        Token::Plus => (BinaryOp::Add, 16, false),
        Token::Minus => (BinaryOp::Sub, 16, false),
        Token::Star => (BinaryOp::Mul, 17, false),
        Token::Slash => (BinaryOp::Div, 17, false),
        Token::Percent => (BinaryOp::Mod, 17, false),
        Token::Pow => (BinaryOp::Pow, 21, true),
        _ => return None,
    };
    Some(entry)
}

impl Parser {
    pub(super) fn parse_expression(&mut self) -> SyntaxResult<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> SyntaxResult<Expr> {
        let mut left = self.parse_prefix()?;
        loop {
            if self.at(&Token::Question) {
                if TERNARY_BP < min_bp {
                    break;
                }
                self.advance();
                let then = if self.eat(&Token::Colon) {
                    None
                } else {
                    let then = self.parse_expr_bp(0)?;
                    self.expect(&Token::Colon, "`:`")?;
                    Some(Box::new(then))
                };
                let otherwise = self.parse_expr_bp(TERNARY_BP + 1)?;
                let line = left.line;
                left = Expr::new(
                    ExprKind::Ternary { condition: Box::new(left), then, otherwise: Box::new(otherwise) },
                    line,
                );
                continue;
            }

            let Some((op, bp, right_assoc)) = infix(self.peek()) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let right = self.parse_expr_bp(if right_assoc { bp } else { bp + 1 })?;
            let line = left.line;
            left = Expr::new(
                ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                line,
            );
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> SyntaxResult<Expr> {
        let line = self.line();
        let unary = match self.peek() {
            Token::Minus => Some((UnaryOp::Neg, PREFIX_BP)),
            Token::Plus => Some((UnaryOp::Plus, PREFIX_BP)),
            Token::Tilde => Some((UnaryOp::BitNot, PREFIX_BP)),
            Token::Bang => Some((UnaryOp::Not, NOT_BP)),
            _ => None,
        };
        if let Some((op, bp)) = unary {
            self.advance();
            let operand = self.parse_expr_bp(bp)?;
            return Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, line));
        }

        if let Some(to) = self.cast_target() {
            self.pos += 3;
            let operand = self.parse_expr_bp(PREFIX_BP)?;
            return Ok(Expr::new(
                ExprKind::Cast { to: to.to_string(), operand: Box::new(operand) },
                line,
            ));
        }

        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn cast_target(&self) -> Option<&'static str> {
        if !self.at(&Token::LeftParen) || self.peek_at(2) != &Token::RightParen {
            return None;
        }
        let name = self.peek_at(1).simple_name()?;
        CASTS.iter().find(|(written, _)| name.eq_ignore_ascii_case(written)).map(|(_, to)| *to)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> SyntaxResult<Expr> {
        loop {
            let line = expr.line;
            match self.peek() {
                Token::Arrow | Token::NullsafeArrow => {
                    self.advance();
                    let member = match self.peek() {
                        Token::Name(name) if !name.contains('\\') => name.clone(),
                        Token::Variable(name) => format!("${name}"),
                        _ => return Err(self.unexpected("property or method name")),
                    };
                    self.advance();
                    expr = if self.at(&Token::LeftParen) {
                        let args = self.parse_args()?;
                        Expr::new(
                            ExprKind::MethodCall { target: Box::new(expr), method: member, args },
                            line,
                        )
                    } else {
                        Expr::new(
                            ExprKind::PropertyFetch { target: Box::new(expr), property: member },
                            line,
                        )
                    };
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = if self.eat(&Token::RightBracket) {
                        None
                    } else {
                        let index = self.parse_expression()?;
                        self.expect(&Token::RightBracket, "`]`")?;
                        Some(Box::new(index))
                    };
                    expr = Expr::new(ExprKind::ArrayDim { target: Box::new(expr), index }, line);
                }
                Token::LeftParen => {
                    let args = self.parse_args()?;
                    expr = Expr::new(ExprKind::DynamicCall { callee: Box::new(expr), args }, line);
                }
                Token::DoubleColon | Token::Increment | Token::Decrement | Token::Assign
                | Token::AssignOp(_) => {
                    return Err(SyntaxError::UnsupportedExpression {
                        what: format!("{} after {}", self.peek(), expr.kind.kind_name()),
                        line: self.line(),
                    });
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> SyntaxResult<Expr> {
        let line = self.line();
        let kind = match self.peek().clone() {
            Token::Int(value) => ExprKind::Int(value),
            Token::Float(value) => ExprKind::Float(value),
            Token::String(value) => ExprKind::String(value),
            Token::Template(value) => ExprKind::Template(value),
            Token::Variable(name) => ExprKind::Variable(name),
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RightParen, "`)`")?;
                return Ok(inner);
            }
            Token::LeftBracket => {
                self.advance();
                let items = self.parse_array_items(&Token::RightBracket)?;
                return Ok(Expr::new(ExprKind::Array(items), line));
            }
            Token::AttributeStart => {
                self.skip_attribute()?;
                return self.parse_primary();
            }
            Token::Name(name) => return self.parse_name_expression(&name, line),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(Expr::new(kind, line))
    }

    fn parse_name_expression(&mut self, name: &str, line: u32) -> SyntaxResult<Expr> {
        let lower = name.to_ascii_lowercase();
        let next = self.peek_at(1).clone();

        match lower.as_str() {
            "array" if next == Token::LeftParen => {
                self.pos += 2;
                let items = self.parse_array_items(&Token::RightParen)?;
                return Ok(Expr::new(ExprKind::Array(items), line));
            }
            "new" => return self.parse_new(line),
            "function" | "fn" if matches!(next, Token::LeftParen | Token::Amp) => {
                let closure = self.parse_closure()?;
                return Ok(Expr::new(ExprKind::Closure(Rc::new(closure)), line));
            }
            "static" if next.is_keyword("function") || next.is_keyword("fn") => {
                self.advance();
                let closure = self.parse_closure()?;
                return Ok(Expr::new(ExprKind::Closure(Rc::new(closure)), line));
            }
            "self" | "static" | "parent" if next == Token::DoubleColon => {
                self.advance();
                let class = match lower.as_str() {
                    "self" => ClassRef::SelfRef,
                    "static" => ClassRef::Static,
                    _ => ClassRef::Parent,
                };
                return self.parse_class_access(class, line);
            }
            word if UNSUPPORTED.contains(&word) => {
                return Err(SyntaxError::UnsupportedExpression { what: word.to_string(), line });
            }
            _ => {}
        }

        self.advance();
        match self.peek() {
            Token::LeftParen => {
                let name = self.names.resolve_function(name);
                let args = self.parse_args()?;
                Ok(Expr::new(ExprKind::FunctionCall { name, args }, line))
            }
            Token::DoubleColon => {
                let class = ClassRef::Named(self.names.resolve_class(name));
                self.parse_class_access(class, line)
            }
            _ => match MagicConstant::from_name(name) {
                Some(magic) => Ok(Expr::new(ExprKind::MagicConstant(magic), line)),
                None => Ok(Expr::new(ExprKind::ConstFetch(self.names.resolve_constant(name)), line)),
            },
        }
    }

    /// Member access after `Class::`.
    fn parse_class_access(&mut self, class: ClassRef, line: u32) -> SyntaxResult<Expr> {
        self.expect(&Token::DoubleColon, "`::`")?;
        match self.peek().clone() {
            Token::Name(member) if member.eq_ignore_ascii_case("class") => {
                self.advance();
                Ok(Expr::new(ExprKind::ClassName(class), line))
            }
            Token::Name(member) if !member.contains('\\') => {
                self.advance();
                if self.at(&Token::LeftParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::new(ExprKind::StaticCall { class, method: member, args }, line))
                } else {
                    Ok(Expr::new(ExprKind::ClassConstFetch { class, constant: member }, line))
                }
            }
            Token::Variable(property) => {
                self.advance();
                Ok(Expr::new(ExprKind::StaticPropertyFetch { class, property }, line))
            }
            _ => Err(self.unexpected("class member")),
        }
    }

    fn parse_new(&mut self, line: u32) -> SyntaxResult<Expr> {
        self.advance();
        if self.at_anonymous_class_after(0) {
            // Harvested separately by statement scanning.
            self.parse_anonymous_class()?;
            return Ok(Expr::new(ExprKind::New { class: None, args: Vec::new() }, line));
        }

        let class = match self.peek().clone() {
            Token::Name(name) => {
                self.advance();
                match name.to_ascii_lowercase().as_str() {
                    "self" => Some(ClassRef::SelfRef),
                    "static" => Some(ClassRef::Static),
                    "parent" => Some(ClassRef::Parent),
                    _ => Some(ClassRef::Named(self.names.resolve_class(&name))),
                }
            }
            Token::Variable(_) => {
                self.advance();
                None
            }
            _ => return Err(self.unexpected("class name")),
        };
        let args = if self.at(&Token::LeftParen) { self.parse_args()? } else { Vec::new() };
        Ok(Expr::new(ExprKind::New { class, args }, line))
    }

    fn parse_args(&mut self) -> SyntaxResult<Vec<Expr>> {
        self.expect(&Token::LeftParen, "`(`")?;
        let mut args = Vec::new();
        // First-class callable syntax: `f(...)`.
        if self.at(&Token::Ellipsis) && self.peek_at(1) == &Token::RightParen {
            self.pos += 2;
            return Ok(args);
        }
        loop {
            if self.eat(&Token::RightParen) {
                return Ok(args);
            }
            if self.peek().simple_name().is_some() && self.peek_at(1) == &Token::Colon {
                self.pos += 2;
            }
            self.eat(&Token::Ellipsis);
            args.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RightParen, "`)`")?;
                return Ok(args);
            }
        }
    }

    fn parse_array_items(&mut self, close: &Token) -> SyntaxResult<Vec<ArrayItem>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            let spread = self.eat(&Token::Ellipsis);
            let mut by_ref = self.eat(&Token::Amp);
            let mut value = self.parse_expression()?;
            let mut key = None;
            if !spread && !by_ref && self.eat(&Token::DoubleArrow) {
                key = Some(value);
                by_ref = self.eat(&Token::Amp);
                value = self.parse_expression()?;
            }
            items.push(ArrayItem { key, value, by_ref, spread });
            if !self.eat(&Token::Comma) {
                self.expect(close, "end of array")?;
                return Ok(items);
            }
        }
    }
}
