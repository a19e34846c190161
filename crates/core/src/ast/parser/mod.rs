//! Recursive-descent parser.
//!
//! Declarations and constant expressions are parsed fully. Any other
//! statement is scanned token by token up to its end, collecting the blocks,
//! closures and anonymous classes it contains so the locator can still find
//! declarations nested inside control structures and function bodies.

mod decl;
mod expr;

use std::rc::Rc;

use crate::ast::error::{SyntaxError, SyntaxResult};
use crate::ast::lexer::tokenize;
use crate::ast::names::{NameContext, UseKind};
use crate::ast::node::{ConstantDecl, ConstantKind, NamespaceBlock, SourceFile, Stmt};
use crate::ast::token::{Spanned, Token};

/// Parse a complete source file.
pub fn parse(source: &str) -> SyntaxResult<SourceFile> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0, names: NameContext::new() };
    let statements = parser.parse_top_level()?;
    Ok(SourceFile { statements })
}

struct Parser {
    /// Always ends with `Token::Eof`.
    tokens: Vec<Spanned>,
    pos: usize,
    names: NameContext,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).map(|idx| &self.tokens[idx].token)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn column(&self) -> u32 {
        self.tokens[self.pos].column
    }

    /// Line of the last consumed token.
    fn previous_line(&self) -> u32 {
        self.pos.checked_sub(1).map_or(1, |idx| self.tokens[idx].line)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.peek().to_string(),
            line: self.line(),
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> SyntaxResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// An unqualified name, keywords included.
    fn expect_identifier(&mut self, expected: &str) -> SyntaxResult<String> {
        match self.peek().simple_name() {
            Some(name) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            None => Err(self.unexpected(expected)),
        }
    }

    /// A possibly qualified name, without its leading separator.
    fn expect_qualified_name(&mut self, expected: &str) -> SyntaxResult<String> {
        match self.peek() {
            Token::Name(name) => {
                let name = name.trim_start_matches('\\').to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn parse_top_level(&mut self) -> SyntaxResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.at(&Token::Eof) {
            if self.at_namespace_declaration() {
                statements.push(self.parse_namespace()?);
            } else {
                self.parse_statement(&mut statements)?;
            }
        }
        Ok(statements)
    }

    fn at_namespace_declaration(&self) -> bool {
        self.at_keyword("namespace") && matches!(self.peek_at(1), Token::Name(_) | Token::LeftBrace)
    }

    fn parse_namespace(&mut self) -> SyntaxResult<Stmt> {
        let line = self.line();
        self.advance();
        let name = match self.peek() {
            Token::Name(_) => Some(self.expect_qualified_name("namespace name")?),
            _ => None,
        };
        self.names.enter_namespace(name.clone());

        let statements = if self.eat(&Token::LeftBrace) {
            let statements = self.parse_block_body()?;
            self.names.enter_namespace(None);
            statements
        } else {
            self.expect(&Token::Semicolon, "`;` or `{`")?;
            let mut statements = Vec::new();
            while !self.at(&Token::Eof) && !self.at_namespace_declaration() {
                self.parse_statement(&mut statements)?;
            }
            statements
        };

        Ok(Stmt::Namespace(NamespaceBlock { name, statements, line }))
    }

    /// Statements up to and including the closing `}`.
    fn parse_block_body(&mut self) -> SyntaxResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Token::RightBrace => {
                    self.advance();
                    return Ok(statements);
                }
                Token::Eof => return Err(self.unexpected("`}`")),
                _ => self.parse_statement(&mut statements)?,
            }
        }
    }

    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<()> {
        match self.peek() {
            Token::OpenTag | Token::InlineHtml(_) | Token::Semicolon => self.advance(),
            Token::AttributeStart => self.skip_attribute()?,
            Token::LeftBrace => {
                self.advance();
                let body = self.parse_block_body()?;
                out.push(Stmt::Block(body));
            }
            Token::RightBrace => return Err(self.unexpected("statement")),
            Token::Eof => {}
            Token::Name(_) => self.parse_keyword_statement(out)?,
            _ => self.scan_statement(out)?,
        }
        Ok(())
    }

    fn parse_keyword_statement(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<()> {
        let Token::Name(word) = self.peek() else {
            return self.scan_statement(out);
        };
        let next_is_name = self.peek_at(1).simple_name().is_some();

        match word.to_ascii_lowercase().as_str() {
            "use" => self.parse_use(),
            "class" | "interface" | "trait" if next_is_name => {
                out.push(Stmt::Class(Rc::new(self.parse_class_declaration()?)));
                Ok(())
            }
            "abstract" | "final" | "readonly" if self.modifiers_lead_to_class() => {
                out.push(Stmt::Class(Rc::new(self.parse_class_declaration()?)));
                Ok(())
            }
            "enum" if self.at_enum_declaration() => {
                out.push(Stmt::Class(Rc::new(self.parse_class_declaration()?)));
                Ok(())
            }
            "function" if self.at_function_declaration() => {
                out.push(Stmt::Function(Rc::new(self.parse_function_declaration()?)));
                Ok(())
            }
            "const" if next_is_name => {
                out.push(Stmt::Constants(self.parse_const_statement()?));
                Ok(())
            }
            "define" if self.peek_at(1) == &Token::LeftParen => self.parse_define(out),
            "__halt_compiler" => {
                self.pos = self.tokens.len() - 1;
                Ok(())
            }
            _ => self.scan_statement(out),
        }
    }

    fn modifiers_lead_to_class(&self) -> bool {
        let mut n = 0;
        while ["abstract", "final", "readonly"].iter().any(|m| self.peek_at(n).is_keyword(m)) {
            n += 1;
        }
        self.peek_at(n).is_keyword("class") && self.peek_at(n + 1).simple_name().is_some()
    }

    fn at_enum_declaration(&self) -> bool {
        self.peek_at(1).simple_name().is_some()
            && (matches!(self.peek_at(2), Token::LeftBrace | Token::Colon)
                || self.peek_at(2).is_keyword("implements"))
    }

    fn at_function_declaration(&self) -> bool {
        match self.peek_at(1) {
            Token::Amp => self.peek_at(2).simple_name().is_some(),
            other => other.simple_name().is_some(),
        }
    }

    fn use_kind(&mut self) -> Option<UseKind> {
        if !matches!(self.peek_at(1), Token::Name(_)) {
            return None;
        }
        if self.eat_keyword("function") {
            Some(UseKind::Function)
        } else if self.eat_keyword("const") {
            Some(UseKind::Constant)
        } else {
            None
        }
    }

    fn parse_use_alias(&mut self) -> SyntaxResult<Option<String>> {
        if self.eat_keyword("as") {
            Ok(Some(self.expect_identifier("alias")?))
        } else {
            Ok(None)
        }
    }

    /// `use A\B [as C], ...;` including group and function/const imports.
    fn parse_use(&mut self) -> SyntaxResult<()> {
        self.advance();
        let kind = self.use_kind();
        loop {
            let name = self.expect_qualified_name("imported name")?;
            if self.eat(&Token::Backslash) {
                self.expect(&Token::LeftBrace, "`{`")?;
                loop {
                    if self.eat(&Token::RightBrace) {
                        break;
                    }
                    let item_kind = self.use_kind().or(kind).unwrap_or(UseKind::Class);
                    let item = self.expect_qualified_name("imported name")?;
                    let alias = self.parse_use_alias()?;
                    self.names.add_use(item_kind, &format!("{name}\\{item}"), alias.as_deref());
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RightBrace, "`}`")?;
                        break;
                    }
                }
            } else {
                let alias = self.parse_use_alias()?;
                self.names.add_use(kind.unwrap_or(UseKind::Class), &name, alias.as_deref());
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Semicolon, "`;`")
    }

    /// `const A = 1, B = 2;`
    fn parse_const_statement(&mut self) -> SyntaxResult<Vec<Rc<ConstantDecl>>> {
        self.advance();
        let mut constants = Vec::new();
        loop {
            let line = self.line();
            let name = self.expect_identifier("constant name")?;
            self.expect(&Token::Assign, "`=`")?;
            let value = self.parse_expression()?;
            constants.push(Rc::new(ConstantDecl {
                namespaced_name: self.names.declare(&name),
                name,
                value: Some(value),
                kind: ConstantKind::Const,
                line,
            }));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Semicolon, "`;`")?;
        Ok(constants)
    }

    /// `define('NAME', value)`. Only a literal name declares a constant; a
    /// value that is not an expression leaves the declaration without one.
    fn parse_define(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<()> {
        let start = self.pos;
        let line = self.line();
        let name = match (self.peek_at(1), self.peek_at(2), self.peek_at(3)) {
            (Token::LeftParen, Token::String(name), Token::Comma) => {
                Some(String::from_utf8_lossy(name).into_owned())
            }
            _ => None,
        };

        if let Some(name) = name {
            self.pos += 4;
            let value = match self.parse_expression() {
                Ok(expr) if matches!(self.peek(), Token::RightParen | Token::Comma) => Some(expr),
                _ => None,
            };
            let name = name.trim_start_matches('\\').to_string();
            out.push(Stmt::Constants(vec![Rc::new(ConstantDecl {
                namespaced_name: name.clone(),
                name,
                value,
                kind: ConstantKind::Define,
                line,
            })]));
        }

        self.pos = start;
        self.scan_statement(out)
    }

    /// Skip an ordinary statement, collecting nested declarations.
    fn scan_statement(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Eof | Token::RightBrace => return Ok(()),
                Token::Semicolon => {
                    self.advance();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::LeftParen | Token::LeftBracket => {
                    depth += 1;
                    self.advance();
                }
                Token::RightParen | Token::RightBracket => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                Token::AttributeStart => self.skip_attribute()?,
                Token::LeftBrace => {
                    self.advance();
                    let body = self.parse_block_body()?;
                    out.push(Stmt::Block(body));
                    if depth == 0 && !self.continues_after_block() {
                        return Ok(());
                    }
                }
                _ => {
                    if !self.harvest_nested(out)? {
                        self.advance();
                    }
                }
            }
        }
    }

    /// Skip an expression that ends at `,`, `)`, `]`, `;` or `}` on its own
    /// nesting level, collecting nested declarations.
    fn scan_expression(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Eof | Token::Semicolon | Token::RightBrace => return Ok(()),
                Token::Comma | Token::RightParen | Token::RightBracket if depth == 0 => {
                    return Ok(())
                }
                Token::LeftParen | Token::LeftBracket => {
                    depth += 1;
                    self.advance();
                }
                Token::RightParen | Token::RightBracket => {
                    depth -= 1;
                    self.advance();
                }
                Token::AttributeStart => self.skip_attribute()?,
                Token::LeftBrace => {
                    self.advance();
                    let body = self.parse_block_body()?;
                    out.push(Stmt::Block(body));
                }
                _ => {
                    if !self.harvest_nested(out)? {
                        self.advance();
                    }
                }
            }
        }
    }

    fn continues_after_block(&self) -> bool {
        ["else", "elseif", "catch", "finally", "while"].iter().any(|kw| self.at_keyword(kw))
    }

    /// Parse a closure or anonymous class starting at the current token.
    fn harvest_nested(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<bool> {
        if self.at_closure_start() {
            let closure = self.parse_closure()?;
            out.push(Stmt::Closure(Rc::new(closure)));
            return Ok(true);
        }
        if self.at_keyword("new") && self.at_anonymous_class_after(1) {
            self.advance();
            let class = self.parse_anonymous_class()?;
            out.push(Stmt::AnonymousClass(Rc::new(class)));
            return Ok(true);
        }
        Ok(false)
    }

    fn at_closure_start(&self) -> bool {
        let keyword = self.at_keyword("function") || self.at_keyword("fn");
        let member_access =
            matches!(self.previous(), Some(Token::Arrow | Token::NullsafeArrow | Token::DoubleColon));
        let opens = match self.peek_at(1) {
            Token::LeftParen => true,
            Token::Amp => self.peek_at(2) == &Token::LeftParen,
            _ => false,
        };
        keyword && !member_access && opens
    }

    fn at_anonymous_class_after(&self, n: usize) -> bool {
        self.peek_at(n).is_keyword("class")
            || (self.peek_at(n).is_keyword("readonly") && self.peek_at(n + 1).is_keyword("class"))
    }

    /// Skip `#[ ... ]`.
    fn skip_attribute(&mut self) -> SyntaxResult<()> {
        let line = self.line();
        self.advance();
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Token::AttributeStart | Token::LeftBracket => depth += 1,
                Token::RightBracket => depth -= 1,
                Token::Eof => return Err(SyntaxError::Unterminated { what: "attribute", line }),
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip a bracketed group starting at the current opener.
    fn skip_group(&mut self) -> SyntaxResult<()> {
        let line = self.line();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::LeftParen | Token::LeftBracket | Token::LeftBrace | Token::AttributeStart => {
                    depth += 1
                }
                Token::RightParen | Token::RightBracket | Token::RightBrace => {
                    depth = depth.saturating_sub(1)
                }
                Token::Eof => return Err(SyntaxError::Unterminated { what: "group", line }),
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }
}
