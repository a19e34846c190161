use crate::ast::error::SyntaxResult;
use crate::ast::node::{
    ClassConstant, ClassKind, ClassLike, ClassMember, EnumCase, FunctionKind, FunctionLike, Name,
    Param, Property, Visibility,
};
use crate::ast::token::Token;
use crate::identifier::CLOSURE_NAME;

use super::Parser;

#[derive(Debug, Default)]
struct Modifiers {
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
    is_final: bool,
    is_readonly: bool,
}

impl Parser {
    /// Named class, interface, trait or enum, with leading modifiers.
    pub(super) fn parse_class_declaration(&mut self) -> SyntaxResult<ClassLike> {
        let line = self.line();
        let column = self.column();
        let mut modifiers = Modifiers::default();
        loop {
            if self.eat_keyword("abstract") {
                modifiers.is_abstract = true;
            } else if self.eat_keyword("final") {
                modifiers.is_final = true;
            } else if self.eat_keyword("readonly") {
                modifiers.is_readonly = true;
            } else {
                break;
            }
        }

        let kind = if self.eat_keyword("class") {
            ClassKind::Class
        } else if self.eat_keyword("interface") {
            ClassKind::Interface
        } else if self.eat_keyword("trait") {
            ClassKind::Trait
        } else if self.eat_keyword("enum") {
            ClassKind::Enum
        } else {
            return Err(self.unexpected("class-like declaration"));
        };

        let name = self.expect_identifier("class name")?;
        let namespaced_name = self.names.declare(&name);
        let backing_type =
            if kind == ClassKind::Enum && self.eat(&Token::Colon) { self.parse_type() } else { None };

        let mut class = self.parse_class_tail(kind, line, column)?;
        class.name = Some(name);
        class.namespaced_name = Some(namespaced_name);
        class.backing_type = backing_type;
        class.is_abstract = modifiers.is_abstract;
        class.is_final = modifiers.is_final;
        class.is_readonly = modifiers.is_readonly;
        Ok(class)
    }

    /// `class (args) extends ... implements ... { ... }` after `new`.
    pub(super) fn parse_anonymous_class(&mut self) -> SyntaxResult<ClassLike> {
        let is_readonly = self.eat_keyword("readonly");
        let line = self.line();
        let column = self.column();
        if !self.eat_keyword("class") {
            return Err(self.unexpected("`class`"));
        }
        if self.at(&Token::LeftParen) {
            self.skip_group()?;
        }
        let mut class = self.parse_class_tail(ClassKind::Class, line, column)?;
        class.is_readonly = is_readonly;
        Ok(class)
    }

    fn parse_class_tail(&mut self, kind: ClassKind, line: u32, column: u32) -> SyntaxResult<ClassLike> {
        let mut extends = Vec::new();
        if self.eat_keyword("extends") {
            extends = self.parse_class_name_list()?;
        }
        let mut implements = Vec::new();
        if self.eat_keyword("implements") {
            implements = self.parse_class_name_list()?;
        }
        self.expect(&Token::LeftBrace, "`{`")?;
        let members = self.parse_class_body()?;

        Ok(ClassLike {
            kind,
            name: None,
            namespaced_name: None,
            is_abstract: false,
            is_final: false,
            is_readonly: false,
            extends,
            implements,
            backing_type: None,
            members,
            line,
            end_line: self.previous_line(),
            column,
        })
    }

    fn parse_class_name(&mut self) -> SyntaxResult<Name> {
        let written = match self.peek() {
            Token::Name(name) => name.clone(),
            _ => return Err(self.unexpected("class name")),
        };
        self.advance();
        Ok(self.names.resolve_class(&written))
    }

    fn parse_class_name_list(&mut self) -> SyntaxResult<Vec<Name>> {
        let mut names = vec![self.parse_class_name()?];
        while self.eat(&Token::Comma) {
            names.push(self.parse_class_name()?);
        }
        Ok(names)
    }

    fn parse_class_body(&mut self) -> SyntaxResult<Vec<ClassMember>> {
        let mut members = Vec::new();
        loop {
            match self.peek() {
                Token::RightBrace => {
                    self.advance();
                    return Ok(members);
                }
                Token::Eof => return Err(self.unexpected("`}`")),
                Token::AttributeStart => self.skip_attribute()?,
                Token::Semicolon => self.advance(),
                _ => self.parse_member(&mut members)?,
            }
        }
    }

    fn visibility_keyword(&self) -> Option<Visibility> {
        if self.at_keyword("public") {
            Some(Visibility::Public)
        } else if self.at_keyword("protected") {
            Some(Visibility::Protected)
        } else if self.at_keyword("private") {
            Some(Visibility::Private)
        } else {
            None
        }
    }

    /// Consume a visibility keyword and an optional `(set)` suffix.
    fn eat_visibility(&mut self) -> SyntaxResult<Option<Visibility>> {
        let Some(visibility) = self.visibility_keyword() else {
            return Ok(None);
        };
        self.advance();
        if self.at(&Token::LeftParen) && self.peek_at(1).is_keyword("set") {
            self.skip_group()?;
        }
        Ok(Some(visibility))
    }

    fn parse_member(&mut self, members: &mut Vec<ClassMember>) -> SyntaxResult<()> {
        let line = self.line();

        if self.eat_keyword("use") {
            let names = self.parse_class_name_list()?;
            if self.at(&Token::LeftBrace) {
                self.skip_group()?;
            } else {
                self.expect(&Token::Semicolon, "`;` or `{`")?;
            }
            members.push(ClassMember::TraitUse(names));
            return Ok(());
        }

        if self.eat_keyword("case") {
            let name = self.expect_identifier("case name")?;
            let value = if self.eat(&Token::Assign) { Some(self.parse_expression()?) } else { None };
            self.expect(&Token::Semicolon, "`;`")?;
            members.push(ClassMember::EnumCase(EnumCase { name, value, line }));
            return Ok(());
        }

        let mut modifiers = Modifiers::default();
        loop {
            if let Some(visibility) = self.eat_visibility()? {
                modifiers.visibility = Some(visibility);
            } else if self.eat_keyword("var") {
                modifiers.visibility = Some(Visibility::Public);
            } else if self.at_keyword("static") && !matches!(self.peek_at(1), Token::DoubleColon) {
                self.advance();
                modifiers.is_static = true;
            } else if self.eat_keyword("abstract") {
                modifiers.is_abstract = true;
            } else if self.eat_keyword("final") {
                modifiers.is_final = true;
            } else if self.eat_keyword("readonly") {
                modifiers.is_readonly = true;
            } else {
                break;
            }
        }

        if self.eat_keyword("const") {
            self.parse_class_constants(&modifiers, members)
        } else if self.at_keyword("function") {
            let method = self.parse_method(&modifiers)?;
            members.push(ClassMember::Method(method.into()));
            Ok(())
        } else {
            self.parse_properties(&modifiers, members)
        }
    }

    fn parse_class_constants(
        &mut self,
        modifiers: &Modifiers,
        members: &mut Vec<ClassMember>,
    ) -> SyntaxResult<()> {
        let type_hint = match (self.peek(), self.peek_at(1)) {
            (Token::Name(_), Token::Assign) => None,
            _ => self.parse_type(),
        };
        loop {
            let line = self.line();
            let name = self.expect_identifier("constant name")?;
            self.expect(&Token::Assign, "`=`")?;
            let value = self.parse_expression()?;
            members.push(ClassMember::Constant(ClassConstant {
                name,
                value,
                visibility: modifiers.visibility.unwrap_or(Visibility::Public),
                is_final: modifiers.is_final,
                type_hint: type_hint.clone(),
                line,
            }));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Semicolon, "`;`")
    }

    fn parse_properties(
        &mut self,
        modifiers: &Modifiers,
        members: &mut Vec<ClassMember>,
    ) -> SyntaxResult<()> {
        let type_hint = self.parse_type();
        loop {
            let line = self.line();
            let name = match self.peek() {
                Token::Variable(name) => name.clone(),
                _ => return Err(self.unexpected("class member")),
            };
            self.advance();
            let default = if self.eat(&Token::Assign) { Some(self.parse_expression()?) } else { None };
            members.push(ClassMember::Property(Property {
                name,
                default,
                type_hint: type_hint.clone(),
                visibility: modifiers.visibility.unwrap_or(Visibility::Public),
                is_static: modifiers.is_static,
                is_readonly: modifiers.is_readonly,
                line,
            }));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if self.at(&Token::LeftBrace) {
            // Property hooks.
            self.skip_group()
        } else {
            self.expect(&Token::Semicolon, "`;`")
        }
    }

    fn parse_method(&mut self, modifiers: &Modifiers) -> SyntaxResult<FunctionLike> {
        let line = self.line();
        let column = self.column();
        self.advance();
        let by_ref = self.eat(&Token::Amp);
        let name = self.expect_identifier("method name")?;
        let params = self.parse_params()?;
        let return_type = self.parse_return_type();
        let body = if self.eat(&Token::LeftBrace) {
            Some(self.parse_block_body()?)
        } else {
            self.expect(&Token::Semicolon, "`;` or `{`")?;
            None
        };

        Ok(FunctionLike {
            kind: FunctionKind::Method,
            namespaced_name: name.clone(),
            name,
            params,
            return_type,
            by_ref,
            is_static: modifiers.is_static,
            is_abstract: modifiers.is_abstract,
            is_final: modifiers.is_final,
            visibility: Some(modifiers.visibility.unwrap_or(Visibility::Public)),
            body,
            line,
            end_line: self.previous_line(),
            column,
        })
    }

    pub(super) fn parse_function_declaration(&mut self) -> SyntaxResult<FunctionLike> {
        let line = self.line();
        let column = self.column();
        self.advance();
        let by_ref = self.eat(&Token::Amp);
        let name = self.expect_identifier("function name")?;
        let namespaced_name = self.names.declare(&name);
        let params = self.parse_params()?;
        let return_type = self.parse_return_type();
        self.expect(&Token::LeftBrace, "`{`")?;
        let body = self.parse_block_body()?;

        Ok(FunctionLike {
            kind: FunctionKind::Function,
            name,
            namespaced_name,
            params,
            return_type,
            by_ref,
            is_static: false,
            is_abstract: false,
            is_final: false,
            visibility: None,
            body: Some(body),
            line,
            end_line: self.previous_line(),
            column,
        })
    }

    /// Closure or arrow function starting at `function` / `fn`.
    pub(super) fn parse_closure(&mut self) -> SyntaxResult<FunctionLike> {
        let is_static = matches!(self.previous(), Some(token) if token.is_keyword("static"));
        let line = self.line();
        let column = self.column();
        let arrow = self.at_keyword("fn");
        self.advance();
        let by_ref = self.eat(&Token::Amp);
        let params = self.parse_params()?;

        let mut body = Vec::new();
        let return_type = if arrow {
            let return_type = self.parse_return_type();
            self.expect(&Token::DoubleArrow, "`=>`")?;
            self.scan_expression(&mut body)?;
            return_type
        } else {
            if self.eat_keyword("use") {
                self.skip_group()?;
            }
            let return_type = self.parse_return_type();
            self.expect(&Token::LeftBrace, "`{`")?;
            body = self.parse_block_body()?;
            return_type
        };

        Ok(FunctionLike {
            kind: if arrow { FunctionKind::ArrowFunction } else { FunctionKind::Closure },
            name: CLOSURE_NAME.to_string(),
            namespaced_name: CLOSURE_NAME.to_string(),
            params,
            return_type,
            by_ref,
            is_static,
            is_abstract: false,
            is_final: false,
            visibility: None,
            body: Some(body),
            line,
            end_line: self.previous_line(),
            column,
        })
    }

    fn parse_return_type(&mut self) -> Option<String> {
        if self.eat(&Token::Colon) {
            self.parse_type()
        } else {
            None
        }
    }

    fn parse_params(&mut self) -> SyntaxResult<Vec<Param>> {
        self.expect(&Token::LeftParen, "`(`")?;
        let mut params = Vec::new();
        loop {
            while self.at(&Token::AttributeStart) {
                self.skip_attribute()?;
            }
            if self.eat(&Token::RightParen) {
                return Ok(params);
            }

            let line = self.line();
            let mut promoted = None;
            loop {
                if let Some(visibility) = self.eat_visibility()? {
                    promoted = Some(visibility);
                } else if self.eat_keyword("readonly") {
                    promoted.get_or_insert(Visibility::Public);
                } else {
                    break;
                }
            }

            let type_hint = self.parse_type();
            let by_ref = self.eat(&Token::Amp);
            let variadic = self.eat(&Token::Ellipsis);
            let name = match self.peek() {
                Token::Variable(name) => name.clone(),
                _ => return Err(self.unexpected("parameter variable")),
            };
            self.advance();
            let default = if self.eat(&Token::Assign) { Some(self.parse_expression()?) } else { None };
            if self.at(&Token::LeftBrace) {
                self.skip_group()?;
            }

            params.push(Param { name, default, type_hint, by_ref, variadic, promoted, line });
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RightParen, "`)`")?;
                return Ok(params);
            }
        }
    }

    /// Type declaration as written. Stops before a by-reference marker, the
    /// declared name of a typed constant, or anything that cannot be part of
    /// a type.
    pub(super) fn parse_type(&mut self) -> Option<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut last_was_name = false;
        loop {
            match self.peek() {
                Token::Name(name) => {
                    if last_was_name || self.peek_at(1) == &Token::Assign {
                        break;
                    }
                    text.push_str(name);
                    last_was_name = true;
                    self.advance();
                    continue;
                }
                Token::Question => text.push('?'),
                Token::Pipe => text.push('|'),
                Token::Amp if !matches!(self.peek_at(1), Token::Variable(_) | Token::Ellipsis) => {
                    text.push('&')
                }
                Token::LeftParen => {
                    depth += 1;
                    text.push('(');
                }
                Token::RightParen if depth > 0 => {
                    depth -= 1;
                    text.push(')');
                }
                _ => break,
            }
            last_was_name = false;
            self.advance();
        }
        (!text.is_empty()).then_some(text)
    }
}
