//! Syntax tree produced by the parser.
//!
//! Declarations are parsed completely; statement bodies are reduced to the
//! nested declarations they contain (blocks, closures, anonymous classes,
//! conditionally declared classes and functions). Declaration nodes are held
//! in `Rc` so reflection handles can share them with the parse cache.

use std::rc::Rc;

/// A parsed file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceFile {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Namespace(NamespaceBlock),
    Class(Rc<ClassLike>),
    Function(Rc<FunctionLike>),
    Constants(Vec<Rc<ConstantDecl>>),
    /// A braced block, or the body of a control structure.
    Block(Vec<Stmt>),
    /// A closure or arrow function found inside a statement.
    Closure(Rc<FunctionLike>),
    /// `new class { ... }` found inside a statement.
    AnonymousClass(Rc<ClassLike>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceBlock {
    /// `None` for the global namespace (`namespace { ... }`).
    pub name: Option<String>,
    pub statements: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl ClassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Trait => "trait",
            ClassKind::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Class, interface, trait or enum declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLike {
    pub kind: ClassKind,
    /// Short name; `None` for anonymous classes.
    pub name: Option<String>,
    /// Fully-qualified name without a leading separator.
    pub namespaced_name: Option<String>,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_readonly: bool,
    /// Parent class for classes, parent interfaces for interfaces.
    pub extends: Vec<Name>,
    pub implements: Vec<Name>,
    /// Backing type of a backed enum (`int` or `string`).
    pub backing_type: Option<String>,
    pub members: Vec<ClassMember>,
    pub line: u32,
    pub end_line: u32,
    pub column: u32,
}

impl ClassLike {
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn constant(&self, name: &str) -> Option<&ClassConstant> {
        self.members.iter().find_map(|member| match member {
            ClassMember::Constant(constant) if constant.name == name => Some(constant),
            _ => None,
        })
    }

    pub fn enum_case(&self, name: &str) -> Option<&EnumCase> {
        self.members.iter().find_map(|member| match member {
            ClassMember::EnumCase(case) if case.name == name => Some(case),
            _ => None,
        })
    }

    /// Method by name, case-insensitively.
    pub fn method(&self, name: &str) -> Option<&Rc<FunctionLike>> {
        self.methods().find(|method| method.name.eq_ignore_ascii_case(name))
    }

    pub fn methods(&self) -> impl Iterator<Item = &Rc<FunctionLike>> {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.members.iter().find_map(|member| match member {
            ClassMember::Property(property) if property.name == name => Some(property),
            _ => None,
        })
    }

    pub fn used_traits(&self) -> impl Iterator<Item = &Name> {
        self.members
            .iter()
            .filter_map(|member| match member {
                ClassMember::TraitUse(names) => Some(names.iter()),
                _ => None,
            })
            .flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Constant(ClassConstant),
    Property(Property),
    Method(Rc<FunctionLike>),
    TraitUse(Vec<Name>),
    EnumCase(EnumCase),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassConstant {
    pub name: String,
    pub value: Expr,
    pub visibility: Visibility,
    pub is_final: bool,
    pub type_hint: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub default: Option<Expr>,
    pub type_hint: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_readonly: bool,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumCase {
    pub name: String,
    pub value: Option<Expr>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Method,
    Closure,
    ArrowFunction,
}

/// Function, method, closure or arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLike {
    pub kind: FunctionKind,
    /// Short name; `{closure}` for closures and arrow functions.
    pub name: String,
    /// Fully-qualified name for functions; equal to `name` otherwise.
    pub namespaced_name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub by_ref: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub visibility: Option<Visibility>,
    /// Nested declarations of the body; `None` when there is no body.
    pub body: Option<Vec<Stmt>>,
    pub line: u32,
    pub end_line: u32,
    pub column: u32,
}

impl FunctionLike {
    pub fn is_closure(&self) -> bool {
        matches!(self.kind, FunctionKind::Closure | FunctionKind::ArrowFunction)
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|param| param.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    /// Type declaration as written, e.g. `?int` or `A|B`.
    pub type_hint: Option<String>,
    pub by_ref: bool,
    pub variadic: bool,
    /// Visibility of a promoted constructor property.
    pub promoted: Option<Visibility>,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    /// `const X = ...;`
    Const,
    /// `define('X', ...);`
    Define,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDecl {
    pub name: String,
    pub namespaced_name: String,
    /// `None` when the value could not be parsed as an expression.
    pub value: Option<Expr>,
    pub kind: ConstantKind,
    pub line: u32,
}

/// A name as written plus its parse-time resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub written: String,
    /// Fully-qualified, without a leading separator.
    pub resolved: String,
    /// Global fallback for unqualified function and constant names inside a
    /// namespace.
    pub fallback: Option<String>,
}

impl Name {
    pub fn fully_qualified(name: impl Into<String>) -> Self {
        let written = name.into();
        let resolved = written.trim_start_matches('\\').to_string();
        Self { written, resolved, fallback: None }
    }

    /// True for `true`, `false` and `null` written without qualification.
    pub fn is_special_constant(&self, constant: &str) -> bool {
        self.written.trim_start_matches('\\').eq_ignore_ascii_case(constant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRef {
    Named(Name),
    SelfRef,
    Static,
    Parent,
}

impl ClassRef {
    pub fn describe(&self) -> &str {
        match self {
            ClassRef::Named(name) => &name.resolved,
            ClassRef::SelfRef => "self",
            ClassRef::Static => "static",
            ClassRef::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicConstant {
    Dir,
    File,
    Line,
    Class,
    Namespace,
    Function,
    Method,
    Trait,
}

impl MagicConstant {
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Some(match upper.as_str() {
            "__DIR__" => MagicConstant::Dir,
            "__FILE__" => MagicConstant::File,
            "__LINE__" => MagicConstant::Line,
            "__CLASS__" => MagicConstant::Class,
            "__NAMESPACE__" => MagicConstant::Namespace,
            "__FUNCTION__" => MagicConstant::Function,
            "__METHOD__" => MagicConstant::Method,
            "__TRAIT__" => MagicConstant::Trait,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    BooleanAnd,
    BooleanOr,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Spaceship,
    Coalesce,
    Instanceof,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Concat => ".",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BooleanAnd => "&&",
            BinaryOp::BooleanOr => "||",
            BinaryOp::LogicalAnd => "and",
            BinaryOp::LogicalOr => "or",
            BinaryOp::LogicalXor => "xor",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Spaceship => "<=>",
            BinaryOp::Coalesce => "??",
            BinaryOp::Instanceof => "instanceof",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub spread: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    String(Vec<u8>),
    /// Interpolated string; never constant.
    Template(String),
    Array(Vec<ArrayItem>),
    ConstFetch(Name),
    ClassConstFetch { class: ClassRef, constant: String },
    /// `X::class`.
    ClassName(ClassRef),
    MagicConstant(MagicConstant),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `then` is `None` for the short form `a ?: b`.
    Ternary { condition: Box<Expr>, then: Option<Box<Expr>>, otherwise: Box<Expr> },
    /// `class` is `None` for anonymous classes.
    New { class: Option<ClassRef>, args: Vec<Expr> },
    Closure(Rc<FunctionLike>),
    FunctionCall { name: Name, args: Vec<Expr> },
    DynamicCall { callee: Box<Expr>, args: Vec<Expr> },
    MethodCall { target: Box<Expr>, method: String, args: Vec<Expr> },
    StaticCall { class: ClassRef, method: String, args: Vec<Expr> },
    Variable(String),
    PropertyFetch { target: Box<Expr>, property: String },
    ArrayDim { target: Box<Expr>, index: Option<Box<Expr>> },
    StaticPropertyFetch { class: ClassRef, property: String },
    Cast { to: String, operand: Box<Expr> },
}

impl ExprKind {
    /// Human-readable node kind for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprKind::Int(_) => "integer literal",
            ExprKind::Float(_) => "float literal",
            ExprKind::String(_) => "string literal",
            ExprKind::Template(_) => "interpolated string",
            ExprKind::Array(_) => "array literal",
            ExprKind::ConstFetch(_) => "constant fetch",
            ExprKind::ClassConstFetch { .. } => "class constant fetch",
            ExprKind::ClassName(_) => "class name fetch",
            ExprKind::MagicConstant(_) => "magic constant",
            ExprKind::Unary { .. } => "unary operation",
            ExprKind::Binary { .. } => "binary operation",
            ExprKind::Ternary { .. } => "ternary operation",
            ExprKind::New { .. } => "object instantiation",
            ExprKind::Closure(_) => "closure",
            ExprKind::FunctionCall { .. } => "function call",
            ExprKind::DynamicCall { .. } => "dynamic call",
            ExprKind::MethodCall { .. } => "method call",
            ExprKind::StaticCall { .. } => "static method call",
            ExprKind::Variable(_) => "variable",
            ExprKind::PropertyFetch { .. } => "property fetch",
            ExprKind::ArrayDim { .. } => "array access",
            ExprKind::StaticPropertyFetch { .. } => "static property fetch",
            ExprKind::Cast { .. } => "cast",
        }
    }
}
