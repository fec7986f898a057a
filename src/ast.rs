//! Árbol sintáctico del pipeline estructurado.
//!
//! El parser construye estos nodos una única vez y el generador los
//! consume sin modificarlos. Cada nodo es dueño exclusivo de sus hijos.
//! Todas las variantes existen en la gramática, aunque el generador de
//! código solo acepta un subconjunto de ellas.

use crate::{
    lex::Identifier,
    source::{Located, Location},
};

use std::fmt::{self, Display};

#[derive(Debug)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        op: Located<BinOp>,
        right: Box<Expr>,
    },

    Unary {
        op: Located<UnOp>,
        right: Box<Expr>,
    },

    Literal {
        value: Literal,
        location: Option<Location>,
    },

    Grouping(Box<Expr>),

    Variable(Located<Identifier>),

    Assign {
        name: Located<Identifier>,
        value: Box<Expr>,
    },

    Logical {
        left: Box<Expr>,
        op: Located<LogicalOp>,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        paren: Location,
        arguments: Vec<Expr>,
    },

    Lambda {
        parameters: Vec<Located<Identifier>>,
        body: Vec<Stmt>,
    },
}

#[derive(Debug)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    Var {
        name: Located<Identifier>,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Function(Function),

    Return {
        keyword: Location,
        value: Option<Expr>,
    },

    Class {
        name: Located<Identifier>,
        methods: Vec<Function>,
    },
}

/// Declaración de función o método.
#[derive(Debug)]
pub struct Function {
    pub name: Located<Identifier>,
    pub parameters: Vec<Located<Identifier>>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Negate,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl Expr {
    /// Nombre del constructo, para diagnósticos.
    pub fn construct(&self) -> &'static str {
        match self {
            Expr::Binary { .. } => "binary expression",
            Expr::Unary { .. } => "unary expression",
            Expr::Literal { .. } => "literal",
            Expr::Grouping(_) => "grouping",
            Expr::Variable(_) => "variable",
            Expr::Assign { .. } => "assignment",
            Expr::Logical { .. } => "logical expression",
            Expr::Call { .. } => "call",
            Expr::Lambda { .. } => "lambda",
        }
    }

    /// Una ubicación representativa del nodo, si alguna es conocida.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Expr::Binary { op, .. } => Some(op.location()),
            Expr::Unary { op, .. } => Some(op.location()),
            Expr::Literal { location, .. } => location.as_ref(),
            Expr::Grouping(inner) => inner.location(),
            Expr::Variable(name) => Some(name.location()),
            Expr::Assign { name, .. } => Some(name.location()),
            Expr::Logical { op, .. } => Some(op.location()),
            Expr::Call { paren, .. } => Some(paren),
            Expr::Lambda {
                parameters, body, ..
            } => parameters
                .first()
                .map(Located::location)
                .or_else(|| body.iter().find_map(Stmt::location)),
        }
    }
}

impl Stmt {
    /// Nombre del constructo, para diagnósticos.
    pub fn construct(&self) -> &'static str {
        match self {
            Stmt::Expression(_) => "expression statement",
            Stmt::Print(_) => "print statement",
            Stmt::Var { .. } => "variable declaration",
            Stmt::Block(_) => "block",
            Stmt::If { .. } => "if statement",
            Stmt::While { .. } => "while statement",
            Stmt::Function(_) => "function declaration",
            Stmt::Return { .. } => "return statement",
            Stmt::Class { .. } => "class declaration",
        }
    }

    /// Una ubicación representativa del nodo, si alguna es conocida.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Stmt::Expression(expr) | Stmt::Print(expr) => expr.location(),
            Stmt::Var { name, .. } => Some(name.location()),
            Stmt::Block(statements) => statements.iter().find_map(Stmt::location),
            Stmt::If { condition, .. } | Stmt::While { condition, .. } => condition.location(),
            Stmt::Function(function) => Some(function.name.location()),
            Stmt::Return { keyword, .. } => Some(keyword),
            Stmt::Class { name, .. } => Some(name.location()),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(number) => write!(fmt, "{}", number),
            Literal::Str(string) => write!(fmt, "{:?}", string),
            Literal::Bool(boolean) => write!(fmt, "{}", boolean),
            Literal::Nil => fmt.write_str("nil"),
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinOp::*;

        let string = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessOrEqual => "<=",
            Greater => ">",
            GreaterOrEqual => ">=",
        };

        fmt.write_str(string)
    }
}
