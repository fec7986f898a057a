//! Análisis sintáctico.
//!
//! Parser descendente recursivo con un token de lookahead. La
//! precedencia de operadores, de menor a mayor, es: asignación,
//! `or`, `and`, igualdad, comparación, suma, producto, unarios,
//! llamadas y primarios. Cada nivel binario asocia a la izquierda.
//!
//! # Recuperación de errores
//! Cuando una declaración falla, el parser descarta tokens hasta la
//! siguiente frontera de sentencia, pero el error original se propaga
//! de todas formas. Una única sentencia malformada aborta el análisis.

use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Function, Literal, LogicalOp, Stmt, UnOp},
    lex::{Identifier, Keyword, Token},
    source::{Located, Location},
};

/// Máximo de argumentos en una llamada o de parámetros en una declaración.
pub const MAX_ARGUMENTS: usize = 255;

/// Máximo anidamiento de expresiones y sentencias.
///
/// Tanto el parser como el generador de código son recursivos, por lo
/// cual el anidamiento se acota aquí y no durante la generación.
pub const MAX_DEPTH: usize = 128;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: Token },

    #[error("Expected an expression, found {0}")]
    ExpectedExpr(Token),

    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("Can't have more than 255 {0}")]
    TooMany(&'static str),

    #[error("Nesting is deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Construye el AST de un flujo de tokens terminado en [`Token::Eof`].
pub fn parse(tokens: &[Located<Token>]) -> Result<Vec<Stmt>, Located<ParserError>> {
    let last = match tokens.last() {
        Some(last) => last,
        None => return Ok(Vec::new()),
    };

    let mut parser = Parser {
        tokens,
        current: 0,
        previous: None,
        last,
        depth: 0,
    };

    parser.program()
}

struct Parser<'a> {
    tokens: &'a [Located<Token>],
    current: usize,
    previous: Option<&'a Located<Token>>,
    last: &'a Located<Token>,
    depth: usize,
}

type Parse<T> = Result<T, Located<ParserError>>;

impl<'a> Parser<'a> {
    fn program(&mut self) -> Parse<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.declaration()?);
        }

        Ok(statements)
    }

    fn declaration(&mut self) -> Parse<Stmt> {
        let result = if self.eat_keyword(Keyword::Class) {
            self.class_declaration()
        } else if self.eat_keyword(Keyword::Fun) {
            self.function("function").map(Stmt::Function)
        } else if self.eat_keyword(Keyword::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        if result.is_err() {
            self.synchronize();
        }

        result
    }

    fn class_declaration(&mut self) -> Parse<Stmt> {
        let name = self.id("class name")?;
        self.expect(Token::OpenCurly, "`{` before class body")?;

        let mut methods = Vec::new();
        while !self.check(&Token::CloseCurly) && !self.at_end() {
            methods.push(self.function("method")?);
        }

        self.expect(Token::CloseCurly, "`}` after class body")?;
        Ok(Stmt::Class { name, methods })
    }

    fn function(&mut self, kind: &str) -> Parse<Function> {
        let name = self.id(&format!("{} name", kind))?;

        self.expect(Token::OpenParen, &format!("`(` after {} name", kind))?;
        let parameters = self.parameters()?;
        self.expect(Token::OpenCurly, &format!("`{{` before {} body", kind))?;
        let body = self.block()?;

        Ok(Function {
            name,
            parameters,
            body,
        })
    }

    fn lambda(&mut self) -> Parse<Expr> {
        self.expect(Token::OpenParen, "`(` after `fun`")?;
        let parameters = self.parameters()?;
        self.expect(Token::OpenCurly, "`{` before lambda body")?;
        let body = self.block()?;

        Ok(Expr::Lambda { parameters, body })
    }

    /// Lista de parámetros, incluyendo el `)` de cierre.
    fn parameters(&mut self) -> Parse<Vec<Located<Identifier>>> {
        let mut parameters = Vec::new();
        if !self.check(&Token::CloseParen) {
            loop {
                if parameters.len() >= MAX_ARGUMENTS {
                    return self.fail(ParserError::TooMany("parameters"));
                }

                parameters.push(self.id("parameter name")?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        self.expect(Token::CloseParen, "`)` after parameters")?;
        Ok(parameters)
    }

    /// Cuerpo de un bloque, luego de su `{`.
    fn block(&mut self) -> Parse<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(&Token::CloseCurly) && !self.at_end() {
            statements.push(self.declaration()?);
        }

        self.expect(Token::CloseCurly, "`}` after block")?;
        Ok(statements)
    }

    fn statement(&mut self) -> Parse<Stmt> {
        self.nested(Parser::unnested_statement)
    }

    fn unnested_statement(&mut self) -> Parse<Stmt> {
        if self.eat_keyword(Keyword::For) {
            self.for_statement()
        } else if self.eat_keyword(Keyword::If) {
            self.if_statement()
        } else if self.eat_keyword(Keyword::Print) {
            self.print_statement()
        } else if self.eat_keyword(Keyword::Return) {
            self.return_statement()
        } else if self.eat_keyword(Keyword::While) {
            self.while_statement()
        } else if self.eat(&Token::OpenCurly) {
            self.block().map(Stmt::Block)
        } else {
            self.expression_statement()
        }
    }

    /// `for` se reduce a un `while` dentro de bloques.
    fn for_statement(&mut self) -> Parse<Stmt> {
        self.expect(Token::OpenParen, "`(` after `for`")?;

        let initializer = if self.eat(&Token::Semicolon) {
            None
        } else if self.eat_keyword(Keyword::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Token::Semicolon, "`;` after loop condition")?;

        let increment = if self.check(&Token::CloseParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Token::CloseParen, "`)` after for clauses")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal {
            value: Literal::Bool(true),
            location: None,
        });

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Parse<Stmt> {
        self.expect(Token::OpenParen, "`(` after `if`")?;
        let condition = self.expression()?;
        self.expect(Token::CloseParen, "`)` after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Parse<Stmt> {
        let value = self.expression()?;
        self.expect(Token::Semicolon, "`;` after value")?;

        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> Parse<Stmt> {
        let keyword = self.previous_location();
        let value = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.expect(Token::Semicolon, "`;` after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn var_declaration(&mut self) -> Parse<Stmt> {
        let name = self.id("variable name")?;
        let initializer = if self.eat(&Token::Assign) {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect(Token::Semicolon, "`;` after variable declaration")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn while_statement(&mut self) -> Parse<Stmt> {
        self.expect(Token::OpenParen, "`(` after `while`")?;
        let condition = self.expression()?;
        self.expect(Token::CloseParen, "`)` after condition")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn expression_statement(&mut self) -> Parse<Stmt> {
        let expr = self.expression()?;
        self.expect(Token::Semicolon, "`;` after expression")?;

        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> Parse<Expr> {
        self.nested(Parser::assignment)
    }

    fn assignment(&mut self) -> Parse<Expr> {
        let expr = self.or()?;

        if self.eat(&Token::Assign) {
            let equals = self.previous_location();
            let value = Box::new(self.expression()?);

            return match expr {
                Expr::Variable(name) => Ok(Expr::Assign { name, value }),
                _ => Err(Located::at(ParserError::InvalidAssignmentTarget, equals)),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Parse<Expr> {
        let mut expr = self.and()?;
        while self.eat_keyword(Keyword::Or) {
            let op = Located::at(LogicalOp::Or, self.previous_location());
            let right = self.and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Parse<Expr> {
        let mut expr = self.equality()?;
        while self.eat_keyword(Keyword::And) {
            let op = Located::at(LogicalOp::And, self.previous_location());
            let right = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Parse<Expr> {
        self.binary(Parser::comparison, |token| match token {
            Token::BangEqual => Some(BinOp::NotEqual),
            Token::Equal => Some(BinOp::Equal),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Parse<Expr> {
        self.binary(Parser::term, |token| match token {
            Token::Greater => Some(BinOp::Greater),
            Token::GreaterEqual => Some(BinOp::GreaterOrEqual),
            Token::Less => Some(BinOp::Less),
            Token::LessEqual => Some(BinOp::LessOrEqual),
            _ => None,
        })
    }

    fn term(&mut self) -> Parse<Expr> {
        self.binary(Parser::factor, |token| match token {
            Token::Minus => Some(BinOp::Sub),
            Token::Plus => Some(BinOp::Add),
            _ => None,
        })
    }

    fn factor(&mut self) -> Parse<Expr> {
        self.binary(Parser::unary, |token| match token {
            Token::Slash => Some(BinOp::Div),
            Token::Times => Some(BinOp::Mul),
            _ => None,
        })
    }

    /// Un nivel de precedencia binario, asociativo a la izquierda.
    fn binary<F, O>(&mut self, mut operand: F, operator: O) -> Parse<Expr>
    where
        F: FnMut(&mut Self) -> Parse<Expr>,
        O: Fn(&Token) -> Option<BinOp>,
    {
        let mut expr = operand(self)?;

        while let Some(op) = operator(self.peek().val()) {
            let op = Located::at(op, self.advance().location().clone());
            let right = operand(self)?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Parse<Expr> {
        if self.eat_keyword(Keyword::Fun) {
            return self.lambda();
        }

        let op = match self.peek().val() {
            Token::Bang => UnOp::Not,
            Token::Minus => UnOp::Negate,
            _ => return self.call(),
        };

        let op = Located::at(op, self.advance().location().clone());
        let right = Box::new(self.nested(Parser::unary)?);

        Ok(Expr::Unary { op, right })
    }

    fn call(&mut self) -> Parse<Expr> {
        let mut expr = self.primary()?;
        while self.eat(&Token::OpenParen) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Parse<Expr> {
        let mut arguments = Vec::new();
        if !self.check(&Token::CloseParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return self.fail(ParserError::TooMany("arguments"));
                }

                arguments.push(self.expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let paren = self
            .expect(Token::CloseParen, "`)` after arguments")?
            .location()
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Parse<Expr> {
        let value = match self.peek().val() {
            Token::Keyword(Keyword::False) => Literal::Bool(false),
            Token::Keyword(Keyword::True) => Literal::Bool(true),
            Token::Keyword(Keyword::Nil) => Literal::Nil,
            Token::Number(number) => Literal::Number(*number),
            Token::Str(string) => Literal::Str(string.clone()),

            Token::Id(id) => {
                let id = id.clone();
                let location = self.advance().location().clone();

                return Ok(Expr::Variable(Located::at(id, location)));
            }

            Token::OpenParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(Token::CloseParen, "`)` after expression")?;

                return Ok(Expr::Grouping(Box::new(expr)));
            }

            other => {
                let error = ParserError::ExpectedExpr(other.clone());
                return self.fail(error);
            }
        };

        let location = Some(self.advance().location().clone());
        Ok(Expr::Literal { value, location })
    }

    /// Invoca a `parse` un nivel de anidamiento más adentro.
    fn nested<T, F>(&mut self, parse: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        if self.depth >= MAX_DEPTH {
            return self.fail(ParserError::TooDeep);
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;

        result
    }

    /// Descarta tokens hasta una probable frontera de sentencia.
    fn synchronize(&mut self) {
        self.advance();

        while !self.at_end() {
            if let Some(Token::Semicolon) = self.previous.map(Located::val) {
                return;
            }

            if let Token::Keyword(keyword) = self.peek().val() {
                use Keyword::*;

                if matches!(keyword, Class | Fun | Var | For | If | While | Print | Return) {
                    return;
                }
            }

            self.advance();
        }
    }

    fn id(&mut self, expected: &str) -> Parse<Located<Identifier>> {
        match self.peek().val() {
            Token::Id(id) => {
                let id = id.clone();
                Ok(Located::at(id, self.advance().location().clone()))
            }

            _ => self.unexpected(expected),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Parse<&'a Located<Token>> {
        if self.check(&token) {
            Ok(self.advance())
        } else {
            self.unexpected(expected)
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        let matches = self.check(token);
        if matches {
            self.advance();
        }

        matches
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(&Token::Keyword(keyword))
    }

    fn check(&self, token: &Token) -> bool {
        !self.at_end() && self.peek().val() == token
    }

    fn at_end(&self) -> bool {
        matches!(self.peek().val(), Token::Eof)
    }

    fn advance(&mut self) -> &'a Located<Token> {
        let token = self.peek();
        if !self.at_end() {
            self.current += 1;
        }

        self.previous = Some(token);
        token
    }

    fn peek(&self) -> &'a Located<Token> {
        self.tokens.get(self.current).unwrap_or(self.last)
    }

    fn previous_location(&self) -> Location {
        self.previous.unwrap_or(self.last).location().clone()
    }

    fn unexpected<T>(&self, expected: &str) -> Parse<T> {
        self.fail(ParserError::UnexpectedToken {
            expected: expected.to_owned(),
            found: self.peek().val().clone(),
        })
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.peek().location().clone()))
    }
}
