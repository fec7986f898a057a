//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del pipeline estructurado. Descompone un
//! [`Source`] en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios se descartan durante esta operación. Cada
//! token emitido está asociado a una ubicación en el código fuente original,
//! cuyo rango de bytes reproduce exactamente el lexema.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por lo que son.
//! Los identificadores incluyen su lexema, mientras que las constantes
//! literales se resuelven a sus valores. El flujo siempre termina con
//! [`Token::Eof`], cuya ubicación es vacía y corresponde al final del texto.
//!
//! # Reglas importantes del lenguaje
//! - Los números son secuencias de dígitos con una parte fraccionaria
//!   opcional. `1.` produce `1` seguido de `.`.
//! - Los strings se delimitan por `"` o `'`, pueden abarcar varias líneas
//!   y admiten secuencias de escape con `\`.
//! - Los comentarios de bloque `/* ... */` terminan en cuanto se observa
//!   un `*`, o bien un `/` en la posición siguiente. Por tanto, un `*` o `/`
//!   aislado dentro del comentario lo termina antes de tiempo.
//!
//! # Errores
//! Los caracteres desconocidos se descartan con una advertencia. Los demás
//! errores no detienen el escaneo, lo cual permite reportar más de un
//! error por ejecución, pero no avanzar a las demás fases.

use crate::source::{Located, Location, Source};
use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use log::warn;
use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Un literal de string no se cerró antes del final del archivo.
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// Secuencia de escape desconocida dentro de un string.
    #[error("Unknown escape sequence `\\{0}` in string literal")]
    BadEscape(char),

    /// Un `\` al final del contenido de un string.
    #[error("Dangling `\\` at the end of a string literal")]
    DanglingEscape,

    /// La constante numérica no es representable como `f64` finito.
    #[error("Number literal is out of range")]
    BadNumber,

    /// Un escape `\u` o `\x` no describe un carácter válido.
    #[error("Invalid character escape `\\{0}` in string literal")]
    BadCharEscape(String),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(fmt)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal numérico.
    Number(f64),

    /// Literal de string, ya sin comillas ni escapes.
    Str(String),

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `,`
    Comma,

    /// `.`
    Period,

    /// `-`
    Minus,

    /// `+`
    Plus,

    /// `;`
    Semicolon,

    /// `/`
    Slash,

    /// `*`
    Times,

    /// `!`
    Bang,

    /// `!=`
    BangEqual,

    /// `=`
    Assign,

    /// `==`
    Equal,

    /// `>`
    Greater,

    /// `>=`
    GreaterEqual,

    /// `<`
    Less,

    /// `<=`
    LessEqual,

    /// Fin del flujo.
    Eof,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Number(number) => write!(fmt, "literal `{}`", number),
            Str(string) => write!(fmt, "literal {:?}", string),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
            Comma => fmt.write_str("`,`"),
            Period => fmt.write_str("`.`"),
            Minus => fmt.write_str("`-`"),
            Plus => fmt.write_str("`+`"),
            Semicolon => fmt.write_str("`;`"),
            Slash => fmt.write_str("`/`"),
            Times => fmt.write_str("`*`"),
            Bang => fmt.write_str("`!`"),
            BangEqual => fmt.write_str("`!=`"),
            Assign => fmt.write_str("`=`"),
            Equal => fmt.write_str("`==`"),
            Greater => fmt.write_str("`>`"),
            GreaterEqual => fmt.write_str("`>=`"),
            Less => fmt.write_str("`<`"),
            LessEqual => fmt.write_str("`<=`"),
            Eof => fmt.write_str("end of input"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            And    => "and",
            Class  => "class",
            Else   => "else",
            False  => "false",
            For    => "for",
            Fun    => "fun",
            If     => "if",
            Nil    => "nil",
            Or     => "or",
            Print  => "print",
            Return => "return",
            Super  => "super",
            This   => "this",
            True   => "true",
            Var    => "var",
            While  => "while",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("and",    And),
            ("class",  Class),
            ("else",   Else),
            ("false",  False),
            ("for",    For),
            ("fun",    Fun),
            ("if",     If),
            ("nil",    Nil),
            ("or",     Or),
            ("print",  Print),
            ("return", Return),
            ("super",  Super),
            ("this",   This),
            ("true",   True),
            ("var",    Var),
            ("while",  While),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Escanea un archivo completo.
///
/// Equivale a [`Lexer::try_exhaustive()`] sobre un lexer nuevo.
pub fn scan(source: Rc<Source>) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
    Lexer::new(source).try_exhaustive()
}

/// Escáner con un carácter de lookahead (dos para comentarios).
///
/// `start` marca el primer byte del token en construcción y `current`
/// el siguiente byte por consumir.
pub struct Lexer {
    source: Rc<Source>,
    start: usize,
    current: usize,
    line: u32,
    start_line: u32,
    finished: bool,
}

impl Lexer {
    /// Crea un lexer en estado inicial a partir de un origen.
    pub fn new(source: Rc<Source>) -> Self {
        Lexer {
            source,
            start: 0,
            current: 0,
            line: 1,
            start_line: 1,
            finished: false,
        }
    }

    /// Reduce la entrada a sea una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará
    /// de acumular tokens exitosos y comenzará a acumular solamente
    /// errores. El propósito de esta función es permitir la
    /// recolección de múltiples errores léxicos en una misma ejecución
    /// del compilador.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        Ok(tokens)
    }

    /// Intenta construir un siguiente token, `None` al final del texto.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use Token::*;

        loop {
            self.start = self.current;
            self.start_line = self.line;

            let c = match self.advance() {
                Some(c) => c,
                None => return Ok(None),
            };

            let token = match c {
                // Tokens triviales
                '(' => OpenParen,
                ')' => CloseParen,
                '{' => OpenCurly,
                '}' => CloseCurly,
                ',' => Comma,
                '.' => Period,
                '-' => Minus,
                '+' => Plus,
                ';' => Semicolon,
                '*' => Times,

                // Operadores de uno o dos caracteres
                '!' if self.eat('=') => BangEqual,
                '!' => Bang,
                '=' if self.eat('=') => Equal,
                '=' => Assign,
                '<' if self.eat('=') => LessEqual,
                '<' => Less,
                '>' if self.eat('=') => GreaterEqual,
                '>' => Greater,

                '/' if self.eat('/') => {
                    self.line_comment();
                    continue;
                }

                '/' if self.eat('*') => {
                    self.block_comment();
                    continue;
                }

                '/' => Slash,

                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    self.line += 1;
                    continue;
                }

                '"' | '\'' => self.string(c)?,
                c if c.is_ascii_digit() => self.number()?,
                c if c.is_alphabetic() => self.word(),

                c => {
                    let location = self.location(self.start_line);
                    warn!("{}: skipping unexpected character {:?}", location, c);
                    continue;
                }
            };

            return Ok(Some(token));
        }
    }

    fn line_comment(&mut self) {
        while !matches!(self.peek(), Some('\n') | None) {
            self.advance();
        }
    }

    fn block_comment(&mut self) {
        // Basta con observar `*` o un `/` que le siga al carácter actual
        while let Some(c) = self.peek() {
            if c == '*' || self.peek_next() == Some('/') {
                break;
            }

            if c == '\n' {
                self.line += 1;
            }

            self.advance();
        }

        for _ in 0..2 {
            if self.advance() == Some('\n') {
                self.line += 1;
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Token, LexerError> {
        loop {
            match self.peek() {
                None => return Err(LexerError::UnterminatedString),
                Some(c) if c == quote => break,
                Some('\n') => self.line += 1,
                Some(_) => (),
            }

            self.advance();
        }

        // Comilla de cierre
        self.advance();

        let quoted = &self.source.text()[self.start..self.current];
        unescape(&quoted[1..quoted.len() - 1]).map(Token::Str)
    }

    fn number(&mut self) -> Result<Token, LexerError> {
        self.skip_digits();

        let has_fraction = self.peek() == Some('.')
            && self.peek_next().map_or(false, |c| c.is_ascii_digit());

        if has_fraction {
            self.advance();
            self.skip_digits();
        }

        match self.source.text()[self.start..self.current].parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Token::Number(number)),
            _ => Err(LexerError::BadNumber),
        }
    }

    fn word(&mut self) -> Token {
        while self.peek().map_or(false, is_word_char) {
            self.advance();
        }

        let word = &self.source.text()[self.start..self.current];
        match Keyword::from_str(word) {
            Ok(keyword) => Token::Keyword(keyword),
            Err(()) => Token::Id(Identifier::from(word)),
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        let matches = self.peek() == Some(expected);
        if matches {
            self.advance();
        }

        matches
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();

        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.source.text()[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.text()[self.current..].chars().nth(1)
    }

    fn location(&self, line: u32) -> Location {
        Location::new(Rc::clone(&self.source), line, self.start..self.current)
    }
}

impl Iterator for Lexer {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.lex() {
            Ok(Some(token)) => Some(Ok(Located::at(token, self.location(self.line)))),

            Ok(None) => {
                self.finished = true;
                Some(Ok(Located::at(Token::Eof, self.location(self.line))))
            }

            // Los errores se ubican en la línea donde inició el token
            Err(error) => Some(Err(Located::at(error, self.location(self.start_line)))),
        }
    }
}

/// Determina si un carácter puede pertenecer a un identificador.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Decodifica secuencias de escape con `\`.
///
/// Además de los escapes de control comunes se aceptan `\xHH`, `\uHHHH`,
/// `\u{H...}` y cualquier signo de puntuación ASCII escapado, que se
/// representa a sí mismo.
fn unescape(raw: &str) -> Result<String, LexerError> {
    let mut output = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }

        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('a') => '\x07',
            Some('f') => '\x0c',
            Some('v') => '\x0b',
            Some('e') => '\x1b',

            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                code_point(&hex, hex.len() == 2)
                    .ok_or_else(|| LexerError::BadCharEscape(format!("x{}", hex)))?
            }

            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();

                let mut hex = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }

                    hex.push(c);
                }

                let well_formed = closed && (1..=6).contains(&hex.len());
                code_point(&hex, well_formed).ok_or_else(|| {
                    let close = if closed { "}" } else { "" };
                    LexerError::BadCharEscape(format!("u{{{}{}", hex, close))
                })?
            }

            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                code_point(&hex, hex.len() == 4)
                    .ok_or_else(|| LexerError::BadCharEscape(format!("u{}", hex)))?
            }

            Some(c) if c.is_ascii_punctuation() => c,
            Some(other) => return Err(LexerError::BadEscape(other)),
            None => return Err(LexerError::DanglingEscape),
        };

        output.push(escaped);
    }

    Ok(output)
}

/// Interpreta los dígitos hexadecimales de un escape `\x` o `\u`.
fn code_point(hex: &str, well_formed: bool) -> Option<char> {
    if !well_formed || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}
