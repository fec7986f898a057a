//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de ubicaciones en el código fuente
//! original, lo cual permite determinar un punto exacto o aproximado
//! en donde ocurre un error, sin importar la fase que lo detecte.

use std::{
    fmt::{self, Debug, Display, Formatter},
    fs, io,
    ops::Range,
    path::Path,
    rc::Rc,
};

/// Un archivo de código fuente, con nombre y contenido completo.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye un origen a partir de texto en memoria.
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Lee un archivo completo.
    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Rc<Self>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        Ok(Source::new(path.display().to_string(), text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Invoca a `f` con el contenido de una línea, sin terminador.
    ///
    /// Líneas fuera de rango se observan como vacías.
    pub fn with_line<F, R>(&self, line: u32, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let index = line.saturating_sub(1) as usize;
        f(self.text.lines().nth(index).unwrap_or(""))
    }

    /// Convierte un offset en bytes a una posición línea-columna.
    fn position_of(&self, offset: usize) -> Position {
        let before = &self.text[..offset.min(self.text.len())];
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);

        Position {
            line: 1 + before.matches('\n').count() as u32,
            column: 1 + before[line_start..].chars().count() as u32,
        }
    }
}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene el valor en forma mutable, sin alterar la ubicación.
    pub fn val_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen, un rango de bytes
/// y el número de línea que le asignó el lexer.
///
/// El número de línea es el contador del lexer al momento de emitir
/// el token, por lo cual un literal de string que abarca varias
/// líneas reporta la última. Las posiciones de [`Location::start()`]
/// y [`Location::end()`] se derivan del rango y siempre son exactas.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    line: u32,
    bytes: Range<usize>,
}

impl Location {
    pub fn new(from: Rc<Source>, line: u32, bytes: Range<usize>) -> Self {
        Location { from, line, bytes }
    }

    /// Número de línea reportado por el lexer.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Texto exacto que cubre esta ubicación.
    pub fn lexeme(&self) -> &str {
        &self.from.text[self.bytes.clone()]
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Source {
        &self.from
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.from.position_of(self.bytes.start)
    }

    /// Obtiene la posición de fin (exclusiva).
    pub fn end(&self) -> Position {
        self.from.position_of(self.bytes.end)
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.from.name, self.start())
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lines_and_columns() {
        let source = Source::new("test", "ab\ncde\n\nf");
        let location = Location::new(Rc::clone(&source), 2, 4..6);

        assert_eq!(location.lexeme(), "de");
        assert_eq!((location.start().line(), location.start().column()), (2, 2));
        assert_eq!((location.end().line(), location.end().column()), (2, 4));
        assert_eq!(location.to_string(), "test:2:2");

        let last = Location::new(source, 4, 8..9);
        assert_eq!(last.start(), Position { line: 4, column: 1 });
    }

    #[test]
    fn lines_out_of_range_are_empty() {
        let source = Source::new("test", "only");
        assert_eq!(source.with_line(1, str::to_owned), "only");
        assert_eq!(source.with_line(7, str::len), 0);
    }
}
