//! Representación plana del pipeline de palabras.
//!
//! El texto fuente se divide directamente en palabras, sin gramática,
//! y cada palabra se traduce a una [`Instruction`]. Los destinos de
//! salto de `if` y `else` no se conocen hasta observar el `else` o `end`
//! correspondiente; [`crate::resolve`] los completa en una sola pasada
//! y produce un [`Program`].

use std::{
    fmt::{self, Display},
    ops::Index,
    rc::Rc,
};

use thiserror::Error;

use crate::source::{Located, Location, Source};

/// Caracteres que separan palabras.
const SEPARATORS: &[char] = &[',', '!', '\'', ' ', '\n', '\t', '\r'];

/// Índice de instrucción utilizado como destino de salto.
///
/// El generador plano emite la etiqueta `addr_N` inmediatamente antes
/// de la instrucción `N`, por lo cual un `Label` también identifica
/// una etiqueta en el ensamblador.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Apila una constante.
    Push(i64),

    /// Desapila dos valores y apila su suma.
    Plus,

    /// Desapila dos valores y apila su diferencia.
    Minus,

    /// Desapila dos valores y apila 1 si son iguales, 0 si no.
    Equal,

    /// Desapila un valor y lo imprime en decimal.
    Dump,

    /// Desapila una condición y salta al destino si es cero.
    If(Option<Label>),

    /// Salta incondicionalmente al destino y abre el brazo alterno.
    Else(Option<Label>),

    /// Cierra el bloque abierto más interno.
    End,
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Push(value) => write!(fmt, "{}", value),
            Plus => fmt.write_str("+"),
            Minus => fmt.write_str("-"),
            Equal => fmt.write_str("=="),
            Dump => fmt.write_str("."),
            If(_) => fmt.write_str("if"),
            Else(_) => fmt.write_str("else"),
            End => fmt.write_str("end"),
        }
    }
}

/// Palabra que no corresponde a ninguna instrucción.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WordError {
    #[error("Unknown word `{0}`")]
    Unknown(String),
}

/// Programa plano con todos los destinos de salto resueltos.
///
/// Solamente [`crate::resolve::resolve()`] construye valores de este tipo.
#[derive(Debug)]
pub struct Program(pub(crate) Vec<Located<Instruction>>);

impl Program {
    pub fn instructions(&self) -> &[Located<Instruction>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<usize> for Program {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        self.0[index].val()
    }
}

/// Divide un archivo en palabras y las traduce a instrucciones.
///
/// Los destinos de `if` y `else` quedan vacíos. Todas las palabras
/// desconocidas se reportan juntas.
pub fn tokenize(source: &Rc<Source>) -> Result<Vec<Located<Instruction>>, Vec<Located<WordError>>> {
    let mut instructions = Vec::new();
    let mut errors = Vec::new();

    for (word, location) in words(source) {
        match instruction(word) {
            Some(instruction) => instructions.push(Located::at(instruction, location)),
            None => errors.push(Located::at(WordError::Unknown(word.to_owned()), location)),
        }
    }

    if errors.is_empty() {
        Ok(instructions)
    } else {
        Err(errors)
    }
}

fn instruction(word: &str) -> Option<Instruction> {
    use Instruction::*;

    let instruction = match word {
        "+" => Plus,
        "-" => Minus,
        "." | "print" => Dump,
        "==" => Equal,
        "if" => If(None),
        "else" => Else(None),
        "end" => End,
        _ => Push(word.parse().ok()?),
    };

    Some(instruction)
}

/// Itera sobre las palabras no vacías junto a su ubicación.
fn words(source: &Rc<Source>) -> impl Iterator<Item = (&str, Location)> + '_ {
    let text = source.text();
    let mut line = 1;
    let mut offset = 0;

    text.split(SEPARATORS).filter_map(move |word| {
        let start = offset;
        offset += word.len() + 1;

        let here = line;
        line += text[start..offset.min(text.len())].matches('\n').count() as u32;

        if word.is_empty() {
            None
        } else {
            let location = Location::new(Rc::clone(source), here, start..start + word.len());
            Some((word, location))
        }
    })
}
