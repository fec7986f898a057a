//! Detalles específicos de la arquitectura objetivo.
//!
//! Toda secuencia de instrucciones que depende de la ISA vive en
//! alguna plantilla de este módulo, de manera que ambos generadores
//! comparten una única fuente de verdad. Las plantillas son funciones
//! puras que únicamente construyen texto.

use std::fmt::{self, Display};

pub mod x86_64;

/// Símbolo de una etiqueta de salto.
///
/// Cada generador numera sus etiquetas de forma independiente, por lo
/// cual cada uno tiene su propio espacio de nombres. Un mismo programa
/// nunca mezcla ambas variantes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Symbol {
    /// Etiqueta derivada de un índice de instrucción (`addr_N`).
    Addr(usize),

    /// Etiqueta tomada de un contador de ramas (`branch_N`).
    Branch(u32),
}

impl Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Addr(index) => write!(fmt, "addr_{}", index),
            Symbol::Branch(number) => write!(fmt, "branch_{}", number),
        }
    }
}
