//! Compilador de un lenguaje de pila hacia ensamblador x86-64.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente, el cual
//! puede procesarse por cualquiera de dos pipelines.
//!
//! La pipeline estructurada somete el archivo a análisis léxico en
//! [`lex`], de lo cual se obtiene un flujo de tokens. El flujo de
//! tokens se dispone en un árbol sintáctico ([`ast`]) por medio de
//! análisis sintáctico en [`parse`].
//!
//! La pipeline plana divide el archivo directamente en palabras, cada
//! una de las cuales es una instrucción de [`ir`]. Los destinos de
//! salto de los bloques condicionales se completan por backpatching
//! en [`resolve`].
//!
//! # Back end
//! Cada pipeline tiene su propio generador de código en [`target`], y
//! ambos comparten las mismas plantillas de ensamblador. El resultado
//! es un programa completo para `fasm`, que [`link`] ensambla y
//! opcionalmente ejecuta. [`driver`] orquesta todas las fases.

#[macro_use]
mod macros;

pub mod ast;
pub mod driver;
pub mod error;
pub mod ir;
pub mod lex;
pub mod link;
pub mod parse;
pub mod resolve;
pub mod source;

mod arch;
mod codegen;

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a
/// generación de código para traducir cualquiera de las dos
/// representaciones a ensamblador.
pub mod target {
    pub use crate::arch::Symbol;
    pub use crate::codegen::{flat, tree, CodegenError};
}
