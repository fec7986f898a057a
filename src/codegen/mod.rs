//! Generación de código.
//!
//! Ambos generadores producen la misma estructura de archivo:
//! encabezado, segmento de código, subrutina de impresión, punto de
//! entrada, el flujo de instrucciones traducido y un epílogo que
//! termina el proceso con código 0.

use std::io::{self, Write};

use thiserror::Error;

use crate::{
    arch::x86_64,
    ast::{BinOp, Literal},
    source::{Located, Location},
};

pub mod flat;
pub mod tree;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unsupported construct: {construct}")]
    Unsupported {
        construct: &'static str,
        location: Option<Location>,
    },

    #[error("Unsupported operator `{}`", .0.val())]
    UnsupportedOperator(Located<BinOp>),

    #[error("Unsupported literal `{value}`, only integers and booleans are allowed")]
    UnsupportedLiteral {
        value: Literal,
        location: Option<Location>,
    },

    #[error("Jump target of instruction {index} was never resolved")]
    Unresolved { index: usize, location: Location },
}

impl CodegenError {
    pub fn location(&self) -> Option<&Location> {
        use CodegenError::*;

        match self {
            Io(_) => None,
            Unsupported { location, .. } | UnsupportedLiteral { location, .. } => {
                location.as_ref()
            }
            UnsupportedOperator(op) => Some(op.location()),
            Unresolved { location, .. } => Some(location),
        }
    }
}

fn prologue<W: Write>(output: &mut W) -> io::Result<()> {
    output.write_all(x86_64::HEADER.as_bytes())?;
    output.write_all(x86_64::CODE_SEGMENT.as_bytes())?;
    output.write_all(x86_64::DUMP_ROUTINE.as_bytes())?;
    output.write_all(x86_64::ENTRY.as_bytes())
}

fn epilogue<W: Write>(output: &mut W) -> io::Result<()> {
    output.write_all(x86_64::exit(0).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_order() {
        let mut output = Vec::new();
        prologue(&mut output).unwrap();
        epilogue(&mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let header = text.find("format ELF64 executable").unwrap();
        let segment = text.find("segment readable executable").unwrap();
        let routine = text.find("dump:\n").unwrap();
        let entry = text.find("entry main\nmain:\n").unwrap();
        let exit = text.find("mov    rax, 60").unwrap();

        assert!(header < segment && segment < routine && routine < entry && entry < exit);
    }
}
