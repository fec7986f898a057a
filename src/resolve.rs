//! Resolución de saltos por backpatching.
//!
//! Una sola pasada de izquierda a derecha con una pila de índices.
//! La pila contiene en todo momento los índices de los bloques `if` y
//! `else` que siguen abiertos, con el más interno en el tope. Al
//! encontrar el delimitador que cierra un bloque, el destino de la
//! instrucción que lo abrió se reescribe en su lugar por índice.
//!
//! Los destinos apuntan a la etiqueta que emite el generador plano:
//! - `if` sin `else` salta a la etiqueta posterior a su `end`;
//! - `if` con `else` salta a la etiqueta posterior al `else`;
//! - `else` salta a la etiqueta posterior a su `end`.

use thiserror::Error;

use crate::{
    ir::{Instruction, Label, Program},
    source::Located,
};

/// Error estructural de bloques.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("`end` without an open `if` or `else` block")]
    UnmatchedEnd,

    #[error("`else` without an open `if` block")]
    UnmatchedElse,

    #[error("`else` can only follow an `if` block, not another `else`")]
    ElseAfterElse,

    #[error("`end` can only close `if` or `else` blocks, found `{0}`")]
    MismatchedEnd(Instruction),

    #[error("Block is never closed with `end`")]
    Unclosed,
}

/// Completa los destinos de todos los `if` y `else`.
///
/// El error se ubica en el delimitador culpable, o bien en el bloque
/// que quedó abierto al final del programa.
pub fn resolve(
    mut instructions: Vec<Located<Instruction>>,
) -> Result<Program, Located<ResolveError>> {
    let mut open: Vec<usize> = Vec::new();

    for ip in 0..instructions.len() {
        let error = match *instructions[ip].val() {
            Instruction::If(_) => {
                open.push(ip);
                None
            }

            Instruction::Else(_) => {
                let error = match opener(&mut instructions, open.pop()) {
                    Some(Instruction::If(target)) => {
                        *target = Some(Label(ip + 1));
                        None
                    }

                    Some(_) => Some(ResolveError::ElseAfterElse),
                    None => Some(ResolveError::UnmatchedElse),
                };

                open.push(ip);
                error
            }

            Instruction::End => match opener(&mut instructions, open.pop()) {
                Some(Instruction::If(target)) | Some(Instruction::Else(target)) => {
                    *target = Some(Label(ip + 1));
                    None
                }

                Some(other) => Some(ResolveError::MismatchedEnd(*other)),
                None => Some(ResolveError::UnmatchedEnd),
            },

            _ => None,
        };

        if let Some(error) = error {
            let location = instructions[ip].location().clone();
            return Err(Located::at(error, location));
        }
    }

    if let Some(block) = open.pop() {
        let location = instructions[block].location().clone();
        return Err(Located::at(ResolveError::Unclosed, location));
    }

    Ok(Program(instructions))
}

/// Instrucción que abrió el bloque en el tope de la pila, si lo hay.
fn opener(
    instructions: &mut [Located<Instruction>],
    block: Option<usize>,
) -> Option<&mut Instruction> {
    instructions.get_mut(block?).map(Located::val_mut)
}
