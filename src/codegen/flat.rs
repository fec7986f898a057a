//! Generador de código sobre el programa plano.
//!
//! Una pasada lineal, una plantilla por instrucción. Las etiquetas se
//! derivan del índice de cada instrucción y viven en el espacio
//! `addr_N`: el cierre de un bloque en el índice `i` define `addr_{i+1}`,
//! que es justamente el destino que el resolvedor le asignó al bloque.

use std::{borrow::Cow, io::Write};

use super::CodegenError;
use crate::{
    arch::{x86_64, Symbol},
    ir::{Instruction, Label, Program},
};

pub fn emit<W: Write>(program: &Program, output: &mut W) -> Result<(), CodegenError> {
    super::prologue(output)?;

    for (ip, instruction) in program.instructions().iter().enumerate() {
        let landing = Symbol::Addr(ip + 1);

        let text: Cow<'static, str> = match *instruction.val() {
            Instruction::Push(value) => x86_64::push(value).into(),
            Instruction::Plus => x86_64::PLUS.into(),
            Instruction::Minus => x86_64::MINUS.into(),
            Instruction::Equal => x86_64::EQUAL.into(),
            Instruction::Dump => x86_64::DUMP.into(),

            Instruction::If(Some(Label(target))) => {
                x86_64::jump_if_false(Symbol::Addr(target)).into()
            }

            Instruction::Else(Some(Label(target))) => {
                x86_64::else_branch(Symbol::Addr(target), landing).into()
            }

            Instruction::End => x86_64::label(landing).into(),

            Instruction::If(None) | Instruction::Else(None) => {
                return Err(CodegenError::Unresolved {
                    index: ip,
                    location: instruction.location().clone(),
                })
            }
        };

        output.write_all(text.as_bytes())?;
    }

    super::epilogue(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ir, resolve, source::Source};

    fn body(text: &str) -> String {
        let instructions = ir::tokenize(&Source::new("test", text)).expect("tokenize failed");
        let program = resolve::resolve(instructions).expect("resolve failed");

        let mut output = Vec::new();
        emit(&program, &mut output).unwrap();

        let program = String::from_utf8(output).unwrap();
        let start = program.find("main:\n").unwrap() + "main:\n".len();
        let end = program.rfind(";; -- exit --").unwrap();

        program[start..end].to_owned()
    }

    #[test]
    fn arithmetic() {
        let expected = [
            x86_64::push(1),
            x86_64::push(2),
            x86_64::PLUS.into(),
            x86_64::push(4),
            x86_64::MINUS.into(),
            x86_64::DUMP.into(),
        ];

        assert_eq!(body("1 2 + 4 - ."), expected.concat());
    }

    #[test]
    fn if_else_labels_match_targets() {
        let program = body("1 1 == if 1 . else 0 . end");

        // if en 3 salta a 7, else en 6 salta a 10
        assert!(program.contains("jz     addr_7\n"));
        assert!(program.contains("jmp    addr_10\naddr_7:\n"));
        assert!(program.ends_with("addr_10:\n"));
    }

    #[test]
    fn if_without_else() {
        let program = body("1 2 == if 1 . end");

        assert!(program.contains("jz     addr_7\n"));
        assert!(program.ends_with("addr_7:\n"));
    }

    #[test]
    fn every_jump_has_a_label() {
        let program = body("1 if 2 if 3 . else 4 . end else 5 if 6 . end end");

        for line in program.lines() {
            if let Some(target) = line
                .strip_prefix("    jz     ")
                .or_else(|| line.strip_prefix("    jmp    "))
            {
                let definition = format!("\n{}:\n", target);
                assert_eq!(program.matches(&definition).count(), 1, "{}", target);
            }
        }
    }

    #[test]
    fn unresolved_blocks_are_rejected() {
        let source = Source::new("test", "1 if 2 . end");
        let program = Program(ir::tokenize(&source).unwrap());

        let error = emit(&program, &mut Vec::new()).unwrap_err();
        assert!(matches!(error, CodegenError::Unresolved { index: 1, .. }));
    }
}
