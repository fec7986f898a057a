//! Orquestación de las fases de compilación.
//!
//! Un mismo archivo puede compilarse por cualquiera de dos pipelines,
//! ambas terminan en el mismo esqueleto de ensamblador. El resultado se
//! construye completo en memoria: si alguna fase falla, no se produce
//! ninguna salida parcial.

use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
    time::Instant,
};

use log::{debug, info};

use crate::{
    codegen::{flat, tree},
    error::Diagnostics,
    ir, lex, parse, resolve,
    source::Source,
};

/// Front end a utilizar.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pipeline {
    /// Lexer, parser y generador sobre el árbol sintáctico.
    Tree,

    /// División en palabras, backpatching y generador lineal.
    Flat,
}

impl FromStr for Pipeline {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "tree" => Ok(Pipeline::Tree),
            "flat" => Ok(Pipeline::Flat),
            _ => Err(()),
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pipeline::Tree => fmt.write_str("tree"),
            Pipeline::Flat => fmt.write_str("flat"),
        }
    }
}

/// Compila un archivo completo a texto ensamblador.
pub fn compile(source: Rc<Source>, pipeline: Pipeline) -> Result<Vec<u8>, Diagnostics> {
    let start = Instant::now();
    let mut asm = Vec::new();

    match pipeline {
        Pipeline::Tree => {
            let tokens = lex::scan(Rc::clone(&source))
                .map_err(|errors| Diagnostics::from(errors).kind("Lexical error"))?;

            debug!("{} tokens", tokens.len());

            let statements = parse::parse(&tokens)
                .map_err(|error| Diagnostics::from(error).kind("Syntax error"))?;

            debug!("{} top-level statements", statements.len());

            tree::emit(&statements, &mut asm)
                .map_err(|error| Diagnostics::from(error).kind("Codegen error"))?;
        }

        Pipeline::Flat => {
            let instructions = ir::tokenize(&source)
                .map_err(|errors| Diagnostics::from(errors).kind("Lexical error"))?;

            let program = resolve::resolve(instructions)
                .map_err(|error| Diagnostics::from(error).kind("Structural error"))?;

            debug!(
                "instructions: [{}]",
                program
                    .instructions()
                    .iter()
                    .map(|instruction| instruction.val().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            flat::emit(&program, &mut asm)
                .map_err(|error| Diagnostics::from(error).kind("Codegen error"))?;
        }
    }

    info!(
        "Compiled {} ({} pipeline) in {}ms",
        source.name(),
        pipeline,
        start.elapsed().as_millis()
    );

    Ok(asm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_text(text: &str, pipeline: Pipeline) -> Result<String, Diagnostics> {
        let asm = compile(Source::new("test", text), pipeline)?;
        Ok(String::from_utf8(asm).unwrap())
    }

    #[test]
    fn pipeline_names() {
        assert_eq!("tree".parse::<Pipeline>(), Ok(Pipeline::Tree));
        assert_eq!("flat".parse::<Pipeline>(), Ok(Pipeline::Flat));
        assert_eq!("ast".parse::<Pipeline>(), Err(()));
        assert_eq!(Pipeline::Flat.to_string(), "flat");
    }

    #[test]
    fn error_kinds_per_phase() {
        let cases = [
            ("print \"open;", Pipeline::Tree, "Lexical error"),
            ("print 1", Pipeline::Tree, "Syntax error"),
            ("while (1) print 1;", Pipeline::Tree, "Codegen error"),
            ("1 dup .", Pipeline::Flat, "Lexical error"),
            ("1 . end", Pipeline::Flat, "Structural error"),
        ];

        for (text, pipeline, heading) in cases {
            let diagnostics = compile_text(text, pipeline).unwrap_err();
            assert_eq!(diagnostics.heading(), heading, "{}", text);
            assert_eq!(diagnostics.len(), 1);
        }
    }

    #[test]
    fn all_unknown_words_are_reported() {
        let diagnostics = compile_text("1 dup swap .", Pipeline::Flat).unwrap_err();
        let messages: Vec<_> = diagnostics.messages().collect();

        assert_eq!(messages, vec!["Unknown word `dup`", "Unknown word `swap`"]);
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let text = format!("print {}1{};", "(".repeat(50_000), ")".repeat(50_000));
        let diagnostics = compile_text(&text, Pipeline::Tree).unwrap_err();

        assert_eq!(diagnostics.heading(), "Syntax error");
        assert_eq!(
            diagnostics.messages().collect::<Vec<_>>(),
            vec!["Nesting is deeper than 128 levels"]
        );
    }

    #[test]
    fn empty_programs_only_exit() {
        for pipeline in [Pipeline::Tree, Pipeline::Flat] {
            let asm = compile_text("", pipeline).unwrap();
            assert!(asm.ends_with("main:\n;; -- exit --\n    mov    rax, 60\n    mov    rdi, 0\n    syscall\n"));
        }
    }
}
