//! Generador de código sobre el árbol sintáctico.
//!
//! Recorre el árbol en profundidad. Los operandos de una expresión se
//! apilan antes que la plantilla de su operador. Las etiquetas provienen
//! de un contador monótono y viven en el espacio `branch_N`.

use std::io::Write;

use super::CodegenError;
use crate::{
    arch::{x86_64, Symbol},
    ast::{BinOp, Expr, Literal, Stmt},
    source::Location,
};

/// Traduce una lista de sentencias a un programa completo.
pub fn emit<W: Write>(statements: &[Stmt], output: &mut W) -> Result<(), CodegenError> {
    super::prologue(output)?;

    let mut emitter = Emitter {
        output,
        next_label: 0,
    };

    for statement in statements {
        emitter.statement(statement)?;
    }

    super::epilogue(emitter.output)?;
    Ok(())
}

struct Emitter<'a, W> {
    output: &'a mut W,
    next_label: u32,
}

impl<W: Write> Emitter<'_, W> {
    fn statement(&mut self, statement: &Stmt) -> Result<(), CodegenError> {
        match statement {
            Stmt::Print(expr) => {
                self.expr(expr)?;
                self.put(x86_64::DUMP)
            }

            Stmt::Block(statements) => statements
                .iter()
                .try_for_each(|statement| self.statement(statement)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_statement(condition, then_branch, else_branch.as_deref()),

            Stmt::Expression(_)
            | Stmt::Var { .. }
            | Stmt::While { .. }
            | Stmt::Function(_)
            | Stmt::Return { .. }
            | Stmt::Class { .. } => Err(unsupported(statement.construct(), statement.location())),
        }
    }

    /// Sin brazo alterno se reserva una etiqueta, con él se reservan dos.
    ///
    /// La primera etiqueta siempre marca el punto de unión posterior a
    /// toda la sentencia; la segunda marca el inicio del brazo alterno.
    fn if_statement(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), CodegenError> {
        let join = Symbol::Branch(self.next_label);

        match else_branch {
            None => {
                self.next_label += 1;

                self.expr(condition)?;
                self.put(&x86_64::jump_if_false(join))?;
                self.statement(then_branch)?;
            }

            Some(else_branch) => {
                let alternate = Symbol::Branch(self.next_label + 1);
                self.next_label += 2;

                self.expr(condition)?;
                self.put(&x86_64::jump_if_false(alternate))?;
                self.statement(then_branch)?;
                self.put(&x86_64::else_branch(join, alternate))?;
                self.statement(else_branch)?;
            }
        }

        self.put(&x86_64::label(join))
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match expr {
            Expr::Literal { value, location } => {
                let value = integral(value, location.as_ref())?;
                self.put(&x86_64::push(value))
            }

            Expr::Binary { left, op, right } => {
                let template = match op.val() {
                    BinOp::Add => x86_64::PLUS,
                    BinOp::Sub => x86_64::MINUS,
                    BinOp::Equal => x86_64::EQUAL,
                    BinOp::NotEqual => x86_64::NOT_EQUAL,
                    _ => return Err(CodegenError::UnsupportedOperator(op.clone())),
                };

                self.expr(left)?;
                self.expr(right)?;
                self.put(template)
            }

            Expr::Unary { .. }
            | Expr::Grouping(_)
            | Expr::Variable(_)
            | Expr::Assign { .. }
            | Expr::Logical { .. }
            | Expr::Call { .. }
            | Expr::Lambda { .. } => Err(unsupported(expr.construct(), expr.location())),
        }
    }

    fn put(&mut self, text: &str) -> Result<(), CodegenError> {
        self.output.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Valor en la máquina de pila de una literal, si tiene alguno.
fn integral(literal: &Literal, location: Option<&Location>) -> Result<i64, CodegenError> {
    // 2^63, i64::MAX no es representable en f64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    match *literal {
        Literal::Number(number) if number.fract() == 0.0 && (-LIMIT..LIMIT).contains(&number) => {
            Ok(number as i64)
        }

        Literal::Bool(boolean) => Ok(boolean as i64),
        _ => Err(CodegenError::UnsupportedLiteral {
            value: literal.clone(),
            location: location.cloned(),
        }),
    }
}

fn unsupported(construct: &'static str, location: Option<&Location>) -> CodegenError {
    CodegenError::Unsupported {
        construct,
        location: location.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, parse, source::Source};

    fn generate(text: &str) -> Result<String, CodegenError> {
        let tokens = lex::scan(Source::new("test", text)).expect("lexing failed");
        let statements = parse::parse(&tokens).expect("parsing failed");

        let mut output = Vec::new();
        emit(&statements, &mut output)?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn body(text: &str) -> String {
        let program = generate(text).unwrap();
        let start = program.find("main:\n").unwrap() + "main:\n".len();
        let end = program.rfind(";; -- exit --").unwrap();

        program[start..end].to_owned()
    }

    #[test]
    fn print_sum() {
        let expected = [x86_64::push(1), x86_64::push(2), x86_64::PLUS.into(), x86_64::DUMP.into()];
        assert_eq!(body("print 1 + 2;"), expected.concat());
    }

    #[test]
    fn operands_before_operator() {
        let expected = [
            x86_64::push(5),
            x86_64::push(3),
            x86_64::MINUS.into(),
            x86_64::push(2),
            x86_64::NOT_EQUAL.into(),
            x86_64::DUMP.into(),
        ];

        assert_eq!(body("print 5 - 3 != 2;"), expected.concat());
    }

    #[test]
    fn booleans_are_integers() {
        let expected = [x86_64::push(1), x86_64::DUMP.into(), x86_64::push(0), x86_64::DUMP.into()];
        assert_eq!(body("print true; print false;"), expected.concat());
    }

    #[test]
    fn if_without_else() {
        let expected = [
            x86_64::push(1),
            x86_64::push(2),
            x86_64::EQUAL.into(),
            x86_64::jump_if_false(Symbol::Branch(0)),
            x86_64::push(1),
            x86_64::DUMP.into(),
            x86_64::label(Symbol::Branch(0)),
        ];

        assert_eq!(body("if (1 == 2) print 1;"), expected.concat());
    }

    #[test]
    fn if_else_allocates_two_labels() {
        let expected = [
            x86_64::push(1),
            x86_64::jump_if_false(Symbol::Branch(1)),
            x86_64::push(1),
            x86_64::DUMP.into(),
            x86_64::else_branch(Symbol::Branch(0), Symbol::Branch(1)),
            x86_64::push(0),
            x86_64::DUMP.into(),
            x86_64::label(Symbol::Branch(0)),
            x86_64::push(2),
            x86_64::jump_if_false(Symbol::Branch(2)),
            x86_64::label(Symbol::Branch(2)),
        ];

        assert_eq!(
            body("if (true) { print 1; } else { print 0; } if (2) {}"),
            expected.concat()
        );
    }

    #[test]
    fn nested_labels_are_unique() {
        let program = body("if (1) { if (0) print 1; else print 2; } else print 3;");

        for label in ["branch_0:", "branch_1:", "branch_2:", "branch_3:"] {
            assert_eq!(program.matches(label).count(), 1, "{}", label);
        }
    }

    #[test]
    fn while_is_unsupported() {
        let error = generate("while (true) print 1;").unwrap_err();

        assert!(matches!(
            error,
            CodegenError::Unsupported {
                construct: "while statement",
                ..
            }
        ));

        assert_eq!(error.location().map(Location::line), Some(1));
    }

    #[test]
    fn unsupported_nodes() {
        for text in ["var x = 1;", "print (1);", "print -1;", "1 + 1;", "print x;", "fun f() {}"] {
            let error = generate(text).unwrap_err();
            assert!(matches!(error, CodegenError::Unsupported { .. }), "{}", text);
        }
    }

    #[test]
    fn unsupported_operator_and_literals() {
        assert!(matches!(
            generate("print 2 * 3;"),
            Err(CodegenError::UnsupportedOperator(_))
        ));

        for text in ["print 1.5;", "print \"a\";", "print nil;"] {
            assert!(
                matches!(generate(text), Err(CodegenError::UnsupportedLiteral { .. })),
                "{}",
                text
            );
        }
    }
}
