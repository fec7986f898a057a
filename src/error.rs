//! Reporte de errores al usuario.
//!
//! Cada fase produce sus propios tipos de error. [`Diagnostics`] los
//! agrupa bajo una misma categoría y los muestra junto al fragmento de
//! código fuente que los originó.

use std::{
    error::Error,
    fmt::{self, Debug, Display},
};

use crate::{
    codegen::CodegenError,
    source::{Located, Location},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error que puede ser asociado a un punto del código fuente.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> Option<&Location>;
}

/// Errores de una misma fase, listos para ser mostrados.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Categoría bajo la cual se reportan los errores.
    pub fn heading(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Mensajes de cada error, sin ubicación.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.errors.iter().map(|error| error.source().to_string())
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        let Diagnostics { kind, errors } = self;
        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;
            if let Some(location) = error.location() {
                snippet(fmt, location)?;
            }

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, fmt)
    }
}

/// Muestra la primera línea de `location` y subraya el rango.
///
/// Un rango vacío, como el del fin de archivo, se subraya con un solo
/// carácter. Un rango de varias líneas se subraya hasta el fin de la
/// primera.
fn snippet(fmt: &mut fmt::Formatter<'_>, location: &Location) -> fmt::Result {
    writeln!(fmt, " --> {}", location)?;

    let (start, end) = (location.start(), location.end());
    let line_number = start.line();
    let digits = line_number.to_string().chars().count();

    writeln!(fmt, "{:digits$} |", "", digits = digits)?;

    let line_length = location.source().with_line(line_number, |line| -> Result<u32, fmt::Error> {
        writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)?;
        Ok(line.chars().count() as u32)
    })?;

    let from = start.column();
    let to = if end.line() == line_number {
        end.column()
    } else {
        line_length + 1
    };

    let skip = from.saturating_sub(1) as usize;
    let highlight = to.saturating_sub(from).max(1) as usize;

    writeln!(
        fmt,
        "{:digits$} | {:skip$}{:^<highlight$}",
        "",
        "",
        "",
        digits = digits,
        skip = skip,
        highlight = highlight
    )
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> Option<&Location> {
        Some(Located::location(self))
    }
}

impl sealed::Sealed for CodegenError {}

impl LocatedError for CodegenError {
    fn source(&self) -> &dyn Error {
        self
    }

    fn location(&self) -> Option<&Location> {
        CodegenError::location(self)
    }
}
