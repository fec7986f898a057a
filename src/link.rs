//! Construcción y ejecución de binarios.
//!
//! Una vez que se ha emitido código ensamblador, este debe ser
//! ensamblado por `fasm` para producir un binario ELF ejecutable.
//! `fasm` produce el ejecutable directamente, sin enlazador aparte.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
    time::{Duration, Instant},
};

use bitflags::bitflags;
use log::{error, info};
use thiserror::Error;

bitflags! {
    /// Opciones de construcción.
    pub struct BuildOptions: u32 {
        /// Ejecutar el binario luego de construirlo.
        const RUN = 0x01;

        /// Medir el tiempo de ejecución del binario.
        const TIME = 0x02;

        /// Mostrar la salida del ensamblador en vez de capturarla.
        const ECHO = 0x04;
    }
}

/// Un error de ensamblado o de ejecución.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de comandos externos.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// El ensamblador inició su ejecución, pero falló en ensamblar.
    #[error("Assembler exited with status code {0:?}")]
    Failed(ExitStatus),

    #[error("Executable not found: {}", .0.display())]
    MissingExecutable(PathBuf),
}

/// Servicio externo que convierte ensamblador en un ejecutable.
pub trait Toolchain {
    fn assemble(&self, asm: &Path, output: &Path, options: BuildOptions) -> Result<(), ToolchainError>;
}

/// Flat assembler.
pub struct Fasm {
    command: OsString,
}

impl Fasm {
    /// Utiliza un ejecutable de `fasm` particular.
    pub fn new<C: Into<OsString>>(command: C) -> Self {
        Fasm {
            command: command.into(),
        }
    }
}

impl Default for Fasm {
    fn default() -> Self {
        Fasm::new("fasm")
    }
}

impl Toolchain for Fasm {
    fn assemble(&self, asm: &Path, output: &Path, options: BuildOptions) -> Result<(), ToolchainError> {
        info!("Assembling {} into {}", asm.display(), output.display());

        let mut command = Command::new(&self.command);
        command.arg(asm).arg(output);

        let status = if options.contains(BuildOptions::ECHO) {
            command.status()?
        } else {
            let captured = command.output()?;
            if !captured.status.success() {
                for stream in [&captured.stdout, &captured.stderr] {
                    let text = String::from_utf8_lossy(stream);
                    if !text.trim().is_empty() {
                        error!("{}", text.trim_end());
                    }
                }
            }

            captured.status
        };

        if !status.success() {
            return Err(ToolchainError::Failed(status));
        }

        mark_executable(output)?;
        Ok(())
    }
}

/// Ensambla y, si así se indica, ejecuta el binario resultante.
///
/// Retorna el estado de salida del binario cuando fue ejecutado.
pub fn build<T: Toolchain>(
    toolchain: &T,
    asm: &Path,
    output: &Path,
    options: BuildOptions,
) -> Result<Option<ExitStatus>, ToolchainError> {
    toolchain.assemble(asm, output, options)?;

    if !options.contains(BuildOptions::RUN) {
        return Ok(None);
    }

    let status = if options.contains(BuildOptions::TIME) {
        let (status, elapsed) = run_timed(output)?;
        info!("{} ran for {}ms", output.display(), elapsed.as_millis());
        status
    } else {
        run(output)?
    };

    info!("{} exited with {}", output.display(), status);
    Ok(Some(status))
}

/// Ejecuta un binario y espera a que termine.
pub fn run(executable: &Path) -> Result<ExitStatus, ToolchainError> {
    if !executable.is_file() {
        return Err(ToolchainError::MissingExecutable(executable.to_path_buf()));
    }

    info!("Running {}", executable.display());
    Ok(Command::new(invocable(executable)).status()?)
}

/// Igual que [`run()`], midiendo además el tiempo de pared.
pub fn run_timed(executable: &Path) -> Result<(ExitStatus, Duration), ToolchainError> {
    let start = Instant::now();
    let status = run(executable)?;

    Ok((status, start.elapsed()))
}

/// Una ruta sin directorio se buscaría en `PATH`, no en el directorio actual.
fn invocable(executable: &Path) -> PathBuf {
    if executable.components().count() == 1 {
        Path::new(".").join(executable)
    } else {
        executable.to_path_buf()
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn mark_executable(path: &Path) -> io::Result<()> {
    fs::metadata(path).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Falla siempre sin crear nada.
    struct Broken {
        calls: Cell<u32>,
    }

    impl Toolchain for Broken {
        fn assemble(&self, _: &Path, _: &Path, _: BuildOptions) -> Result<(), ToolchainError> {
            self.calls.set(self.calls.get() + 1);
            Err(io::Error::new(io::ErrorKind::Other, "broken").into())
        }
    }

    #[test]
    fn failed_assembly_never_runs() {
        let toolchain = Broken { calls: Cell::new(0) };
        let result = build(
            &toolchain,
            Path::new("in.asm"),
            Path::new("out"),
            BuildOptions::RUN | BuildOptions::TIME,
        );

        assert!(matches!(result, Err(ToolchainError::Io(_))));
        assert_eq!(toolchain.calls.get(), 1);
    }

    #[test]
    fn missing_assembler() {
        let fasm = Fasm::new("cforth-test-no-such-assembler");
        let result = fasm.assemble(Path::new("in.asm"), Path::new("out"), BuildOptions::empty());

        assert!(matches!(result, Err(ToolchainError::Io(_))));
    }

    #[test]
    fn missing_executable() {
        let path = Path::new("cforth-test-no-such-executable");

        assert!(matches!(run(path), Err(ToolchainError::MissingExecutable(_))));
        assert!(matches!(run_timed(path), Err(ToolchainError::MissingExecutable(_))));
    }

    #[test]
    fn bare_names_resolve_locally() {
        assert_eq!(invocable(Path::new("out")), Path::new("./out"));
        assert_eq!(invocable(Path::new("/tmp/out")), Path::new("/tmp/out"));
    }
}
