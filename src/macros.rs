/// Construye una plantilla constante de ensamblador.
///
/// La plantilla inicia con un comentario `;; -- título --` y continúa
/// con una instrucción indentada por línea.
macro_rules! template {
    ($title:literal => $($line:literal),* $(,)?) => {
        concat!(";; -- ", $title, " --\n", $("    ", $line, "\n"),*)
    };
}
