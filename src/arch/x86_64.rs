//! Plantillas de ensamblador fasm para Linux x86-64.
//!
//! El programa generado es una máquina de pila que usa la pila nativa
//! del proceso: cada valor ocupa una palabra de 64 bits, los operadores
//! desapilan sus operandos y apilan su resultado.

use super::Symbol;

/// Encabezado del archivo de salida.
pub const HEADER: &str = "format ELF64 executable\n";

/// Único segmento del ejecutable.
pub const CODE_SEGMENT: &str = "segment readable executable\n";

/// Punto de entrada del ejecutable.
pub const ENTRY: &str = "entry main\nmain:\n";

/// Subrutina que imprime `rdi` en decimal sin signo, seguido de `\n`.
///
/// Divide entre 10 mediante multiplicación por el inverso modular y
/// construye los dígitos de derecha a izquierda en la pila nativa.
pub const DUMP_ROUTINE: &str = r#";; -- dump --
dump:
    mov    r8, -3689348814741910323
    sub    rsp, 40
    mov    BYTE [rsp+31], 10
    lea    rcx, [rsp+30]
.L2:
    mov    rax, rdi
    mul    r8
    mov    rax, rdi
    shr    rdx, 3
    lea    rsi, [rdx+rdx*4]
    add    rsi, rsi
    sub    rax, rsi
    mov    rsi, rcx
    sub    rcx, 1
    add    eax, 48
    mov    BYTE [rcx+1], al
    mov    rax, rdi
    mov    rdi, rdx
    cmp    rax, 9
    ja     .L2
    lea    rdx, [rsp+32]
    mov    edi, 1
    xor    eax, eax
    sub    rdx, rsi
    mov    rax, 1
    syscall
    add    rsp, 40
    ret
"#;

pub const PLUS: &str = template!("plus" =>
    "pop    rax",
    "pop    rbx",
    "add    rax, rbx",
    "push   rax",
);

/// Resta el tope al segundo elemento.
pub const MINUS: &str = template!("minus" =>
    "pop    rax",
    "pop    rbx",
    "sub    rbx, rax",
    "push   rbx",
);

pub const EQUAL: &str = template!("equal" =>
    "mov    rcx, 0",
    "mov    rdx, 1",
    "pop    rax",
    "pop    rbx",
    "cmp    rax, rbx",
    "cmove  rcx, rdx",
    "push   rcx",
);

pub const NOT_EQUAL: &str = template!("not equal" =>
    "mov    rcx, 1",
    "mov    rdx, 0",
    "pop    rax",
    "pop    rbx",
    "cmp    rax, rbx",
    "cmove  rcx, rdx",
    "push   rcx",
);

/// Desapila un valor e invoca a [`DUMP_ROUTINE`].
pub const DUMP: &str = template!("dump" =>
    "pop    rdi",
    "call   dump",
);

/// Apila una constante.
///
/// `push` solo codifica inmediatos de 32 bits con extensión de signo;
/// valores más amplios pasan por `rax`.
pub fn push(value: i64) -> String {
    if i32::try_from(value).is_ok() {
        format!(";; -- push {0} --\n    push   {0}\n", value)
    } else {
        format!(
            ";; -- push {0} --\n    mov    rax, {0}\n    push   rax\n",
            value
        )
    }
}

/// Desapila una condición y salta a `target` si es cero.
pub fn jump_if_false(target: Symbol) -> String {
    format!(
        ";; -- if --\n    pop    rax\n    test   rax, rax\n    jz     {}\n",
        target
    )
}

/// Cierra el brazo verdadero de un `if` y abre el alterno.
///
/// Salta incondicionalmente a `exit` y define `landing`, que es adonde
/// llega el `if` cuando su condición es falsa.
pub fn else_branch(exit: Symbol, landing: Symbol) -> String {
    format!(";; -- else --\n    jmp    {}\n{}", exit, label(landing))
}

pub fn label(symbol: Symbol) -> String {
    format!("{}:\n", symbol)
}

/// Termina el proceso con `exit(2)`.
pub fn exit(code: i32) -> String {
    format!(
        ";; -- exit --\n    mov    rax, 60\n    mov    rdi, {}\n    syscall\n",
        code
    )
}
