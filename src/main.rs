//! Punto de entrada.
//!
//! Este módulo lee el archivo fuente, lo compila por la pipeline
//! elegida y delega el ensamblado y la ejecución a [`cforth::link`].

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg, Command};
use cforth::{
    driver::{self, Pipeline},
    link::{self, BuildOptions, Fasm},
    source::Source,
};
use env_logger::Env;

use std::{
    fs,
    io::{self, Write},
    path::Path,
    process,
    str::FromStr,
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("cforth")
        .version(crate_version!())
        .about("Stack language compiler for x86-64 Linux")
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("INPUT")
                .help("Source file"),
        )
        .arg(
            Arg::new("pipeline")
                .short('p')
                .long("pipeline")
                .value_name("PIPELINE")
                .takes_value(true)
                .default_value("tree")
                .possible_values(["tree", "flat"])
                .help("Front end: grammar-based (tree) or word-based (flat)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("out")
                .help("Output file ('-' along with -S for stdout)"),
        )
        .arg(
            Arg::new("asm")
                .short('S')
                .help("Generate assembly instead of an executable"),
        )
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .help("Run the executable once built"),
        )
        .arg(
            Arg::new("time")
                .long("time")
                .help("Run the executable and report its wall time"),
        )
        .arg(
            Arg::new("echo-asm")
                .long("echo-asm")
                .help("Show assembler output"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log compilation details"),
        )
        .get_matches();

    let filter = if args.is_present("verbose") {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").context("Missing input file")?;
    let output = args.value_of("output").context("Missing output file")?;
    let pipeline = args.value_of("pipeline").context("Missing pipeline")?;
    let pipeline = Pipeline::from_str(pipeline)
        .ok()
        .context("main.rs allowed a bad pipeline")?;

    let source = Source::read(input)
        .with_context(|| format!("Failed to read source file: {}", input))?;

    let asm = match driver::compile(source, pipeline) {
        Ok(asm) => asm,
        Err(diagnostics) => {
            eprint!("{}", diagnostics);
            process::exit(1);
        }
    };

    match (args.is_present("asm"), output) {
        // Ensamblador a stdout
        (true, "-") => io::stdout()
            .write_all(&asm)
            .context("Failed to emit to stdout")?,

        // Ensamblador a archivo
        (true, path) => fs::write(path, &asm)
            .with_context(|| format!("Failed to emit to file: {}", path))?,

        (false, "-") => bail!("Refusing to write executable to stdout"),

        // Ejecutable, con ensamblador intermedio en FILE.asm
        (false, path) => {
            let mut options = BuildOptions::empty();
            if args.is_present("run") {
                options |= BuildOptions::RUN;
            }

            if args.is_present("time") {
                options |= BuildOptions::RUN | BuildOptions::TIME;
            }

            if args.is_present("echo-asm") {
                options |= BuildOptions::ECHO;
            }

            let asm_path = format!("{}.asm", path);
            fs::write(&asm_path, &asm)
                .with_context(|| format!("Failed to emit to file: {}", asm_path))?;

            let status = link::build(&Fasm::default(), Path::new(&asm_path), Path::new(path), options)
                .with_context(|| format!("Failed to generate executable: {}", path))?;

            if let Some(status) = status {
                if !status.success() {
                    process::exit(status.code().unwrap_or(1));
                }
            }
        }
    };

    Ok(())
}
