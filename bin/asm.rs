use std::fs;
use std::process::exit;

use clap::{App, Arg, ArgMatches};
use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use avc64::{assembler::Assembler, error::AssemblyError};

enum Error {
    Assembly(AssemblyError),
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<AssemblyError> for Error {
    fn from(e: AssemblyError) -> Error {
        Error::Assembly(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("avc64asm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Assembler for the AVC-64 virtual instruction architecture")
        .arg(
            Arg::with_name("input")
                .help("File containing AVC-64 assembly source")
                .value_name("INPUT")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .help("File the binary image is written to")
                .value_name("OUTPUT")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("verbose")
                .help("Enables verbose logging")
                .long("verbose")
                .short("v"),
        )
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    let input = args.value_of("input").unwrap();
    let output = args.value_of("output").unwrap();

    let logger = match args.is_present("verbose") {
        true => {
            let decorator = TermDecorator::new().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Some(Logger::root(drain, o!()))
        }
        false => None,
    };

    match run(input, output, logger) {
        Ok(()) => (),
        Err(Error::IO(err)) => {
            eprintln!("IO error: {}", err);
            exit(1);
        }
        Err(Error::Assembly(err)) => {
            eprintln!("{}", err);
            exit(1);
        }
    }
}

fn run(input: &str, output: &str, logger: Option<Logger>) -> Result<(), Error> {
    let source = fs::read_to_string(input)?;

    let mut assembler = Assembler::new();

    if let Some(logger) = logger {
        assembler.set_logger(logger);
    }

    // The output file is only touched once both passes have succeeded.
    let image = assembler.assemble_source(&source, Some(input))?;
    fs::write(output, &image)?;

    Ok(())
}
