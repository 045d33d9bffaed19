use std::fs;
use std::process::exit;

use clap::{App, Arg, ArgMatches};

fn parse_arguments() -> ArgMatches<'static> {
    App::new("avc64ld")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Linker for AVC-64 object files: concatenates them in argument order")
        .arg(
            Arg::with_name("files")
                .help("Object files to link, followed by the output file")
                .value_name("OBJECTS... OUTPUT")
                .required(true)
                .multiple(true)
                .min_values(2)
                .index(1),
        )
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    let files: Vec<&str> = args.values_of("files").unwrap().collect();

    // clap guarantees at least two values, so the split cannot fail.
    let (output, objects) = match files.split_last() {
        Some(pair) => pair,
        None => exit(1),
    };

    match run(objects, output) {
        Ok(()) => (),
        Err(err) => {
            eprintln!("IO error: {}", err);
            exit(1);
        }
    }
}

fn run(objects: &[&str], output: &str) -> Result<(), std::io::Error> {
    let mut image = Vec::new();

    for object in objects {
        image.extend_from_slice(&fs::read(object)?);
    }

    fs::write(output, &image)?;

    Ok(())
}
