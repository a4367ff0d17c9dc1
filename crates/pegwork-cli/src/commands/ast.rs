use std::path::Path;

use pegwork_lib::Compiler;

use super::{read_source, report};
use crate::cli::ColorChoice;

pub fn run(file: &Path, pretty: bool, color: ColorChoice) {
    let Some(source) = read_source(file) else {
        std::process::exit(1);
    };

    let ast = match Compiler::parse(&source) {
        Ok(ast) => ast,
        Err(e) => {
            report(file, &source, &e, color);
            std::process::exit(1);
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&ast)
    } else {
        serde_json::to_string(&ast)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: cannot serialize AST: {e}");
            std::process::exit(1);
        }
    }
}
