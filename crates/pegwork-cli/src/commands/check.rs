use std::path::PathBuf;

use pegwork_lib::Compiler;

use super::{read_source, report};
use crate::cli::ColorChoice;

pub fn run(files: &[PathBuf], color: ColorChoice) {
    let mut failed = false;

    for path in files {
        let Some(source) = read_source(path) else {
            failed = true;
            continue;
        };
        if let Err(e) = Compiler::compile(&source) {
            report(path, &source, &e, color);
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }

    // Silent on success (like cargo check).
}
