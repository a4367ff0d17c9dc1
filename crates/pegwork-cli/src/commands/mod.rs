pub mod ast;
pub mod check;
pub mod emit;

use std::path::Path;

use pegwork_lib::Error;

use crate::cli::ColorChoice;

/// Read a grammar file, or report and return `None`.
pub(crate) fn read_source(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", path.display());
            None
        }
    }
}

/// Print a compilation failure: the `Line L, column C:` cause tree, plus an
/// annotated snippet when the failure has a position in the source.
pub(crate) fn report(path: &Path, source: &str, error: &Error, color: ColorChoice) {
    match error {
        Error::Parse(e) => {
            eprintln!("{e}");
            let path_str = path.display().to_string();
            let rendered = e
                .printer()
                .source(source)
                .path(&path_str)
                .colored(color.should_colorize())
                .render();
            eprintln!();
            eprintln!("{rendered}");
        }
        other => eprintln!("error: {other}"),
    }
}
