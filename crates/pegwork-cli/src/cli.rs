use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_colorize(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

#[derive(Parser)]
#[command(name = "pegwork", bin_name = "pegwork")]
#[command(about = "PEG grammar compiler emitting Rust parsers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile grammar files and print the emitted Rust source
    #[command(after_help = r#"EXAMPLES:
  pegwork emit grammar.peg
  pegwork emit lexer.peg parser.peg > generated.rs"#)]
    Emit {
        /// Grammar files to compile
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// When to colorize error output
        #[arg(long, value_enum, default_value = "auto")]
        color: ColorChoice,
    },

    /// Dump a grammar file's AST as JSON
    Ast {
        /// Grammar file to parse
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// When to colorize error output
        #[arg(long, value_enum, default_value = "auto")]
        color: ColorChoice,
    },

    /// Parse and emit grammar files without printing; silent on success
    Check {
        /// Grammar files to check
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// When to colorize error output
        #[arg(long, value_enum, default_value = "auto")]
        color: ColorChoice,
    },
}
