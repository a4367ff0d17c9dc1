mod cli;
mod commands;

use clap::Parser as _;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Emit { files, color } => commands::emit::run(&files, color),
        Command::Ast {
            file,
            pretty,
            color,
        } => commands::ast::run(&file, pretty, color),
        Command::Check { files, color } => commands::check::run(&files, color),
    }
}
