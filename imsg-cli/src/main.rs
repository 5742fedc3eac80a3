//! imsg-contacts — resolve messaging handles to contacts from the command line.

#![allow(
    missing_docs,
    missing_debug_implementations,
    clippy::print_stderr,
    clippy::print_stdout
)]

mod cmd;
mod display;

use std::process;

use clap::Parser;

use crate::cmd::{Cli, Command};

fn main() {
    if let Err(e) = run() {
        eprintln!("fatal: {e}");
        process::exit(1);
    }
}

fn run() -> imsg::Result<()> {
    let cli = Cli::parse();
    imsg::init_logger(Some(&cli.log_level))?;

    if let Some(path) = cmd::config::directory_path(cli.directory.as_deref()) {
        imsg::load_directory(&path)?;
    }

    match cli.command {
        Command::Status => cmd::access::status(),
        Command::Request => cmd::access::request(),
        Command::Resolve(args) => cmd::resolve::run(&args),
        Command::Label { values } => cmd::resolve::label(&values),
    }
}
