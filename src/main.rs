use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;

use arc::diagnostic::{Diagnostic, ansi::AnsiRenderer, json};
use arc::{Error, bytecode::disasm};

#[derive(Parser)]
#[command(name = "arc", version, about = "Compile and run Arc programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit diagnostics as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored diagnostics
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file to a bytecode artifact
    Build {
        source: PathBuf,
        #[arg(short, long, default_value = "main.arx")]
        output: PathBuf,
    },
    /// Execute a bytecode artifact
    Run { artifact: PathBuf },
    /// Print a readable listing of an artifact
    Disasm { artifact: PathBuf },
    /// Print the syntax tree of a source file as JSON
    Ast { source: PathBuf },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn read_source(path: &Path) -> arc::Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })
}

fn dispatch(command: &Command) -> arc::Result<String> {
    match command {
        Command::Build { source, output } => {
            arc::build(source, output)?;
            Ok(format!("Compiled to {}", output.display()))
        }
        Command::Run { artifact } => {
            let value = arc::run(artifact)?;
            Ok(format!("Return: {}", value))
        }
        Command::Disasm { artifact } => {
            let chunk = arc::load(artifact)?;
            Ok(disasm::disassemble(&chunk).trim_end().to_string())
        }
        Command::Ast { source } => {
            let program = arc::parse_source(&read_source(source)?)?;
            // Plain data with string keys; serialization never fails.
            Ok(serde_json::to_string_pretty(&program).unwrap_or_default())
        }
    }
}

/// Source file the command reads, for diagnostics that point into it.
fn source_path(command: &Command) -> Option<&Path> {
    match command {
        Command::Build { source, .. } | Command::Ast { source } => Some(source),
        Command::Run { .. } | Command::Disasm { .. } => None,
    }
}

fn report(cli: &Cli, err: &Error) {
    let mut d = Diagnostic::from(err);
    if err.has_source_span() {
        if let Some(text) = source_path(&cli.command).and_then(|p| std::fs::read_to_string(p).ok()) {
            d = d.with_source(text);
        }
    }
    if cli.json {
        eprintln!("{}", json::render(&d));
    } else {
        let use_color = !cli.no_color
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stderr().is_terminal();
        eprint!("{}", AnsiRenderer { use_color }.render(&d));
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(&cli.command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            report(&cli, &err);
            ExitCode::FAILURE
        }
    }
}
