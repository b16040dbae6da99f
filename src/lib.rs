//! Arc: a small imperative language compiled to a stack-machine bytecode.
//!
//! Pipeline: [`lexer::lex`] → [`parser::parse`] → [`compiler::compile`] →
//! [`bytecode::format::serialize`] on the way out, and
//! [`bytecode::format::deserialize`] → [`vm::execute`] on the way back in.

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod value;
pub mod vm;

use std::path::{Path, PathBuf};

pub use bytecode::Chunk;
pub use value::Value;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] lexer::LexError),
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Compile(#[from] compiler::CompileError),
    #[error(transparent)]
    Artifact(#[from] bytecode::format::ArtifactError),
    #[error(transparent)]
    Vm(#[from] vm::VmError),
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether the error points into source text (and so wants it for rendering).
    pub fn has_source_span(&self) -> bool {
        matches!(self, Error::Lex(_) | Error::Parse(_) | Error::Compile(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io { path: path.to_path_buf(), source }
}

pub fn parse_source(source: &str) -> Result<ast::Program> {
    let tokens = lexer::lex(source)?;
    let mut program = parser::parse(tokens)?;
    program.source = Some(source.to_string());
    Ok(program)
}

pub fn compile_source(source: &str) -> Result<Chunk> {
    let program = parse_source(source)?;
    Ok(compiler::compile(&program)?)
}

/// Compile the file at `source` and write the artifact to `output`.
/// Nothing is written unless compilation succeeds.
pub fn build(source: &Path, output: &Path) -> Result<Chunk> {
    let text = std::fs::read_to_string(source).map_err(io_error(source))?;
    let chunk = compile_source(&text)?;
    let bytes = bytecode::format::serialize(&chunk);
    std::fs::write(output, &bytes).map_err(io_error(output))?;
    tracing::debug!(output = %output.display(), bytes = bytes.len(), "wrote artifact");
    Ok(chunk)
}

pub fn load(artifact: &Path) -> Result<Chunk> {
    let bytes = std::fs::read(artifact).map_err(io_error(artifact))?;
    let chunk = bytecode::format::deserialize(&bytes)?;
    tracing::debug!(
        artifact = %artifact.display(),
        instructions = chunk.code.len(),
        "loaded artifact"
    );
    Ok(chunk)
}

/// Load and execute the artifact at `artifact`, returning the terminal value.
pub fn run(artifact: &Path) -> Result<Value> {
    let chunk = load(artifact)?;
    execute(&chunk)
}

pub fn execute(chunk: &Chunk) -> Result<Value> {
    Ok(vm::execute(chunk)?)
}
