use crate::ast::*;
use crate::bytecode::{Chunk, Op};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String, span: Span },
    #[error("'break' outside of a while loop")]
    IllegalBreak { span: Span },
    #[error("program too large: more than {} {what}", u32::MAX)]
    TooLarge { what: &'static str },
}

impl CompileError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::UndefinedVariable { span, .. } | CompileError::IllegalBreak { span } => {
                Some(*span)
            }
            CompileError::TooLarge { .. } => None,
        }
    }
}

type Result<T> = std::result::Result<T, CompileError>;

/// Pending `break` jumps for one lexically enclosing `while`.
#[derive(Default)]
struct LoopContext {
    breaks: Vec<usize>,
}

// ── Stack Compiler ───────────────────────────────────────────────────

struct Compiler {
    chunk: Chunk,
    loops: Vec<LoopContext>,
}

fn index(i: usize, what: &'static str) -> Result<u32> {
    u32::try_from(i).map_err(|_| CompileError::TooLarge { what })
}

impl Compiler {
    fn new() -> Self {
        Compiler { chunk: Chunk::new(), loops: Vec::new() }
    }

    /// Address of the next instruction to be emitted.
    fn here(&self) -> Result<u32> {
        index(self.chunk.code.len(), "instructions")
    }

    fn emit_jump_placeholder(&mut self, make: fn(u32) -> Op) -> usize {
        self.chunk.emit(make(0))
    }

    /// Resolve the jump at `pos` to the next instruction.
    fn patch_to_here(&mut self, pos: usize) -> Result<()> {
        let target = self.here()?;
        let patched = self.chunk.patch_jump(pos, target);
        debug_assert!(patched, "no jump at {pos}");
        Ok(())
    }

    fn compile_program(mut self, program: &Program) -> Result<Chunk> {
        self.compile_block(&program.body)?;
        self.chunk.emit(Op::Halt);
        self.here()?;
        tracing::debug!(
            instructions = self.chunk.code.len(),
            constants = self.chunk.constants.len(),
            variables = self.chunk.variables.len(),
            "compiled program"
        );
        Ok(self.chunk)
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Let { name, value, .. } | Stmt::Assign { name, value, .. } => {
                // Value first: `x = x + 1` must not see its own slot
                self.compile_expr(value)?;
                index(name.len(), "bytes in a variable name")?;
                let slot = index(self.chunk.add_variable(name), "variables")?;
                self.chunk.emit(Op::StoreVar(slot));
            }

            Stmt::If { condition, body } => {
                self.compile_expr(condition)?;
                let skip = self.emit_jump_placeholder(Op::JumpIfFalse);
                self.compile_block(body)?;
                self.patch_to_here(skip)?;
            }

            Stmt::While { condition, body } => {
                self.loops.push(LoopContext::default());
                let loop_start = self.here()?;
                self.compile_expr(condition)?;
                let exit = self.emit_jump_placeholder(Op::JumpIfFalse);
                self.compile_block(body)?;
                self.chunk.emit(Op::Jump(loop_start));

                let ctx = self.loops.pop().unwrap_or_default();
                self.patch_to_here(exit)?;
                for site in ctx.breaks {
                    self.patch_to_here(site)?;
                }
            }

            Stmt::Break { span } => {
                let site = self.emit_jump_placeholder(Op::Jump);
                match self.loops.last_mut() {
                    Some(ctx) => ctx.breaks.push(site),
                    None => return Err(CompileError::IllegalBreak { span: *span }),
                }
            }

            Stmt::Return { value } => {
                self.compile_expr(value)?;
                self.chunk.emit(Op::Return);
            }
        }
        Ok(())
    }

    /// Emits code leaving exactly one value on the operand stack.
    fn compile_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(lit) => {
                let val = match lit {
                    Literal::Int(n) => Value::Int(*n),
                    Literal::Bool(b) => Value::Bool(*b),
                };
                let ki = index(self.chunk.add_const(val), "constants")?;
                self.chunk.emit(Op::PushConst(ki));
            }

            Expr::Ref { name, span } => match self.chunk.variable_index(name) {
                Some(slot) => {
                    let slot = index(slot, "variables")?;
                    self.chunk.emit(Op::LoadVar(slot));
                }
                None => {
                    return Err(CompileError::UndefinedVariable { name: name.clone(), span: *span });
                }
            },

            Expr::UnaryOp { op, operand } => {
                self.compile_expr(operand)?;
                self.chunk.emit(match op {
                    UnaryOp::Not => Op::Not,
                    UnaryOp::Negate => Op::Neg,
                });
            }

            Expr::BinOp { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.chunk.emit(match op {
                    BinOp::Add => Op::Add,
                    BinOp::Subtract => Op::Sub,
                    BinOp::Multiply => Op::Mul,
                    BinOp::Divide => Op::Div,
                    BinOp::Modulo => Op::Mod,
                    BinOp::Equals => Op::Eq,
                    BinOp::NotEquals => Op::Neq,
                    BinOp::LessThan => Op::Lt,
                    BinOp::GreaterThan => Op::Gt,
                    BinOp::LessOrEqual => Op::Le,
                    BinOp::GreaterOrEqual => Op::Ge,
                });
            }
        }
        Ok(())
    }
}

/// Lower a parsed program to a single chunk ending in `HALT`.
pub fn compile(program: &Program) -> Result<Chunk> {
    Compiler::new().compile_program(program)
}
