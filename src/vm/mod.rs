use std::ops::ControlFlow;

use crate::bytecode::{Chunk, Op};
use crate::value::Value;

/// What went wrong while executing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("type mismatch: {op} cannot take {found}")]
    TypeMismatch { op: &'static str, found: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow in {op}")]
    ArithmeticOverflow { op: &'static str },
    #[error("variable '{name}' read before it was assigned")]
    UnboundVariable { name: String },
    #[error("program finished without executing 'return'")]
    NoReturnValue,
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),
}

/// A runtime fault together with the address of the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{fault} (at instruction {pc})")]
pub struct VmError {
    pub pc: usize,
    pub fault: Fault,
}

type Step = Result<ControlFlow<Value>, Fault>;

// ── Stack machine ────────────────────────────────────────────────────

struct Vm<'a> {
    chunk: &'a Chunk,
    pc: usize,
    stack: Vec<Value>,
    vars: Vec<Option<Value>>,
}

impl<'a> Vm<'a> {
    fn new(chunk: &'a Chunk) -> Self {
        Vm { chunk, pc: 0, stack: Vec::new(), vars: vec![None; chunk.variables.len()] }
    }

    fn run(&mut self) -> Result<Value, VmError> {
        loop {
            let pc = self.pc;
            let Some(&op) = self.chunk.code.get(pc) else {
                return Err(VmError { pc, fault: Fault::NoReturnValue });
            };
            tracing::trace!(pc, op = op.mnemonic(), depth = self.stack.len(), "step");
            self.pc += 1;
            match self.step(op) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(val)) => return Ok(val),
                Err(fault) => return Err(VmError { pc, fault }),
            }
        }
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        self.stack
            .pop()
            .ok_or_else(|| Fault::CorruptArtifact("operand stack underflow".to_string()))
    }

    fn pop_int(&mut self, op: Op) -> Result<i64, Fault> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            other => Err(mismatch(op, &[other])),
        }
    }

    fn pop_ints(&mut self, op: Op) -> Result<(i64, i64), Fault> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok((x, y)),
            _ => Err(mismatch(op, &[a, b])),
        }
    }

    fn slot(&self, i: u32) -> Result<usize, Fault> {
        let i = i as usize;
        if i < self.vars.len() {
            Ok(i)
        } else {
            Err(Fault::CorruptArtifact(format!(
                "variable index {} out of range ({} variables)",
                i,
                self.vars.len()
            )))
        }
    }

    fn jump(&mut self, target: u32) -> Step {
        let target = target as usize;
        if target >= self.chunk.code.len() {
            return Err(Fault::CorruptArtifact(format!(
                "jump target {} out of range ({} instructions)",
                target,
                self.chunk.code.len()
            )));
        }
        self.pc = target;
        Ok(ControlFlow::Continue(()))
    }

    fn arith(&mut self, op: Op, f: fn(i64, i64) -> Option<i64>) -> Step {
        let (a, b) = self.pop_ints(op)?;
        if matches!(op, Op::Div | Op::Mod) && b == 0 {
            return Err(Fault::DivisionByZero);
        }
        let r = f(a, b).ok_or(Fault::ArithmeticOverflow { op: op.mnemonic() })?;
        self.stack.push(Value::Int(r));
        Ok(ControlFlow::Continue(()))
    }

    fn compare(&mut self, op: Op, f: fn(&i64, &i64) -> bool) -> Step {
        let (a, b) = self.pop_ints(op)?;
        self.stack.push(Value::Bool(f(&a, &b)));
        Ok(ControlFlow::Continue(()))
    }

    fn equality(&mut self, op: Op) -> Step {
        let b = self.pop()?;
        let a = self.pop()?;
        if a.type_name() != b.type_name() {
            return Err(mismatch(op, &[a, b]));
        }
        let eq = a == b;
        self.stack.push(Value::Bool(if op == Op::Eq { eq } else { !eq }));
        Ok(ControlFlow::Continue(()))
    }

    fn step(&mut self, op: Op) -> Step {
        match op {
            Op::PushConst(i) => {
                let val = self.chunk.constants.get(i as usize).copied().ok_or_else(|| {
                    Fault::CorruptArtifact(format!(
                        "constant index {} out of range ({} constants)",
                        i,
                        self.chunk.constants.len()
                    ))
                })?;
                self.stack.push(val);
            }
            Op::LoadVar(i) => {
                let slot = self.slot(i)?;
                let val = self.vars[slot].ok_or_else(|| Fault::UnboundVariable {
                    name: self.chunk.variables[slot].clone(),
                })?;
                self.stack.push(val);
            }
            Op::StoreVar(i) => {
                let slot = self.slot(i)?;
                let val = self.pop()?;
                self.vars[slot] = Some(val);
            }

            Op::Add => return self.arith(op, i64::checked_add),
            Op::Sub => return self.arith(op, i64::checked_sub),
            Op::Mul => return self.arith(op, i64::checked_mul),
            Op::Div => return self.arith(op, i64::checked_div),
            Op::Mod => return self.arith(op, i64::checked_rem),
            Op::Neg => {
                let n = self.pop_int(op)?;
                let r = n.checked_neg().ok_or(Fault::ArithmeticOverflow { op: "NEG" })?;
                self.stack.push(Value::Int(r));
            }

            Op::Eq | Op::Neq => return self.equality(op),
            Op::Lt => return self.compare(op, i64::lt),
            Op::Gt => return self.compare(op, i64::gt),
            Op::Le => return self.compare(op, i64::le),
            Op::Ge => return self.compare(op, i64::ge),
            Op::Not => match self.pop()? {
                Value::Bool(b) => self.stack.push(Value::Bool(!b)),
                other => return Err(mismatch(op, &[other])),
            },

            Op::Jump(target) => return self.jump(target),
            Op::JumpIfFalse(target) => match self.pop()? {
                Value::Bool(false) => return self.jump(target),
                Value::Bool(true) => {}
                other => return Err(mismatch(op, &[other])),
            },

            Op::Return => return Ok(ControlFlow::Break(self.pop()?)),
            Op::Halt => return Err(Fault::NoReturnValue),
        }
        Ok(ControlFlow::Continue(()))
    }
}

fn mismatch(op: Op, operands: &[Value]) -> Fault {
    let found = operands.iter().map(Value::type_name).collect::<Vec<_>>().join(" and ");
    Fault::TypeMismatch { op: op.mnemonic(), found }
}

/// Run `chunk` from instruction 0 until the first `RETURN`.
pub fn execute(chunk: &Chunk) -> Result<Value, VmError> {
    let result = Vm::new(chunk).run();
    match &result {
        Ok(val) => tracing::debug!(%val, "program returned"),
        Err(e) => tracing::debug!(pc = e.pc, fault = %e.fault, "program faulted"),
    }
    result
}
