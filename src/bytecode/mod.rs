pub mod disasm;
pub mod format;

use crate::value::Value;

// ── Opcodes ─────────────────────────────────────────────────────────
//
// One byte per instruction tag, as stored in the artifact. Operand-carrying
// opcodes take a single u32: a constant index, a variable index, or an
// absolute instruction address.

pub(crate) const OP_PUSH_CONST: u8 = 0x01;
pub(crate) const OP_LOAD_VAR: u8 = 0x02;
pub(crate) const OP_STORE_VAR: u8 = 0x03;

pub(crate) const OP_ADD: u8 = 0x10;
pub(crate) const OP_SUB: u8 = 0x11;
pub(crate) const OP_MUL: u8 = 0x12;
pub(crate) const OP_DIV: u8 = 0x13;
pub(crate) const OP_MOD: u8 = 0x14;
pub(crate) const OP_NEG: u8 = 0x15;

pub(crate) const OP_EQ: u8 = 0x20;
pub(crate) const OP_NEQ: u8 = 0x21;
pub(crate) const OP_LT: u8 = 0x22;
pub(crate) const OP_GT: u8 = 0x23;
pub(crate) const OP_LE: u8 = 0x24;
pub(crate) const OP_GE: u8 = 0x25;
pub(crate) const OP_NOT: u8 = 0x26;

pub(crate) const OP_JUMP: u8 = 0x30;
pub(crate) const OP_JUMP_IF_FALSE: u8 = 0x31;

pub(crate) const OP_RETURN: u8 = 0x40;
pub(crate) const OP_HALT: u8 = 0x41;

/// A single stack-machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Push `constants[i]`.
    PushConst(u32),
    /// Push the value bound to variable slot `i`.
    LoadVar(u32),
    /// Pop into variable slot `i`.
    StoreVar(u32),

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Not,

    /// Unconditional jump to an absolute address.
    Jump(u32),
    /// Pop a Bool; jump to the address when it is false.
    JumpIfFalse(u32),

    /// Pop the terminal value and halt the program.
    Return,
    /// End of program; reaching it means no `return` executed.
    Halt,
}

/// Why a raw (opcode, operand) pair could not be turned into an [`Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeError {
    UnknownOpcode,
    MissingOperand,
    UnexpectedOperand,
}

impl Op {
    pub fn opcode(self) -> u8 {
        match self {
            Op::PushConst(_) => OP_PUSH_CONST,
            Op::LoadVar(_) => OP_LOAD_VAR,
            Op::StoreVar(_) => OP_STORE_VAR,
            Op::Add => OP_ADD,
            Op::Sub => OP_SUB,
            Op::Mul => OP_MUL,
            Op::Div => OP_DIV,
            Op::Mod => OP_MOD,
            Op::Neg => OP_NEG,
            Op::Eq => OP_EQ,
            Op::Neq => OP_NEQ,
            Op::Lt => OP_LT,
            Op::Gt => OP_GT,
            Op::Le => OP_LE,
            Op::Ge => OP_GE,
            Op::Not => OP_NOT,
            Op::Jump(_) => OP_JUMP,
            Op::JumpIfFalse(_) => OP_JUMP_IF_FALSE,
            Op::Return => OP_RETURN,
            Op::Halt => OP_HALT,
        }
    }

    pub fn operand(self) -> Option<u32> {
        match self {
            Op::PushConst(i)
            | Op::LoadVar(i)
            | Op::StoreVar(i)
            | Op::Jump(i)
            | Op::JumpIfFalse(i) => Some(i),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::PushConst(_) => "PUSH_CONST",
            Op::LoadVar(_) => "LOAD_VAR",
            Op::StoreVar(_) => "STORE_VAR",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Mod => "MOD",
            Op::Neg => "NEG",
            Op::Eq => "EQ",
            Op::Neq => "NEQ",
            Op::Lt => "LT",
            Op::Gt => "GT",
            Op::Le => "LE",
            Op::Ge => "GE",
            Op::Not => "NOT",
            Op::Jump(_) => "JUMP",
            Op::JumpIfFalse(_) => "JUMP_IF_FALSE",
            Op::Return => "RETURN",
            Op::Halt => "HALT",
        }
    }

    /// Jump target, for the two branching instructions.
    pub fn jump_target(self) -> Option<u32> {
        match self {
            Op::Jump(t) | Op::JumpIfFalse(t) => Some(t),
            _ => None,
        }
    }

    pub(crate) fn decode(opcode: u8, operand: Option<u32>) -> Result<Op, DecodeError> {
        let with = |make: fn(u32) -> Op| operand.map(make).ok_or(DecodeError::MissingOperand);
        let bare = |op: Op| match operand {
            None => Ok(op),
            Some(_) => Err(DecodeError::UnexpectedOperand),
        };
        match opcode {
            OP_PUSH_CONST => with(Op::PushConst),
            OP_LOAD_VAR => with(Op::LoadVar),
            OP_STORE_VAR => with(Op::StoreVar),
            OP_ADD => bare(Op::Add),
            OP_SUB => bare(Op::Sub),
            OP_MUL => bare(Op::Mul),
            OP_DIV => bare(Op::Div),
            OP_MOD => bare(Op::Mod),
            OP_NEG => bare(Op::Neg),
            OP_EQ => bare(Op::Eq),
            OP_NEQ => bare(Op::Neq),
            OP_LT => bare(Op::Lt),
            OP_GT => bare(Op::Gt),
            OP_LE => bare(Op::Le),
            OP_GE => bare(Op::Ge),
            OP_NOT => bare(Op::Not),
            OP_JUMP => with(Op::Jump),
            OP_JUMP_IF_FALSE => with(Op::JumpIfFalse),
            OP_RETURN => bare(Op::Return),
            OP_HALT => bare(Op::Halt),
            _ => Err(DecodeError::UnknownOpcode),
        }
    }
}

// ── Chunk ────────────────────────────────────────────────────────────

/// A compiled program: instruction stream, constant pool and variable table.
///
/// The pool and the table are append-only; an index never changes once handed out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk {
    pub code: Vec<Op>,
    pub constants: Vec<Value>,
    /// Variable names by slot. Kept for diagnostics; the VM only needs the count.
    pub variables: Vec<String>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Index of `val` in the constant pool, adding it if absent.
    /// Deduplication is by value and type, so `1` and `true` never share a slot.
    pub fn add_const(&mut self, val: Value) -> usize {
        if let Some(i) = self.constants.iter().position(|c| *c == val) {
            return i;
        }
        self.constants.push(val);
        self.constants.len() - 1
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|n| n == name)
    }

    /// Slot for `name`; the first occurrence allocates the next slot.
    pub fn add_variable(&mut self, name: &str) -> usize {
        if let Some(i) = self.variable_index(name) {
            return i;
        }
        self.variables.push(name.to_string());
        self.variables.len() - 1
    }

    pub fn emit(&mut self, op: Op) -> usize {
        let idx = self.code.len();
        self.code.push(op);
        idx
    }

    /// Point the jump at `pos` to `target`. Returns false, leaving the code
    /// untouched, when `pos` is not a jump.
    pub fn patch_jump(&mut self, pos: usize, target: u32) -> bool {
        match self.code.get_mut(pos) {
            Some(Op::Jump(t) | Op::JumpIfFalse(t)) => {
                *t = target;
                true
            }
            _ => false,
        }
    }
}
