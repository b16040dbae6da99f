//! Binary artifact layout (`.arx`). All integers are little-endian.
//!
//! ```text
//! header     "ARCB" magic, u16 version
//! constants  u32 count, then per entry: u8 tag (0 = Int + i64, 1 = Bool + u8)
//! variables  u32 count, then per entry: u32 length + UTF-8 bytes
//! code       u32 count, then per entry: u8 opcode, u8 operand flag, [u32 operand]
//! ```
//!
//! Decoding validates every operand against the pools of the same artifact, so a
//! chunk returned by [`deserialize`] never indexes out of bounds.

use super::{Chunk, DecodeError, Op};
use crate::value::Value;

pub const MAGIC: &[u8; 4] = b"ARCB";
pub const VERSION: u16 = 1;

const TAG_INT: u8 = 0;
const TAG_BOOL: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    #[error("corrupt artifact: bad magic tag, not an Arc bytecode file")]
    BadMagic,
    #[error("corrupt artifact: unsupported format version {found} (expected {expected})", expected = VERSION)]
    UnsupportedVersion { found: u16 },
    #[error("corrupt artifact: truncated while reading {what} at byte {offset}")]
    Truncated { what: &'static str, offset: usize },
    #[error("corrupt artifact: unknown constant tag {tag:#04x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("corrupt artifact: invalid boolean byte {byte:#04x} at byte {offset}")]
    InvalidBool { byte: u8, offset: usize },
    #[error("corrupt artifact: variable name {index} is not valid UTF-8")]
    InvalidName { index: usize },
    #[error("corrupt artifact: unknown opcode {opcode:#04x} at instruction {index}")]
    UnknownOpcode { opcode: u8, index: usize },
    #[error("corrupt artifact: invalid operand flag {flag:#04x} at instruction {index}")]
    InvalidOperandFlag { flag: u8, index: usize },
    #[error("corrupt artifact: operand presence does not match opcode {opcode:#04x} at instruction {index}")]
    OperandMismatch { opcode: u8, index: usize },
    #[error("corrupt artifact: instruction {index} ({mnemonic}) references {kind} {operand}, but only {len} exist")]
    OutOfBounds {
        index: usize,
        mnemonic: &'static str,
        kind: &'static str,
        operand: u32,
        len: usize,
    },
    #[error("corrupt artifact: {count} trailing bytes after instruction stream")]
    TrailingBytes { count: usize },
}

// ── Writing ──────────────────────────────────────────────────────────

fn wr_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

fn wr_u16le(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn wr_u32le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn wr_len(out: &mut Vec<u8>, len: usize) {
    // Counts and name lengths are bounded by the compiler (CompileError::TooLarge)
    debug_assert!(u32::try_from(len).is_ok(), "length {len} does not fit the format");
    wr_u32le(out, len as u32);
}

/// Encode a chunk into artifact bytes.
pub fn serialize(chunk: &Chunk) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    wr_u16le(&mut out, VERSION);

    wr_len(&mut out, chunk.constants.len());
    for c in &chunk.constants {
        match c {
            Value::Int(n) => {
                wr_u8(&mut out, TAG_INT);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Value::Bool(b) => {
                wr_u8(&mut out, TAG_BOOL);
                wr_u8(&mut out, u8::from(*b));
            }
        }
    }

    wr_len(&mut out, chunk.variables.len());
    for name in &chunk.variables {
        wr_len(&mut out, name.len());
        out.extend_from_slice(name.as_bytes());
    }

    wr_len(&mut out, chunk.code.len());
    for op in &chunk.code {
        wr_u8(&mut out, op.opcode());
        match op.operand() {
            Some(v) => {
                wr_u8(&mut out, 1);
                wr_u32le(&mut out, v);
            }
            None => wr_u8(&mut out, 0),
        }
    }

    tracing::debug!(bytes = out.len(), instructions = chunk.code.len(), "serialized chunk");
    out
}

// ── Reading ──────────────────────────────────────────────────────────

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], ArtifactError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ArtifactError::Truncated { what, offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], ArtifactError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N, what)?);
        Ok(buf)
    }

    fn rd_u8(&mut self, what: &'static str) -> Result<u8, ArtifactError> {
        Ok(self.take_array::<1>(what)?[0])
    }

    fn rd_u16le(&mut self, what: &'static str) -> Result<u16, ArtifactError> {
        Ok(u16::from_le_bytes(self.take_array(what)?))
    }

    fn rd_u32le(&mut self, what: &'static str) -> Result<u32, ArtifactError> {
        Ok(u32::from_le_bytes(self.take_array(what)?))
    }

    fn rd_i64le(&mut self, what: &'static str) -> Result<i64, ArtifactError> {
        Ok(i64::from_le_bytes(self.take_array(what)?))
    }
}

/// Decode and validate artifact bytes.
pub fn deserialize(bytes: &[u8]) -> Result<Chunk, ArtifactError> {
    let mut r = Reader { bytes, pos: 0 };

    let magic = r.take(MAGIC.len(), "magic tag").map_err(|_| ArtifactError::BadMagic)?;
    if magic != MAGIC {
        return Err(ArtifactError::BadMagic);
    }
    let version = r.rd_u16le("format version")?;
    if version != VERSION {
        return Err(ArtifactError::UnsupportedVersion { found: version });
    }

    let mut chunk = Chunk::new();

    // Counts are untrusted, so entries are pushed one by one rather than preallocated.
    let n_consts = r.rd_u32le("constant count")?;
    for _ in 0..n_consts {
        let offset = r.pos;
        let value = match r.rd_u8("constant tag")? {
            TAG_INT => Value::Int(r.rd_i64le("integer constant")?),
            TAG_BOOL => {
                let offset = r.pos;
                match r.rd_u8("boolean constant")? {
                    0 => Value::Bool(false),
                    1 => Value::Bool(true),
                    byte => return Err(ArtifactError::InvalidBool { byte, offset }),
                }
            }
            tag => return Err(ArtifactError::UnknownTag { tag, offset }),
        };
        chunk.constants.push(value);
    }

    let n_vars = r.rd_u32le("variable count")?;
    for index in 0..n_vars as usize {
        let len = r.rd_u32le("variable name length")? as usize;
        let raw = r.take(len, "variable name")?;
        let name = std::str::from_utf8(raw).map_err(|_| ArtifactError::InvalidName { index })?;
        chunk.variables.push(name.to_string());
    }

    let n_code = r.rd_u32le("instruction count")?;
    for index in 0..n_code as usize {
        let opcode = r.rd_u8("opcode")?;
        let operand = match r.rd_u8("operand flag")? {
            0 => None,
            1 => Some(r.rd_u32le("operand")?),
            flag => return Err(ArtifactError::InvalidOperandFlag { flag, index }),
        };
        let op = Op::decode(opcode, operand).map_err(|e| match e {
            DecodeError::UnknownOpcode => ArtifactError::UnknownOpcode { opcode, index },
            DecodeError::MissingOperand | DecodeError::UnexpectedOperand => {
                ArtifactError::OperandMismatch { opcode, index }
            }
        })?;
        chunk.code.push(op);
    }

    if r.pos != bytes.len() {
        return Err(ArtifactError::TrailingBytes { count: bytes.len() - r.pos });
    }

    validate(&chunk)?;
    tracing::debug!(
        constants = chunk.constants.len(),
        variables = chunk.variables.len(),
        instructions = chunk.code.len(),
        "deserialized chunk"
    );
    Ok(chunk)
}

/// Check every operand against the pools of the same chunk.
pub fn validate(chunk: &Chunk) -> Result<(), ArtifactError> {
    for (index, op) in chunk.code.iter().enumerate() {
        let (kind, len) = match op {
            Op::PushConst(_) => ("constant", chunk.constants.len()),
            Op::LoadVar(_) | Op::StoreVar(_) => ("variable", chunk.variables.len()),
            Op::Jump(_) | Op::JumpIfFalse(_) => ("instruction", chunk.code.len()),
            _ => continue,
        };
        if let Some(operand) = op.operand() {
            if operand as usize >= len {
                return Err(ArtifactError::OutOfBounds {
                    index,
                    mnemonic: op.mnemonic(),
                    kind,
                    operand,
                    len,
                });
            }
        }
    }
    Ok(())
}
