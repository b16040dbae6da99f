use std::collections::BTreeSet;
use std::fmt::Write;

use super::{Chunk, Op};

/// Human-readable listing of a chunk: constant pool, variable table, then
/// the instruction stream with resolved operands. Jump targets are marked `>`.
pub fn disassemble(chunk: &Chunk) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== constants ({}) ==", chunk.constants.len());
    for (i, c) in chunk.constants.iter().enumerate() {
        let _ = writeln!(out, "  #{:<4} {:<5} {}", i, c.type_name(), c);
    }

    let _ = writeln!(out, "== variables ({}) ==", chunk.variables.len());
    for (i, name) in chunk.variables.iter().enumerate() {
        let _ = writeln!(out, "  ${:<4} {}", i, name);
    }

    let _ = writeln!(out, "== code ({}) ==", chunk.code.len());
    let targets = jump_targets(&chunk.code);
    for (ip, op) in chunk.code.iter().enumerate() {
        let marker = if targets.contains(&ip) { '>' } else { ' ' };
        let _ = writeln!(out, "  {:04} {} {}", ip, marker, describe(chunk, *op));
    }

    out
}

fn jump_targets(code: &[Op]) -> BTreeSet<usize> {
    code.iter()
        .filter_map(|op| op.jump_target())
        .map(|t| t as usize)
        .collect()
}

fn describe(chunk: &Chunk, op: Op) -> String {
    let name = op.mnemonic();
    match op {
        Op::PushConst(i) => match chunk.constants.get(i as usize) {
            Some(c) => format!("{:<14} #{} ({})", name, i, c),
            None => format!("{:<14} #{} (<invalid>)", name, i),
        },
        Op::LoadVar(i) | Op::StoreVar(i) => match chunk.variables.get(i as usize) {
            Some(v) => format!("{:<14} ${} ({})", name, i, v),
            None => format!("{:<14} ${} (<invalid>)", name, i),
        },
        Op::Jump(t) | Op::JumpIfFalse(t) => format!("{:<14} -> {:04}", name, t),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample() -> Chunk {
        Chunk {
            code: vec![
                Op::PushConst(0),
                Op::StoreVar(0),
                Op::LoadVar(0),
                Op::JumpIfFalse(5),
                Op::Jump(2),
                Op::Halt,
            ],
            constants: vec![Value::Bool(true)],
            variables: vec!["flag".to_string()],
        }
    }

    #[test]
    fn lists_pools() {
        let out = disassemble(&sample());
        assert!(out.contains("== constants (1) =="), "{out}");
        assert!(out.contains("Bool  true"), "{out}");
        assert!(out.contains("== variables (1) =="), "{out}");
        assert!(out.contains("flag"), "{out}");
    }

    #[test]
    fn resolves_operands() {
        let out = disassemble(&sample());
        assert!(out.contains("PUSH_CONST     #0 (true)"), "{out}");
        assert!(out.contains("STORE_VAR      $0 (flag)"), "{out}");
        assert!(out.contains("JUMP_IF_FALSE  -> 0005"), "{out}");
    }

    #[test]
    fn marks_jump_targets() {
        let out = disassemble(&sample());
        assert!(out.contains("0002 > LOAD_VAR"), "{out}");
        assert!(out.contains("0005 > HALT"), "{out}");
        assert!(out.contains("0000   PUSH_CONST"), "{out}");
    }

    #[test]
    fn invalid_operands_do_not_panic() {
        let chunk = Chunk { code: vec![Op::PushConst(9), Op::LoadVar(4)], ..Chunk::default() };
        let out = disassemble(&chunk);
        assert_eq!(out.matches("<invalid>").count(), 2);
    }
}
