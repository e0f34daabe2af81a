use sha2::{Digest, Sha256};

use crate::{
    bytecode::{
        op_code::{OpCode, instruction_len, read_u16, takes_name_operand},
        unit::CodeUnit,
    },
    runtime::error::LoadError,
};

use super::payload_serialization;

pub const CHECKSUM_LEN: usize = 32;

pub fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

pub(super) fn validate_magic(reader: &mut &[u8], magic: &[u8; 4]) -> Result<(), LoadError> {
    let mut found = [0u8; 4];
    for byte in &mut found {
        *byte = payload_serialization::read_u8(reader)?;
    }
    if &found == magic {
        Ok(())
    } else {
        Err(LoadError::BadMagic)
    }
}

pub(super) fn validate_format_version(reader: &mut &[u8], expected: u16) -> Result<u16, LoadError> {
    let version = payload_serialization::read_u16(reader)?;
    if version == expected {
        Ok(version)
    } else {
        Err(LoadError::UnsupportedVersion(version))
    }
}

/// Splits `bytes` into body and trailer and, when asked, checks that the
/// trailer is the SHA-256 of the body.
pub(super) fn split_checksum(bytes: &[u8], verify: bool) -> Result<(&[u8], [u8; 32]), LoadError> {
    if bytes.len() < CHECKSUM_LEN {
        return Err(LoadError::Truncated);
    }
    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let mut stored = [0u8; 32];
    stored.copy_from_slice(trailer);
    if verify && hash_bytes(body) != stored {
        return Err(LoadError::ChecksumMismatch);
    }
    Ok((body, stored))
}

/// Checks that the code of `unit` only contains known opcodes with complete
/// operands, in-range constant references of the right kind, and jumps that
/// land on instruction boundaries.
pub fn verify_code(unit: &CodeUnit) -> Result<(), LoadError> {
    let code = &unit.instructions;
    let malformed = |offset: usize, reason: String| LoadError::MalformedCode {
        unit: unit.name.clone(),
        offset,
        reason,
    };

    let mut boundaries = vec![false; code.len() + 1];
    let mut jumps = Vec::new();
    let mut ip = 0;

    while ip < code.len() {
        boundaries[ip] = true;
        let op = OpCode::try_from(code[ip])
            .map_err(|byte| malformed(ip, format!("unknown opcode {}", byte)))?;
        let len = instruction_len(op);
        if ip + len > code.len() {
            return Err(malformed(ip, format!("truncated operands for {}", op)));
        }

        match op {
            OpCode::OpConstant => {
                let index = read_u16(code, ip + 1) as usize;
                if index >= unit.constants.len() {
                    return Err(malformed(ip, format!("constant {} out of range", index)));
                }
            }
            OpCode::OpJump | OpCode::OpJumpIfFalse => {
                jumps.push((ip, read_u16(code, ip + 1) as usize));
            }
            op if takes_name_operand(op) => {
                let index = read_u16(code, ip + 1) as usize;
                match unit.constants.get(index) {
                    Some(constant) if constant.as_str().is_some() => {}
                    Some(constant) => {
                        return Err(malformed(
                            ip,
                            format!(
                                "{} expects a string constant, found {}",
                                op,
                                constant.type_name()
                            ),
                        ));
                    }
                    None => {
                        return Err(malformed(ip, format!("constant {} out of range", index)));
                    }
                }
            }
            _ => {}
        }
        ip += len;
    }
    boundaries[code.len()] = true;

    for (ip, target) in jumps {
        if target > code.len() || !boundaries[target] {
            return Err(malformed(
                ip,
                format!("jump target {} is not an instruction boundary", target),
            ));
        }
    }

    Ok(())
}
