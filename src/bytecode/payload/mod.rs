//! Payload codec: the private agreement between a compiler and the loader.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "KSTU" | u16 version | name | u32 n, n x param name
//!   | u32 n, n x constant | u32 len, code bytes | sha256(all of the above)
//! ```
//!
//! Strings are `u32` length + UTF-8 bytes. Constants are a tag byte
//! followed by the value.

use crate::{bytecode::unit::CodeUnit, runtime::error::LoadError};

mod payload_serialization;
mod payload_validation;

use payload_serialization::{
    read_bytes, read_constant, read_string, read_u32, write_bytes, write_constant, write_string,
    write_u16, write_u32,
};
use payload_validation::{split_checksum, validate_format_version, validate_magic};

pub use payload_validation::{hash_bytes, verify_code};

const MAGIC: &[u8; 4] = b"KSTU";
pub const FORMAT_VERSION: u16 = 1;

/// Summary of a payload without building a unit from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadInfo {
    pub format_version: u16,
    pub name: String,
    pub parameters: usize,
    pub constants_count: usize,
    pub instructions_len: usize,
    pub checksum: [u8; 32],
}

impl PayloadInfo {
    pub fn checksum_hex(&self) -> String {
        to_hex(&self.checksum)
    }
}

/// Serializes `unit` into a payload the loader accepts.
pub fn encode_unit(unit: &CodeUnit) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    write_u16(&mut out, FORMAT_VERSION);
    write_string(&mut out, &unit.name);

    write_u32(&mut out, unit.parameters.len() as u32);
    for parameter in &unit.parameters {
        write_string(&mut out, parameter);
    }

    write_u32(&mut out, unit.constants.len() as u32);
    for constant in &unit.constants {
        write_constant(&mut out, constant);
    }

    write_bytes(&mut out, &unit.instructions);

    let checksum = hash_bytes(&out);
    out.extend_from_slice(&checksum);
    out
}

/// Parses and verifies a payload.
///
/// The code is run through [`verify_code`] so the interpreter never sees
/// unknown opcodes or out-of-range operands.
pub fn decode_unit(bytes: &[u8], verify_checksum: bool) -> Result<CodeUnit, LoadError> {
    let (unit, _) = decode_with_checksum(bytes, verify_checksum)?;
    verify_code(&unit)?;
    Ok(unit)
}

pub fn inspect(bytes: &[u8]) -> Result<PayloadInfo, LoadError> {
    let (unit, checksum) = decode_with_checksum(bytes, false)?;
    Ok(PayloadInfo {
        format_version: FORMAT_VERSION,
        name: unit.name,
        parameters: unit.parameters.len(),
        constants_count: unit.constants.len(),
        instructions_len: unit.instructions.len(),
        checksum,
    })
}

fn decode_with_checksum(
    bytes: &[u8],
    verify_checksum: bool,
) -> Result<(CodeUnit, [u8; 32]), LoadError> {
    let mut header = bytes;
    validate_magic(&mut header, MAGIC)?;
    validate_format_version(&mut header, FORMAT_VERSION)?;

    let (body, checksum) = split_checksum(bytes, verify_checksum)?;
    let mut reader = body
        .get(MAGIC.len() + 2..)
        .ok_or(LoadError::Truncated)?;

    let name = read_string(&mut reader)?;

    let parameters_count = read_u32(&mut reader)? as usize;
    let mut parameters = Vec::with_capacity(parameters_count.min(reader.len()));
    for _ in 0..parameters_count {
        parameters.push(read_string(&mut reader)?);
    }

    let constants_count = read_u32(&mut reader)? as usize;
    let mut constants = Vec::with_capacity(constants_count.min(reader.len()));
    for _ in 0..constants_count {
        constants.push(read_constant(&mut reader)?);
    }

    let instructions = read_bytes(&mut reader)?;

    if !reader.is_empty() {
        return Err(LoadError::TrailingBytes(reader.len()));
    }

    Ok((
        CodeUnit {
            name,
            parameters,
            constants,
            instructions,
        },
        checksum,
    ))
}

fn to_hex(bytes: &[u8; 32]) -> String {
    let mut out = String::with_capacity(64);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
