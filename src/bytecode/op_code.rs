use std::fmt;

/// Instruction set of loaded units.
///
/// Operands are big-endian. Most take a `u16` constant-pool index; `OpCall`
/// takes a `u8` argument count and the jumps take a `u16` absolute code
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    OpConstant = 0,
    OpUndefined = 1,
    OpReceiver = 2,
    OpGetName = 3,
    OpSetName = 4,
    OpSetGlobal = 5,
    OpGetProperty = 6,
    OpSetProperty = 7,
    OpNewObject = 8,
    OpFunction = 9,
    OpCall = 10,
    OpPop = 11,
    OpDup = 12,
    OpAdd = 13,
    OpSub = 14,
    OpMul = 15,
    OpLessThan = 16,
    OpEqual = 17,
    OpNot = 18,
    OpJump = 19,
    OpJumpIfFalse = 20,
    OpReturn = 21,
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Ok(match byte {
            0 => OpCode::OpConstant,
            1 => OpCode::OpUndefined,
            2 => OpCode::OpReceiver,
            3 => OpCode::OpGetName,
            4 => OpCode::OpSetName,
            5 => OpCode::OpSetGlobal,
            6 => OpCode::OpGetProperty,
            7 => OpCode::OpSetProperty,
            8 => OpCode::OpNewObject,
            9 => OpCode::OpFunction,
            10 => OpCode::OpCall,
            11 => OpCode::OpPop,
            12 => OpCode::OpDup,
            13 => OpCode::OpAdd,
            14 => OpCode::OpSub,
            15 => OpCode::OpMul,
            16 => OpCode::OpLessThan,
            17 => OpCode::OpEqual,
            18 => OpCode::OpNot,
            19 => OpCode::OpJump,
            20 => OpCode::OpJumpIfFalse,
            21 => OpCode::OpReturn,
            other => return Err(other),
        })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub fn operand_widths(op: OpCode) -> &'static [usize] {
    match op {
        OpCode::OpConstant
        | OpCode::OpGetName
        | OpCode::OpSetName
        | OpCode::OpSetGlobal
        | OpCode::OpGetProperty
        | OpCode::OpSetProperty
        | OpCode::OpFunction
        | OpCode::OpJump
        | OpCode::OpJumpIfFalse => &[2],
        OpCode::OpCall => &[1],
        _ => &[],
    }
}

/// Whether the single operand of `op` is a constant-pool index naming a
/// string (property key, binding name or function identifier).
pub fn takes_name_operand(op: OpCode) -> bool {
    matches!(
        op,
        OpCode::OpGetName
            | OpCode::OpSetName
            | OpCode::OpSetGlobal
            | OpCode::OpGetProperty
            | OpCode::OpSetProperty
            | OpCode::OpFunction
    )
}

pub type Instructions = Vec<u8>;

pub fn make(op: OpCode, operands: &[usize]) -> Instructions {
    let widths = operand_widths(op);
    let mut instruction = vec![op as u8];

    for (i, operand) in operands.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(0);
        match width {
            1 => instruction.push(*operand as u8),
            2 => {
                instruction.push((*operand >> 8) as u8);
                instruction.push(*operand as u8);
            }
            _ => {}
        }
    }

    instruction
}

pub fn read_u16(instructions: &[u8], offset: usize) -> u16 {
    ((instructions[offset] as u16) << 8) | (instructions[offset + 1] as u16)
}

pub fn read_u8(instructions: &[u8], offset: usize) -> u8 {
    instructions[offset]
}

/// Size in bytes of the instruction starting with `op`.
pub fn instruction_len(op: OpCode) -> usize {
    1 + operand_widths(op).iter().sum::<usize>()
}

pub fn disassemble(instructions: &[u8]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < instructions.len() {
        let op = match OpCode::try_from(instructions[i]) {
            Ok(op) => op,
            Err(byte) => {
                result.push_str(&format!("{:04} <unknown {}>\n", i, byte));
                i += 1;
                continue;
            }
        };

        let mut operands = Vec::new();
        let mut offset = i + 1;

        for &width in operand_widths(op) {
            if offset + width > instructions.len() {
                break;
            }
            match width {
                1 => operands.push(read_u8(instructions, offset) as usize),
                2 => operands.push(read_u16(instructions, offset) as usize),
                _ => {}
            }
            offset += width;
        }

        let operand_str = operands
            .iter()
            .map(|o| o.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        result.push_str(format!("{:04} {} {}", i, op, operand_str).trim_end());
        result.push('\n');
        i = offset;
    }

    result
}
