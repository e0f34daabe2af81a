use std::{io::Read, rc::Rc};

use crate::{bytecode::unit::Constant, runtime::error::LoadError};

const TAG_INT: u8 = 0;
const TAG_FLOAT: u8 = 1;
const TAG_STR: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_UNDEFINED: u8 = 4;

pub(super) fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_le_bytes());
}

pub(super) fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_le_bytes());
}

fn write_i64(writer: &mut Vec<u8>, value: i64) {
    writer.extend_from_slice(&value.to_le_bytes());
}

fn write_f64(writer: &mut Vec<u8>, value: f64) {
    writer.extend_from_slice(&value.to_le_bytes());
}

pub(super) fn write_string(writer: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    write_u32(writer, bytes.len() as u32);
    writer.extend_from_slice(bytes);
}

pub(super) fn write_bytes(writer: &mut Vec<u8>, value: &[u8]) {
    write_u32(writer, value.len() as u32);
    writer.extend_from_slice(value);
}

pub(super) fn write_constant(writer: &mut Vec<u8>, constant: &Constant) {
    match constant {
        Constant::Int(value) => {
            writer.push(TAG_INT);
            write_i64(writer, *value);
        }
        Constant::Float(value) => {
            writer.push(TAG_FLOAT);
            write_f64(writer, *value);
        }
        Constant::Str(value) => {
            writer.push(TAG_STR);
            write_string(writer, value);
        }
        Constant::Bool(value) => {
            writer.push(TAG_BOOL);
            writer.push(*value as u8);
        }
        Constant::Undefined => writer.push(TAG_UNDEFINED),
    }
}

fn read_array<const N: usize>(reader: &mut &[u8]) -> Result<[u8; N], LoadError> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|_| LoadError::Truncated)?;
    Ok(buf)
}

pub(super) fn read_u8(reader: &mut &[u8]) -> Result<u8, LoadError> {
    Ok(read_array::<1>(reader)?[0])
}

pub(super) fn read_u16(reader: &mut &[u8]) -> Result<u16, LoadError> {
    Ok(u16::from_le_bytes(read_array(reader)?))
}

pub(super) fn read_u32(reader: &mut &[u8]) -> Result<u32, LoadError> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

fn read_i64(reader: &mut &[u8]) -> Result<i64, LoadError> {
    Ok(i64::from_le_bytes(read_array(reader)?))
}

fn read_f64(reader: &mut &[u8]) -> Result<f64, LoadError> {
    Ok(f64::from_le_bytes(read_array(reader)?))
}

pub(super) fn read_bytes(reader: &mut &[u8]) -> Result<Vec<u8>, LoadError> {
    let len = read_u32(reader)? as usize;
    if len > reader.len() {
        return Err(LoadError::Truncated);
    }
    let (bytes, rest) = reader.split_at(len);
    *reader = rest;
    Ok(bytes.to_vec())
}

pub(super) fn read_string(reader: &mut &[u8]) -> Result<String, LoadError> {
    Ok(String::from_utf8(read_bytes(reader)?)?)
}

pub(super) fn read_constant(reader: &mut &[u8]) -> Result<Constant, LoadError> {
    match read_u8(reader)? {
        TAG_INT => Ok(Constant::Int(read_i64(reader)?)),
        TAG_FLOAT => Ok(Constant::Float(read_f64(reader)?)),
        TAG_STR => Ok(Constant::Str(Rc::from(read_string(reader)?))),
        TAG_BOOL => Ok(Constant::Bool(read_u8(reader)? != 0)),
        TAG_UNDEFINED => Ok(Constant::Undefined),
        other => Err(LoadError::InvalidConstantTag(other)),
    }
}
